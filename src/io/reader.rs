//! C2: ByteReader — positional reads of the backing file.

use std::fs::File;
use std::io;
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::FileExt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Cancellation handle threaded through every read (spec §5). Cloning shares
/// the same underlying cancellation flag.
pub type AbortToken = CancellationToken;

/// Positional read of the backing file.
///
/// The spec's contract is `read(buf, bufOffset, length, fileOffset)` —
/// writing into a caller-supplied buffer. This trait instead returns an
/// owned `Bytes`, since the engine reads go straight into the async read
/// cache (`ReadCache`) rather than a caller-managed scratch buffer; the
/// effect — exactly `length` bytes read starting at `file_offset` — is the
/// same.
#[async_trait]
pub trait ByteReader: Send + Sync {
    async fn read(
        &self,
        file_offset: u64,
        length: u64,
        abort: &AbortToken,
    ) -> Result<Bytes, Error>;
}

/// A `ByteReader` over a plain file, performing each read on a blocking
/// thread so the async engine never blocks its executor on disk I/O.
pub struct FileByteReader {
    file: Arc<File>,
}

impl FileByteReader {
    pub fn new(file: File) -> Self {
        FileByteReader {
            file: Arc::new(file),
        }
    }

    pub fn open(path: &str) -> io::Result<Self> {
        Ok(FileByteReader::new(File::open(path)?))
    }
}

#[async_trait]
impl ByteReader for FileByteReader {
    async fn read(
        &self,
        file_offset: u64,
        length: u64,
        abort: &AbortToken,
    ) -> Result<Bytes, Error> {
        if abort.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let file = self.file.clone();
        let abort = abort.clone();
        let result = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(Error::Cancelled),
            r = tokio::task::spawn_blocking(move || read_at_exact(&file, file_offset, length)) => r,
        };
        match result {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(Error::IoFailure(e)),
            Err(join_err) => Err(Error::IoFailure(io::Error::new(
                io::ErrorKind::Other,
                join_err.to_string(),
            ))),
        }
    }
}

#[cfg(unix)]
fn read_at_exact(file: &File, offset: u64, length: u64) -> io::Result<Bytes> {
    let mut buf = vec![0u8; length as usize];
    file.read_exact_at(&mut buf, offset)?;
    Ok(Bytes::from(buf))
}

#[cfg(not(unix))]
fn read_at_exact(file: &File, offset: u64, length: u64) -> io::Result<Bytes> {
    use std::io::{Read, Seek, SeekFrom};
    // Portable fallback: no shared-handle positional read API, so take an
    // exclusive lock on a cloned handle's cursor for the duration of the read.
    let mut file = file.try_clone()?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; length as usize];
    file.read_exact(&mut buf)?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_exact_range_at_offset() {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"0123456789abcdef").unwrap();
        let reader = FileByteReader::new(tmp);

        let abort = CancellationToken::new();
        let bytes = reader.read(3, 4, &abort).await.unwrap();
        assert_eq!(&bytes[..], b"3456");
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        let reader = FileByteReader::new(tmp);

        let abort = CancellationToken::new();
        abort.cancel();
        let result = reader.read(0, 4, &abort).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
