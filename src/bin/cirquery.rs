use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio_stream::StreamExt;

use cirquery::io::{AbortToken, FileByteReader, ReadCache};
use cirquery::observer::Event;
use cirquery::{read_header, QueryEngine};

#[derive(Parser)]
#[command(name = "cirquery", version, about = "Query a BigWig/BigBed CIR tree for overlapping features")]
struct Cli {
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Print every feature overlapping `chrom:start-end` to stdout.
    Query {
        #[command(flatten)]
        args: QueryArgs,
    },
    /// Print the parsed common header and chromosome list.
    Info {
        #[command(flatten)]
        args: InfoArgs,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Path to a .bw/.bigWig or .bb/.bigBed file.
    path: String,
    /// Reference sequence name, e.g. "chr1".
    chrom: String,
    /// Half-open interval start.
    start: i32,
    /// Half-open interval end.
    end: i32,
}

#[derive(Args)]
struct InfoArgs {
    /// Path to a .bw/.bigWig or .bb/.bigBed file.
    path: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        SubCommands::Query { args } => run_query(args).await,
        SubCommands::Info { args } => run_info(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_query(args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let header = {
        let mut f = BufReader::new(File::open(&args.path)?);
        read_header(&mut f)?
    };

    let reader: Arc<dyn cirquery::io::ByteReader> = Arc::new(FileByteReader::open(&args.path)?);
    let cache = ReadCache::new();
    let engine = Arc::new(QueryEngine::new(reader, header, cache)?);
    let abort = AbortToken::new();

    let mut stream = Box::pin(engine.read_wig_data_stream(
        args.chrom.clone(),
        args.start,
        args.end,
        abort,
    ));

    let mut total = 0usize;
    while let Some(event) = stream.next().await {
        match event {
            Event::Next(features) => {
                for f in features {
                    total += 1;
                    print_feature(&args.chrom, &f);
                }
            }
            Event::Complete => break,
            Event::Error(e) => return Err(Box::new(e)),
        }
    }
    eprintln!("{total} feature(s)");
    Ok(())
}

fn print_feature(chrom: &str, f: &cirquery::Feature) {
    if f.summary {
        print!("{chrom}\t{}\t{}\t{}", f.start, f.end, f.score);
        if let (Some(min), Some(max)) = (f.min_score, f.max_score) {
            print!("\tmin={min}\tmax={max}");
        }
        println!();
    } else if let Some(rest) = &f.rest {
        println!(
            "{chrom}\t{}\t{}\t{}",
            f.start,
            f.end,
            String::from_utf8_lossy(rest)
        );
    } else {
        println!("{chrom}\t{}\t{}\t{}", f.start, f.end, f.score);
    }
}

fn run_info(args: InfoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut f = BufReader::new(File::open(&args.path)?);
    let header = read_header(&mut f)?;

    println!("filetype: {:?}", header.filetype);
    println!("endianness: {:?}", header.endianness);
    println!("version: {}", header.version);
    println!("zoom levels: {}", header.zoom_levels);
    println!("compressed: {}", header.is_compressed());
    println!("chromosomes: {}", header.refs_by_name.len());
    let mut names: Vec<&String> = header.refs_by_name.keys().collect();
    names.sort();
    for name in names {
        println!("  {name} -> {}", header.refs_by_name[name]);
    }
    Ok(())
}
