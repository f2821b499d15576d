use clap::Parser;
use crilayla::Decoder;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Decompress a CRILAYLA segment, either a whole file or one stored inside a CPK archive.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// File containing the compressed segment
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Byte offset of the segment inside the input
    #[arg(long, default_value_t = 0)]
    offset: u64,
    /// Length of the segment in bytes [default: rest of the input]
    #[arg(long)]
    length: Option<u64>,
    /// Fail unless the decompressed output is exactly this many bytes
    #[arg(long)]
    expect_size: Option<u64>,
    /// Print a trace of every decoded token to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let length = match args.length {
        Some(len) => len,
        None => fs::metadata(&args.input)?
            .len()
            .saturating_sub(args.offset),
    };

    let mut stderr = io::stderr();
    let mut decoder = Decoder::for_file(&args.input)?;
    decoder.segment(args.offset, length);
    if let Some(size) = args.expect_size {
        decoder.expect_size(size);
    }
    if args.verbose {
        decoder.with_logging(&mut stderr);
    }

    decoder.decode_to_file(&args.output).map_err(|e| {
        format!(
            "decompressing {} @ {:#x} failed: {}",
            args.input.display(),
            args.offset,
            e
        )
    })?;

    Ok(())
}
