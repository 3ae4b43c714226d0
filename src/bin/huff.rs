use clap::{Parser, Subcommand};
use huff_archive::archive::{self, Outcome};
use huff_archive::{CodecConfig, FrameCodec, HuffError};
use std::path::PathBuf;
use std::process::ExitCode;

/// Canonical Huffman compressor and archiver.
#[derive(Parser, Debug)]
#[command(author, version, about = "Huffman archive tool", long_about = None)]
struct Cli {
    /// Read compressed data with plain sequential reads instead of a memory map.
    #[arg(long, global = true)]
    no_mmap: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an archive from one or more files.
    Create {
        archive: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the members of an archive.
    List { archive: PathBuf },
    /// Extract every member of an archive.
    Extract {
        archive: PathBuf,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Extract a single member of an archive.
    ExtractOne {
        archive: PathBuf,
        member: String,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Compress one file into a single frame.
    Compress { input: PathBuf, output: PathBuf },
    /// Decompress a single frame.
    Decompress { input: PathBuf, output: PathBuf },
}

fn run(cli: Cli) -> Result<Outcome, HuffError> {
    let config = CodecConfig {
        memory_map: !cli.no_mmap,
        ..CodecConfig::default()
    };

    match cli.command {
        Command::Create { archive, files } => {
            let report = archive::create_archive(&archive, &files, config)?;
            for failure in &report.failures {
                eprintln!("error: {}: {}", failure.path, failure.error);
            }
            Ok(report.outcome())
        }
        Command::List { archive } => {
            println!("Archive: {}", archive.display());
            print!("{}", archive::list_archive(&archive)?);
            Ok(Outcome::Complete)
        }
        Command::Extract { archive, output } => {
            let report = archive::extract_all(&archive, &output, config)?;
            for failure in &report.failures {
                eprintln!("error: {}: {}", failure.path, failure.error);
            }
            Ok(report.outcome())
        }
        Command::ExtractOne {
            archive,
            member,
            output,
        } => {
            let dest = archive::extract_one(&archive, &member, &output, config)?;
            println!("{}", dest.display());
            Ok(Outcome::Complete)
        }
        Command::Compress { input, output } => {
            FrameCodec::new(config).compress_file(&input, &output)?;
            Ok(Outcome::Complete)
        }
        Command::Decompress { input, output } => {
            FrameCodec::new(config).decompress_file(&input, &output)?;
            Ok(Outcome::Complete)
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(Outcome::Complete) => ExitCode::SUCCESS,
        Ok(Outcome::Partial) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
