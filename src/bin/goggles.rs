//! Savegame Goggles
//!
//! Lists and extracts the save files inside a savegame container

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use savegame_goggles::{DecodeOptions, DuplexCopy, Savegame};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "goggles")]
#[command(about = "Utility for managing save files in savegame archives")]
struct Args {
    /// The savegame archive to process
    savegame: PathBuf,

    /// The operation to perform on the save files
    #[arg(value_enum)]
    operation: Operation,

    /// The wildcard to match the save files on which to operate
    #[arg(default_value = "*")]
    wildcard: String,

    /// The path where to write the save files [default: current directory]
    #[arg(short = 'o', long)]
    outpath: Option<PathBuf>,

    /// TOML file with decode options
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Read the file table from the second duplex copy
    #[arg(long)]
    secondary: bool,

    /// Fail on the first unusable file table entry instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Print machine-readable JSON (list, info)
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// Print the matching save files
    List,
    /// Write the matching save files to the output path
    Extract,
    /// Print the decoded header chain
    Info,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

/// Merge the config file (if any) with command-line overrides
fn decode_options(args: &Args) -> Result<DecodeOptions> {
    let mut options = match &args.config {
        Some(path) => DecodeOptions::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => DecodeOptions::default(),
    };

    if args.secondary {
        options.duplex_copy = DuplexCopy::Secondary;
    }
    if args.strict {
        options.strict_names = true;
    }

    Ok(options)
}

fn list(save: &Savegame, wildcard: &str, json: bool) -> Result<()> {
    let selected = save.resolve(wildcard)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    for entry in selected {
        println!("{:>10}  {:#010x}  {}", entry.size, entry.offset, entry.name);
    }
    Ok(())
}

fn extract(save: &Savegame, wildcard: &str, outpath: PathBuf) -> Result<()> {
    let written = save
        .extract(wildcard, &outpath)
        .with_context(|| format!("Failed to extract into {:?}", outpath))?;

    for path in &written {
        println!("{}", path.display());
    }
    eprintln!("Extracted {} save file(s)", written.len());
    Ok(())
}

fn info(save: &Savegame, json: bool) -> Result<()> {
    let container = save.container();

    if json {
        println!("{}", serde_json::to_string_pretty(container)?);
        return Ok(());
    }

    let sb = container.superblock();
    let duplex = container.duplex();
    let alloc = container.allocation();

    println!("Superblock version:   {}", sb.version);
    println!(
        "Save partition:       {:#x} (+{:#x})",
        sb.save_partition.offset, sb.save_partition.size
    );
    for (i, region) in duplex.regions.iter().enumerate() {
        println!(
            "Duplex region {}:      {:#x} (+{:#x}, {} blocks)",
            i, region.offset, region.size, region.block_count
        );
    }
    println!("Hash tree levels:     {}", container.hash_tree().levels.len());
    println!("Journal savedata:     {:#x} bytes", container.journal().savedata_size);
    println!("File table slots:     {}", alloc.number);
    println!("Save files:           {}", save.index().len());
    println!("Skipped entries:      {}", save.index().skipped().len());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let options = decode_options(&args)?;
    let save = Savegame::open_with(&args.savegame, options)
        .with_context(|| format!("Failed to decode {:?}", args.savegame))?;

    info!(
        "Validated {:?}: {} save files",
        args.savegame,
        save.index().len()
    );

    match args.operation {
        Operation::List => list(&save, &args.wildcard, args.json)?,
        Operation::Extract => {
            let outpath = match args.outpath.clone() {
                Some(path) => path,
                None => std::env::current_dir()?,
            };
            extract(&save, &args.wildcard, outpath)?
        }
        Operation::Info => info(&save, args.json)?,
    }

    eprintln!("Done.");
    Ok(())
}
