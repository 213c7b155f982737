//! Plantcoco: PlantaeK dataset layout and annotation tooling.
//!
//! Plantcoco converts the PlantaeK plant-disease image dataset between
//! on-disk layouts and annotation formats. The pipeline, in dataset order:
//!
//! - [`reorganize`]: raw `data/{SPECIES}/{HEALTH}/` folders into the
//!   canonical `{category}/{subcategory}/{csv,json,images,sets}/` tree
//! - [`perimage`]: COCO-style JSON sidecars, one per image
//! - [`distribute`]: category-level split lists into subcategory directories
//! - [`convert`]: CSV annotations plus a labelmap into COCO instances JSON,
//!   per category/split or merged across categories
//!
//! # Modules
//!
//! - [`assemble`]: the split-aware COCO annotation assembler
//! - [`merge`]: cross-category merging and split re-partitioning
//! - [`coco`]: COCO document schema and writer
//! - [`labelmap`], [`splits`], [`boxes`]: resource readers
//! - [`error`]: error types for plantcoco operations

pub mod assemble;
pub mod boxes;
pub mod coco;
pub mod convert;
pub mod distribute;
pub mod error;
pub mod labelmap;
pub mod merge;
pub mod perimage;
pub mod reorganize;
pub mod splits;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use error::PlantcocoError;

/// The plantcoco CLI application.
#[derive(Parser)]
#[command(name = "plantcoco")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert CSV annotations to COCO instances JSON.
    Convert(ConvertArgs),

    /// Reorganize a raw species/health tree into the canonical layout.
    Reorganize(ReorganizeArgs),

    /// Generate per-image COCO JSON sidecars.
    GenJson(GenJsonArgs),

    /// Distribute category-level split files into subcategory directories.
    Distribute(DistributeArgs),
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Dataset root directory.
    #[arg(long)]
    root: PathBuf,

    /// Output directory for COCO JSON files (default: <root>/annotations).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Category names to convert (default: all categories found).
    #[arg(long, num_args = 1..)]
    categories: Option<Vec<String>>,

    /// Dataset splits to generate.
    #[arg(long, num_args = 1.., default_values = ["train", "val", "test"])]
    splits: Vec<String>,

    /// Generate combined COCO JSON files for all categories.
    #[arg(long)]
    combined: bool,

    /// Stem matching mode for combined split re-partitioning.
    #[arg(long, value_enum, default_value_t = SplitMatchArg::Substring)]
    split_match: SplitMatchArg,
}

/// CLI mirror of [`merge::SplitMatch`], decoupled from the library type.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum SplitMatchArg {
    Substring,
    Exact,
}

impl From<SplitMatchArg> for merge::SplitMatch {
    fn from(arg: SplitMatchArg) -> Self {
        match arg {
            SplitMatchArg::Substring => merge::SplitMatch::Substring,
            SplitMatchArg::Exact => merge::SplitMatch::Exact,
        }
    }
}

/// Arguments for the reorganize subcommand.
#[derive(clap::Args)]
struct ReorganizeArgs {
    /// Input data directory holding SPECIES/HEALTH folders.
    #[arg(long)]
    data_dir: PathBuf,

    /// Output directory for the canonical tree.
    #[arg(long)]
    output_dir: PathBuf,
}

/// Arguments for the gen-json subcommand.
#[derive(clap::Args)]
struct GenJsonArgs {
    /// Data directory holding supercategory/category folders.
    #[arg(long)]
    data_dir: PathBuf,
}

/// Arguments for the distribute subcommand.
#[derive(clap::Args)]
struct DistributeArgs {
    /// Dataset root directory.
    #[arg(long)]
    root: PathBuf,

    /// Remove category-level sets directories after distribution.
    #[arg(long)]
    prune: bool,
}

/// Run the plantcoco CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PlantcocoError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => {
            let opts = convert::ConvertOptions {
                root: args.root,
                out: args.out,
                categories: args.categories,
                splits: args.splits,
                combined: args.combined,
                split_match: args.split_match.into(),
            };
            convert::run_convert(&opts)
        }
        Some(Commands::Reorganize(args)) => {
            reorganize::run_reorganize(&args.data_dir, &args.output_dir)
        }
        Some(Commands::GenJson(args)) => perimage::run_gen_json(&args.data_dir),
        Some(Commands::Distribute(args)) => distribute::run_distribute(&args.root, args.prune),
        None => {
            println!("plantcoco {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("PlantaeK dataset layout and COCO annotation tooling.");
            println!();
            println!("Run 'plantcoco --help' for usage information.");
            Ok(())
        }
    }
}
