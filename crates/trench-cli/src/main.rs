mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trench_core::error::TrenchError;

#[derive(Parser)]
#[command(
    name = "trench",
    version,
    about = "Demand note parser for road-trenching permissions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that parses a demand note.
#[derive(Args)]
pub struct DocumentArgs {
    /// Path to the demand note PDF
    pub input_file: PathBuf,

    /// Issuing authority: MCGM, MBMC, KDMC, NMMC, "MIDC Type 1", "MIDC Type 2"
    #[arg(short, long)]
    pub authority: String,

    /// Override a Non Refundable header: "HEADER=VALUE" (repeatable)
    #[arg(short, long = "manual", value_name = "HEADER=VALUE")]
    pub manual: Vec<String>,

    /// Override an SD header: "HEADER=VALUE" (repeatable)
    #[arg(long = "sd-manual", value_name = "HEADER=VALUE")]
    pub sd_manual: Vec<String>,

    /// JSON file with {"non_refundable": {...}, "sd": {...}} overrides
    #[arg(long, value_name = "FILE")]
    pub manual_file: Option<PathBuf>,

    /// Custom authority profile (JSON) replacing the builtin one
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Rasterization resolution for OCR'd pages
    #[arg(long, default_value_t = 300)]
    pub dpi: u32,

    /// Downscale factor applied before table detection (1.0 disables)
    #[arg(long, default_value_t = 0.7)]
    pub downscale: f32,

    /// Parallel OCR workers per page
    #[arg(long, default_value_t = 4)]
    pub ocr_workers: usize,

    /// Output format: table (default) or json
    #[arg(short, long, default_value = "table")]
    pub output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a demand note and write both spreadsheets
    Parse {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Directory for the output spreadsheets
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Parse a demand note and print both rows without writing files
    Preview {
        #[command(flatten)]
        doc: DocumentArgs,
    },
    /// List supported and upcoming authorities
    Authorities,
    /// Inspect and validate authority profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Print the tables detected on a page
    Tables {
        /// Path to PDF file
        input_file: PathBuf,

        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Use the raster/OCR extractor instead of the vector one
        #[arg(long)]
        raster: bool,

        #[arg(long, default_value_t = 300)]
        dpi: u32,
    },
    /// Parse a ROW application letter
    Application {
        /// Path to PDF file
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Look up a site in the "684 POP" sheet of a PO workbook
    PoLookup {
        /// Path to xlsx file
        workbook: PathBuf,

        site_id: String,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the builtin profile of an authority
    Show {
        authority: String,

        /// Print the raw JSON profile
        #[arg(long)]
        json: bool,
    },
    /// Validate a custom profile file
    Validate {
        /// Path to JSON profile
        file: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { doc, out_dir } => commands::parse::run(&doc, &out_dir),
        Commands::Preview { doc } => commands::parse::preview(&doc),
        Commands::Authorities => commands::profile::authorities(),
        Commands::Profile { action } => match action {
            ProfileAction::Show { authority, json } => commands::profile::show(&authority, json),
            ProfileAction::Validate { file } => commands::profile::validate(&file),
        },
        Commands::Tables {
            input_file,
            page,
            raster,
            dpi,
        } => commands::tables::run(&input_file, page, raster, dpi),
        Commands::Application { input_file, output } => {
            commands::lookup::application(&input_file, &output)
        }
        Commands::PoLookup {
            workbook,
            site_id,
            output,
        } => commands::lookup::po(&workbook, &site_id, &output),
    };

    match result {
        Ok(()) => {}
        Err(TrenchError::UnsupportedAuthority(authority)) => {
            eprintln!("{authority} parser is not yet supported (coming soon). Run `trench authorities` for the supported list.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
