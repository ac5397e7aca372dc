//! CLI argument parsing for the pickpad-worker binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::types::{ExportFilter, ExportFormat, ExportMode, VoteStatusFilter};

#[derive(Parser)]
#[command(name = "pickpad-worker", about = "PickPad electoral roll worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Write the import template CSV
    Template {
        /// Output path (defaults to plantilla_padron.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validate and import a roll file
    Import {
        /// CSV or spreadsheet file
        file: PathBuf,
        /// Profile id the import runs as
        #[arg(long)]
        user: Uuid,
        /// Only validate; never write
        #[arg(long)]
        dry_run: bool,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Where to write the error report when validation fails
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Export the roll to CSV or XLSX
    Export(ExportArgs),
}

#[derive(Args)]
pub struct ExportArgs {
    /// Profile id the export runs as
    #[arg(long)]
    pub user: Uuid,
    /// Directory the export file is written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = ModeArg::Raw)]
    pub mode: ModeArg,
    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    pub format: FormatArg,
    #[arg(long, value_enum, default_value_t = VoteArg::All)]
    pub vote_status: VoteArg,
    #[arg(long)]
    pub emopick: Option<i32>,
    #[arg(long)]
    pub mesa_from: Option<i32>,
    #[arg(long)]
    pub mesa_to: Option<i32>,
    #[arg(long)]
    pub clase_from: Option<i32>,
    #[arg(long)]
    pub clase_to: Option<i32>,
    /// Confirm exports above the confirmation threshold
    #[arg(long, short)]
    pub yes: bool,
}

impl ExportArgs {
    pub fn filter(&self) -> ExportFilter {
        ExportFilter {
            vote_status: self.vote_status.into(),
            emopick_id: self.emopick,
            mesa_from: self.mesa_from,
            mesa_to: self.mesa_to,
            clase_from: self.clase_from,
            clase_to: self.clase_to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Raw,
    Curated,
}

impl From<ModeArg> for ExportMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Raw => ExportMode::Raw,
            ModeArg::Curated => ExportMode::Curated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VoteArg {
    All,
    Voted,
    NotVoted,
}

impl From<VoteArg> for VoteStatusFilter {
    fn from(arg: VoteArg) -> Self {
        match arg {
            VoteArg::All => VoteStatusFilter::All,
            VoteArg::Voted => VoteStatusFilter::Voted,
            VoteArg::NotVoted => VoteStatusFilter::NotVoted,
        }
    }
}
