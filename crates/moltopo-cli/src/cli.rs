use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "moltopo - inspect, convert and edit molecular structures and topologies (GRO, PDB, GROMACS .top, LAMMPS).",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Reader and writer settings in TOML format
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a summary of a coordinate or topology file.
    Info(InfoArgs),
    /// Convert a coordinate file between GRO and PDB.
    Convert(ConvertArgs),
    /// Remove atoms from a coordinate file or a GROMACS topology.
    Strip(StripArgs),
    /// Expand a single-molecule GROMACS topology into its [ molecules ] count.
    Replicate(ReplicateArgs),
    /// Export the bond graph of a topology as an edge list.
    Graph(GraphArgs),
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to a .gro, .pdb, .top, LAMMPS data file or LAMMPS input script.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the input coordinate file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output coordinate file; the format follows its extension.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Renumber atoms to 1..N before writing.
    #[arg(long)]
    pub renumber: bool,
}

/// Arguments for the `strip` subcommand.
#[derive(Args, Debug)]
pub struct StripArgs {
    /// Path to the input coordinate or .top file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output file, in the same format as the input.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Atom ids to remove, as a comma-separated list of ids and ranges.
    /// Example: --ids 1,4-6
    #[arg(long, required = true, value_name = "IDS")]
    pub ids: String,

    /// Keep the original ids instead of renumbering the remaining atoms.
    #[arg(long)]
    pub keep_ids: bool,
}

/// Arguments for the `replicate` subcommand.
#[derive(Args, Debug)]
pub struct ReplicateArgs {
    /// Path to the input .top file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the replicated .top file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLabels {
    /// Mark edges as plain or cross-molecule bonds.
    Plain,
    /// Label edges with the bond type (first bond parameter).
    Typed,
}

/// Arguments for the `graph` subcommand.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Path to a .top, LAMMPS data file or LAMMPS input script.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Write the edge list here instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// How edges are labelled.
    #[arg(long, value_enum, default_value_t = EdgeLabels::Plain)]
    pub labels: EdgeLabels,
}
