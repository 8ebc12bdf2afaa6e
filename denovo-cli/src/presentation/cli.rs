use clap::{ArgAction, Args, Parser, Subcommand};
use denovo_core::ToolKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "de novo sequencing driver", long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Chunk sizing; with neither flag the input is split into `--chunks 1`.
#[derive(Args, Clone, Copy, Debug)]
pub struct ChunkArgs {
    /// Upper bound on spectra per chunk
    #[arg(long, conflicts_with = "chunks")]
    pub max_spectra: Option<usize>,

    /// Number of chunks to cut
    #[arg(long)]
    pub chunks: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count the spectra in MGF files
    Count { inputs: Vec<PathBuf> },

    /// Show how a file would be chunked
    Plan {
        input: PathBuf,
        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Split an MGF file into chunk files plus a manifest
    Split {
        input: PathBuf,
        #[arg(long, short)]
        out_dir: PathBuf,
        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Merge chunk result files into one result file
    Merge {
        /// Result file to write
        #[arg(long, short)]
        out: PathBuf,

        #[arg(long)]
        tool: ToolKind,

        /// Chunk manifest written by `split`; results are looked up next to the chunks
        #[arg(long, conflicts_with_all = ["dir", "files"])]
        manifest: Option<PathBuf>,

        /// Directory holding the chunk results (`<stem>_<n><suffix>`)
        #[arg(long, conflicts_with = "files")]
        dir: Option<PathBuf>,

        /// Delete the chunk results after a successful merge
        #[arg(long)]
        delete: bool,

        /// Chunk results in chunk order
        files: Vec<PathBuf>,
    },

    /// Split, search and merge each input
    Run {
        /// Settings file (see `init-config`)
        #[arg(long, short)]
        config: Option<PathBuf>,

        #[arg(long)]
        tool: Option<ToolKind>,

        #[arg(long)]
        executable: Option<PathBuf>,

        #[arg(long, short = 'j')]
        threads: Option<usize>,

        #[arg(long)]
        max_spectra: Option<usize>,

        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        #[arg(long)]
        keep_chunks: bool,

        /// Print the run reports as JSON on stdout
        #[arg(long)]
        json: bool,

        /// MGF files or directories holding them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Write a default settings file
    InitConfig {
        out: PathBuf,

        #[arg(long, default_value_t = ToolKind::PepNovo)]
        tool: ToolKind,

        #[arg(long)]
        force: bool,
    },
}
