pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use denovo_core::error::Result;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Count { inputs } => handlers::handle_count(inputs),
        Commands::Plan { input, chunking } => handlers::handle_plan(input, chunking),
        Commands::Split {
            input,
            out_dir,
            chunking,
        } => handlers::handle_split(input, out_dir, chunking),
        Commands::Merge {
            out,
            tool,
            manifest,
            dir,
            delete,
            files,
        } => handlers::handle_merge(out, tool, manifest, dir, delete, files),
        Commands::Run {
            config,
            tool,
            executable,
            threads,
            max_spectra,
            output_dir,
            keep_chunks,
            json,
            inputs,
        } => handlers::handle_run(
            config,
            tool,
            executable,
            threads,
            max_spectra,
            output_dir,
            keep_chunks,
            json,
            inputs,
        ),
        Commands::InitConfig { out, tool, force } => {
            handlers::handle_init_config(out, tool, force)
        }
    }
}
