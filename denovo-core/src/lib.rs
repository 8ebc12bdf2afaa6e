#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod stats;

pub mod util {
    pub mod fsx;
}

pub mod mgf;

pub mod chunking;

pub mod job;

pub mod tool;

pub mod result {
    pub mod line;
    pub mod merge;
}

pub mod pipeline;

// Re-exports: stable API surface
pub use chunking::{ChunkSet, ChunkStrategy, split_file};
pub use config::SearchSettings;
pub use error::{DenovoError, Result};
pub use job::{CancelToken, JobStatus, LogProgress, NoProgress, ProgressListener};
pub use mgf::count_spectra;
pub use pipeline::{Pipeline, RunReport, collect_inputs};
pub use result::merge::{MergePolicy, merge_and_delete, merge_results};
pub use tool::{ToolKind, tool_for};
