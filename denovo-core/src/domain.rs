use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One chunk of a source spectra file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub source: PathBuf,
    /// 1-based position of the chunk.
    pub index: usize,
    pub path: PathBuf,
    pub spectra: usize,
    /// Spectra held by all earlier chunks.
    pub offset: usize,
}

/// A chunk's result file and where its spectra start in the source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkResult {
    pub path: PathBuf,
    pub offset: usize,
}

/// Summary of one job, as shown in run reports.
#[derive(Clone, Debug, Serialize)]
pub struct JobRow {
    pub id: usize,
    pub chunk: PathBuf,
    pub status: String,
    pub spectra_seen: u64,
    pub error: Option<String>,
}
