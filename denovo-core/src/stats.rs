use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub chunks: u64,
    pub lines: u64,
    /// `>>` separators seen, i.e. spectra with a result block.
    pub spectra: u64,
    pub dropped_progress: u64,
    pub normalized_problems: u64,
}
