use crate::error::{DenovoError, Result};
use serde::{Deserialize, Serialize};

/// How an input is cut into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStrategy {
    /// Fewest chunks holding at most this many spectra each.
    MaxSpectra(usize),
    /// This many chunks (fewer if there are fewer spectra).
    Chunks(usize),
}

/// Spectrum count of every chunk, in chunk order.
///
/// Sizes differ by at most one and the larger chunks come first. No chunk is
/// empty, so zero spectra plan zero chunks.
pub fn plan_chunk_sizes(total: usize, strategy: ChunkStrategy) -> Result<Vec<usize>> {
    let n_chunks = match strategy {
        ChunkStrategy::MaxSpectra(0) => {
            return Err(DenovoError::Config("chunk size must be at least 1".into()));
        }
        ChunkStrategy::Chunks(0) => {
            return Err(DenovoError::Config("chunk count must be at least 1".into()));
        }
        ChunkStrategy::MaxSpectra(max) => total.div_ceil(max),
        ChunkStrategy::Chunks(k) => k.min(total),
    };
    if n_chunks == 0 {
        return Ok(Vec::new());
    }
    let base = total / n_chunks;
    let extra = total % n_chunks;
    Ok((0..n_chunks)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect())
}

/// Spectrum offset of each chunk in the source file.
pub fn chunk_offsets(sizes: &[usize]) -> Vec<usize> {
    sizes
        .iter()
        .scan(0usize, |acc, &n| {
            let off = *acc;
            *acc += n;
            Some(off)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_earliest_chunks() {
        assert_eq!(
            plan_chunk_sizes(10, ChunkStrategy::Chunks(4)).unwrap(),
            [3, 3, 2, 2]
        );
        assert_eq!(
            plan_chunk_sizes(10, ChunkStrategy::MaxSpectra(4)).unwrap(),
            [4, 3, 3]
        );
    }

    #[test]
    fn never_plans_empty_chunks() {
        assert_eq!(plan_chunk_sizes(2, ChunkStrategy::Chunks(8)).unwrap(), [1, 1]);
        assert!(plan_chunk_sizes(0, ChunkStrategy::Chunks(8)).unwrap().is_empty());
        assert!(plan_chunk_sizes(0, ChunkStrategy::MaxSpectra(8)).unwrap().is_empty());
    }

    #[test]
    fn zero_arguments_are_rejected() {
        assert!(plan_chunk_sizes(5, ChunkStrategy::Chunks(0)).is_err());
        assert!(plan_chunk_sizes(5, ChunkStrategy::MaxSpectra(0)).is_err());
    }

    #[test]
    fn balanced_for_every_combination() {
        for total in 0..120usize {
            for arg in 1..15usize {
                for strategy in [ChunkStrategy::Chunks(arg), ChunkStrategy::MaxSpectra(arg)] {
                    let sizes = plan_chunk_sizes(total, strategy).unwrap();
                    assert_eq!(sizes.iter().sum::<usize>(), total, "{total} {strategy:?}");
                    let (lo, hi) = (sizes.iter().min(), sizes.iter().max());
                    if let (Some(lo), Some(hi)) = (lo, hi) {
                        assert!(hi - lo <= 1, "{total} {strategy:?} {sizes:?}");
                        assert!(*lo >= 1);
                    }
                    assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
                    if let ChunkStrategy::MaxSpectra(max) = strategy {
                        assert!(sizes.iter().all(|&n| n <= max));
                        assert_eq!(sizes.len(), total.div_ceil(max));
                    }
                }
            }
        }
    }

    #[test]
    fn offsets_are_running_sums() {
        assert_eq!(chunk_offsets(&[3, 3, 2]), [0, 3, 6]);
        assert!(chunk_offsets(&[]).is_empty());
    }
}
