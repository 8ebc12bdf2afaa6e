pub mod plan;
pub mod split;

pub use plan::{ChunkStrategy, chunk_offsets, plan_chunk_sizes};
pub use split::{ChunkSet, split_file};
