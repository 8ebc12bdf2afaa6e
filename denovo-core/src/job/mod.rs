pub mod cancel;
pub mod progress;
pub mod runner;
pub mod status;

pub use cancel::CancelToken;
pub use progress::{LogProgress, NoProgress, ProgressListener};
pub use runner::Job;
pub use status::JobStatus;
