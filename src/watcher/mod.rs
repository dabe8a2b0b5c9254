pub mod backoff;
pub mod dedup;
pub mod extractor;
pub mod notifier;
pub mod poll_loop;

pub use dedup::DedupWindow;
pub use extractor::extract;
pub use notifier::Notifier;
pub use poll_loop::{LoopConfig, LoopState, LoopStats, PollLoop};
