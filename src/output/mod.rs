mod progress;

pub use progress::{summarize, ProgressReporter};
