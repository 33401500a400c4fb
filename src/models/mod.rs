mod asset;
mod collection;
mod download;
mod progress;
mod remote;
mod sync;

pub use asset::{AssetDescriptor, AssetKind, NameError, NamingRule};
pub use collection::{AssetCollection, CollectionError};
pub use download::{download_with_progress, DownloadOutcome, DownloadPlan, DEFAULT_CHUNK_SIZE};
pub use progress::{format_bytes, format_duration, ProgressTracker, TransferStats};
pub use remote::{HttpSource, RemoteBody, RemoteSource};
pub use sync::{SyncEvent, SyncOutcome, SyncRecord, SyncReport, Synchronizer};
