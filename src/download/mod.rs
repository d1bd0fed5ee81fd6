//! Download module.
//!
//! This module provides:
//! - The bounded-concurrency download pool
//! - Retry and backoff
//! - M3U8/HLS handling
//! - Per-item records
//! - The source-to-pool pipeline and its shutdown signal

pub mod m3u8;
pub mod pipeline;
pub mod pool;
pub mod record;
pub mod retry;
pub mod shutdown;

pub use pipeline::{Pipeline, RunOutcome};
pub use pool::{DownloadPool, PoolItem};
pub use record::{DownloadRecord, DownloadStatus};
pub use retry::RetryPolicy;
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
