pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics_server;
pub mod normalize;
pub mod observability;
pub mod resample;
pub mod store;
pub mod sync;

pub use error::SyncError;
pub use store::GridStore;
pub use sync::SyncEngine;
