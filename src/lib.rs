//! up-restutil: move JSON resources between REST collection endpoints.
//!
//! Every command is a pipeline of threads joined by bounded channels. The first fatal error
//! stops the pipeline and is returned; see [`pipeline`] for the individual commands.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::{CancelToken, ClientConfig, RestClient};
pub use error::RestError;
pub use pipeline::{
    FileIdRetriever, IdRetriever, SyncService, UrlIdRetriever, diff_ids, dump_resources,
    put_binary_resources, put_resources,
};

/// Result alias used by the public up-restutil API
pub type Result<T> = std::result::Result<T, RestError>;
