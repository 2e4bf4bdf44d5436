//! Pipelines: id retrievers, first-error supervision, failure sink, and one module per command.

pub mod diff;
pub mod dump;
pub mod failure_sink;
pub mod put_binary;
pub mod put_resources;
pub mod retriever;
pub mod supervisor;
pub mod sync;

pub use diff::{collect_id_sets, diff_ids, write_json};
pub use dump::dump_resources;
pub use failure_sink::{FailureSink, open_failure_sink};
pub use put_binary::put_binary_resources;
pub use put_resources::put_resources;
pub use retriever::{
    FileIdRetriever, IdRetriever, UrlIdRetriever, id_retriever, is_valid_uuid, spawn_retriever,
};
pub use supervisor::Supervisor;
pub use sync::SyncService;
