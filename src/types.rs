//! Public types for the up-restutil API and pipelines.

use serde::Serialize;

use crate::engine::client::ResponseBody;

/// One record: property name → arbitrary JSON value. Only the id property is ever inspected.
pub type Resource = serde_json::Map<String, serde_json::Value>;

/// HTTP Basic credentials, applied to PUT requests when both parts are non-empty.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.user.is_empty() && !self.pass.is_empty()
    }
}

/// A fetched resource on its way from a fetcher to an uploader.
///
/// The body is still the open GET response. Whoever takes the message owns it and must
/// consume or drop it; dropping drains what is left so the connection can be reused.
pub struct BinaryMsg {
    pub id: String,
    pub body: ResponseBody,
    pub content_type: Option<String>,
}

impl BinaryMsg {
    pub fn new(id: String, body: ResponseBody) -> Self {
        let content_type = body.content_type();
        Self {
            id,
            body,
            content_type,
        }
    }
}

/// Options for [`put_resources`](crate::put_resources).
#[derive(Clone, Debug)]
pub struct PutOpts {
    /// Collection to PUT into; normalized to end with `/`.
    pub base_url: String,
    /// Property whose string value is the resource id.
    pub id_property: String,
    /// Worker pool size.
    pub concurrency: usize,
    /// Write failed resources to the output instead of failing the run.
    pub dump_failed: bool,
    /// Show a counter on stderr.
    pub progress: bool,
}

/// Options for [`put_binary_resources`](crate::put_binary_resources).
#[derive(Clone, Debug)]
pub struct BinaryOpts {
    pub from_url: String,
    pub to_url: String,
    /// Fetcher and uploader pool size (each).
    pub concurrency: usize,
    /// GET requests per second; 0 disables the limiter.
    pub throttle: u32,
    /// Write ids that could not be copied to the output, one per line.
    pub dump_failed: bool,
    pub progress: bool,
}

/// Options for [`dump_resources`](crate::dump_resources).
#[derive(Clone, Debug)]
pub struct DumpOpts {
    pub base_url: String,
    /// GET requests per second; must be at least 1.
    pub throttle: i64,
    /// Reader pool size.
    pub readers: usize,
    pub progress: bool,
}

/// Per-run counts of the JSON PUT path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PutStats {
    pub put: usize,
    pub dumped: usize,
    pub skipped: usize,
}

/// Per-run counts of the binary path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinaryStats {
    pub copied: usize,
    pub failed: usize,
}

/// Output of diff-ids. Arrays follow set iteration order and are never null.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DiffReport {
    #[serde(rename = "only-in-source")]
    pub only_in_source: Vec<String>,
    #[serde(rename = "only-in-destination")]
    pub only_in_destination: Vec<String>,
}

/// Output of sync-ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub deleted: usize,
}
