//! Application configuration constants.
//! Tuning and defaults in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    /// Config file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- HTTP ----

/// Sent as `User-Agent` on every request.
pub const USER_AGENT: &str = env!("CARGO_PKG_NAME");

/// Content type of resources on the JSON paths.
pub const APPLICATION_JSON: &str = "application/json";

/// Transport tuning shared by every command.
pub struct TransportConsts;

impl TransportConsts {
    pub const DIAL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const KEEP_ALIVE: Duration = Duration::from_secs(30);
}

// ---- Command defaults ----

/// Built-in defaults, used when neither the CLI nor the config file sets a value.
pub struct Defaults;

impl Defaults {
    pub const PUT_CONCURRENCY: usize = 16;
    pub const SYNC_CONCURRENCY: usize = 32;
    /// GET requests per second on dump-resources.
    pub const DUMP_THROTTLE: i64 = 10;
    /// Reader pool size on dump-resources.
    pub const DUMP_READERS: usize = 32;
    /// 0 disables the binary path rate limiter.
    pub const BINARY_THROTTLE: u32 = 0;
    pub const SYNC_RETRIES: u32 = 2;
    pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);
}

// ---- Channel capacities ----

/// Capacities of the bounded channels between pipeline stages.
pub struct ChannelCaps;

impl ChannelCaps {
    /// Fetcher → uploader channel of the binary path, and the id/body channels of dump-resources.
    pub const STREAM: usize = 128;
    /// Id channel capacity per connection on the binary path.
    pub const IDS_PER_CONN: usize = 24;
    /// Failure sink capacity per connection on the binary path.
    pub const FAILURES_PER_CONN: usize = 2;
}

// ---- Progress ----

pub struct ProgressConsts;

impl ProgressConsts {
    pub const CREATE_DESC: &'static str = "Creating";
    pub const DELETE_DESC: &'static str = "Deleting";
    pub const PUT_DESC: &'static str = "Putting";
    pub const DUMP_DESC: &'static str = "Dumping";
}
