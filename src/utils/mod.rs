pub mod config;
pub mod credentials;
pub mod logger;
pub mod restutil_toml;

pub use config::*;
pub use credentials::resolve_credentials;
pub use logger::setup_logging;
pub use restutil_toml::{Settings, load_settings};
