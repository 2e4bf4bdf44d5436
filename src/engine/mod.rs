//! Engine: CLI, command handlers, HTTP client and the primitives pipelines share.

pub mod arg_parser;
pub mod cancel;
pub mod cli;
pub mod client;
pub mod handlers;
pub mod limiter;
pub mod progress;
pub mod tools;

pub use arg_parser::{Cli, Commands};
pub use cancel::CancelToken;
pub use cli::handle_run;
pub use client::{ClientConfig, ResponseBody, RestClient};
pub use limiter::{RateLimiter, ticker};
pub use tools::{ids_url, normalize_base, resource_url};
