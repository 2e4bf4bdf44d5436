use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Move JSON resources between REST collection endpoints.
#[derive(Clone, Parser)]
#[command(name = "up-restutil", version)]
#[command(about = "Copy, dump, diff and sync resources of REST collections.")]
pub struct Cli {
    /// SOCKS5 proxy for every request.
    #[arg(long = "socks-proxy", value_name = "HOST:PORT", global = true)]
    pub socks_proxy: Option<String>,

    /// Config file. Default: `.up-restutil.toml` in the working directory, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Read JSON objects from stdin and PUT each to BASEURL/<object[IDPROP]>.
    PutResources(PutResourcesArgs),
    /// Stream every resource of FROM_BASEURL to TO_BASEURL, keeping its content type.
    PutBinaryResources(PutBinaryArgs),
    /// Write every resource body of BASEURL to stdout, one per line.
    DumpResources(DumpArgs),
    /// Print the ids present on only one side.
    DiffIds(DiffArgs),
    /// Copy ids missing from DESTURL and optionally delete the extras.
    SyncIds(SyncArgs),
}

/// Basic auth for PUT requests.
#[derive(Clone, Args)]
pub struct AuthArgs {
    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub pass: Option<String>,

    /// Prompt for the password when --user is given without one.
    #[arg(long)]
    pub ask_pass: bool,
}

#[derive(Clone, Args)]
pub struct PutResourcesArgs {
    /// Property holding each resource's id.
    #[arg(value_name = "IDPROP")]
    pub id_property: String,

    #[arg(value_name = "BASEURL")]
    pub base_url: String,

    #[command(flatten)]
    pub auth: AuthArgs,

    /// Concurrent PUT workers. Default: 16.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Write failed resources to stdout instead of failing.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub dump_failed: Option<bool>,

    /// Show a counter on stderr.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,
}

#[derive(Clone, Args)]
pub struct PutBinaryArgs {
    #[arg(value_name = "FROM_BASEURL")]
    pub from_url: String,

    #[arg(value_name = "TO_BASEURL")]
    pub to_url: String,

    #[command(flatten)]
    pub auth: AuthArgs,

    /// Fetchers and uploaders (each). Default: 16.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// GET requests per second. 0 (default) disables throttling.
    #[arg(long, value_parser = clap::value_parser!(i64))]
    pub throttle: Option<i64>,

    /// Write ids that failed to copy to stdout.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub dump_failed: Option<bool>,

    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,
}

#[derive(Clone, Args)]
pub struct DumpArgs {
    #[arg(value_name = "BASEURL")]
    pub base_url: String,

    /// GET requests per second, at least 1. Default: 10.
    #[arg(long, value_parser = clap::value_parser!(i64))]
    pub throttle: Option<i64>,

    /// Concurrent readers. Default: 32.
    #[arg(long)]
    pub readers: Option<usize>,

    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,
}

/// Where the two id sets come from. A file replaces the `__ids` listing of its side.
#[derive(Clone, Args)]
pub struct IdSourceArgs {
    #[arg(value_name = "SOURCEURL")]
    pub source_url: String,

    #[arg(value_name = "DESTURL")]
    pub dest_url: String,

    /// Read source ids from a file, one UUID per line.
    #[arg(long = "sourceFile", value_name = "PATH")]
    pub source_file: Option<PathBuf>,

    /// Read destination ids from a file, one UUID per line.
    #[arg(long = "destFile", value_name = "PATH")]
    pub dest_file: Option<PathBuf>,
}

#[derive(Clone, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub ids: IdSourceArgs,
}

#[derive(Clone, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub ids: IdSourceArgs,

    /// Delete destination ids missing from the source.
    #[arg(long)]
    pub deletes: bool,

    /// Concurrent copies. Default: 32.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Minimum seconds each copy takes, retries included.
    #[arg(long = "minExecTime", value_name = "SECONDS")]
    pub min_exec_time: Option<u64>,

    /// Retries after a failed copy. Default: 2.
    #[arg(long)]
    pub retries: Option<u32>,

    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_put_resources_with_flags() {
        let cli = Cli::try_parse_from([
            "up-restutil",
            "put-resources",
            "--dump-failed",
            "uuid",
            "http://h/coll",
            "--concurrency",
            "2",
        ])
        .unwrap();
        let Commands::PutResources(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.id_property, "uuid");
        assert_eq!(args.base_url, "http://h/coll");
        assert_eq!(args.concurrency, Some(2));
        assert_eq!(args.dump_failed, Some(true));
        assert!(args.auth.user.is_none());
    }

    #[test]
    fn test_parse_sync_ids_camel_case_options() {
        let cli = Cli::try_parse_from([
            "up-restutil",
            "--socks-proxy",
            "localhost:1080",
            "sync-ids",
            "http://a/x",
            "http://b/x",
            "--deletes",
            "--minExecTime",
            "3",
            "--sourceFile",
            "ids.txt",
        ])
        .unwrap();
        assert_eq!(cli.socks_proxy.as_deref(), Some("localhost:1080"));
        let Commands::SyncIds(args) = cli.command else {
            panic!("wrong command");
        };
        assert!(args.deletes);
        assert_eq!(args.min_exec_time, Some(3));
        assert_eq!(args.ids.source_file, Some(PathBuf::from("ids.txt")));
        assert!(args.ids.dest_file.is_none());
        assert!(args.retries.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["up-restutil", "dump-resources", "http://h/c", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
