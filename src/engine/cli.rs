//! CLI entry: load settings, install the Ctrl+C handler and dispatch to the command handler.

use anyhow::{Context, Result};
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::cancel::CancelToken;
use crate::engine::handlers::{
    RunContext, handle_diff_ids, handle_dump_resources, handle_put_binary, handle_put_resources,
    handle_sync_ids,
};
use crate::utils::{load_settings, setup_logging};

/// Exit status of a process killed by SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

/// First Ctrl+C cancels the running pipeline; a second one exits immediately.
fn install_interrupt_handler() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let interrupted = AtomicBool::new(false);
    ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            std::process::exit(INTERRUPTED_EXIT);
        }
        warn!("Interrupted, stopping (press Ctrl+C again to exit now)");
        handler_token.cancel();
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel)
}

pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose);
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let settings = load_settings(cli.config.as_deref(), &cwd)?;
    let cancel = install_interrupt_handler()?;
    let ctx = RunContext {
        settings: &settings,
        socks_proxy: cli
            .socks_proxy
            .clone()
            .or_else(|| settings.socks_proxy.clone()),
        cancel: &cancel,
    };

    match &cli.command {
        Commands::PutResources(args) => handle_put_resources(args, &ctx),
        Commands::PutBinaryResources(args) => handle_put_binary(args, &ctx),
        Commands::DumpResources(args) => handle_dump_resources(args, &ctx),
        Commands::DiffIds(args) => handle_diff_ids(args, &ctx),
        Commands::SyncIds(args) => handle_sync_ids(args, &ctx),
    }
}
