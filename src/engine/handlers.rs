//! Command handlers: resolve options (flag > config file > default), build the client, run
//! the pipeline and write its report to stdout.

use anyhow::{Context, Result};
use log::info;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use crate::engine::arg_parser::{
    AuthArgs, DiffArgs, DumpArgs, IdSourceArgs, PutBinaryArgs, PutResourcesArgs, SyncArgs,
};
use crate::engine::cancel::CancelToken;
use crate::engine::client::{ClientConfig, RestClient};
use crate::pipeline::{
    IdRetriever, SyncService, diff_ids, dump_resources, id_retriever, put_binary_resources,
    put_resources, write_json,
};
use crate::types::{BinaryOpts, DumpOpts, PutOpts};
use crate::utils::{Defaults, Settings, resolve_credentials};

/// What every handler needs besides its own arguments.
pub struct RunContext<'a> {
    pub settings: &'a Settings,
    pub socks_proxy: Option<String>,
    pub cancel: &'a CancelToken,
}

impl RunContext<'_> {
    fn client(&self, pool_size: usize, auth: Option<&AuthArgs>) -> Result<RestClient> {
        let config = ClientConfig {
            pool_size,
            socks_proxy: self.socks_proxy.clone(),
            ..ClientConfig::default()
        };
        let client = RestClient::new(&config).context("create HTTP client")?;
        let Some(auth) = auth else {
            return Ok(client);
        };
        let credentials = resolve_credentials(
            auth.user.clone().or_else(|| self.settings.user.clone()),
            auth.pass.clone().or_else(|| self.settings.pass.clone()),
            auth.ask_pass,
        )?;
        Ok(client.with_credentials(credentials))
    }

    fn progress(&self, flag: Option<bool>) -> bool {
        flag.or(self.settings.progress).unwrap_or(false)
    }
}

/// Stdout for command output; stderr carries logs and progress.
fn stdout() -> BufWriter<io::Stdout> {
    BufWriter::new(io::stdout())
}

pub fn handle_put_resources(args: &PutResourcesArgs, ctx: &RunContext<'_>) -> Result<()> {
    let opts = PutOpts {
        base_url: args.base_url.clone(),
        id_property: args.id_property.clone(),
        concurrency: args
            .concurrency
            .or(ctx.settings.concurrency)
            .unwrap_or(Defaults::PUT_CONCURRENCY),
        dump_failed: args
            .dump_failed
            .or(ctx.settings.dump_failed)
            .unwrap_or(false),
        progress: ctx.progress(args.progress),
    };
    let client = ctx.client(opts.concurrency, Some(&args.auth))?;
    let mut out = stdout();
    let stats = put_resources(io::stdin().lock(), &mut out, &client, &opts, ctx.cancel)
        .with_context(|| format!("put-resources to {}", opts.base_url))?;
    out.flush().context("flush stdout")?;
    info!(
        "Put {} resources ({} dumped, {} skipped)",
        stats.put, stats.dumped, stats.skipped
    );
    Ok(())
}

pub fn handle_put_binary(args: &PutBinaryArgs, ctx: &RunContext<'_>) -> Result<()> {
    let throttle = args
        .throttle
        .or(ctx.settings.binary_throttle)
        .unwrap_or(i64::from(Defaults::BINARY_THROTTLE));
    let opts = BinaryOpts {
        from_url: args.from_url.clone(),
        to_url: args.to_url.clone(),
        concurrency: args
            .concurrency
            .or(ctx.settings.concurrency)
            .unwrap_or(Defaults::PUT_CONCURRENCY),
        // Zero or negative: no limiter.
        throttle: u32::try_from(throttle.max(0)).unwrap_or(u32::MAX),
        dump_failed: args
            .dump_failed
            .or(ctx.settings.dump_failed)
            .unwrap_or(false),
        progress: ctx.progress(args.progress),
    };
    // Fetchers and uploaders each hold a connection.
    let client = ctx.client(opts.concurrency * 2, Some(&args.auth))?;
    let mut out = stdout();
    put_binary_resources(&mut out, &client, &opts, ctx.cancel)
        .with_context(|| format!("put-binary-resources {} -> {}", opts.from_url, opts.to_url))?;
    out.flush().context("flush stdout")?;
    Ok(())
}

fn dump_opts(args: &DumpArgs, ctx: &RunContext<'_>) -> DumpOpts {
    DumpOpts {
        base_url: args.base_url.clone(),
        throttle: args
            .throttle
            .or(ctx.settings.dump_throttle)
            .unwrap_or(Defaults::DUMP_THROTTLE),
        readers: args.readers.unwrap_or(Defaults::DUMP_READERS),
        progress: ctx.progress(args.progress),
    }
}

pub fn handle_dump_resources(args: &DumpArgs, ctx: &RunContext<'_>) -> Result<()> {
    let opts = dump_opts(args, ctx);
    let client = ctx.client(opts.readers, None)?;
    let mut out = stdout();
    dump_resources(&mut out, &client, &opts, ctx.cancel)
        .with_context(|| format!("dump-resources {}", opts.base_url))?;
    Ok(())
}

fn retrievers(
    ids: &IdSourceArgs,
    client: &RestClient,
) -> (Box<dyn IdRetriever>, Box<dyn IdRetriever>) {
    (
        id_retriever(ids.source_file.as_deref(), &ids.source_url, client),
        id_retriever(ids.dest_file.as_deref(), &ids.dest_url, client),
    )
}

pub fn handle_diff_ids(args: &DiffArgs, ctx: &RunContext<'_>) -> Result<()> {
    let client = ctx.client(2, None)?;
    let (source, dest) = retrievers(&args.ids, &client);
    let report = diff_ids(source, dest).context("diff-ids")?;
    write_json(&mut stdout(), &report)?;
    Ok(())
}

pub fn handle_sync_ids(args: &SyncArgs, ctx: &RunContext<'_>) -> Result<()> {
    let concurrency = args
        .concurrency
        .or(ctx.settings.concurrency)
        .unwrap_or(Defaults::SYNC_CONCURRENCY);
    let client = ctx.client(concurrency, None)?;
    let (source, dest) = retrievers(&args.ids, &client);
    let service = SyncService {
        max_concurrent_reqs: concurrency,
        min_exec_time: Duration::from_secs(
            args.min_exec_time
                .or(ctx.settings.min_exec_time)
                .unwrap_or(0),
        ),
        retries: args
            .retries
            .or(ctx.settings.retries)
            .unwrap_or(Defaults::SYNC_RETRIES),
        deletes: args.deletes,
        show_progress: ctx.progress(args.progress),
        ..SyncService::new(source, dest, &args.ids.source_url, &args.ids.dest_url)
    };
    let summary = service
        .run(&client, ctx.cancel)
        .with_context(|| format!("sync-ids {} -> {}", args.ids.source_url, args.ids.dest_url))?;
    write_json(&mut stdout(), &summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::restutil_toml::parse_settings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_CONFIG: &str = r#"
        [settings]
        user = "writer"
        pass = "secret"
        concurrency = 16
        binary_throttle = 0
        dump_throttle = 10
        socks_proxy = "localhost:1080"
        dump_failed = false
        retries = 2
        min_exec_time = 0
        progress = true
    "#;

    fn dump_args(base_url: String, throttle: Option<i64>) -> DumpArgs {
        DumpArgs {
            base_url,
            throttle,
            readers: Some(2),
            progress: Some(false),
        }
    }

    #[test]
    fn test_dump_opts_use_dump_throttle() {
        let settings = parse_settings(SAMPLE_CONFIG).unwrap();
        let cancel = CancelToken::new();
        let ctx = RunContext {
            settings: &settings,
            socks_proxy: None,
            cancel: &cancel,
        };
        assert_eq!(dump_opts(&dump_args("http://h/c".into(), None), &ctx).throttle, 10);
        assert_eq!(
            dump_opts(&dump_args("http://h/c".into(), Some(3)), &ctx).throttle,
            3
        );
    }

    #[test]
    fn test_binary_throttle_does_not_reach_dump() {
        // A legacy shared `throttle` key is ignored rather than fed to dump-resources.
        for config in [
            "[settings]\nconcurrency = 16\nbinary_throttle = 0\nretries = 2\n",
            "[settings]\nconcurrency = 16\nthrottle = 0\nretries = 2\n",
        ] {
            let settings = parse_settings(config).unwrap();
            let cancel = CancelToken::new();
            let ctx = RunContext {
                settings: &settings,
                socks_proxy: None,
                cancel: &cancel,
            };
            let opts = dump_opts(&dump_args("http://h/c".into(), None), &ctx);
            assert_eq!(opts.throttle, Defaults::DUMP_THROTTLE);
        }
    }

    #[test]
    fn test_dump_runs_with_sample_config() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/coll/__ids"))
                .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":\"a\"}"))
                .expect(1)
                .mount(&server),
        );
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/coll/a"))
                .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
                .expect(1)
                .mount(&server),
        );

        let settings = parse_settings(SAMPLE_CONFIG).unwrap();
        let cancel = CancelToken::new();
        let ctx = RunContext {
            settings: &settings,
            socks_proxy: None,
            cancel: &cancel,
        };
        let opts = dump_opts(&dump_args(format!("{}/coll", server.uri()), None), &ctx);
        let client = RestClient::new(&ClientConfig {
            pool_size: 2,
            socks_proxy: None,
            env_proxy: false,
        })
        .unwrap();
        let mut out = Vec::new();
        let written = dump_resources(&mut out, &client, &opts, &cancel).unwrap();
        assert_eq!(written, 1);
        assert_eq!(out, b"{}\n");
        rt.block_on(server.verify());
    }
}
