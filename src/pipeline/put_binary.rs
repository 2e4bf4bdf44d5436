//! Binary path: stream each resource from one collection to another, GET → PUT, without
//! buffering bodies and keeping the upstream content type.
//!
//! ids → fetchers (rate limited GET) → BinaryMsg channel → uploaders (PUT) → failure sink.
//! Per-item failures are logged and their ids dumped; they never fail the run.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, error, info, warn};
use reqwest::Url;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::failure_sink::{FailureSink, open_failure_sink};
use super::retriever::{IdRetriever, UrlIdRetriever};
use super::supervisor::Supervisor;
use crate::engine::cancel::CancelToken;
use crate::engine::client::RestClient;
use crate::engine::limiter::RateLimiter;
use crate::engine::progress::{ProgressBar, create_counter, finish_progress, tick_progress};
use crate::engine::tools::{normalize_base, resource_url};
use crate::utils::config::{ChannelCaps, ProgressConsts};
use crate::{BinaryMsg, BinaryOpts, BinaryStats, RestError, Result};

struct BinaryContext<'a> {
    from: Url,
    to: Url,
    client: &'a RestClient,
    limiter: Option<RateLimiter>,
    cancel: &'a CancelToken,
    copied: AtomicUsize,
    failed: AtomicUsize,
    progress: Option<ProgressBar>,
}

impl BinaryContext<'_> {
    fn fail(&self, id: String, sink: &FailureSink) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        sink.dump(id.into_bytes());
    }
}

/// Copy every id listed by `<from>/__ids` from `from` to `to`.
///
/// Returns an error only for invalid options, an id listing that cannot be read, a failure
/// writing the failure sink, or cancellation.
pub fn put_binary_resources<W: Write + Send>(
    output: &mut W,
    client: &RestClient,
    opts: &BinaryOpts,
    cancel: &CancelToken,
) -> Result<BinaryStats> {
    let supervisor = Supervisor::new(cancel.clone());
    let ctx = BinaryContext {
        from: normalize_base(&opts.from_url)?,
        to: normalize_base(&opts.to_url)?,
        client,
        limiter: RateLimiter::per_second(opts.throttle),
        cancel,
        copied: AtomicUsize::new(0),
        failed: AtomicUsize::new(0),
        progress: opts
            .progress
            .then(|| create_counter(ProgressConsts::PUT_DESC, " resources")),
    };
    let conns = opts.concurrency.max(1);
    info!(
        "Copying {} -> {} with {} connections, throttle {}",
        ctx.from, ctx.to, conns, opts.throttle
    );

    let retriever = UrlIdRetriever::new(ctx.from.as_str(), client.clone());
    let (list_errs_tx, list_errs_rx) = bounded::<RestError>(1);

    thread::scope(|s| {
        let (ids_tx, ids_rx) = bounded::<String>(conns * ChannelCaps::IDS_PER_CONN);
        let lister = s.spawn(move || retriever.retrieve(ids_tx, list_errs_tx));

        let (msgs_tx, msgs_rx) = bounded::<BinaryMsg>(ChannelCaps::STREAM);
        let (sink, writer) = open_failure_sink(
            s,
            opts.dump_failed,
            conns * ChannelCaps::FAILURES_PER_CONN,
            output,
            &supervisor,
        );

        let uploaders: Vec<_> = (0..conns)
            .map(|_| {
                let msgs_rx = msgs_rx.clone();
                let sink = sink.clone();
                let ctx = &ctx;
                s.spawn(move || upload_loop(msgs_rx, sink, ctx))
            })
            .collect();
        let fetchers: Vec<_> = (0..conns)
            .map(|_| {
                let ids_rx = ids_rx.clone();
                let msgs_tx = msgs_tx.clone();
                let sink = sink.clone();
                let ctx = &ctx;
                s.spawn(move || fetch_loop(ids_rx, msgs_tx, sink, ctx))
            })
            .collect();
        drop(ids_rx);
        drop(msgs_rx);
        drop(msgs_tx);

        // Fetchers done → last msgs sender gone → uploaders drain and return.
        for f in fetchers {
            supervisor.join("fetcher", f);
        }
        supervisor.join("id lister", lister);
        for u in uploaders {
            supervisor.join("uploader", u);
        }
        drop(sink);
        if let Some(writer) = writer {
            supervisor.join("failure writer", writer);
        }
    });

    finish_progress(ctx.progress);
    let stats = BinaryStats {
        copied: ctx.copied.load(Ordering::Relaxed),
        failed: ctx.failed.load(Ordering::Relaxed),
    };
    info!("Copied {} resources, {} failed", stats.copied, stats.failed);
    if let Ok(err) = list_errs_rx.try_recv() {
        return Err(err);
    }
    supervisor.finish()?;
    Ok(stats)
}

fn fetch_loop(
    ids: Receiver<String>,
    msgs: Sender<BinaryMsg>,
    sink: FailureSink,
    ctx: &BinaryContext<'_>,
) {
    for id in ids.iter() {
        if let Some(limiter) = &ctx.limiter
            && let Err(e) = limiter.wait(ctx.cancel)
        {
            if e.is_cancelled() {
                debug!("Stopping fetcher at ID={id}");
            } else {
                warn!("Got error rate limiting ID={id}: {e}");
            }
            ctx.fail(id, &sink);
            return;
        }
        if ctx.cancel.is_cancelled() {
            ctx.fail(id, &sink);
            return;
        }
        debug!("Fetching ID={id}");
        let fetched = resource_url(&ctx.from, &id).and_then(|url| ctx.client.get(&url));
        match fetched {
            Ok(body) => {
                if msgs.send(BinaryMsg::new(id, body)).is_err() {
                    return;
                }
            }
            Err(e) => {
                error!("GET ID={id}: {e}");
                ctx.fail(id, &sink);
            }
        }
    }
}

fn upload_loop(msgs: Receiver<BinaryMsg>, sink: FailureSink, ctx: &BinaryContext<'_>) {
    for msg in msgs.iter() {
        let BinaryMsg {
            id,
            body,
            content_type,
        } = msg;
        if ctx.cancel.is_cancelled() {
            ctx.fail(id, &sink);
            continue;
        }
        let url = match resource_url(&ctx.to, &id) {
            Ok(url) => url,
            Err(e) => {
                error!("generating PUT URL for ID={id}: {e}");
                ctx.fail(id, &sink);
                continue;
            }
        };
        // The body moves into the request; whatever the PUT leaves unread is drained when
        // the request drops it.
        match ctx
            .client
            .put(&url, body.into_body(), content_type.as_deref())
        {
            Ok(_) => {
                ctx.copied.fetch_add(1, Ordering::Relaxed);
                tick_progress(ctx.progress.as_ref());
            }
            Err(e) => {
                error!("PUT putURL={url}, Error={e}");
                ctx.fail(id, &sink);
            }
        }
    }
}
