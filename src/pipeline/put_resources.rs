//! JSON PUT path: decode resources from an input stream and PUT each to `<base>/<id>`.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, info, warn};
use reqwest::Url;
use serde_json::Value;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::failure_sink::{FailureSink, open_failure_sink};
use super::supervisor::Supervisor;
use crate::engine::cancel::CancelToken;
use crate::engine::client::RestClient;
use crate::engine::progress::{ProgressBar, create_counter, finish_progress, tick_progress};
use crate::engine::tools::{normalize_base, resource_url};
use crate::utils::config::{APPLICATION_JSON, ProgressConsts};
use crate::{PutOpts, PutStats, RestError, Resource, Result};

#[derive(Default)]
struct Counters {
    put: AtomicUsize,
    dumped: AtomicUsize,
    skipped: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> PutStats {
        PutStats {
            put: self.put.load(Ordering::Relaxed),
            dumped: self.dumped.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Shared, read-only state of the put workers.
struct PutContext<'a> {
    base: Url,
    id_property: &'a str,
    client: &'a RestClient,
    supervisor: &'a Supervisor,
    counters: Counters,
    progress: Option<ProgressBar>,
}

/// Read concatenated JSON objects from `input` and PUT each one.
///
/// The resource channel is unbuffered, so decoding only runs ahead of the workers by one
/// resource. With `dump_failed`, failed resources are written to `output` one per line and
/// the run still succeeds; without it the first failure stops the run and is returned.
/// Resources without a string id property are skipped (and dumped when `dump_failed`).
pub fn put_resources<R, W>(
    input: R,
    output: &mut W,
    client: &RestClient,
    opts: &PutOpts,
    cancel: &CancelToken,
) -> Result<PutStats>
where
    R: Read,
    W: Write + Send,
{
    let supervisor = Supervisor::new(cancel.clone());
    let ctx = PutContext {
        base: normalize_base(&opts.base_url)?,
        id_property: &opts.id_property,
        client,
        supervisor: &supervisor,
        counters: Counters::default(),
        progress: opts
            .progress
            .then(|| create_counter(ProgressConsts::PUT_DESC, " resources")),
    };
    let conns = opts.concurrency.max(1);
    info!("PUT resources to {} with {} workers", ctx.base, conns);

    thread::scope(|s| {
        let (docs_tx, docs_rx) = bounded::<Resource>(0);
        let (sink, writer) = open_failure_sink(s, opts.dump_failed, 0, output, ctx.supervisor);

        let workers: Vec<_> = (0..conns)
            .map(|_| {
                let docs_rx = docs_rx.clone();
                let sink = sink.clone();
                let ctx = &ctx;
                s.spawn(move || put_worker(docs_rx, sink, ctx))
            })
            .collect();
        drop(docs_rx);

        feed_resources(input, docs_tx, ctx.supervisor);

        for w in workers {
            ctx.supervisor.join("put worker", w);
        }
        // Every worker has returned: closing the sink now cannot race a dump.
        drop(sink);
        if let Some(writer) = writer {
            ctx.supervisor.join("failure writer", writer);
        }
    });

    finish_progress(ctx.progress);
    let stats = ctx.counters.snapshot();
    debug!("put-resources finished: {stats:?}");
    supervisor.finish()?;
    Ok(stats)
}

/// Producer: decode resources and hand them to the workers until input ends or the
/// pipeline stops.
fn feed_resources<R: Read>(input: R, docs: Sender<Resource>, supervisor: &Supervisor) {
    let cancel = supervisor.cancel_token();
    let stream = serde_json::Deserializer::from_reader(input).into_iter::<Resource>();
    for doc in stream {
        let doc = match doc {
            Ok(doc) => doc,
            Err(e) => {
                supervisor.report(RestError::json("decoding resource from input", e));
                return;
            }
        };
        select! {
            send(docs, doc) -> res => if res.is_err() { return },
            recv(cancel.signal()) -> _ => return,
        }
    }
}

fn put_worker(docs: Receiver<Resource>, sink: FailureSink, ctx: &PutContext<'_>) {
    for doc in docs.iter() {
        if ctx.supervisor.is_stopping() {
            return;
        }
        if let Err(e) = put_one(&doc, &sink, ctx) {
            ctx.supervisor.report(e);
            return;
        }
        tick_progress(ctx.progress.as_ref());
    }
}

/// PUT one resource. Returns an error only when it must stop the run.
fn put_one(doc: &Resource, sink: &FailureSink, ctx: &PutContext<'_>) -> Result<()> {
    let mut payload =
        serde_json::to_vec(doc).map_err(|e| RestError::json("encoding resource", e))?;

    let Some(id) = doc.get(ctx.id_property).and_then(Value::as_str) else {
        warn!(
            "unable to extract id property {} from resource, skipping",
            ctx.id_property
        );
        ctx.counters.skipped.fetch_add(1, Ordering::Relaxed);
        if sink.dump(payload) {
            ctx.counters.dumped.fetch_add(1, Ordering::Relaxed);
        }
        return Ok(());
    };

    let body = if sink.is_enabled() {
        payload.clone()
    } else {
        std::mem::take(&mut payload)
    };
    let result = resource_url(&ctx.base, id)
        .and_then(|url| ctx.client.put(&url, body, Some(APPLICATION_JSON)));
    match result {
        Ok(_) => {
            ctx.counters.put.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        Err(e) if sink.is_enabled() => {
            warn!("PUT id={id} failed, dumping resource: {e}");
            if sink.dump(payload) {
                ctx.counters.dumped.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
