//! Dump path: GET every resource of a collection and write each body plus newline.
//!
//! A shared ticker paces the readers globally; the reader pool only hides latency.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, info};
use reqwest::Url;
use std::io::Write;
use std::time::Instant;
use std::thread;

use super::retriever::{IdRetriever, UrlIdRetriever};
use super::supervisor::Supervisor;
use crate::engine::cancel::CancelToken;
use crate::engine::client::RestClient;
use crate::engine::limiter::ticker;
use crate::engine::progress::{create_counter, finish_progress, tick_progress};
use crate::engine::tools::{normalize_base, resource_url};
use crate::utils::config::{ChannelCaps, ProgressConsts};
use crate::{DumpOpts, RestError, Result};

/// Write every resource body of the collection at `opts.base_url` to `output`.
/// Returns the number of bodies written.
///
/// Options are validated before any request: an empty base URL or a throttle below 1 is
/// a config error. The first HTTP or I/O failure stops the run and is returned.
pub fn dump_resources<W: Write + Send>(
    output: &mut W,
    client: &RestClient,
    opts: &DumpOpts,
    cancel: &CancelToken,
) -> Result<usize> {
    let base = normalize_base(&opts.base_url)?;
    let ticker = ticker(opts.throttle)?;
    let readers = opts.readers.max(1);
    info!(
        "Dumping {} at {} req/s with {} readers",
        base, opts.throttle, readers
    );

    let supervisor = Supervisor::new(cancel.clone());
    let progress = opts
        .progress
        .then(|| create_counter(ProgressConsts::DUMP_DESC, " resources"));
    let retriever = UrlIdRetriever::new(base.as_str(), client.clone());
    let (list_errs_tx, list_errs_rx) = bounded::<RestError>(1);

    let written = thread::scope(|s| {
        let (ids_tx, ids_rx) = bounded::<String>(ChannelCaps::STREAM);
        let lister = s.spawn(move || retriever.retrieve(ids_tx, list_errs_tx));

        let (bodies_tx, bodies_rx) = bounded::<Vec<u8>>(ChannelCaps::STREAM);
        let workers: Vec<_> = (0..readers)
            .map(|_| {
                let ids_rx = ids_rx.clone();
                let bodies_tx = bodies_tx.clone();
                let ticker = ticker.clone();
                let (base, supervisor) = (&base, &supervisor);
                s.spawn(move || read_loop(ids_rx, bodies_tx, &ticker, base, client, supervisor))
            })
            .collect();
        drop(ids_rx);
        drop(bodies_tx);

        let mut written = 0_usize;
        for body in bodies_rx.iter() {
            let res = output
                .write_all(&body)
                .and_then(|_| output.write_all(b"\n"));
            if let Err(e) = res {
                supervisor.report(RestError::io("writing resource to output", e));
                break;
            }
            written += 1;
            tick_progress(progress.as_ref());
        }
        // Readers blocked on a full channel see the disconnect and return.
        drop(bodies_rx);
        for w in workers {
            supervisor.join("reader", w);
        }
        supervisor.join("id lister", lister);
        written
    });

    finish_progress(progress);
    output
        .flush()
        .map_err(|e| RestError::io("flushing output", e))?;
    debug!("dump-resources wrote {written} bodies");
    if let Ok(err) = list_errs_rx.try_recv() {
        return Err(err);
    }
    supervisor.finish()?;
    Ok(written)
}

fn read_loop(
    ids: Receiver<String>,
    bodies: Sender<Vec<u8>>,
    ticker: &Receiver<Instant>,
    base: &Url,
    client: &RestClient,
    supervisor: &Supervisor,
) {
    for id in ids.iter() {
        if supervisor.cancel_token().wait_for(ticker).is_err() {
            return;
        }
        let data = resource_url(base, &id).and_then(|url| client.get_bytes(&url));
        match data {
            Ok(data) => {
                if bodies.send(data).is_err() {
                    return;
                }
            }
            Err(e) => {
                supervisor.report(e);
                return;
            }
        }
    }
}
