//! Id-set collection shared by diff-ids and sync-ids.

use crossbeam_channel::{bounded, never, select};
use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;

use super::retriever::{IdRetriever, spawn_retriever};
use crate::utils::config::ChannelCaps;
use crate::{DiffReport, RestError, Result};

/// Run both retrievers concurrently and collect their ids into sets.
///
/// The first error from either retriever aborts collection.
pub fn collect_id_sets(
    source: Box<dyn IdRetriever>,
    dest: Box<dyn IdRetriever>,
) -> Result<(HashSet<String>, HashSet<String>)> {
    let (errs_tx, errs_rx) = bounded::<RestError>(2);
    let source_rx = spawn_retriever(source, ChannelCaps::STREAM, errs_tx.clone());
    let dest_rx = spawn_retriever(dest, ChannelCaps::STREAM, errs_tx);

    let mut sources = HashSet::new();
    let mut dests = HashSet::new();
    let (mut source_open, mut dest_open, mut errs_open) = (true, true, true);
    let closed = never::<String>();
    let errs_closed = never::<RestError>();

    while source_open || dest_open {
        let source_ch = if source_open { &source_rx } else { &closed };
        let dest_ch = if dest_open { &dest_rx } else { &closed };
        let errs_ch = if errs_open { &errs_rx } else { &errs_closed };
        select! {
            recv(source_ch) -> id => match id {
                Ok(id) => { sources.insert(id); }
                Err(_) => source_open = false,
            },
            recv(dest_ch) -> id => match id {
                Ok(id) => { dests.insert(id); }
                Err(_) => dest_open = false,
            },
            recv(errs_ch) -> err => match err {
                Ok(err) => return Err(err),
                Err(_) => errs_open = false,
            },
        }
    }
    // A retriever sends its error before closing its id channel, but select may have
    // picked the close first.
    if let Ok(err) = errs_rx.try_recv() {
        return Err(err);
    }
    debug!(
        "collected {} source ids, {} destination ids",
        sources.len(),
        dests.len()
    );
    Ok((sources, dests))
}

/// Ids present on only one side, in set iteration order.
pub fn diff_ids(source: Box<dyn IdRetriever>, dest: Box<dyn IdRetriever>) -> Result<DiffReport> {
    let (sources, dests) = collect_id_sets(source, dest)?;
    Ok(DiffReport {
        only_in_source: sources.difference(&dests).cloned().collect(),
        only_in_destination: dests.difference(&sources).cloned().collect(),
    })
}

/// Serialize `value` as one line of JSON.
pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)
        .map_err(|e| RestError::json("encoding report", e))?;
    out.write_all(b"\n")
        .and_then(|_| out.flush())
        .map_err(|e| RestError::io("writing report", e))
}
