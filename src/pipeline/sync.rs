//! sync-ids: make a destination collection hold the same ids as a source collection.
//!
//! Collect both id sets, copy what the destination lacks through a bounded set of
//! concurrent workers, then (optionally) delete what the source lacks, one at a time.

use crossbeam_channel::{after, bounded, select};
use kdam::Animation;
use log::{debug, info, warn};
use reqwest::Url;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use super::diff::collect_id_sets;
use super::retriever::IdRetriever;
use super::supervisor::Supervisor;
use crate::engine::cancel::CancelToken;
use crate::engine::client::RestClient;
use crate::engine::progress::{
    ProgressBar, ProgressBarConfig, create_progress_bar, finish_progress, tick_progress,
};
use crate::engine::tools::{normalize_base, resource_url};
use crate::utils::config::{APPLICATION_JSON, Defaults, ProgressConsts};
use crate::{RestError, Result, SyncSummary};

pub struct SyncService {
    pub source_ids: Box<dyn IdRetriever>,
    pub dest_ids: Box<dyn IdRetriever>,
    pub source_url: String,
    pub dest_url: String,
    /// Copies in flight at once.
    pub max_concurrent_reqs: usize,
    /// Floor on the wall-clock time of each copy, retries included.
    pub min_exec_time: Duration,
    /// Extra attempts after the first failed copy.
    pub retries: u32,
    pub retry_backoff: Duration,
    pub deletes: bool,
    pub show_progress: bool,
}

impl SyncService {
    /// Service with default concurrency, retries and back-off.
    pub fn new(
        source_ids: Box<dyn IdRetriever>,
        dest_ids: Box<dyn IdRetriever>,
        source_url: impl Into<String>,
        dest_url: impl Into<String>,
    ) -> Self {
        Self {
            source_ids,
            dest_ids,
            source_url: source_url.into(),
            dest_url: dest_url.into(),
            max_concurrent_reqs: Defaults::SYNC_CONCURRENCY,
            min_exec_time: Duration::ZERO,
            retries: Defaults::SYNC_RETRIES,
            retry_backoff: Defaults::RETRY_BACKOFF,
            deletes: false,
            show_progress: false,
        }
    }

    pub fn run(self, client: &RestClient, cancel: &CancelToken) -> Result<SyncSummary> {
        let source = normalize_base(&self.source_url)?;
        let dest = normalize_base(&self.dest_url)?;
        let (sources, mut dests) = collect_id_sets(self.source_ids, self.dest_ids)?;
        info!(
            "sync {} -> {}: {} source ids, {} destination ids",
            source,
            dest,
            sources.len(),
            dests.len()
        );

        let copier = Copier {
            source: &source,
            dest: &dest,
            client,
            min_exec_time: self.min_exec_time,
            retries: self.retries,
            retry_backoff: self.retry_backoff,
        };
        let progress = self.show_progress.then(|| {
            create_progress_bar(ProgressBarConfig::new(
                sources.len(),
                ProgressConsts::CREATE_DESC,
                Animation::Classic,
            ))
        });
        let supervisor = Supervisor::new(cancel.clone());
        let created = create_missing(
            &sources,
            &mut dests,
            &copier,
            self.max_concurrent_reqs.max(1),
            &supervisor,
            progress.as_ref(),
        );
        finish_progress(progress);
        info!("created {created} resources");
        supervisor.finish()?;

        let deleted = if self.deletes {
            delete_extra(&dests, &dest, client, cancel, self.show_progress)?
        } else {
            0
        };
        Ok(SyncSummary { created, deleted })
    }
}

/// Dispatch one copy per source id missing from `dests`, at most `conns` at a time. Ids
/// on both sides are removed from `dests` and skipped. Returns the number of successful
/// copies.
fn create_missing(
    sources: &HashSet<String>,
    dests: &mut HashSet<String>,
    copier: &Copier<'_>,
    conns: usize,
    supervisor: &Supervisor,
    progress: Option<&ProgressBar>,
) -> usize {
    let cancel = supervisor.cancel_token();
    let created = AtomicUsize::new(0);
    let mut skipped = 0_usize;

    // Semaphore: a worker holds one token for its whole lifetime.
    let (tokens_tx, tokens_rx) = bounded::<()>(conns);
    for _ in 0..conns {
        let _ = tokens_tx.send(());
    }

    thread::scope(|s| {
        let mut workers = Vec::new();
        for id in sources {
            if dests.remove(id) {
                skipped += 1;
                tick_progress(progress);
                continue;
            }
            let acquired = select! {
                recv(tokens_rx) -> token => token.is_ok(),
                recv(cancel.signal()) -> _ => false,
            };
            if !acquired || supervisor.is_stopping() {
                break;
            }
            let (tokens_tx, created) = (tokens_tx.clone(), &created);
            workers.push(s.spawn(move || {
                if let Err(e) = copier.copy_paced(id, cancel, created) {
                    supervisor.report(e);
                }
                tick_progress(progress);
                let _ = tokens_tx.send(());
            }));
        }
        for w in workers {
            supervisor.join("copy worker", w);
        }
    });
    debug!("skipped {skipped} ids present on both sides");
    created.load(Ordering::Relaxed)
}

struct Copier<'a> {
    source: &'a Url,
    dest: &'a Url,
    client: &'a RestClient,
    min_exec_time: Duration,
    retries: u32,
    retry_backoff: Duration,
}

impl Copier<'_> {
    /// Copy `id` with retries, count it in `created`, then hold until `min_exec_time` has
    /// passed since the first attempt began. A copy that succeeded stays counted even when
    /// the hold is cut short by cancellation.
    fn copy_paced(&self, id: &str, cancel: &CancelToken, created: &AtomicUsize) -> Result<()> {
        let floor = after(self.min_exec_time);
        self.copy_with_retries(id, cancel)?;
        created.fetch_add(1, Ordering::Relaxed);
        if cancel.wait_for(&floor).is_err() {
            debug!("minExecTime wait for ID={id} cut short");
        }
        Ok(())
    }

    /// Copy `id`, retrying failed attempts after the back-off.
    fn copy_with_retries(&self, id: &str, cancel: &CancelToken) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.copy(id) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("copy ID={id} failed (attempt {attempt}), retrying: {e}");
                    cancel.sleep(self.retry_backoff)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// GET from the source and stream the body into a PUT on the destination.
    fn copy(&self, id: &str) -> Result<()> {
        let body = self.client.get(&resource_url(self.source, id)?)?;
        self.client.put_ok(
            &resource_url(self.dest, id)?,
            body.into_body(),
            Some(APPLICATION_JSON),
        )?;
        Ok(())
    }
}

/// DELETE each id in turn; the first failure stops the phase.
fn delete_extra(
    ids: &HashSet<String>,
    dest: &Url,
    client: &RestClient,
    cancel: &CancelToken,
    show_progress: bool,
) -> Result<usize> {
    let progress = show_progress.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            ids.len(),
            ProgressConsts::DELETE_DESC,
            Animation::Classic,
        ))
    });
    let mut deleted = 0;
    let result = ids.iter().try_for_each(|id| {
        if cancel.is_cancelled() {
            return Err(RestError::Cancelled);
        }
        client.delete(&resource_url(dest, id)?)?;
        deleted += 1;
        tick_progress(progress.as_ref());
        Ok(())
    });
    finish_progress(progress);
    result?;
    info!("deleted {deleted} resources");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::client::ClientConfig;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_copy_stays_counted_when_floor_wait_is_cancelled() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/src/a"))
                .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("PUT"))
                .and(path("/dst/a"))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        });
        let source = normalize_base(&format!("{}/src", server.uri())).unwrap();
        let dest = normalize_base(&format!("{}/dst", server.uri())).unwrap();
        let client = RestClient::new(&ClientConfig {
            pool_size: 1,
            socks_proxy: None,
            env_proxy: false,
        })
        .unwrap();
        let copier = Copier {
            source: &source,
            dest: &dest,
            client: &client,
            min_exec_time: Duration::from_secs(30),
            retries: 0,
            retry_backoff: Duration::ZERO,
        };
        let supervisor = Supervisor::new(CancelToken::new());
        let sources: HashSet<String> = HashSet::from(["a".to_string()]);
        let mut dests = HashSet::new();

        let start = Instant::now();
        let created = thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(500));
                supervisor.report(RestError::Config("another copy failed".into()));
            });
            create_missing(&sources, &mut dests, &copier, 2, &supervisor, None)
        });

        assert_eq!(created, 1);
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(matches!(supervisor.finish(), Err(RestError::Config(_))));
        rt.block_on(server.verify());
    }
}
