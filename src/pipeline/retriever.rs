//! Id sources: a file of UUIDs, or a collection's `__ids` stream.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;

use crate::engine::client::RestClient;
use crate::engine::tools::{ids_url, normalize_base};
use crate::{RestError, Result};

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[0-9a-fA-F]{8}-([0-9a-fA-F]{4}-){3}[0-9a-fA-F]{12}$").expect("valid UUID regex")
});

/// Canonical hyphenated UUID, any hex case.
pub fn is_valid_uuid(id: &str) -> bool {
    UUID_PATTERN.is_match(id)
}

/// Produces a lazy sequence of record ids.
///
/// `retrieve` sends ids on `ids`, sends at most one fatal error on `errs`, and always drops
/// `ids` on return: closure of the id channel is the only end-of-stream signal. `errs` is
/// the caller's to close. A send failure on `ids` means the consumer has gone and ends the
/// retrieval quietly.
pub trait IdRetriever: Send + Sync {
    fn retrieve(&self, ids: Sender<String>, errs: Sender<RestError>);
}

/// Pick the file-backed retriever when a path is given, else the URL-backed one.
pub fn id_retriever(
    file: Option<&Path>,
    base_url: &str,
    client: &RestClient,
) -> Box<dyn IdRetriever> {
    match file {
        Some(path) => Box::new(FileIdRetriever::new(path)),
        None => Box::new(UrlIdRetriever::new(base_url, client.clone())),
    }
}

/// Run `retriever` on its own thread and return the id receiver.
pub fn spawn_retriever(
    retriever: Box<dyn IdRetriever>,
    capacity: usize,
    errs: Sender<RestError>,
) -> Receiver<String> {
    let (ids_tx, ids_rx) = bounded(capacity);
    thread::spawn(move || retriever.retrieve(ids_tx, errs));
    ids_rx
}

/// One UUID per line; the first line that is not a UUID ends retrieval with `InvalidId`.
pub struct FileIdRetriever {
    path: PathBuf,
}

impl FileIdRetriever {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_ids(&self, ids: &Sender<String>) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| RestError::open_file(&self.path, e))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| {
                RestError::io(format!("Failed reading file={}", self.path.display()), e)
            })?;
            let id = line.trim();
            if !is_valid_uuid(id) {
                return Err(RestError::InvalidId {
                    id: id.to_string(),
                    path: self.path.clone(),
                });
            }
            if ids.send(id.to_string()).is_err() {
                break;
            }
        }
        Ok(())
    }
}

impl IdRetriever for FileIdRetriever {
    fn retrieve(&self, ids: Sender<String>, errs: Sender<RestError>) {
        if let Err(e) = self.read_ids(&ids) {
            let _ = errs.send(e);
        }
    }
}

#[derive(Deserialize)]
struct ListEntry {
    id: String,
}

/// GETs `<base>/__ids` and decodes the body as concatenated `{"id": ...}` objects.
/// Ids are passed on verbatim.
pub struct UrlIdRetriever {
    base_url: String,
    client: RestClient,
}

impl UrlIdRetriever {
    pub fn new(base_url: impl Into<String>, client: RestClient) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn stream_ids(&self, ids: &Sender<String>) -> Result<()> {
        let base = normalize_base(&self.base_url)?;
        let url = ids_url(&base)?;
        debug!("Listing ids from {url}");
        let body = self.client.get(&url)?;
        let entries = serde_json::Deserializer::from_reader(body).into_iter::<ListEntry>();
        for entry in entries {
            let entry = entry.map_err(|e| RestError::json(format!("decoding {url}"), e))?;
            if ids.send(entry.id).is_err() {
                break;
            }
        }
        Ok(())
    }
}

impl IdRetriever for UrlIdRetriever {
    fn retrieve(&self, ids: Sender<String>, errs: Sender<RestError>) {
        if let Err(e) = self.stream_ids(&ids) {
            let _ = errs.send(e);
        }
    }
}
