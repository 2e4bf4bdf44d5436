//! Failure sink: payloads that could not be uploaded, written one per line by a single writer.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::io::Write;
use std::thread::{Scope, ScopedJoinHandle};

use super::supervisor::Supervisor;
use crate::RestError;

/// Worker-side handle. Disabled sinks accept nothing and callers fall back to failing.
#[derive(Clone)]
pub struct FailureSink {
    tx: Option<Sender<Vec<u8>>>,
}

impl FailureSink {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a payload for the writer. Returns false when disabled or the writer has stopped.
    pub fn dump(&self, payload: Vec<u8>) -> bool {
        match &self.tx {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }
}

/// Spawn the writer in `scope` when `enabled`.
///
/// The channel closes when the last [`FailureSink`] clone is dropped; drop the returned sink
/// only after every worker holding a clone has been joined, then join the writer. The writer
/// returns how many payloads it wrote. A write error is reported to `supervisor` and ends the
/// writer, after which [`FailureSink::dump`] returns false.
pub fn open_failure_sink<'scope, 'env, W>(
    scope: &'scope Scope<'scope, 'env>,
    enabled: bool,
    capacity: usize,
    out: &'scope mut W,
    supervisor: &'scope Supervisor,
) -> (FailureSink, Option<ScopedJoinHandle<'scope, usize>>)
where
    W: Write + Send,
{
    if !enabled {
        return (FailureSink::disabled(), None);
    }
    let (tx, rx) = bounded::<Vec<u8>>(capacity);
    let writer = scope.spawn(move || write_failures(rx, out, supervisor));
    (FailureSink { tx: Some(tx) }, Some(writer))
}

fn write_failures<W: Write>(rx: Receiver<Vec<u8>>, out: &mut W, supervisor: &Supervisor) -> usize {
    let mut written = 0;
    for payload in rx.iter() {
        let res = out
            .write_all(&payload)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush());
        if let Err(e) = res {
            supervisor.report(RestError::io("writing failed payload", e));
            return written;
        }
        written += 1;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cancel::CancelToken;
    use std::thread;

    #[test]
    fn test_disabled_sink_rejects() {
        let sink = FailureSink::disabled();
        assert!(!sink.is_enabled());
        assert!(!sink.dump(b"x".to_vec()));
    }

    #[test]
    fn test_writer_emits_one_line_per_payload_after_close() {
        let supervisor = Supervisor::new(CancelToken::new());
        let mut out = Vec::new();
        let written = thread::scope(|s| {
            let (sink, writer) = open_failure_sink(s, true, 0, &mut out, &supervisor);
            let workers: Vec<_> = (0..3)
                .map(|i| {
                    let sink = sink.clone();
                    s.spawn(move || assert!(sink.dump(format!("{{\"n\":{i}}}").into_bytes())))
                })
                .collect();
            for w in workers {
                w.join().unwrap();
            }
            drop(sink);
            writer.unwrap().join().unwrap()
        });
        assert_eq!(written, 3);
        let text = String::from_utf8(out).unwrap();
        let mut lines: Vec<_> = text.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["{\"n\":0}", "{\"n\":1}", "{\"n\":2}"]);
        assert!(supervisor.finish().is_ok());
    }
}
