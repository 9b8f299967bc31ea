//! Watcher thread: notify + per-path debounce, send settled paths to the event loop.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{CdrlogError, Result};
use crate::ingest::is_hidden;

/// What a notify event means for a path's debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    /// A file appeared or was closed after writing: start or restart its quiet timer.
    Track,
    /// More data arrived: restart the timer of a path already tracked.
    Refresh,
    Ignore,
}

pub fn classify_event(kind: &EventKind) -> EventAction {
    match kind {
        EventKind::Create(_)
        | EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => EventAction::Track,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => EventAction::Refresh,
        _ => EventAction::Ignore,
    }
}

/// Per-path quiet timers. A path is ready once no event touched it for `debounce`.
#[derive(Debug)]
struct Debouncer {
    debounce: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: HashMap::new(),
        }
    }

    fn record(&mut self, action: EventAction, path: PathBuf, now: Instant) {
        match action {
            EventAction::Track => {
                self.pending.insert(path, now);
            }
            EventAction::Refresh => {
                // Writes to a file that was never tracked (an already logged
                // file being appended to) must not trigger a second run
                if let Some(last) = self.pending.get_mut(&path) {
                    *last = now;
                }
            }
            EventAction::Ignore => {}
        }
    }

    /// How long the loop may block before the next path can become ready.
    /// `None` when nothing is pending.
    fn wait_time(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|last| (*last + self.debounce).saturating_duration_since(now))
            .min()
    }

    /// Remove and return the ready paths, oldest first.
    fn take_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready: Vec<(PathBuf, Instant)> = self
            .pending
            .iter()
            .filter(|(_, last)| now.duration_since(**last) >= self.debounce)
            .map(|(p, last)| (p.clone(), *last))
            .collect();
        for (p, _) in &ready {
            self.pending.remove(p);
        }
        ready.sort_by_key(|(_, last)| *last);
        ready.into_iter().map(|(p, _)| p).collect()
    }
}

/// Register a recursive watch on every root, then debounce events on a
/// background thread and send settled file paths over `tx`.
///
/// Registration happens before returning, so a missing root or an exhausted
/// inotify limit is reported to the caller. The thread exits once `tx`'s
/// receiver is dropped.
pub fn spawn_watcher(
    roots: &[PathBuf],
    debounce: Duration,
    tx: mpsc::Sender<PathBuf>,
) -> Result<JoinHandle<()>> {
    let (event_tx, event_rx) = mpsc::channel::<(EventAction, Vec<PathBuf>)>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(ev) => {
                let action = classify_event(&ev.kind);
                if action == EventAction::Ignore {
                    return;
                }
                let paths: Vec<PathBuf> = ev.paths.into_iter().filter(|p| !is_hidden(p)).collect();
                if !paths.is_empty() {
                    let _ = event_tx.send((action, paths));
                }
            }
            Err(e) => log::error!("watch error: {}", e),
        }
    })
    .map_err(|e| CdrlogError::Watch(format!("cannot start file watcher: {}", e)))?;

    for root in roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| CdrlogError::Watch(format!("cannot watch {}: {}", root.display(), e)))?;
        log::info!("Watching {}", root.display());
    }

    let handle = thread::Builder::new()
        .name("cdrlog-watcher".to_string())
        .spawn(move || debounce_loop(watcher, event_rx, debounce, tx))?;
    Ok(handle)
}

fn debounce_loop(
    _watcher: RecommendedWatcher,
    event_rx: mpsc::Receiver<(EventAction, Vec<PathBuf>)>,
    debounce: Duration,
    tx: mpsc::Sender<PathBuf>,
) {
    let mut debouncer = Debouncer::new(debounce);

    loop {
        // Block without a timeout while idle; otherwise wake for the next deadline
        let received = match debouncer.wait_time(Instant::now()) {
            None => event_rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
            Some(wait) => event_rx.recv_timeout(wait),
        };

        match received {
            Ok((action, paths)) => {
                let now = Instant::now();
                for p in paths {
                    debouncer.record(action, p, now);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        for p in debouncer.take_ready(Instant::now()) {
            if tx.send(p).is_err() {
                return;
            }
        }
    }
}
