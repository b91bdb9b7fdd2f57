//! Native discovery strategy: parallel directory traversal.
//!
//! Worker threads pull directories from a shared queue, emit matching file
//! names, and enqueue subdirectories until the depth bound. An in-flight
//! counter tells idle workers when the whole tree has been drained.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;

use crate::core::errors::{Result, SweepError};
use crate::scanner::discovery::{Discovered, DiscoveryStrategy, ScanRequest};

/// Item in the work queue: (directory, depth of the directory itself).
type WorkItem = (PathBuf, usize);

/// Parallel `read_dir` traversal.
///
/// Safety invariants:
/// - Never follows symlinks below the root
/// - Only regular files are reported
/// - Bounded by `max_depth` (direct children of the root are depth 1)
#[derive(Debug, Clone)]
pub struct NativeWalkStrategy {
    threads: usize,
}

impl NativeWalkStrategy {
    #[must_use]
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }
}

impl DiscoveryStrategy for NativeWalkStrategy {
    fn name(&self) -> &'static str {
        "native-walk"
    }

    fn discover(&self, request: &ScanRequest<'_>) -> Result<Discovered> {
        match fs::metadata(request.root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(Discovered::default()),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Discovered::default()),
            Err(err) => {
                return Err(SweepError::Discovery {
                    strategy: self.name(),
                    details: format!("cannot stat {}: {err}", request.root.display()),
                });
            }
        }
        // Surface an unreadable root as a strategy failure; deeper unreadable
        // directories are skipped silently.
        if let Err(err) = fs::read_dir(request.root) {
            return Err(SweepError::Discovery {
                strategy: self.name(),
                details: format!("cannot read {}: {err}", request.root.display()),
            });
        }

        let (work_tx, work_rx) = channel::unbounded::<WorkItem>();
        let (result_tx, result_rx) = channel::unbounded::<PathBuf>();
        let in_flight = AtomicUsize::new(1);
        work_tx
            .send((request.root.to_path_buf(), 0))
            .map_err(|_| SweepError::ChannelClosed {
                component: "native-walk",
            })?;

        thread::scope(|scope| {
            for _ in 0..self.threads {
                let work_rx = work_rx.clone();
                let work_tx = work_tx.clone();
                let result_tx = result_tx.clone();
                let in_flight = &in_flight;
                scope.spawn(move || {
                    walker_thread(&work_rx, &work_tx, &result_tx, in_flight, request);
                });
            }
        });
        drop(result_tx);

        Ok(Discovered::from(result_rx.try_iter().collect::<Vec<_>>()))
    }
}

fn walker_thread(
    work_rx: &channel::Receiver<WorkItem>,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<PathBuf>,
    in_flight: &AtomicUsize,
    request: &ScanRequest<'_>,
) {
    loop {
        match work_rx.recv_timeout(Duration::from_millis(20)) {
            Ok((dir, depth)) => {
                process_directory(&dir, depth, work_tx, result_tx, in_flight, request);
                in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Read one directory: report matching files, queue subdirectories.
///
/// Children are counted into `in_flight` before this directory is released
/// by the caller, so the counter cannot touch zero while work remains.
fn process_directory(
    dir: &Path,
    depth: usize,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<PathBuf>,
    in_flight: &AtomicUsize,
    request: &ScanRequest<'_>,
) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let child_depth = depth + 1;
    let mut pending_children: Vec<PathBuf> = Vec::new();

    for entry in entries.flatten() {
        let Ok(ft) = entry.file_type() else {
            continue;
        };
        if ft.is_symlink() {
            continue;
        }
        if ft.is_file() {
            if request
                .matcher
                .matches_name(&entry.file_name().to_string_lossy())
            {
                let _ = result_tx.send(entry.path());
            }
        } else if ft.is_dir() && child_depth < request.max_depth {
            pending_children.push(entry.path());
        }
    }

    for child in pending_children {
        in_flight.fetch_add(1, Ordering::AcqRel);
        if work_tx.send((child, child_depth)).is_err() {
            in_flight.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
