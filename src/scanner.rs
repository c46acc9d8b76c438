// Candidate discovery and the polling loop.
//
// A `CandidateSource` yields every file that might need uploading;
// `Poller` drains it once per tick and feeds each task to the
// `Uploader`. The only source shipped is `TreeWalk`, a full recursive
// rescan of the upload directory.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, error};
use walkdir::WalkDir;

use crate::error::{Result, UploadError};
use crate::ledger::Ledger;
use crate::uploader::{Disposition, Uploader};

/// One file discovered during a scan, pending disposition.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub path: PathBuf,
    pub discovered_at: DateTime<Local>,
}

impl UploadTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UploadTask {
            path: path.into(),
            discovered_at: Local::now(),
        }
    }
}

/// Produces the candidate files of one tick.
pub trait CandidateSource {
    /// Call `visit` for each candidate, in order. An error ends the batch;
    /// candidates already visited stay dispositioned.
    fn for_each_candidate(&mut self, visit: &mut dyn FnMut(UploadTask)) -> Result<()>;
}

/// Depth-first walk of a directory tree, siblings in file-name order.
#[derive(Debug, Clone)]
pub struct TreeWalk {
    root: PathBuf,
}

impl TreeWalk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TreeWalk { root: root.into() }
    }

    fn absolute_root(&self) -> Result<PathBuf> {
        if self.root.is_absolute() {
            return Ok(self.root.clone());
        }
        let cwd = std::env::current_dir().map_err(|e| UploadError::io(&self.root, e))?;
        Ok(cwd.join(&self.root))
    }
}

impl CandidateSource for TreeWalk {
    fn for_each_candidate(&mut self, visit: &mut dyn FnMut(UploadTask)) -> Result<()> {
        let root = self.absolute_root()?;
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            visit(UploadTask::new(entry.into_path()));
        }
        Ok(())
    }
}

/// Per-disposition counts for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub discovered: usize,
    pub skipped: usize,
    pub recorded: usize,
    pub unrecorded: usize,
    pub rejected: usize,
    pub dropped: usize,
    /// The walk stopped early on an error.
    pub aborted: bool,
}

impl TickReport {
    fn tally(&mut self, disposition: Disposition) {
        self.discovered += 1;
        match disposition {
            Disposition::Skipped => self.skipped += 1,
            Disposition::Recorded => self.recorded += 1,
            Disposition::Unrecorded => self.unrecorded += 1,
            Disposition::Rejected(_) => self.rejected += 1,
            Disposition::Dropped => self.dropped += 1,
        }
    }

    /// Number of files a request was sent (or attempted) for.
    pub fn attempted(&self) -> usize {
        self.discovered - self.skipped
    }
}

/// Fixed-interval scan-and-upload loop.
pub struct Poller<S, L> {
    source: S,
    uploader: Uploader<L>,
    interval: Duration,
}

impl<S: CandidateSource, L: Ledger> Poller<S, L> {
    pub fn new(source: S, uploader: Uploader<L>, interval: Duration) -> Self {
        Poller {
            source,
            uploader,
            interval,
        }
    }

    /// One full scan: every candidate is dispositioned before this returns.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let uploader = &self.uploader;

        let walked = self.source.for_each_candidate(&mut |task| {
            report.tally(uploader.process(&task));
        });

        if let Err(e) = walked {
            error!("{}", e);
            report.aborted = true;
        }
        report
    }

    /// Tick, sleep, repeat. Runs until the process is killed.
    pub fn run(&mut self) -> ! {
        loop {
            let report = self.tick();
            debug!(
                discovered = report.discovered,
                recorded = report.recorded,
                rejected = report.rejected,
                dropped = report.dropped,
                "Scan finished"
            );
            thread::sleep(self.interval);
        }
    }
}
