//! Bounded worker pools.
//!
//! Files are processed by an outer pool and the entries of one file by an
//! inner pool. Both pools are fixed-size tokio tasks pulling from a shared job
//! queue and pushing to a bounded result queue. The result queue closes when
//! the last worker drops its sender, which ends the consumer loop.
//!
//! A translator outage sets an abort flag: no new jobs are scheduled, in-flight
//! jobs drain and the outage is reported to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use crate::block::{PatchEntry, Pipeline};
use crate::mt::{MtError, MtResult};
use crate::patch::{PatchError, PatchFile};

/// Knobs for one run over a set of files.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub file_workers: usize,
    pub block_workers: usize,
    /// `None` uses the engine default of each file.
    pub line_length: Option<usize>,
    pub tolerance: usize,
    /// Translate but leave the files on disk untouched.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            file_workers: 1,
            block_workers: 1,
            line_length: None,
            tolerance: 5,
            dry_run: false,
        }
    }
}

/// Why a single file was not translated.
#[derive(Debug)]
pub enum FileError {
    Patch(PatchError),
    Translation(MtError),
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileError::Patch(e) => write!(f, "{}", e),
            FileError::Translation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FileError {}

impl From<PatchError> for FileError {
    fn from(e: PatchError) -> Self {
        FileError::Patch(e)
    }
}

impl From<MtError> for FileError {
    fn from(e: MtError) -> Self {
        FileError::Translation(e)
    }
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Number of units translated in this run.
    pub result: Result<usize, FileError>,
}

/// Totals for a finished run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: usize,
    pub translated_units: usize,
    pub failed: Vec<(PathBuf, FileError)>,
    /// Set when the run was cut short by a translator outage.
    pub fatal: Option<MtError>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.fatal.is_none()
    }
}

/// Translates every entry of `patch` on `workers` concurrent tasks.
///
/// Entry order is preserved regardless of completion order. Returns the first
/// outage seen; other per-entry problems never surface here.
pub async fn translate_patch(
    pipeline: Arc<Pipeline>,
    mut patch: PatchFile,
    workers: usize,
) -> MtResult<PatchFile> {
    let count = patch.entries.len();
    let engine = patch.engine;
    let workers = workers.clamp(1, count.max(1));

    let (job_tx, job_rx) = mpsc::channel::<(usize, PatchEntry)>(workers);
    let (result_tx, mut result_rx) = mpsc::channel::<(usize, MtResult<PatchEntry>)>(workers);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let abort = Arc::new(AtomicBool::new(false));

    for _ in 0..workers {
        let pipeline = Arc::clone(&pipeline);
        let job_rx = Arc::clone(&job_rx);
        let result_tx = result_tx.clone();
        let abort = Arc::clone(&abort);

        tokio::spawn(async move {
            loop {
                let job = job_rx.lock().await.recv().await;
                let Some((index, entry)) = job else { break };
                if abort.load(Ordering::SeqCst) {
                    break;
                }

                let result = pipeline.translate_entry(entry, engine).await;
                if matches!(&result, Err(e) if e.is_fatal()) {
                    abort.store(true, Ordering::SeqCst);
                }
                if result_tx.send((index, result)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(result_tx);

    let entries = std::mem::take(&mut patch.entries);
    let producer_abort = Arc::clone(&abort);
    tokio::spawn(async move {
        for job in entries.into_iter().enumerate() {
            if producer_abort.load(Ordering::SeqCst) || job_tx.send(job).await.is_err() {
                break;
            }
        }
    });

    let mut slots: Vec<Option<PatchEntry>> = vec![None; count];
    let mut outage = None;

    while let Some((index, result)) = result_rx.recv().await {
        match result {
            Ok(entry) => slots[index] = Some(entry),
            Err(e) => {
                if outage.is_none() {
                    outage = Some(e);
                }
            }
        }
    }

    if let Some(e) = outage {
        return Err(e);
    }

    patch.entries = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| MtError::Other(format!("{}: lost entries", patch.path.display())))?;

    Ok(patch)
}

/// Loads, translates and writes back one file.
pub async fn process_file(
    pipeline: Arc<Pipeline>,
    path: &Path,
    options: &RunOptions,
) -> Result<usize, FileError> {
    let patch = PatchFile::load(path).await?;
    let engine = patch.engine;
    debug!(
        "{}: {} entries, {} units ({})",
        path.display(),
        patch.entries.len(),
        patch.unit_count(),
        engine
    );

    let patch = translate_patch(pipeline, patch, options.block_workers).await?;
    let touched = patch
        .entries
        .iter()
        .flat_map(|e| &e.units)
        .filter(|u| u.touched)
        .count();

    if options.dry_run {
        debug!("Dry run, not writing {}", path.display());
    } else {
        let line_length = options
            .line_length
            .unwrap_or_else(|| engine.default_line_length());
        patch.save(line_length, options.tolerance).await?;
    }

    Ok(touched)
}

/// Runs `files` through the outer pool.
///
/// A file with a container error is reported and skipped. A translator outage
/// stops scheduling and is returned in [`RunSummary::fatal`].
pub async fn run_files(pipeline: Arc<Pipeline>, files: Vec<PathBuf>, options: RunOptions) -> RunSummary {
    let workers = options.file_workers.clamp(1, files.len().max(1));
    let options = Arc::new(options);

    let (job_tx, job_rx) = mpsc::channel::<PathBuf>(workers);
    let (result_tx, mut result_rx) = mpsc::channel::<FileOutcome>(workers);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let abort = Arc::new(AtomicBool::new(false));

    for _ in 0..workers {
        let pipeline = Arc::clone(&pipeline);
        let job_rx = Arc::clone(&job_rx);
        let result_tx = result_tx.clone();
        let abort = Arc::clone(&abort);
        let options = Arc::clone(&options);

        tokio::spawn(async move {
            loop {
                let job = job_rx.lock().await.recv().await;
                let Some(path) = job else { break };
                if abort.load(Ordering::SeqCst) {
                    break;
                }

                let result = process_file(Arc::clone(&pipeline), &path, &options).await;
                if matches!(&result, Err(FileError::Translation(e)) if e.is_fatal()) {
                    abort.store(true, Ordering::SeqCst);
                }
                if result_tx.send(FileOutcome { path, result }).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(result_tx);

    let producer_abort = Arc::clone(&abort);
    tokio::spawn(async move {
        for file in files {
            if producer_abort.load(Ordering::SeqCst) || job_tx.send(file).await.is_err() {
                break;
            }
        }
    });

    let mut summary = RunSummary::default();

    while let Some(outcome) = result_rx.recv().await {
        summary.files += 1;
        match outcome.result {
            Ok(units) => {
                info!("{}: translated {} units", outcome.path.display(), units);
                summary.translated_units += units;
            }
            Err(FileError::Translation(e)) if e.is_fatal() => {
                error!("{}: {}", outcome.path.display(), e);
                if summary.fatal.is_none() {
                    summary.fatal = Some(e);
                }
            }
            Err(e) => {
                error!("{}, skipping file", e);
                summary.failed.push((outcome.path, e));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::mt::{MockMode, MockTranslator};

    fn pipeline(mock: &MockTranslator) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(Arc::new(mock.clone()), Dictionary::new()))
    }

    fn patch_text(lines: &[&str]) -> String {
        let mut out = String::from("> RPGMAKER TRANS PATCH FILE VERSION 3.2\n");
        for (i, line) in lines.iter().enumerate() {
            out.push_str(&format!(
                "> BEGIN STRING\n{}\n> CONTEXT: Map001/events/{}/pages/0/Dialogue < UNTRANSLATED\n\n> END STRING\n\n",
                line, i
            ));
        }
        out
    }

    // ========== Inner Pool Tests ==========

    #[tokio::test]
    async fn test_translate_patch_keeps_order() {
        let mock = MockTranslator::with_delay(MockMode::Suffix, 5);
        let lines = ["一", "二", "三", "四", "五", "六", "七", "八", "九", "十"];
        let patch = PatchFile::parse(Path::new("Test.txt"), &patch_text(&lines)).unwrap();

        let patch = translate_patch(pipeline(&mock), patch, 4).await.unwrap();

        assert_eq!(patch.entries.len(), lines.len());
        for (entry, line) in patch.entries.iter().zip(lines) {
            assert_eq!(entry.original, format!("{}\n", line));
            assert_eq!(entry.units[0].translated_text, format!("{}_en", line));
        }
        assert_eq!(mock.calls(), lines.len());
    }

    #[tokio::test]
    async fn test_translate_patch_empty_file() {
        let mock = MockTranslator::new(MockMode::Suffix);
        let patch = PatchFile::parse(Path::new("Test.txt"), &patch_text(&[])).unwrap();
        let patch = translate_patch(pipeline(&mock), patch, 4).await.unwrap();
        assert!(patch.entries.is_empty());
    }

    #[tokio::test]
    async fn test_translate_patch_outage_is_fatal() {
        let mock = MockTranslator::new(MockMode::Unavailable);
        let patch = PatchFile::parse(Path::new("Test.txt"), &patch_text(&["一", "二", "三"])).unwrap();

        let err = translate_patch(pipeline(&mock), patch, 2).await.unwrap_err();
        assert!(err.is_fatal());
    }

    // ========== Outer Pool Tests ==========

    #[tokio::test]
    async fn test_run_files_writes_translations() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("Map001.txt");
        let second = dir.path().join("Map002.txt");
        std::fs::write(&first, patch_text(&["一"])).unwrap();
        std::fs::write(&second, patch_text(&["二", "三"])).unwrap();

        let mock = MockTranslator::new(MockMode::Suffix);
        let options = RunOptions {
            file_workers: 2,
            block_workers: 2,
            ..Default::default()
        };
        let summary = run_files(pipeline(&mock), vec![first.clone(), second], options).await;

        assert!(summary.is_success());
        assert_eq!(summary.files, 2);
        assert_eq!(summary.translated_units, 3);

        let written = std::fs::read_to_string(&first).unwrap();
        assert!(written.contains("> CONTEXT: Map001/events/0/pages/0/Dialogue\n一_en\n"));
    }

    #[tokio::test]
    async fn test_run_files_skips_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Good.txt");
        let bad = dir.path().join("Bad.txt");
        std::fs::write(&good, patch_text(&["一"])).unwrap();
        std::fs::write(&bad, "not a patch\n").unwrap();

        let mock = MockTranslator::new(MockMode::Suffix);
        let summary = run_files(pipeline(&mock), vec![bad.clone(), good], RunOptions::default()).await;

        assert_eq!(summary.files, 2);
        assert_eq!(summary.translated_units, 1);
        assert!(summary.fatal.is_none());
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, bad);
        assert_eq!(std::fs::read_to_string(&bad).unwrap(), "not a patch\n");
    }

    #[tokio::test]
    async fn test_run_files_dry_run_leaves_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Map001.txt");
        let original = patch_text(&["一"]);
        std::fs::write(&path, &original).unwrap();

        let mock = MockTranslator::new(MockMode::Suffix);
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = run_files(pipeline(&mock), vec![path.clone()], options).await;

        assert_eq!(summary.translated_units, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_run_files_stops_on_outage() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..6)
            .map(|i| {
                let path = dir.path().join(format!("Map{:03}.txt", i));
                std::fs::write(&path, patch_text(&["一"])).unwrap();
                path
            })
            .collect();

        let mock = MockTranslator::new(MockMode::Unavailable);
        let summary = run_files(pipeline(&mock), files, RunOptions::default()).await;

        assert!(summary.fatal.is_some());
        assert!(!summary.is_success());
        // One worker: the outage in the first file stops the rest
        assert_eq!(summary.files, 1);
    }
}
