use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use log::{error, info, warn};
use rayon::ThreadPoolBuilder;
use walkdir::WalkDir;

use crate::buffer_pool::BufferPool;
use crate::cancel::{process_or_done, report_on_interval, CancelToken};
use crate::error::DiskTestError;
use crate::hash::hash_path_with_pool;
use crate::model::WorkItem;
use crate::recorder::Recorder;
use crate::sizing;

const VERIFY_BUFFER_SIZE: usize = 1 << 20;

/// Below this starting denominator a verification run is expected to
/// finish well inside one reporting interval; see
/// `generate::PROGRESS_REPORT_MIN_VOLUME` for the generation side of
/// the same guard (spec §4.7's "once a minute" reporter is meant for
/// runs long enough to need it).
const PROGRESS_REPORT_MIN_VOLUME: u64 = sizing::SMALL_RANGE.min;

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Runs the verification pipeline to completion: walks `root`,
/// rehashes every regular file, and marks it against `recorder`.
/// Returns `true` iff every previously recorded file was seen again
/// (i.e. `recorder.unmarked()` is empty once the walk finishes).
pub fn run(
    root: PathBuf,
    workers: usize,
    recorder: Arc<dyn Recorder>,
    cancel: CancelToken,
    error_tx: Sender<DiskTestError>,
) -> bool {
    let workers = workers.max(1);
    let (work_tx, work_rx) = bounded::<WorkItem>(workers);

    let walk_cancel = cancel.clone();
    let walk_error_tx = error_tx.clone();
    let walker_handle = thread::spawn(move || {
        let mut it = WalkDir::new(&root).into_iter();
        loop {
            if walk_cancel.is_cancelled() {
                break;
            }
            let entry = match it.next() {
                None => break,
                Some(Ok(e)) => e,
                Some(Err(e)) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    let err = DiskTestError::walk(path, &e);
                    error!("{}", err);
                    let _ = walk_error_tx.send(err);
                    break;
                }
            };

            let file_type = entry.file_type();
            let name = entry.file_name();
            if file_type.is_dir() {
                if entry.depth() > 0 && is_hidden(name) {
                    it.skip_current_dir();
                }
                continue;
            }
            if is_hidden(name) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    let path = entry.path().display().to_string();
                    let err = DiskTestError::walk(path, &e);
                    error!("{}", err);
                    let _ = walk_error_tx.send(err);
                    continue;
                }
            };

            let item = WorkItem::new(entry.path().to_path_buf(), size);
            if work_tx.send(item).is_err() {
                break;
            }
        }
    });
    drop(work_tx);

    let total_unmarked_at_start = recorder.total_unmarked().unwrap_or(0);
    let progress = (total_unmarked_at_start >= PROGRESS_REPORT_MIN_VOLUME).then(|| {
        let finished = Arc::new(AtomicBool::new(false));
        let progress_recorder = recorder.clone();
        let progress_finished = finished.clone();
        let progress_cancel = cancel.clone();
        let handle = thread::spawn(move || {
            report_on_interval(&progress_finished, &progress_cancel, Duration::from_secs(60), || {
                match progress_recorder.total_marked() {
                    Ok(marked) => {
                        let pct = (marked as f64 * 100.0) / total_unmarked_at_start.max(1) as f64;
                        info!("verification: {:.3}% done", pct);
                    }
                    Err(e) => error!("{}", e),
                }
            });
        });
        (handle, finished)
    });

    let pool = Arc::new(BufferPool::new(workers, VERIFY_BUFFER_SIZE));
    let verifier_pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("disktest-verifier-{}", i))
        .build()
        .expect("build verifier thread pool");

    verifier_pool.install(|| {
        let mut worker_handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = work_rx.clone();
            let cancel = cancel.clone();
            let recorder = recorder.clone();
            let pool = pool.clone();
            let error_tx = error_tx.clone();
            worker_handles.push(thread::spawn(move || {
                for item in process_or_done(rx, cancel.clone()) {
                    let hash = match hash_path_with_pool(&item.path, &pool) {
                        Ok(h) => h,
                        Err(e) => {
                            error!("{}", e);
                            let _ = error_tx.send(e);
                            continue;
                        }
                    };

                    match recorder.exists(&hash) {
                        Ok(true) => {
                            if let Err(e) = recorder.mark(&hash) {
                                error!("could not mark {} as existing: {}", item.path.display(), e);
                                let _ = error_tx.send(e);
                            }
                        }
                        Ok(false) => {
                            warn!("{} was not recorded previously", item.path.display());
                        }
                        Err(e) => {
                            error!("{}", e);
                            let _ = error_tx.send(e);
                        }
                    }
                }
            }));
        }
        for h in worker_handles {
            let _ = h.join();
        }
    });

    let _ = walker_handle.join();
    if let Some((handle, finished)) = progress {
        finished.store(true, Ordering::SeqCst);
        let _ = handle.join();
    }

    match recorder.unmarked() {
        Ok(remaining) if remaining.is_empty() => {
            info!("success: all files were read and verified");
            true
        }
        Ok(remaining) => {
            eprintln!("not all files were read/verified. missing files:");
            for file in &remaining {
                eprintln!("{}", file.path.display());
            }
            false
        }
        Err(e) => {
            error!("could not get missing files: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::InMemRecorder;
    use crossbeam_channel::unbounded;

    fn write_and_record(dir: &std::path::Path, name: &str, contents: &[u8], recorder: &InMemRecorder) {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        let pool = Arc::new(BufferPool::new(1, VERIFY_BUFFER_SIZE));
        let hash = hash_path_with_pool(&path, &pool).unwrap();
        recorder
            .record(crate::model::FileRecord::new(path, contents.len() as u64, hash))
            .unwrap();
    }

    #[test]
    fn verifying_every_recorded_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = InMemRecorder::new();
        write_and_record(dir.path(), "a.tmp", b"alpha", &recorder);
        write_and_record(dir.path(), "b.tmp", b"bravo", &recorder);

        let recorder: Arc<dyn Recorder> = Arc::new(recorder);
        let cancel = CancelToken::new();
        let (err_tx, err_rx) = unbounded();
        let ok = run(dir.path().to_path_buf(), 2, recorder.clone(), cancel, err_tx);

        assert!(ok);
        assert!(err_rx.try_recv().is_err());
        assert!(recorder.unmarked().unwrap().is_empty());
    }

    #[test]
    fn missing_file_leaves_one_record_unmarked() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = InMemRecorder::new();
        write_and_record(dir.path(), "a.tmp", b"alpha", &recorder);
        write_and_record(dir.path(), "b.tmp", b"bravo", &recorder);
        std::fs::remove_file(dir.path().join("b.tmp")).unwrap();

        let recorder: Arc<dyn Recorder> = Arc::new(recorder);
        let cancel = CancelToken::new();
        let (err_tx, _err_rx) = unbounded();
        let ok = run(dir.path().to_path_buf(), 1, recorder.clone(), cancel, err_tx);

        assert!(!ok);
        assert_eq!(recorder.unmarked().unwrap().len(), 1);
    }

    #[test]
    fn hidden_files_and_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = InMemRecorder::new();
        write_and_record(dir.path(), "visible.tmp", b"seen", &recorder);
        std::fs::write(dir.path().join(".hidden"), b"nope").unwrap();
        std::fs::create_dir(dir.path().join(".hiddendir")).unwrap();
        std::fs::write(dir.path().join(".hiddendir").join("inside.tmp"), b"nope").unwrap();

        let recorder: Arc<dyn Recorder> = Arc::new(recorder);
        let cancel = CancelToken::new();
        let (err_tx, _err_rx) = unbounded();
        let ok = run(dir.path().to_path_buf(), 1, recorder.clone(), cancel, err_tx);

        assert!(ok);
    }

    #[test]
    fn unrecorded_file_is_logged_but_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stray.tmp"), b"nobody recorded me").unwrap();

        let recorder: Arc<dyn Recorder> = Arc::new(InMemRecorder::new());
        let cancel = CancelToken::new();
        let (err_tx, err_rx) = unbounded();
        let ok = run(dir.path().to_path_buf(), 1, recorder, cancel, err_tx);

        assert!(ok);
        assert!(err_rx.try_recv().is_err());
    }
}
