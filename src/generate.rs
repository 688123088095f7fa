use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Sender};
use log::info;
use rayon::ThreadPoolBuilder;

use crate::cancel::{process_or_done, report_on_interval, CancelToken};
use crate::error::DiskTestError;
use crate::planner::PathPlanner;
use crate::recorder::Recorder;
use crate::sizing;
use crate::writer;

/// Below this volume a run is expected to finish well inside one
/// reporting interval; spawning the once-a-minute progress thread for it
/// would be pure overhead that never gets to report anything (spec
/// §4.6's "when ... the run is non-trivial" guard).
const PROGRESS_REPORT_MIN_VOLUME: u64 = sizing::SMALL_RANGE.min;

/// Runs the generation pipeline to completion: plans a directory tree
/// under `volume` bytes rooted at `root`, writes every file with
/// `workers` concurrent writers, and (if `recorder` is given) records
/// each file's hash and prints progress once a minute.
///
/// Blocks until the Path Planner has exhausted its budget and every
/// writer has exited, or until `cancel` is observed.
pub fn run(
    root: PathBuf,
    volume: u64,
    workers: usize,
    recorder: Option<Arc<dyn Recorder>>,
    cancel: CancelToken,
    error_tx: Sender<DiskTestError>,
) {
    let workers = workers.max(1);
    info!("generating using {} concurrent writers", workers);

    // Bounded: the planner blocks once writers are saturated (spec's
    // planner/writer backpressure contract).
    let (work_tx, work_rx) = bounded(workers);
    let (done_tx, done_rx) = unbounded();

    let planner_cancel = cancel.clone();
    let planner_handle = thread::spawn(move || {
        let planner = PathPlanner::new(root, volume);
        for item in planner {
            if planner_cancel.is_cancelled() {
                break;
            }
            if work_tx.send(item).is_err() {
                break;
            }
        }
        // dropping work_tx here closes the channel once the planner is done
    });

    let writer_pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("disktest-writer-{}", i))
        .build()
        .expect("build writer thread pool");

    // done_rx closes once every writer's clone of done_tx has dropped,
    // which happens as each writer thread below exits.
    let join_handle = thread::spawn(move || {
        writer_pool.install(|| {
            let mut writer_handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let rx = work_rx.clone();
                let tx = done_tx.clone();
                let cancel = cancel.clone();
                let error_tx = error_tx.clone();
                writer_handles.push(thread::spawn(move || {
                    for mut item in process_or_done(rx, cancel.clone()) {
                        match writer::write(item.size, &item.path, &cancel) {
                            Ok(hash) => {
                                item.hash = hash;
                                if tx.send(item).is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                log::error!(
                                    "error while generating {}: {}",
                                    item.path.display(),
                                    err
                                );
                                let _ = error_tx.send(err);
                            }
                        }
                    }
                }));
            }
            for h in writer_handles {
                let _ = h.join();
            }
        });
    });

    match recorder {
        Some(recorder) => {
            let progress = (volume >= PROGRESS_REPORT_MIN_VOLUME).then(|| {
                let progress_recorder = recorder.clone();
                let progress_cancel = cancel.clone();
                let finished = Arc::new(AtomicBool::new(false));
                let progress_finished = finished.clone();
                let handle = thread::spawn(move || {
                    report_on_interval(&progress_finished, &progress_cancel, Duration::from_secs(60), || {
                        match progress_recorder.total_unmarked() {
                            Ok(generated) => {
                                let pct = (generated as f64 * 100.0) / volume.max(1) as f64;
                                info!("generation: {:.3}% done", pct);
                            }
                            Err(e) => log::error!("{}", e),
                        }
                    });
                });
                (handle, finished)
            });

            for item in process_or_done(done_rx, cancel.clone()) {
                if let Err(err) = recorder.record(item.into_record()) {
                    log::error!("{}", err);
                    let _ = error_tx.send(err);
                    break;
                }
            }

            if let Some((handle, finished)) = progress {
                finished.store(true, Ordering::SeqCst);
                let _ = handle.join();
            }
        }
        None => {
            let processed = Arc::new(AtomicU64::new(0));
            for item in process_or_done(done_rx, cancel.clone()) {
                let total = processed.fetch_add(item.size, Ordering::SeqCst) + item.size;
                let pct = (total as f64 * 100.0) / volume.max(1) as f64;
                println!(
                    "generated: {} ({} bytes). {:.3}% done.",
                    item.path.display(),
                    item.size,
                    pct
                );
            }
        }
    }

    let _ = planner_handle.join();
    let _ = join_handle.join();
}
