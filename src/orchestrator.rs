use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use log::warn;

use crate::cancel::CancelToken;
use crate::generate;
use crate::recorder::Recorder;
use crate::verify;

/// Sequences the two pipelines: generation (optional), then
/// verification (optional, strictly after generation). Returns `true`
/// iff nothing failed — no error was ever surfaced on the shared error
/// channel, and (when verification ran) every recorded file was found
/// again.
pub fn run(
    root: PathBuf,
    volume: u64,
    workers: usize,
    do_generate: bool,
    do_verify: bool,
    recorder: Option<Arc<dyn Recorder>>,
    cancel: CancelToken,
) -> bool {
    let (error_tx, error_rx) = unbounded();
    let errored = Arc::new(AtomicBool::new(false));
    let watcher_errored = errored.clone();
    let watcher_cancel = cancel.clone();
    let watcher_handle = thread::spawn(move || {
        for err in error_rx {
            log::error!("{}", err);
            watcher_errored.store(true, Ordering::SeqCst);
            watcher_cancel.cancel();
        }
    });

    if !do_generate && do_verify {
        warn!("no recorder configured, but verify requested");
    }

    if do_generate {
        generate::run(
            root.clone(),
            volume,
            workers,
            recorder.clone(),
            cancel.clone(),
            error_tx.clone(),
        );
    }

    if do_verify && !errored.load(Ordering::SeqCst) && !cancel.is_cancelled() {
        if let Some(recorder) = recorder {
            // verify::run's own return value ("everything matched") is a
            // success-with-warnings signal, not a process error (spec §7):
            // missing/differing files are logged, not surfaced here.
            let _ = verify::run(root, workers, recorder, cancel.clone(), error_tx.clone());
        }
    }

    drop(error_tx);
    let _ = watcher_handle.join();

    !errored.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::InMemRecorder;

    #[test]
    fn generate_then_verify_round_trip_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let recorder: Arc<dyn Recorder> = Arc::new(InMemRecorder::new());
        let cancel = CancelToken::new();

        let ok = run(
            dir.path().to_path_buf(),
            1_000_000,
            2,
            true,
            true,
            Some(recorder),
            cancel,
        );

        assert!(ok);
    }

    #[test]
    fn generate_only_skips_verification() {
        let dir = tempfile::tempdir().unwrap();
        let recorder: Arc<dyn Recorder> = Arc::new(InMemRecorder::new());
        let cancel = CancelToken::new();

        let ok = run(
            dir.path().to_path_buf(),
            500_000,
            1,
            true,
            false,
            Some(recorder.clone()),
            cancel,
        );

        assert!(ok);
        assert!(recorder.total_unmarked().unwrap() > 0);
    }

    #[test]
    fn deleting_one_file_before_verify_still_exits_success() {
        let dir = tempfile::tempdir().unwrap();
        let recorder: Arc<dyn Recorder> = Arc::new(InMemRecorder::new());
        let cancel = CancelToken::new();

        generate::run(
            dir.path().to_path_buf(),
            1_000_000,
            1,
            Some(recorder.clone()),
            cancel.clone(),
            unbounded().0,
        );

        let one_file = recorder
            .unmarked()
            .unwrap()
            .into_iter()
            .next()
            .expect("at least one file generated");
        std::fs::remove_file(&one_file.path).unwrap();

        let ok = run(
            dir.path().to_path_buf(),
            1_000_000,
            1,
            false,
            true,
            Some(recorder.clone()),
            cancel,
        );

        // verification itself exits success even with missing files
        // (warnings only); unmarked() must reflect the deleted file.
        assert!(ok);
        assert_eq!(recorder.unmarked().unwrap().len(), 1);
    }
}
