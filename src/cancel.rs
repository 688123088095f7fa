use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::info;

use crate::error::DiskTestError;

/// Process-wide cancellation signal. Every blocking operation
/// (channel send/recv, filesystem I/O) pairs with a check of this token;
/// cancellation is observed no later than the current in-flight block
/// write or filesystem call completes.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), DiskTestError> {
        if self.is_cancelled() {
            Err(DiskTestError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Install a Ctrl+C handler that flips this token. Grounded on
    /// `nefaxer`'s `setup_ctrlc_handler`: a single process-wide signal
    /// handler that stores into an `Arc<AtomicBool>` shared with every
    /// consumer of this token.
    pub fn install_ctrlc_handler(&self) -> anyhow::Result<()> {
        let flag = self.flag.clone();
        ctrlc::set_handler(move || {
            info!("received interrupt, cancelling");
            flag.store(true, Ordering::SeqCst);
        })?;
        Ok(())
    }
}

/// The cancellation-aware forwarder: relays items from
/// `rx` unchanged until either the channel closes or `cancel` is
/// requested, in which case it stops forwarding without draining the
/// channel. Every stage consumes its upstream channel through this
/// rather than open-coding a cancellation check around a raw `recv`.
pub fn process_or_done<T>(rx: Receiver<T>, cancel: CancelToken) -> impl Iterator<Item = T> {
    std::iter::from_fn(move || {
        if cancel.is_cancelled() {
            return None;
        }
        loop {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(item) => return Some(item),
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    })
}

/// Granularity at which `report_on_interval` re-checks `finished`/`cancel`
/// while waiting out one `interval`. Matches `process_or_done`'s own poll
/// granularity so a normal completion or a cancellation is observed
/// within a fraction of a second rather than sleeping out the full
/// interval, the way a `select` on an exit channel would in the source.
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs `tick` once per `interval` of elapsed wall-clock time, but wakes
/// and returns immediately (within one poll) once `finished` is set or
/// `cancel` fires. Used by both pipelines' once-a-minute progress
/// reporters so shutdown never has to wait out a stale sleep.
pub fn report_on_interval(
    finished: &AtomicBool,
    cancel: &CancelToken,
    interval: Duration,
    mut tick: impl FnMut(),
) {
    let mut elapsed = Duration::ZERO;
    loop {
        if finished.load(Ordering::SeqCst) || cancel.is_cancelled() {
            return;
        }
        thread::sleep(PROGRESS_POLL_INTERVAL);
        elapsed += PROGRESS_POLL_INTERVAL;
        if finished.load(Ordering::SeqCst) || cancel.is_cancelled() {
            return;
        }
        if elapsed >= interval {
            tick();
            elapsed = Duration::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn forwards_until_channel_closes() {
        let (tx, rx) = crossbeam_channel::unbounded::<i32>();
        let cancel = CancelToken::new();
        thread::spawn(move || {
            for i in 0..5 {
                tx.send(i).unwrap();
            }
        });
        let items: Vec<i32> = process_or_done(rx, cancel).collect();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn stops_forwarding_once_cancelled() {
        let (tx, rx) = crossbeam_channel::unbounded::<i32>();
        let cancel = CancelToken::new();
        cancel.cancel();
        tx.send(1).unwrap();
        let items: Vec<i32> = process_or_done(rx, cancel).collect();
        assert!(items.is_empty());
    }

    #[test]
    fn check_reports_cancelled_error() {
        let cancel = CancelToken::new();
        assert!(cancel.check().is_ok());
        cancel.cancel();
        match cancel.check() {
            Err(DiskTestError::Cancelled) => {}
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[test]
    fn report_on_interval_returns_promptly_once_finished() {
        let finished = AtomicBool::new(false);
        let cancel = CancelToken::new();
        finished.store(true, Ordering::SeqCst);

        let start = std::time::Instant::now();
        report_on_interval(&finished, &cancel, Duration::from_secs(60), || {
            panic!("tick must not fire once finished is set before the first poll");
        });
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn report_on_interval_returns_promptly_once_cancelled() {
        let finished = AtomicBool::new(false);
        let cancel = CancelToken::new();
        cancel.cancel();

        let start = std::time::Instant::now();
        report_on_interval(&finished, &cancel, Duration::from_secs(60), || {
            panic!("tick must not fire once cancelled before the first poll");
        });
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn report_on_interval_ticks_then_stops_when_finished_mid_wait() {
        let finished = Arc::new(AtomicBool::new(false));
        let cancel = CancelToken::new();
        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let stopper_finished = finished.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stopper_finished.store(true, Ordering::SeqCst);
        });

        let start = std::time::Instant::now();
        let ticks_clone = ticks.clone();
        report_on_interval(&finished, &cancel, Duration::from_millis(30), move || {
            ticks_clone.fetch_add(1, Ordering::SeqCst);
        });
        stopper.join().unwrap();

        // Finishes promptly (well under the 60s production interval) rather
        // than sleeping out a full tick after the stopper fires.
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
