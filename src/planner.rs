use std::path::PathBuf;

use crate::model::{FolderFrame, WorkItem};
use crate::queue::FifoQueue;
use crate::sizing::SizeBudget;

/// Files emitted per folder before descending into its children.
pub const FILES_PER_FOLDER: u32 = 500;
/// Child folders scheduled per folder once it has been drained.
pub const SUBFOLDERS_PER_FOLDER: u32 = 10;

/// Lazily produces `(path, size)` work items summing to approximately the
/// requested volume budget, obeying the per-folder fanout rules below.
/// A single owner (this planner) drives the internal `FifoQueue` of
/// `FolderFrame`s; it is not meant to be shared across threads.
pub struct PathPlanner {
    queue: FifoQueue<FolderFrame>,
    budget: SizeBudget,
    volume_remaining: u64,
    current: Option<FolderFrame>,
    round_idx: usize,
    round_emitted: bool,
}

impl PathPlanner {
    pub fn new(root: PathBuf, volume: u64) -> Self {
        let mut queue = FifoQueue::new();
        queue
            .enqueue(Some(FolderFrame::new(root, FILES_PER_FOLDER)))
            .expect("root frame is never absent");

        Self {
            queue,
            budget: SizeBudget::for_volume(volume),
            volume_remaining: volume,
            current: None,
            round_idx: 0,
            round_emitted: false,
        }
    }

    fn schedule_children(&mut self, base: &std::path::Path) {
        for i in 0..SUBFOLDERS_PER_FOLDER {
            let child = base.join(format!("subfolder_{}.tmp", i));
            self.queue
                .enqueue(Some(FolderFrame::new(child, FILES_PER_FOLDER)))
                .expect("child frame is never absent");
        }
    }
}

impl Iterator for PathPlanner {
    type Item = WorkItem;

    fn next(&mut self) -> Option<WorkItem> {
        loop {
            if self.volume_remaining == 0 {
                return None;
            }

            if self.current.is_none() {
                if self.queue.is_empty() {
                    return None;
                }
                self.current = self.queue.dequeue().ok();
                self.round_idx = 0;
                self.round_emitted = false;
            }

            let frame_done = matches!(&self.current, Some(f) if f.remaining_files == 0);
            if frame_done {
                let frame = self.current.take().unwrap();
                if self.volume_remaining > 0 {
                    self.schedule_children(&frame.base_path);
                }
                continue;
            }

            if self.round_idx < 3 {
                let class_idx = self.round_idx;
                self.round_idx += 1;

                let class = &mut self.budget.classes_mut()[class_idx];
                let drawn = class.try_draw(self.volume_remaining);
                let Some(size) = drawn else {
                    continue;
                };

                let frame = self.current.as_mut().unwrap();
                let path = frame
                    .base_path
                    .join(format!("file_{}.tmp", frame.remaining_files));
                frame.remaining_files -= 1;
                self.volume_remaining -= size;
                self.round_emitted = true;
                return Some(WorkItem::new(path, size));
            }

            // A full round (large, medium, small) visited nothing: the
            // tail corner case: emits exactly one file sized
            // to whatever volume remains and zeroes it out.
            if !self.round_emitted && self.volume_remaining > 0 {
                let size = self.volume_remaining;
                let frame = self.current.as_mut().unwrap();
                let path = frame
                    .base_path
                    .join(format!("file_{}.tmp", frame.remaining_files));
                frame.remaining_files -= 1;
                self.volume_remaining = 0;
                return Some(WorkItem::new(path, size));
            }

            self.round_idx = 0;
            self.round_emitted = false;
        }
    }
}
