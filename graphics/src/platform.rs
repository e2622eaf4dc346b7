//! Platform collaborators.
//!
//! The device never talks to a window system directly. It reads the surface
//! size and vsync interval from a [`PlatformHost`], and runs closures posted
//! from other threads through a [`WorkQueue`] once per frame.

use std::collections::VecDeque;

use parking_lot::{Mutex, RwLock};
use tessera_core::math::Size2;

/// Window or surface provider.
pub trait PlatformHost: Send + Sync {
    /// Current drawable size of the surface.
    fn surface_size(&self) -> Size2;

    /// Number of vertical blanks to wait for when vsync is enabled.
    fn vsync_interval(&self) -> u32 {
        1
    }
}

/// Host without a window, for tests and offline tools.
#[derive(Debug)]
pub struct HeadlessHost {
    size: RwLock<Size2>,
}

impl HeadlessHost {
    pub fn new(size: Size2) -> Self {
        Self {
            size: RwLock::new(size),
        }
    }

    /// Change the reported surface size.
    ///
    /// The device is not notified; pass the new size to
    /// [`RenderDevice::on_size_change`](crate::RenderDevice::on_size_change).
    pub fn set_size(&self, size: Size2) {
        *self.size.write() = size;
    }
}

impl PlatformHost for HeadlessHost {
    fn surface_size(&self) -> Size2 {
        *self.size.read()
    }
}

type Task = Box<dyn FnOnce() + Send>;

/// Thread-safe queue of closures executed on the render thread.
#[derive(Default)]
pub struct WorkQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a closure for the next frame.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.lock().push_back(Box::new(task));
    }

    /// Number of queued closures.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Run every queued closure in submission order, returning how many ran.
    ///
    /// The queue lock is released before the closures run, so a closure may
    /// submit more work; that work runs on the next call.
    pub fn execute_all(&self) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("pending", &self.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(HeadlessHost: Send, Sync);
static_assertions::assert_impl_all!(WorkQueue: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_headless_host_size() {
        let host = HeadlessHost::new(Size2::new(800.0, 600.0));
        assert_eq!(host.surface_size(), Size2::new(800.0, 600.0));
        host.set_size(Size2::new(1024.0, 768.0));
        assert_eq!(host.surface_size(), Size2::new(1024.0, 768.0));
        assert_eq!(host.vsync_interval(), 1);
    }

    #[test]
    fn test_work_queue_runs_in_order() {
        let queue = WorkQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            queue.submit(move || log.lock().push(i));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.execute_all(), 3);
        assert!(queue.is_empty());
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_work_queue_reentrant_submit() {
        let queue = Arc::new(WorkQueue::new());
        let inner = Arc::clone(&queue);
        queue.submit(move || inner.submit(|| {}));
        assert_eq!(queue.execute_all(), 1);
        assert_eq!(queue.len(), 1);
    }
}
