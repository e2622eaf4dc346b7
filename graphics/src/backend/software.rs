//! Building blocks shared by the software devices.
//!
//! Both backends keep native objects in a handle-indexed store, count the work
//! they do, and can be told to fail specific calls so tests can exercise the
//! pipeline's error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{DrawRecord, NativeHandle};

/// Display modes reported by both software devices.
pub(crate) const DISPLAY_MODES: [(u32, u32); 6] = [
    (640, 480),
    (800, 600),
    (1024, 768),
    (1280, 720),
    (1920, 1080),
    (2560, 1440),
];

/// Category of native call that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Buffer, texture, view and state object creation.
    Allocation,
    /// Mapped writes and sub-data updates.
    Map,
    /// Back buffer recreation.
    BackBuffer,
    /// Draw submission.
    Draw,
    /// Present.
    Present,
}

impl FaultKind {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            FaultKind::Allocation => 0,
            FaultKind::Map => 1,
            FaultKind::BackBuffer => 2,
            FaultKind::Draw => 3,
            FaultKind::Present => 4,
        }
    }
}

/// Forces upcoming native calls to fail.
///
/// # Example
///
/// ```ignore
/// device.faults().fail_next(FaultKind::Allocation, 1);
/// ```
#[derive(Debug, Default)]
pub struct FaultInjector {
    remaining: [AtomicU32; FaultKind::COUNT],
}

impl FaultInjector {
    /// Make the next `count` calls of `kind` fail.
    pub fn fail_next(&self, kind: FaultKind, count: u32) {
        self.remaining[kind.index()].store(count, Ordering::SeqCst);
    }

    /// Cancel all pending failures.
    pub fn clear(&self) {
        for remaining in &self.remaining {
            remaining.store(0, Ordering::SeqCst);
        }
    }

    /// Number of pending failures of `kind`.
    pub fn pending(&self, kind: FaultKind) -> u32 {
        self.remaining[kind.index()].load(Ordering::SeqCst)
    }

    /// Consume one pending failure, returning whether the call must fail.
    pub(crate) fn trip(&self, kind: FaultKind) -> bool {
        self.remaining[kind.index()]
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Snapshot of a software device's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendStats {
    /// Native objects created.
    pub allocations: u64,
    /// Native objects destroyed.
    pub releases: u64,
    /// Native objects currently alive.
    pub live_objects: u64,
    /// Releases queued but not yet flushed.
    pub pending_releases: u64,
    /// Mapped writes and sub-data updates.
    pub writes: u64,
    /// Sampler objects created.
    pub samplers: u64,
    pub draws: u64,
    pub presents: u64,
    pub back_buffer_resizes: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub allocations: AtomicU64,
    pub releases: AtomicU64,
    pub writes: AtomicU64,
    pub samplers: AtomicU64,
    pub draws: AtomicU64,
    pub presents: AtomicU64,
    pub back_buffer_resizes: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, live_objects: usize, pending_releases: usize) -> BackendStats {
        BackendStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            live_objects: live_objects as u64,
            pending_releases: pending_releases as u64,
            writes: self.writes.load(Ordering::Relaxed),
            samplers: self.samplers.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            presents: self.presents.load(Ordering::Relaxed),
            back_buffer_resizes: self.back_buffer_resizes.load(Ordering::Relaxed),
        }
    }
}

/// Handle-indexed storage for a software device's native objects.
#[derive(Debug)]
pub(crate) struct ObjectStore<T> {
    next: AtomicU64,
    objects: Mutex<HashMap<NativeHandle, T>>,
    deferred: Mutex<Vec<NativeHandle>>,
}

impl<T> Default for ObjectStore<T> {
    fn default() -> Self {
        Self {
            // Zero is never handed out, matching null native handles.
            next: AtomicU64::new(1),
            objects: Mutex::new(HashMap::new()),
            deferred: Mutex::new(Vec::new()),
        }
    }
}

impl<T> ObjectStore<T> {
    pub fn insert(&self, object: T) -> NativeHandle {
        let handle = NativeHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.objects.lock().insert(handle, object);
        handle
    }

    pub fn contains(&self, handle: NativeHandle) -> bool {
        self.objects.lock().contains_key(&handle)
    }

    pub fn with<R>(&self, handle: NativeHandle, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.objects.lock().get(&handle).map(f)
    }

    pub fn with_mut<R>(&self, handle: NativeHandle, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.objects.lock().get_mut(&handle).map(f)
    }

    /// Destroy an object immediately. Returns false for unknown handles.
    pub fn remove(&self, handle: NativeHandle) -> bool {
        self.objects.lock().remove(&handle).is_some()
    }

    /// Queue an object for destruction at the next [`flush_deferred`](Self::flush_deferred).
    pub fn defer_remove(&self, handle: NativeHandle) {
        self.deferred.lock().push(handle);
    }

    /// Destroy every queued object, returning how many were destroyed.
    pub fn flush_deferred(&self) -> usize {
        let handles = std::mem::take(&mut *self.deferred.lock());
        let mut objects = self.objects.lock();
        handles
            .into_iter()
            .filter(|handle| objects.remove(handle).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn pending_len(&self) -> usize {
        self.deferred.lock().len()
    }
}

/// Ordered log of executed draws.
#[derive(Debug, Default)]
pub(crate) struct DrawLog {
    records: Mutex<Vec<DrawRecord>>,
}

impl DrawLog {
    pub fn push(&self, mut record: DrawRecord) {
        let mut records = self.records.lock();
        record.sequence = records.len() as u64;
        records.push(record);
    }

    pub fn snapshot(&self) -> Vec<DrawRecord> {
        self.records.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_injector_counts_down() {
        let faults = FaultInjector::default();
        assert!(!faults.trip(FaultKind::Map));

        faults.fail_next(FaultKind::Map, 2);
        assert_eq!(faults.pending(FaultKind::Map), 2);
        assert!(!faults.trip(FaultKind::Allocation));
        assert!(faults.trip(FaultKind::Map));
        assert!(faults.trip(FaultKind::Map));
        assert!(!faults.trip(FaultKind::Map));
    }

    #[test]
    fn test_fault_injector_clear() {
        let faults = FaultInjector::default();
        faults.fail_next(FaultKind::Present, 3);
        faults.clear();
        assert!(!faults.trip(FaultKind::Present));
    }

    #[test]
    fn test_object_store_deferred_removal() {
        let store = ObjectStore::<u32>::default();
        let a = store.insert(1);
        let b = store.insert(2);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);

        store.defer_remove(a);
        assert!(store.contains(a));
        assert_eq!(store.pending_len(), 1);
        assert_eq!(store.flush_deferred(), 1);
        assert!(!store.contains(a));
        assert!(store.remove(b));
        assert!(!store.remove(b));
    }
}
