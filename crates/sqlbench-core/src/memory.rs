//! Process memory snapshots.
//!
//! Resident and virtual sizes come from `sysinfo`. Live heap bytes come from
//! [`CountingAllocator`], which a binary installs as its global allocator.
//! Without it the heap-used counter stays at zero and its delta is zero.

use std::alloc::{GlobalAlloc, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{Error, Result};

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Bytes currently allocated through [`CountingAllocator`].
pub fn allocated_bytes() -> usize {
    LIVE_BYTES.load(Ordering::Relaxed)
}

/// Global allocator wrapper that tracks live heap bytes.
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: CountingAllocator<mimalloc::MiMalloc> = CountingAllocator::new(mimalloc::MiMalloc);
/// ```
pub struct CountingAllocator<A> {
    inner: A,
}

impl<A> CountingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        LIVE_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                LIVE_BYTES.fetch_add(new_size - layout.size(), Ordering::Relaxed);
            } else {
                LIVE_BYTES.fetch_sub(layout.size() - new_size, Ordering::Relaxed);
            }
        }
        new_ptr
    }
}

/// Absolute memory figures at one instant, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    /// Resident set size.
    pub rss: u64,
    /// Total virtual memory reserved by the process.
    pub heap_total: u64,
    /// Live heap bytes seen by the counting allocator.
    pub heap_used: u64,
}

/// Signed memory change between two snapshots. Negative values are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss: i64,
    pub heap_total: i64,
    pub heap_used: i64,
}

impl MemoryUsage {
    /// `end - start` for every field.
    pub fn between(start: &MemorySnapshot, end: &MemorySnapshot) -> Self {
        Self {
            rss: signed_delta(start.rss, end.rss),
            heap_total: signed_delta(start.heap_total, end.heap_total),
            heap_used: signed_delta(start.heap_used, end.heap_used),
        }
    }
}

fn signed_delta(start: u64, end: u64) -> i64 {
    (end as i128 - start as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Source of memory snapshots for the measurement engine.
pub trait MemoryProbe: Send {
    fn snapshot(&mut self) -> Result<MemorySnapshot>;
}

/// Probe reading the current process through `sysinfo`.
pub struct ProcessMemory {
    system: System,
    pid: Pid,
}

impl ProcessMemory {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| Error::MemoryProbe(e.to_string()))?;
        Ok(Self {
            system: System::new(),
            pid,
        })
    }
}

impl MemoryProbe for ProcessMemory {
    fn snapshot(&mut self) -> Result<MemorySnapshot> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::new().with_memory(),
        );
        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| Error::MemoryProbe(format!("process {} not visible", self.pid)))?;

        Ok(MemorySnapshot {
            rss: process.memory(),
            heap_total: process.virtual_memory(),
            heap_used: allocated_bytes() as u64,
        })
    }
}
