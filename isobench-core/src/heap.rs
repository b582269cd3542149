//! Heap Collection Control
//!
//! Rust has no tracing collector, so "collect" returns freed allocator memory
//! to the OS and "suspend" stops the allocator from trimming on its own. On
//! glibc this maps to `malloc_trim` and `M_TRIM_THRESHOLD`; elsewhere the
//! calls are no-ops but keep their position in the trial sequence.

/// Hooks forced around every trial.
pub trait HeapControl {
    /// Release free heap memory immediately
    fn collect(&self);
    /// Stop automatic trimming until [`HeapControl::resume`]
    fn suspend(&self);
    /// Restore automatic trimming
    fn resume(&self);
}

/// Process allocator control
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHeap;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod glibc {
    /// `M_TRIM_THRESHOLD` parameter id from `<malloc.h>`
    pub const M_TRIM_THRESHOLD: libc::c_int = -1;
    /// glibc's default trim threshold (128 KiB)
    pub const DEFAULT_TRIM_THRESHOLD: libc::c_int = 128 * 1024;
}

impl HeapControl for SystemHeap {
    fn collect(&self) {
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        unsafe {
            libc::malloc_trim(0);
        }
    }

    fn suspend(&self) {
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        unsafe {
            libc::mallopt(glibc::M_TRIM_THRESHOLD, libc::c_int::MAX);
        }
    }

    fn resume(&self) {
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        unsafe {
            libc::mallopt(glibc::M_TRIM_THRESHOLD, glibc::DEFAULT_TRIM_THRESHOLD);
        }
    }
}

/// Heap control that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHeap;

impl HeapControl for NoopHeap {
    fn collect(&self) {}
    fn suspend(&self) {}
    fn resume(&self) {}
}
