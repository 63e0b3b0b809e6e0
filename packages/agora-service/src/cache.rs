//! Single-flight guards for the derived views.
//!
//! One async mutex serializes recomputes per view. A lock-free generation
//! counter lets a forced caller that queued behind another forced reload
//! detect the finished recompute and adopt its result instead of running
//! the expensive pipeline a second time.

use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};

use tokio::sync::{Mutex, MutexGuard};

/// In-memory slot for a lazily loaded derived view.
pub(crate) struct ViewSlot<T> {
	generation: AtomicU64,
	inner: Mutex<Option<Arc<T>>>,
}

impl<T> ViewSlot<T> {
	pub fn new() -> Self {
		Self { generation: AtomicU64::new(0), inner: Mutex::new(None) }
	}

	/// Snapshot taken before contending on the slot lock.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	/// Called with the slot lock held.
	pub fn bump(&self) {
		self.generation.fetch_add(1, Ordering::Release);
	}

	pub async fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
		self.inner.lock().await
	}
}

/// Guard for a view cached in the persisted store only (no in-memory
/// layer); it tracks recompute generations but holds no value.
pub(crate) struct RecomputeGate {
	generation: AtomicU64,
	inner: Mutex<()>,
}

impl RecomputeGate {
	pub fn new() -> Self {
		Self { generation: AtomicU64::new(0), inner: Mutex::new(()) }
	}

	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	pub fn bump(&self) {
		self.generation.fetch_add(1, Ordering::Release);
	}

	pub async fn lock(&self) -> MutexGuard<'_, ()> {
		self.inner.lock().await
	}
}
