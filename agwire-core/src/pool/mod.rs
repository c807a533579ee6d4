//! Bounded, size-tiered pools of byte buffers.
//!
//! A [`Pool`] hands out [`Pooled`] handles. Dropping a handle returns the
//! object to the tier it came from, zeroed first when the tier is configured
//! for secure release. A tier never owns more than `max_count` objects at
//! once; when the bound is reached [`Pool::get`] returns `None` instead of
//! allocating.

mod manager;

pub use manager::{PoolConfig, PoolManager, PoolStats};

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A growable byte container that can be recycled by a [`Pool`].
pub trait Poolable: Default + Send + 'static {
    fn with_capacity(capacity: usize) -> Self;

    fn capacity(&self) -> usize;

    /// Set the length to zero, keeping the allocation.
    fn clear(&mut self);

    /// Overwrite the whole allocation with zero bytes, leaving the length at zero.
    fn zero(&mut self);
}

impl Poolable for BytesMut {
    fn with_capacity(capacity: usize) -> Self {
        BytesMut::with_capacity(capacity)
    }

    fn capacity(&self) -> usize {
        BytesMut::capacity(self)
    }

    fn clear(&mut self) {
        BytesMut::clear(self);
    }

    fn zero(&mut self) {
        let capacity = BytesMut::capacity(self);
        self.clear();
        self.resize(capacity, 0);
        self.clear();
    }
}

impl Poolable for Vec<u8> {
    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn zero(&mut self) {
        let capacity = Vec::capacity(self);
        self.clear();
        self.resize(capacity, 0);
        self.clear();
    }
}

/// Bounds for one pool tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Capacity of freshly allocated objects.
    pub initial_capacity: usize,
    /// Objects whose capacity grew past this are dropped on release.
    pub max_size: usize,
    /// Upper bound on objects owned by the tier, idle or handed out.
    pub max_count: usize,
    /// Zero released objects before they are reused.
    #[serde(default = "default_secure_zero")]
    pub secure_zero: bool,
}

fn default_secure_zero() -> bool {
    true
}

impl TierConfig {
    /// Create a tier config with secure zeroing enabled.
    pub fn new(initial_capacity: usize, max_size: usize, max_count: usize) -> Self {
        Self {
            initial_capacity,
            max_size,
            max_count,
            secure_zero: true,
        }
    }

    /// Enable or disable zeroing on release.
    pub fn with_secure_zero(mut self, secure_zero: bool) -> Self {
        self.secure_zero = secure_zero;
        self
    }
}

/// Point-in-time counters for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub name: String,
    pub live: usize,
    pub idle: usize,
    pub max_count: usize,
    pub reused: u64,
    pub allocated: u64,
    pub exhausted: u64,
    pub discarded: u64,
}

struct Tier<T> {
    name: String,
    config: TierConfig,
    idle: Mutex<Vec<T>>,
    live: AtomicUsize,
    generation: AtomicU64,
    reused: AtomicU64,
    allocated: AtomicU64,
    exhausted: AtomicU64,
    discarded: AtomicU64,
}

impl<T: Poolable> Tier<T> {
    fn acquire(&self) -> Option<(T, u64)> {
        // Reset bumps the generation under the same lock, so the generation
        // read here always matches the count the reservation lands in.
        let mut idle = self.idle.lock();
        let generation = self.generation.load(Ordering::Acquire);

        if let Some(item) = idle.pop() {
            self.reused.fetch_add(1, Ordering::Relaxed);
            return Some((item, generation));
        }

        let reserved = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < self.config.max_count).then_some(live + 1)
            })
            .is_ok();
        drop(idle);
        if !reserved {
            self.exhausted.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.allocated.fetch_add(1, Ordering::Relaxed);
        Some((T::with_capacity(self.config.initial_capacity), generation))
    }

    fn release(&self, mut item: T, generation: u64, secure: bool) {
        if generation != self.generation.load(Ordering::Acquire) {
            if secure {
                item.zero();
            }
            return;
        }

        if item.capacity() > self.config.max_size {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            self.forget(generation);
            return;
        }

        if secure {
            item.zero();
        } else {
            item.clear();
        }
        self.idle.lock().push(item);
    }

    /// Drop one object from the live count without returning it.
    fn forget(&self, generation: u64) {
        if generation != self.generation.load(Ordering::Acquire) {
            return;
        }
        let _ = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| live.checked_sub(1));
    }

    fn reset(&self) {
        let mut idle = self.idle.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        idle.clear();
        self.live.store(0, Ordering::Release);
    }
}

/// One size tier of pooled objects.
pub struct Pool<T: Poolable> {
    tier: Arc<Tier<T>>,
}

impl<T: Poolable> Pool<T> {
    /// Create an empty tier.
    pub fn new(name: impl Into<String>, config: TierConfig) -> Self {
        Self {
            tier: Arc::new(Tier {
                name: name.into(),
                config,
                idle: Mutex::new(Vec::new()),
                live: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
                reused: AtomicU64::new(0),
                allocated: AtomicU64::new(0),
                exhausted: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
            }),
        }
    }

    /// Take an idle object, or allocate one if the tier is below `max_count`.
    ///
    /// Returns `None` when the tier is exhausted. The object always has length zero.
    pub fn get(&self) -> Option<Pooled<T>> {
        let (item, generation) = self.tier.acquire()?;
        Some(Pooled {
            item,
            origin: Some(Origin {
                tier: Arc::clone(&self.tier),
                generation,
            }),
        })
    }

    /// Discard idle objects and zero the live count.
    ///
    /// Handles still outstanding are dropped on release instead of rejoining the tier.
    pub fn reset(&self) {
        self.tier.reset();
    }

    /// The bounds this tier enforces.
    pub fn config(&self) -> &TierConfig {
        &self.tier.config
    }

    /// The tier's name, as reported in stats.
    pub fn name(&self) -> &str {
        &self.tier.name
    }

    /// Snapshot of this tier's counters.
    pub fn stats(&self) -> TierStats {
        let tier = &self.tier;
        TierStats {
            name: tier.name.clone(),
            live: tier.live.load(Ordering::Acquire),
            idle: tier.idle.lock().len(),
            max_count: tier.config.max_count,
            reused: tier.reused.load(Ordering::Relaxed),
            allocated: tier.allocated.load(Ordering::Relaxed),
            exhausted: tier.exhausted.load(Ordering::Relaxed),
            discarded: tier.discarded.load(Ordering::Relaxed),
        }
    }
}

impl<T: Poolable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.tier.name)
            .field("config", &self.tier.config)
            .field("live", &self.tier.live.load(Ordering::Relaxed))
            .finish()
    }
}

struct Origin<T> {
    tier: Arc<Tier<T>>,
    generation: u64,
}

/// An object checked out of a [`Pool`].
///
/// Dropping the handle releases the object with its tier's zeroing policy.
/// Handles created by [`Pooled::detached`] belong to no tier and simply free
/// their allocation.
pub struct Pooled<T: Poolable> {
    item: T,
    origin: Option<Origin<T>>,
}

impl<T: Poolable> Pooled<T> {
    /// Wrap a freshly allocated object that is not accounted to any tier.
    pub fn detached(item: T) -> Self {
        Self { item, origin: None }
    }

    /// True when the object will return to a tier on release.
    pub fn is_pooled(&self) -> bool {
        self.origin.is_some()
    }

    /// Release with the tier's default zeroing policy.
    pub fn put(self) {
        drop(self);
    }

    /// Release with zeroing regardless of the tier's policy.
    pub fn put_secure(mut self) {
        if let Some(origin) = self.origin.take() {
            let item = std::mem::take(&mut self.item);
            origin.tier.release(item, origin.generation, true);
        } else {
            self.item.zero();
        }
    }

    /// Take ownership of the object. It no longer counts against its tier.
    pub fn into_inner(mut self) -> T {
        if let Some(origin) = self.origin.take() {
            origin.tier.forget(origin.generation);
        }
        std::mem::take(&mut self.item)
    }
}

impl<T: Poolable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Poolable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Poolable> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(origin) = self.origin.take() {
            let item = std::mem::take(&mut self.item);
            let secure = origin.tier.config.secure_zero;
            origin.tier.release(item, origin.generation, secure);
        }
    }
}

impl<T: Poolable + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("item", &self.item)
            .field("pooled", &self.origin.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
