use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use super::{Pool, Pooled, TierConfig, TierStats};
use crate::error::ConfigError;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

/// Tier bounds shared by the buffer and slice pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub small: TierConfig,
    pub medium: TierConfig,
    pub large: TierConfig,
    /// Largest fresh allocation the `*_safe` getters make once a tier is exhausted.
    pub safe_ceiling: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            small: TierConfig::new(KIB, 4 * KIB, 500),
            medium: TierConfig::new(4 * KIB, 64 * KIB, 200),
            large: TierConfig::new(16 * KIB, MIB, 50),
            safe_ceiling: 100 * MIB,
        }
    }
}

impl PoolConfig {
    /// Check tier bounds and ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, tier) in self.tiers() {
            if tier.max_count == 0 {
                return Err(ConfigError::InvalidTier {
                    tier: name.to_string(),
                    reason: "max_count must be greater than zero".to_string(),
                });
            }
            if tier.max_size == 0 {
                return Err(ConfigError::InvalidTier {
                    tier: name.to_string(),
                    reason: "max_size must be greater than zero".to_string(),
                });
            }
            if tier.initial_capacity > tier.max_size {
                return Err(ConfigError::InvalidTier {
                    tier: name.to_string(),
                    reason: format!(
                        "initial_capacity {} exceeds max_size {}",
                        tier.initial_capacity, tier.max_size
                    ),
                });
            }
        }

        if self.small.max_size > self.medium.max_size || self.medium.max_size > self.large.max_size
        {
            return Err(ConfigError::Invalid(
                "tier max sizes must not decrease from small to large".to_string(),
            ));
        }
        if self.safe_ceiling < self.large.max_size {
            return Err(ConfigError::Invalid(format!(
                "safe_ceiling {} is below the large tier max_size {}",
                self.safe_ceiling, self.large.max_size
            )));
        }
        Ok(())
    }

    fn tiers(&self) -> [(&'static str, &TierConfig); 3] {
        [
            ("small", &self.small),
            ("medium", &self.medium),
            ("large", &self.large),
        ]
    }
}

/// Live and idle counts for every tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub buffers: Vec<TierStats>,
    pub slices: Vec<TierStats>,
}

struct Tiers<T: super::Poolable> {
    small: Pool<T>,
    medium: Pool<T>,
    large: Pool<T>,
}

impl<T: super::Poolable> Tiers<T> {
    fn new(kind: &str, config: &PoolConfig) -> Self {
        Self {
            small: Pool::new(format!("{kind}.small"), config.small),
            medium: Pool::new(format!("{kind}.medium"), config.medium),
            large: Pool::new(format!("{kind}.large"), config.large),
        }
    }

    fn for_size(&self, expected_size: usize) -> &Pool<T> {
        if expected_size <= self.small.config().max_size {
            &self.small
        } else if expected_size <= self.medium.config().max_size {
            &self.medium
        } else {
            &self.large
        }
    }

    fn all(&self) -> [&Pool<T>; 3] {
        [&self.small, &self.medium, &self.large]
    }
}

/// Owns the buffer and slice tiers for one server or test.
///
/// Shared by reference (usually behind an `Arc`) between every writer that
/// needs scratch space.
pub struct PoolManager {
    config: PoolConfig,
    buffers: Tiers<BytesMut>,
    slices: Tiers<Vec<u8>>,
}

impl PoolManager {
    /// Create a manager after validating `config`.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            buffers: Tiers::new("buffer", &config),
            slices: Tiers::new("slice", &config),
            config,
        })
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// A buffer from the tier sized for `expected_size`, or `None` if that tier is exhausted.
    pub fn get_buffer(&self, expected_size: usize) -> Option<Pooled<BytesMut>> {
        self.buffers.for_size(expected_size).get()
    }

    /// Like [`get_buffer`](Self::get_buffer), but falls back to a fresh unpooled
    /// buffer when the tier is exhausted. Returns `None` only when
    /// `expected_size` exceeds the safe ceiling.
    pub fn get_buffer_safe(&self, expected_size: usize) -> Option<Pooled<BytesMut>> {
        self.get_buffer(expected_size)
            .or_else(|| self.fresh(expected_size))
    }

    /// A slice from the tier sized for `expected_size`, or `None` if that tier is exhausted.
    pub fn get_slice(&self, expected_size: usize) -> Option<Pooled<Vec<u8>>> {
        self.slices.for_size(expected_size).get()
    }

    /// Like [`get_slice`](Self::get_slice), falling back to a detached allocation below the ceiling.
    pub fn get_slice_safe(&self, expected_size: usize) -> Option<Pooled<Vec<u8>>> {
        self.get_slice(expected_size)
            .or_else(|| self.fresh(expected_size))
    }

    fn fresh<T: super::Poolable>(&self, expected_size: usize) -> Option<Pooled<T>> {
        if expected_size > self.config.safe_ceiling {
            tracing::warn!(
                expected_size,
                ceiling = self.config.safe_ceiling,
                "pool exhausted and request exceeds safe allocation ceiling"
            );
            return None;
        }
        tracing::debug!(expected_size, "pool exhausted, allocating unpooled object");
        Some(Pooled::detached(T::with_capacity(expected_size)))
    }

    /// Reset every tier. Outstanding handles are dropped when released.
    pub fn reset_all(&self) {
        for pool in self.buffers.all() {
            pool.reset();
        }
        for pool in self.slices.all() {
            pool.reset();
        }
    }

    /// Snapshot of every buffer and slice tier.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            buffers: self.buffers.all().iter().map(|p| p.stats()).collect(),
            slices: self.slices.all().iter().map(|p| p.stats()).collect(),
        }
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        let config = PoolConfig::default();
        Self {
            buffers: Tiers::new("buffer", &config),
            slices: Tiers::new("slice", &config),
            config,
        }
    }
}

impl std::fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
