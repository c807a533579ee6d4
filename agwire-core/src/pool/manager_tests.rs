use super::*;

fn tiny_config() -> PoolConfig {
    PoolConfig {
        small: TierConfig::new(16, 64, 1),
        medium: TierConfig::new(64, 256, 1),
        large: TierConfig::new(256, 1024, 1),
        safe_ceiling: 4096,
    }
}

#[test]
fn test_default_tiers() {
    let config = PoolConfig::default();
    assert_eq!(config.small.max_size, 4096);
    assert_eq!(config.small.max_count, 500);
    assert_eq!(config.medium.max_size, 65536);
    assert_eq!(config.medium.max_count, 200);
    assert_eq!(config.large.max_size, 1_048_576);
    assert_eq!(config.large.max_count, 50);
    assert_eq!(config.safe_ceiling, 100 * 1024 * 1024);
    assert!(config.small.secure_zero);
    assert!(config.validate().is_ok());
}

#[test]
fn test_size_selects_tier() {
    let manager = PoolManager::default();

    assert_eq!(manager.get_slice(100).unwrap().capacity(), 1024);
    assert_eq!(manager.get_slice(5000).unwrap().capacity(), 4096);
    assert_eq!(manager.get_slice(2 * 1024 * 1024).unwrap().capacity(), 16384);
}

#[test]
fn test_small_tier_round_trip() {
    let manager = PoolManager::default();

    let mut buf = manager.get_buffer(100).unwrap();
    let capacity = buf.capacity();
    buf.extend_from_slice(b"secret");
    buf.put();

    let buf = manager.get_buffer(100).unwrap();
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), capacity);
}

#[test]
fn test_exhaustion_and_safe_fallback() {
    let manager = PoolManager::new(tiny_config()).unwrap();

    let held = manager.get_buffer(10).unwrap();
    assert!(held.is_pooled());
    assert!(manager.get_buffer(10).is_none());

    let fallback = manager.get_buffer_safe(10).unwrap();
    assert!(!fallback.is_pooled());
    assert!(fallback.capacity() >= 10);

    // Other tiers are unaffected.
    assert!(manager.get_buffer(200).unwrap().is_pooled());
}

#[test]
fn test_safe_fallback_respects_ceiling() {
    let manager = PoolManager::new(tiny_config()).unwrap();

    let _held = manager.get_slice(2000).unwrap();
    assert!(manager.get_slice_safe(2000).is_some());
    assert!(manager.get_slice_safe(5000).is_none());
}

#[test]
fn test_reset_all_restores_capacity() {
    let manager = PoolManager::new(tiny_config()).unwrap();

    let _a = manager.get_buffer(10).unwrap();
    let _b = manager.get_slice(10).unwrap();
    assert!(manager.get_buffer(10).is_none());

    manager.reset_all();
    assert!(manager.get_buffer(10).is_some());
    assert!(manager.get_slice(10).is_some());
}

#[test]
fn test_stats_report_every_tier() {
    let manager = PoolManager::default();
    let _buf = manager.get_buffer(10).unwrap();

    let stats = manager.stats();
    let names: Vec<_> = stats.buffers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["buffer.small", "buffer.medium", "buffer.large"]);
    assert_eq!(stats.buffers[0].live, 1);
    assert_eq!(stats.slices.len(), 3);
    assert!(stats.slices.iter().all(|s| s.live == 0));
}

#[test]
fn test_validate_rejects_bad_tiers() {
    let mut config = PoolConfig::default();
    config.medium.max_count = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidTier { ref tier, .. }) if tier == "medium"
    ));

    let mut config = PoolConfig::default();
    config.small.initial_capacity = 8192;
    assert!(PoolManager::new(config).is_err());

    let mut config = PoolConfig::default();
    config.safe_ceiling = 1024;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: PoolConfig = serde_json::from_str(
        r#"{"small": {"initial_capacity": 512, "max_size": 2048, "max_count": 10}}"#,
    )
    .unwrap();
    assert_eq!(config.small.max_count, 10);
    assert!(config.small.secure_zero);
    assert_eq!(config.large, PoolConfig::default().large);
}
