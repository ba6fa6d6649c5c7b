//! 集成测试公共设施
//!
//! 需要一个真实的 Redis：通过 REDMAP_TEST_URL 指定，例如
//! `redis://127.0.0.1:6379/15`。未设置时所有集成测试直接跳过。
//! 每次测试进程使用独立的键前缀，避免和库里已有数据互相干扰。
#![allow(dead_code)]

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use redmap::{RedmapConfig, Session};

static RUN_PREFIX: OnceLock<String> = OnceLock::new();
static KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

fn run_prefix() -> &'static str {
    RUN_PREFIX.get_or_init(|| {
        format!(
            "redmaptests_{}_{}:",
            std::process::id(),
            chrono::Utc::now().format("%Y%m%d%H%M%S%f")
        )
    })
}

/// 测试配置；REDMAP_TEST_URL 未设置时返回 None
pub fn test_config() -> Option<RedmapConfig> {
    let Ok(url) = std::env::var("REDMAP_TEST_URL") else {
        eprintln!("REDMAP_TEST_URL not set; skipping integration test");
        return None;
    };
    let mut config = RedmapConfig::with_url(url);
    config.redis.key_prefix = run_prefix().to_string();
    Some(config)
}

/// 建立一个测试会话；REDMAP_TEST_URL 未设置或 Redis 不可达时返回 None
pub async fn test_session() -> Option<Session> {
    let config = test_config()?;
    match Session::open(&config).await {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("cannot reach Redis, skipping integration test: {}", e);
            None
        }
    }
}

/// 测试内唯一的逻辑键
pub fn unique_key(name: &str) -> String {
    format!("{}_{}", name, KEY_COUNTER.fetch_add(1, Ordering::SeqCst))
}
