use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::retry::RetryConfig;

/// 库配置
///
/// 包含连接与事务行为的基础设施配置：
/// - redis: 连接地址与键前缀
/// - retry: 普通命令的重连重试策略
/// - transaction: 乐观事务的重试上限
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RedmapConfig {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub transaction: TransactionConfig,
}

impl RedmapConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > redmap.toml > 默认值
    /// ENV 前缀：REDMAP，分隔符：__
    /// 示例：REDMAP__REDIS__URL=redis://10.0.0.2:6379/1
    pub fn load() -> Self {
        use config::{Config, Environment, File};

        dotenvy::dotenv().ok();

        let path = "redmap.toml";

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 REDMAP，分隔符 __
            .add_source(
                Environment::with_prefix("REDMAP")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<RedmapConfig>() {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to deserialize config: {}; using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to build config: {}; using defaults", e);
                Self::default()
            }
        }
    }

    /// 使用给定 URL 的最小配置
    pub fn with_url<T: Into<String>>(url: T) -> Self {
        Self {
            redis: RedisConfig {
                url: url.into(),
                ..RedisConfig::default()
            },
            ..Self::default()
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// Redis 连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// 所有逻辑键统一加该前缀，便于多应用共用一个库
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// 事务配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// 冲突重试上限，0 表示不限次数
    #[serde(default = "default_transaction_retry_limit")]
    pub retry_limit: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_transaction_retry_limit(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    String::new()
}

fn default_transaction_retry_limit() -> u32 {
    0
}
