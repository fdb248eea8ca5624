// index-core/src/config.rs
//! 配置模块

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 索引核心配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub walker: WalkerConfig,
}

/// 索引配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexSettings {
    /// 写入者堆内存（字节）
    pub writer_memory: usize,
    /// 批量摄取的批大小
    pub batch_size: usize,
    /// 工作线程与暂存消费者之间的通道容量
    pub channel_bound: usize,
    /// 全量枚举与目录重命名使用的命中上限
    pub max_enumerate_hits: usize,
    /// 文件事件防抖窗口（毫秒）
    pub debounce_ms: u64,
}

/// Walker 配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalkerConfig {
    pub respect_ignore: bool,
    pub skip_hidden: bool,
    pub follow_symlinks: bool,
    pub max_depth: usize,
    pub supported_extensions: Vec<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            writer_memory: 50_000_000,
            batch_size: 10_000,
            channel_bound: 256,
            max_enumerate_hits: 100_000,
            debounce_ms: 500,
        }
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            respect_ignore: true,
            skip_hidden: true,
            follow_symlinks: false,
            max_depth: 0,
            supported_extensions: vec![
                "rs".to_string(),
                "cs".to_string(),
                "c".to_string(),
                "h".to_string(),
                "cpp".to_string(),
                "hpp".to_string(),
                "js".to_string(),
                "ts".to_string(),
                "py".to_string(),
                "java".to_string(),
                "go".to_string(),
                "md".to_string(),
                "txt".to_string(),
                "toml".to_string(),
                "json".to_string(),
                "xml".to_string(),
                "yml".to_string(),
                "yaml".to_string(),
            ],
        }
    }
}

impl CoreConfig {
    /// 从 TOML 文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CoreConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// 尝试加载配置，失败则使用默认值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }
}

/// 全局配置
pub static CONFIG: Lazy<CoreConfig> = Lazy::new(|| CoreConfig::load_or_default("./config.toml"));
