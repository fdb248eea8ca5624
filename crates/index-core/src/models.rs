// index-core/src/models.rs
//! 数据模型定义

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 代码文件文档，一个文件对应一条记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSource {
    /// 128 位稳定主键；首次映射为索引文档时生成，更新与重命名保持不变
    pub code_pk: Option<Uuid>,
    /// 文件名（不含扩展名）
    pub file_name: String,
    /// 扩展名（不含点号）
    pub file_extension: String,
    /// 绝对规范化路径
    pub file_path: String,
    /// 完整 UTF-8 文本内容
    pub content: String,
    /// 索引时刻（Unix 纪元纳秒）
    pub index_date: u64,
    /// 文件最后写入时刻（Unix 纪元纳秒）
    pub last_write_time_utc: u64,
    /// 自由格式元信息
    pub info: String,
}

impl CodeSource {
    /// 从磁盘文件构造：读取内容并记录时间戳，路径规范化为绝对形式
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取文件失败: {:?}", path))?;
        let metadata = fs::metadata(path)?;
        let last_write = metadata.modified().map(ticks_of).unwrap_or_else(|_| now_ticks());

        Ok(Self {
            code_pk: None,
            file_name: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_extension: path
                .extension()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: canonical_path_string(path),
            content,
            index_date: now_ticks(),
            last_write_time_utc: last_write,
            info: String::new(),
        })
    }
}

/// 提示词文档，每个不同大小写拼写一条记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeWord {
    /// 原始大小写词，作为唯一键
    pub word: String,
    /// 小写副本，供大小写不敏感查找
    pub word_lower: String,
}

impl CodeWord {
    pub fn new(word: impl Into<String>) -> Self {
        let word = word.into();
        Self {
            word_lower: word.to_lowercase(),
            word,
        }
    }
}

/// 路径的规范化字符串形式；规范化失败时回退为原始路径
pub fn canonical_path_string(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

/// 时刻转换为 Unix 纪元纳秒
pub fn ticks_of(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64
}

/// 当前时刻的纳秒时间戳
pub fn now_ticks() -> u64 {
    ticks_of(SystemTime::now())
}
