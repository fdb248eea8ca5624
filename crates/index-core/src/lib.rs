// index-core/src/lib.rs
//! 源代码全文索引核心库
//!
//! 基于 Tantivy 的双索引引擎：
//! - 代码索引：每个文件一个文档，可按内容、文件名、扩展名与路径搜索
//! - 提示索引：从代码内容提取的去重词，支撑自动补全
//! - 文件监控把磁盘变更同步进两个索引

pub mod analyzer;
pub mod builder;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod scan;
pub mod schema;
pub mod segmenter;
pub mod watcher;

pub use builder::CodeIndexBuilder;
pub use config::{CoreConfig, CONFIG};
pub use error::{CancelToken, Cancelled, OpStatus};
pub use models::{CodeSource, CodeWord};
pub use pool::IndexPool;
pub use segmenter::WordSegmenter;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tantivy::query::RegexQuery;

use crate::analyzer::code_query_parser;
use crate::schema::{build_code_schema, build_hint_schema, code_source_from, hint_word_from};

/// 代码索引目录名
pub const CODE_INDEX_DIR: &str = "CodeIndex";
/// 提示索引目录名
pub const HINT_INDEX_DIR: &str = "HintIndex";

/// 索引引擎统一入口：一个监控根对应一对兄弟索引目录
pub struct IndexEngine {
    builder: Arc<CodeIndexBuilder>,
}

impl IndexEngine {
    /// 在 `index_root` 下打开（或创建）`CodeIndex` 与 `HintIndex`
    pub fn open(index_root: &Path) -> Result<Self> {
        let code_pool = Arc::new(IndexPool::open(
            &index_root.join(CODE_INDEX_DIR),
            build_code_schema(),
        )?);
        let hint_pool = Arc::new(IndexPool::open(
            &index_root.join(HINT_INDEX_DIR),
            build_hint_schema(),
        )?);

        let name = index_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "index".to_string());
        let builder = Arc::new(CodeIndexBuilder::new(name, code_pool, hint_pool));

        Ok(Self { builder })
    }

    /// 维护接口：外部监控与调度通过构建器驱动索引
    pub fn builder(&self) -> &Arc<CodeIndexBuilder> {
        &self.builder
    }

    /// 全文搜索代码索引，词项之间默认按 AND 组合
    pub fn search_code(&self, query_str: &str, max_hits: usize) -> Result<Vec<CodeSource>> {
        let fields = self.builder.code_fields();
        let pool = self.builder.code_pool();

        // 解析器不跨线程共享，每次搜索新建
        let parser = code_query_parser(pool.index(), vec![fields.content, fields.file_name]);
        let query = match parser.parse_query(query_str) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!("查询语法错误: {}", e);
                return Ok(vec![]);
            }
        };

        let docs = pool.search(&*query, max_hits)?;
        docs.iter().map(|doc| code_source_from(doc, fields)).collect()
    }

    /// 提示词前缀查找（大小写不敏感），供自动补全使用
    pub fn search_hints(&self, prefix: &str, max_hits: usize) -> Result<Vec<CodeWord>> {
        if prefix.is_empty() {
            return Ok(vec![]);
        }
        let fields = self.builder.hint_fields();
        let pattern = format!("{}.*", regex::escape(&prefix.to_lowercase()));
        let query = RegexQuery::from_pattern(&pattern, fields.word_lower)?;

        let docs = self.builder.hint_pool().search(&query, max_hits)?;
        docs.iter().map(|doc| hint_word_from(doc, fields)).collect()
    }
}
