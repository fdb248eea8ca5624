// index-core/src/builder.rs
//! 代码索引构建器
//!
//! 唯一的编排者：同时持有代码索引与提示索引两个索引池，负责批量摄取、
//! 单文件增删改与重命名协议。两个索引的耦合只在这里出现。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use tantivy::query::{AllQuery, RegexQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{TantivyDocument, Term};

use crate::config::CONFIG;
use crate::error::{CancelToken, Cancelled, OpStatus};
use crate::models::{CodeSource, CodeWord};
use crate::pool::IndexPool;
use crate::schema::{code_document, code_source_from, hint_document, CodeFields, HintFields};
use crate::segmenter::WordSegmenter;

/// 批量摄取的默认批大小
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// 工作线程经通道送往暂存消费者的条目
enum StagedItem {
    Staged {
        doc: TantivyDocument,
        words: Vec<String>,
    },
    Failed(PathBuf),
}

pub struct CodeIndexBuilder {
    /// 日志用名称
    name: String,
    code_pool: Arc<IndexPool>,
    hint_pool: Arc<IndexPool>,
    code_fields: CodeFields,
    hint_fields: HintFields,
}

impl CodeIndexBuilder {
    pub fn new(name: impl Into<String>, code_pool: Arc<IndexPool>, hint_pool: Arc<IndexPool>) -> Self {
        let code_fields = CodeFields::from_schema(&code_pool.index().schema());
        let hint_fields = HintFields::from_schema(&hint_pool.index().schema());
        Self {
            name: name.into(),
            code_pool,
            hint_pool,
            code_fields,
            hint_fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code_pool(&self) -> &IndexPool {
        &self.code_pool
    }

    pub fn hint_pool(&self) -> &IndexPool {
        &self.hint_pool
    }

    pub fn code_fields(&self) -> &CodeFields {
        &self.code_fields
    }

    pub fn hint_fields(&self) -> &HintFields {
        &self.hint_fields
    }

    // ============== 批量摄取 ==============

    /// 批量并行摄取
    ///
    /// 工作线程并行读取文件、完成文档映射与提示词切分，经有界通道交给
    /// 单一消费者暂存；暂存文档达到 `batch_size` 时刷写一批，循环结束后
    /// 再刷写剩余部分。单个文件的失败记入返回值，不中断整体。
    /// 取消在每个文件与每次刷写前检查，并作为取消信号向上传播。
    pub fn build_by_batch(
        &self,
        files: &[PathBuf],
        commit: bool,
        trigger_merge: bool,
        apply_deletes: bool,
        cancel: &CancelToken,
        batch_size: usize,
    ) -> Result<Vec<PathBuf>> {
        let (tx, rx) = mpsc::sync_channel::<StagedItem>(CONFIG.index.channel_bound);

        let failed = thread::scope(|scope| -> Result<Vec<PathBuf>> {
            let consumer = scope.spawn(move || {
                self.consume_staged(rx, commit, trigger_merge, apply_deletes, cancel, batch_size)
            });

            let produced: Result<()> = files.par_iter().try_for_each_with(tx, |tx, path| {
                cancel.bail_if_cancelled()?;
                let item = match self.stage_file(path) {
                    Ok((doc, words)) => StagedItem::Staged { doc, words },
                    Err(e) => {
                        tracing::warn!("[{}] 文件摄取失败 {:?}: {}", self.name, path, e);
                        StagedItem::Failed(path.clone())
                    }
                };
                tx.send(item).map_err(|_| anyhow!("暂存消费者已退出"))?;
                Ok(())
            });

            let failed = consumer
                .join()
                .map_err(|_| anyhow!("暂存消费者线程崩溃"))??;
            produced?;
            Ok(failed)
        })?;

        tracing::info!(
            "[{}] 批量摄取完成: {} 个文件, {} 个失败",
            self.name,
            files.len(),
            failed.len()
        );
        Ok(failed)
    }

    /// 暂存消费者：去重提示词并按批大小刷写
    fn consume_staged(
        &self,
        rx: Receiver<StagedItem>,
        commit: bool,
        trigger_merge: bool,
        apply_deletes: bool,
        cancel: &CancelToken,
        batch_size: usize,
    ) -> Result<Vec<PathBuf>> {
        let batch_size = batch_size.max(1);
        let mut staged_docs: Vec<TantivyDocument> = Vec::new();
        let mut hint_words: Vec<String> = Vec::new();
        // 作用域为整次调用的已见集：同一拼写只进提示索引一次
        let mut whole_words: HashSet<String> = HashSet::new();
        let mut failed: Vec<PathBuf> = Vec::new();

        for item in rx {
            match item {
                StagedItem::Staged { doc, words } => {
                    staged_docs.push(doc);
                    for word in words {
                        if whole_words.insert(word.clone()) {
                            hint_words.push(word);
                        }
                    }
                    if staged_docs.len() >= batch_size {
                        cancel.bail_if_cancelled()?;
                        self.flush(&mut staged_docs, &mut hint_words, commit, trigger_merge, apply_deletes)?;
                    }
                }
                StagedItem::Failed(path) => failed.push(path),
            }
        }

        cancel.bail_if_cancelled()?;
        self.flush(&mut staged_docs, &mut hint_words, commit, trigger_merge, apply_deletes)?;
        Ok(failed)
    }

    /// 刷写一批暂存内容后清空两个暂存区。
    /// 提交语义对两个索引保持一致：标志使代码索引提交时，提示索引同批提交
    fn flush(
        &self,
        staged_docs: &mut Vec<TantivyDocument>,
        hint_words: &mut Vec<String>,
        commit: bool,
        trigger_merge: bool,
        apply_deletes: bool,
    ) -> Result<()> {
        if staged_docs.is_empty() && hint_words.is_empty() {
            return Ok(());
        }
        let doc_count = staged_docs.len();
        let word_count = hint_words.len();

        self.code_pool
            .build(std::mem::take(staged_docs), commit, trigger_merge, apply_deletes)?;
        for word in hint_words.drain(..) {
            self.upsert_hint(&word)?;
        }
        if commit || apply_deletes {
            self.hint_pool.commit()?;
        }

        tracing::info!("[{}] 已刷写批次: {} 个文档, {} 个提示词", self.name, doc_count, word_count);
        Ok(())
    }

    /// 读取文件并映射为索引文档与候选提示词
    fn stage_file(&self, path: &Path) -> Result<(TantivyDocument, Vec<String>)> {
        let mut source = CodeSource::from_file(path)?;
        let words = WordSegmenter::segment(&source.content);
        let doc = code_document(&mut source, &self.code_fields);
        Ok((doc, words))
    }

    fn upsert_hint(&self, word: &str) -> Result<()> {
        let hint = CodeWord::new(word);
        let term = Term::from_field_text(self.hint_fields.word, word);
        self.hint_pool.update(term, hint_document(&hint, &self.hint_fields))
    }

    // ============== 单文件操作 ==============

    /// 单文件创建：写入代码文档（不提交）并逐词 upsert 提示索引
    pub fn create(&self, path: &Path, cancel: &CancelToken) -> Result<OpStatus> {
        cancel.bail_if_cancelled()?;
        match self.try_create(path) {
            Ok(()) => {
                tracing::info!("[{}] 已创建索引文档: {:?}", self.name, path);
                Ok(OpStatus::Successful)
            }
            Err(e) => {
                tracing::error!("[{}] 创建索引文档失败 {:?}: {}", self.name, path, e);
                Ok(OpStatus::from_error(&e))
            }
        }
    }

    fn try_create(&self, path: &Path) -> Result<()> {
        let (doc, words) = self.stage_file(path)?;
        self.code_pool.build(vec![doc], false, false, false)?;
        let mut seen = HashSet::new();
        for word in words {
            if seen.insert(word.clone()) {
                self.upsert_hint(&word)?;
            }
        }
        Ok(())
    }

    /// 单文件更新：按未分词路径字段替换代码文档，主键保持稳定。
    /// 旧内容独有的提示词目前不会回收
    pub fn update(&self, path: &Path, cancel: &CancelToken) -> Result<OpStatus> {
        cancel.bail_if_cancelled()?;
        match self.try_update(path, cancel) {
            Ok(()) => {
                tracing::info!("[{}] 已更新索引文档: {:?}", self.name, path);
                Ok(OpStatus::Successful)
            }
            Err(e) if e.is::<Cancelled>() => Err(e),
            Err(e) => {
                tracing::error!("[{}] 更新索引文档失败 {:?}: {}", self.name, path, e);
                Ok(OpStatus::from_error(&e))
            }
        }
    }

    fn try_update(&self, path: &Path, cancel: &CancelToken) -> Result<()> {
        let mut source = CodeSource::from_file(path)?;
        let words = WordSegmenter::segment(&source.content);

        // 主键在更新间保持稳定：沿用已索引文档的主键
        if let Some(existing) = self.find_by_path(&source.file_path)? {
            source.code_pk = existing.code_pk;
        }

        cancel.bail_if_cancelled()?;
        let term = Term::from_field_text(self.code_fields.file_path_raw, &source.file_path);
        let doc = code_document(&mut source, &self.code_fields);
        self.code_pool.update(term, doc)?;

        let mut seen = HashSet::new();
        for word in words {
            if seen.insert(word.clone()) {
                self.upsert_hint(&word)?;
            }
        }
        Ok(())
    }

    /// 按路径删除代码文档，删除在提交后生效。提示词不回收
    pub fn delete(&self, path: &str) -> Result<OpStatus> {
        let term = Term::from_field_text(self.code_fields.file_path_raw, path);
        self.code_pool.delete_term(term);
        tracing::info!("[{}] 已标记删除: {}", self.name, path);
        Ok(OpStatus::Successful)
    }

    // ============== 重命名协议 ==============

    /// 文件重命名：精确匹配旧路径的唯一文档，替换路径前缀后按主键回写。
    /// 零命中回退为创建（覆盖模板先改名后落盘的竞态）；
    /// 多命中说明路径唯一性被破坏，放弃改动
    pub fn rename_file(&self, old_path: &str, new_path: &str, cancel: &CancelToken) -> Result<OpStatus> {
        cancel.bail_if_cancelled()?;
        let term = Term::from_field_text(self.code_fields.file_path_raw, old_path);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let docs = self.code_pool.search(&query, 2)?;

        match docs.len() {
            0 => self.create(Path::new(new_path), cancel),
            1 => match self.rewrite_path(&docs[0], old_path, new_path) {
                Ok(()) => {
                    tracing::info!("[{}] 已重命名: {} -> {}", self.name, old_path, new_path);
                    Ok(OpStatus::Successful)
                }
                Err(e) => {
                    tracing::error!("[{}] 重命名失败 {}: {}", self.name, old_path, e);
                    Ok(OpStatus::from_error(&e))
                }
            },
            _ => {
                tracing::warn!("[{}] 路径命中多个文档，放弃重命名: {}", self.name, old_path);
                Ok(OpStatus::FailedWithError)
            }
        }
    }

    /// 目录重命名：前缀匹配所有旧路径文档并逐个改写
    pub fn rename_folder(&self, old_prefix: &str, new_prefix: &str, cancel: &CancelToken) -> Result<OpStatus> {
        cancel.bail_if_cancelled()?;
        let pattern = format!("{}.*", regex::escape(old_prefix));
        let query = RegexQuery::from_pattern(&pattern, self.code_fields.file_path_raw)?;
        let docs = self.code_pool.search(&query, CONFIG.index.max_enumerate_hits)?;

        for doc in &docs {
            cancel.bail_if_cancelled()?;
            if let Err(e) = self.rewrite_path(doc, old_prefix, new_prefix) {
                tracing::error!("[{}] 目录重命名中文档改写失败: {}", self.name, e);
                return Ok(OpStatus::from_error(&e));
            }
        }

        tracing::info!(
            "[{}] 目录重命名完成: {} -> {} ({} 个文档)",
            self.name,
            old_prefix,
            new_prefix,
            docs.len()
        );
        Ok(OpStatus::Successful)
    }

    /// 以前缀替换的方式改写文档路径并按主键回写
    fn rewrite_path(&self, doc: &TantivyDocument, old_prefix: &str, new_prefix: &str) -> Result<()> {
        let mut source = code_source_from(doc, &self.code_fields)?;
        let pk = source.code_pk.context("文档缺少主键")?;
        source.file_path = source.file_path.replacen(old_prefix, new_prefix, 1);

        let term = Term::from_field_text(self.code_fields.code_pk, &pk.to_string());
        let doc = code_document(&mut source, &self.code_fields);
        self.code_pool.update(term, doc)
    }

    // ============== 维护接口其余部分 ==============

    /// 枚举全部已索引文档的 (路径, 最后写入时刻)
    pub fn get_all_indexed(&self) -> Result<Vec<(String, u64)>> {
        let docs = self.code_pool.search(&AllQuery, CONFIG.index.max_enumerate_hits)?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in &docs {
            let source = code_source_from(doc, &self.code_fields)?;
            out.push((source.file_path, source.last_write_time_utc));
        }
        Ok(out)
    }

    /// 清空两个索引
    pub fn delete_all(&self) -> Result<()> {
        self.code_pool.delete_all()?;
        self.hint_pool.delete_all()
    }

    /// 提交两个索引
    pub fn commit(&self) -> Result<()> {
        self.code_pool.commit()?;
        self.hint_pool.commit()
    }

    /// 按未分词路径字段查找已索引文档
    fn find_by_path(&self, path: &str) -> Result<Option<CodeSource>> {
        let term = Term::from_field_text(self.code_fields.file_path_raw, path);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let docs = self.code_pool.search(&query, 1)?;
        docs.first()
            .map(|doc| code_source_from(doc, &self.code_fields))
            .transpose()
    }
}
