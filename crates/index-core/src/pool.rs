// index-core/src/pool.rs
//! 索引池
//!
//! 单个磁盘倒排索引目录的并发安全句柄。引擎层每个目录只允许一个
//! 写入者，池内部用互斥锁串行化写入，同时允许任意数量的并发搜索。
//!
//! 读取器新鲜度：池中最多缓存一个读取器。搜索在共享锁下取用缓存；
//! 需要新可见性的修改（提交，或调用方传入 `commit=true` 的写入）
//! 在独占锁下丢弃缓存，下一次搜索重新打开读取器。搜索之间互不阻塞，
//! 只会与失效窗口互斥。

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use anyhow::{Context, Result};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::Query;
use tantivy::schema::Schema;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use crate::analyzer::register_code_tokenizer;
use crate::config::CONFIG;

pub struct IndexPool {
    path: PathBuf,
    index: Index,
    // 缓存读取器声明在写入者之前：析构按声明顺序先关读取器，再关写入者
    reader: RwLock<Option<IndexReader>>,
    writer: Mutex<IndexWriter>,
}

impl IndexPool {
    /// 打开索引目录，目录不存在时先创建
    pub fn open(dir: &Path, schema: Schema) -> Result<Self> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).with_context(|| format!("创建索引目录失败: {:?}", dir))?;
            tracing::info!("已创建索引目录: {:?}", dir);
        }

        let index = Index::open_or_create(MmapDirectory::open(dir)?, schema)?;
        register_code_tokenizer(&index);
        let writer: IndexWriter = index.writer(CONFIG.index.writer_memory)?;

        Ok(Self {
            path: dir.to_path_buf(),
            index,
            reader: RwLock::new(None),
            writer: Mutex::new(writer),
        })
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 批量追加文档
    ///
    /// `commit` 落盘；`trigger_merge` 请求段合并；`apply_deletes`
    /// 使挂起的删除生效。引擎在提交时应用删除，`apply_deletes`
    /// 因此也会触发一次提交。
    pub fn build(
        &self,
        docs: Vec<TantivyDocument>,
        commit: bool,
        trigger_merge: bool,
        apply_deletes: bool,
    ) -> Result<()> {
        let mut writer = self.writer.lock().unwrap();
        for doc in docs {
            writer.add_document(doc)?;
        }
        if commit || apply_deletes {
            writer.commit()?;
            self.invalidate_reader();
        }
        if trigger_merge {
            let segments = self.index.searchable_segment_ids()?;
            if segments.len() > 1 {
                writer.merge(&segments).wait()?;
            }
        }
        Ok(())
    }

    /// 删除词项命中的旧文档并写入新文档，两步在同一次写锁持有期内完成；
    /// 词项不命中任何文档时退化为插入
    pub fn update(&self, term: Term, doc: TantivyDocument) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.delete_term(term);
        writer.add_document(doc)?;
        Ok(())
    }

    /// 按词项删除，提交前保持挂起
    pub fn delete_term(&self, term: Term) {
        let writer = self.writer.lock().unwrap();
        writer.delete_term(term);
    }

    /// 按查询删除，提交前保持挂起
    pub fn delete_query(&self, query: Box<dyn Query>) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.delete_query(query)?;
        Ok(())
    }

    /// 清空索引并立即提交
    pub fn delete_all(&self) -> Result<()> {
        {
            let mut writer = self.writer.lock().unwrap();
            writer.delete_all_documents()?;
            writer.commit()?;
        }
        self.invalidate_reader();
        tracing::info!("索引已清空: {:?}", self.path);
        Ok(())
    }

    /// 提交写入并使缓存读取器失效，此后发起的搜索可见全部已提交变更
    pub fn commit(&self) -> Result<()> {
        {
            let mut writer = self.writer.lock().unwrap();
            writer.commit()?;
        }
        self.invalidate_reader();
        Ok(())
    }

    /// 执行查询，返回最多 `max_hits` 个命中文档
    pub fn search(&self, query: &dyn Query, max_hits: usize) -> Result<Vec<TantivyDocument>> {
        let searcher = self.searcher()?;
        let top_docs = searcher.search(query, &TopDocs::with_limit(max_hits.max(1)))?;
        let mut docs = Vec::with_capacity(top_docs.len());
        for (_score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            docs.push(doc);
        }
        Ok(docs)
    }

    /// 当前可见的文档总数
    pub fn num_docs(&self) -> Result<u64> {
        Ok(self.searcher()?.num_docs())
    }

    fn searcher(&self) -> Result<Searcher> {
        // 共享侧：缓存仍有效时直接取用
        {
            let cached = self.reader.read().unwrap();
            if let Some(reader) = cached.as_ref() {
                return Ok(reader.searcher());
            }
        }
        // 独占侧：补开读取器；双重检查避免并发重复打开
        let mut cached = self.reader.write().unwrap();
        if cached.is_none() {
            let reader = self
                .index
                .reader_builder()
                .reload_policy(ReloadPolicy::Manual)
                .try_into()?;
            *cached = Some(reader);
        }
        Ok(cached.as_ref().unwrap().searcher())
    }

    fn invalidate_reader(&self) {
        *self.reader.write().unwrap() = None;
    }
}
