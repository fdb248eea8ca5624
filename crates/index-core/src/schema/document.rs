// index-core/src/schema/document.rs
//! 文档映射
//!
//! `CodeSource` / `CodeWord` 与索引文档之间的双向映射。
//! 未分词伴生字段只建索引不存储，分词字段承载存储取值，
//! 因此回读只经过主字段。

use anyhow::{Context, Result};
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use uuid::Uuid;

use super::builder::{CodeFields, HintFields};
use super::fields::*;
use crate::models::{CodeSource, CodeWord};

/// `CodeSource` → 索引文档；主键缺失时在此生成
pub fn code_document(source: &mut CodeSource, fields: &CodeFields) -> TantivyDocument {
    let pk = *source.code_pk.get_or_insert_with(Uuid::new_v4);

    let mut doc = TantivyDocument::default();
    doc.add_text(fields.code_pk, pk.to_string());
    doc.add_text(fields.file_name, &source.file_name);
    doc.add_text(fields.file_name_raw, &source.file_name);
    doc.add_text(fields.file_extension, &source.file_extension);
    doc.add_text(fields.file_extension_raw, &source.file_extension);
    doc.add_text(fields.file_path, &source.file_path);
    doc.add_text(fields.file_path_raw, &source.file_path);
    doc.add_text(fields.info, &source.info);
    doc.add_text(fields.info_raw, &source.info);
    doc.add_text(fields.content, &source.content);
    doc.add_text(fields.index_date, source.index_date.to_string());
    doc.add_text(fields.last_write_time_utc, source.last_write_time_utc.to_string());
    doc
}

/// 索引文档 → `CodeSource`；时间戳按普通整数解析
pub fn code_source_from(doc: &TantivyDocument, fields: &CodeFields) -> Result<CodeSource> {
    let pk_text = stored_text(doc, fields.code_pk, FIELD_CODE_PK)?;
    let pk = Uuid::parse_str(&pk_text).with_context(|| format!("非法主键: {}", pk_text))?;

    let index_date: u64 = stored_text(doc, fields.index_date, FIELD_INDEX_DATE)?
        .parse()
        .context("IndexDate 解析失败")?;
    let last_write: u64 = stored_text(doc, fields.last_write_time_utc, FIELD_LAST_WRITE)?
        .parse()
        .context("LastWriteTimeUtc 解析失败")?;

    Ok(CodeSource {
        code_pk: Some(pk),
        file_name: stored_text(doc, fields.file_name, FIELD_FILE_NAME)?,
        file_extension: stored_text(doc, fields.file_extension, FIELD_FILE_EXTENSION)?,
        file_path: stored_text(doc, fields.file_path, FIELD_FILE_PATH)?,
        content: stored_text(doc, fields.content, FIELD_CONTENT)?,
        index_date,
        last_write_time_utc: last_write,
        info: stored_text(doc, fields.info, FIELD_INFO)?,
    })
}

/// `CodeWord` → 提示索引文档
pub fn hint_document(word: &CodeWord, fields: &HintFields) -> TantivyDocument {
    let mut doc = TantivyDocument::default();
    doc.add_text(fields.word, &word.word);
    doc.add_text(fields.word_lower, &word.word_lower);
    doc
}

/// 提示索引文档 → `CodeWord`
pub fn hint_word_from(doc: &TantivyDocument, fields: &HintFields) -> Result<CodeWord> {
    Ok(CodeWord {
        word: stored_text(doc, fields.word, FIELD_WORD)?,
        word_lower: stored_text(doc, fields.word_lower, FIELD_WORD_LOWER)?,
    })
}

fn stored_text(doc: &TantivyDocument, field: tantivy::schema::Field, name: &str) -> Result<String> {
    doc.get_first(field)
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .with_context(|| format!("文档缺少字段 {}", name))
}
