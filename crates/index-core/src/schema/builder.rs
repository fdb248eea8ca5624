// index-core/src/schema/builder.rs
//! Schema 构建器
//!
//! 构建代码索引与提示索引的 Tantivy Schema，统一管理字段配置

use tantivy::schema::*;

use super::fields::*;
use crate::analyzer::CODE_TOKENIZER;

/// 代码分词字段的通用配置
fn code_text_options() -> TextOptions {
    TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(CODE_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored()
}

/// 构建代码索引 Schema
///
/// # 字段布局
/// - 字符串字段成对出现：分词字段存储取值，未分词伴生字段只建索引
/// - `CodePK` 只有未分词形式
/// - `Content` 分词并存储
/// - 时间戳以整数字符串形式精确存储
pub fn build_code_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let code_text = code_text_options();

    schema_builder.add_text_field(FIELD_CODE_PK, STRING | STORED);

    schema_builder.add_text_field(FIELD_FILE_NAME, code_text.clone());
    schema_builder.add_text_field(FIELD_FILE_NAME_RAW, STRING);
    schema_builder.add_text_field(FIELD_FILE_EXTENSION, code_text.clone());
    schema_builder.add_text_field(FIELD_FILE_EXTENSION_RAW, STRING);
    schema_builder.add_text_field(FIELD_FILE_PATH, code_text.clone());
    schema_builder.add_text_field(FIELD_FILE_PATH_RAW, STRING);
    schema_builder.add_text_field(FIELD_INFO, code_text.clone());
    schema_builder.add_text_field(FIELD_INFO_RAW, STRING);

    schema_builder.add_text_field(FIELD_CONTENT, code_text);

    schema_builder.add_text_field(FIELD_INDEX_DATE, STRING | STORED);
    schema_builder.add_text_field(FIELD_LAST_WRITE, STRING | STORED);

    schema_builder.build()
}

/// 构建提示索引 Schema
pub fn build_hint_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field(FIELD_WORD, STRING | STORED);
    schema_builder.add_text_field(FIELD_WORD_LOWER, STRING | STORED);
    schema_builder.build()
}

/// 代码索引字段引用缓存，避免重复查找
#[derive(Debug, Clone, Copy)]
pub struct CodeFields {
    pub code_pk: Field,
    pub file_name: Field,
    pub file_name_raw: Field,
    pub file_extension: Field,
    pub file_extension_raw: Field,
    pub file_path: Field,
    pub file_path_raw: Field,
    pub content: Field,
    pub index_date: Field,
    pub last_write_time_utc: Field,
    pub info: Field,
    pub info_raw: Field,
}

impl CodeFields {
    /// 从 Schema 中提取所有字段引用
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            code_pk: schema.get_field(FIELD_CODE_PK).expect("missing CodePK field"),
            file_name: schema.get_field(FIELD_FILE_NAME).expect("missing FileName field"),
            file_name_raw: schema
                .get_field(FIELD_FILE_NAME_RAW)
                .expect("missing FileName$$_ field"),
            file_extension: schema
                .get_field(FIELD_FILE_EXTENSION)
                .expect("missing FileExtension field"),
            file_extension_raw: schema
                .get_field(FIELD_FILE_EXTENSION_RAW)
                .expect("missing FileExtension$$_ field"),
            file_path: schema.get_field(FIELD_FILE_PATH).expect("missing FilePath field"),
            file_path_raw: schema
                .get_field(FIELD_FILE_PATH_RAW)
                .expect("missing FilePath$$_ field"),
            content: schema.get_field(FIELD_CONTENT).expect("missing Content field"),
            index_date: schema.get_field(FIELD_INDEX_DATE).expect("missing IndexDate field"),
            last_write_time_utc: schema
                .get_field(FIELD_LAST_WRITE)
                .expect("missing LastWriteTimeUtc field"),
            info: schema.get_field(FIELD_INFO).expect("missing Info field"),
            info_raw: schema.get_field(FIELD_INFO_RAW).expect("missing Info$$_ field"),
        }
    }
}

/// 提示索引字段引用缓存
#[derive(Debug, Clone, Copy)]
pub struct HintFields {
    pub word: Field,
    pub word_lower: Field,
}

impl HintFields {
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            word: schema.get_field(FIELD_WORD).expect("missing Word field"),
            word_lower: schema.get_field(FIELD_WORD_LOWER).expect("missing WordLower field"),
        }
    }
}
