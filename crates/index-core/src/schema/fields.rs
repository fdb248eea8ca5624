// index-core/src/schema/fields.rs
//! 字段名常量定义
//!
//! 统一管理两个索引的字段名，避免魔法字符串。
//! 非内容字符串字段以双字段方式存储：分词字段保持原名，
//! 未分词伴生字段追加固定后缀 `$$_`，供词项精确匹配与前缀查询使用。

/// 未分词伴生字段的固定后缀
pub const RAW_SUFFIX: &str = "$$_";

// ============== 代码索引字段 ==============

/// 文档主键（128 位，只有未分词形式）
pub const FIELD_CODE_PK: &str = "CodePK";

/// 文件名（不含扩展名）
pub const FIELD_FILE_NAME: &str = "FileName";
pub const FIELD_FILE_NAME_RAW: &str = "FileName$$_";

/// 扩展名（不含点号）
pub const FIELD_FILE_EXTENSION: &str = "FileExtension";
pub const FIELD_FILE_EXTENSION_RAW: &str = "FileExtension$$_";

/// 绝对规范化路径（未分词形式是文档的路径唯一键）
pub const FIELD_FILE_PATH: &str = "FilePath";
pub const FIELD_FILE_PATH_RAW: &str = "FilePath$$_";

/// 文件内容（全文检索主字段）
pub const FIELD_CONTENT: &str = "Content";

/// 索引时刻（纳秒整数的字符串形式）
pub const FIELD_INDEX_DATE: &str = "IndexDate";

/// 文件最后写入时刻（纳秒整数的字符串形式）
pub const FIELD_LAST_WRITE: &str = "LastWriteTimeUtc";

/// 自由格式元信息
pub const FIELD_INFO: &str = "Info";
pub const FIELD_INFO_RAW: &str = "Info$$_";

// ============== 提示索引字段 ==============

/// 原始大小写提示词（唯一键，大小写敏感）
pub const FIELD_WORD: &str = "Word";

/// 小写副本，供大小写不敏感查找
pub const FIELD_WORD_LOWER: &str = "WordLower";
