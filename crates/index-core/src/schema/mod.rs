// index-core/src/schema/mod.rs
//! Schema 与文档映射

mod builder;
mod document;
mod fields;

pub use builder::{build_code_schema, build_hint_schema, CodeFields, HintFields};
pub use document::{code_document, code_source_from, hint_document, hint_word_from};
pub use fields::*;
