// index-core/src/analyzer.rs
//! 代码分词器
//!
//! 面向标识符与符号的分词规则：token 是字母、数字与代码符号的
//! 最长连续串，空白与其余字符作为分隔符丢弃。大小写保留，
//! 不做词干化，也没有停用词。索引与查询解析共用同一套规则。

use std::str::CharIndices;

use tantivy::query::QueryParser;
use tantivy::schema::Field;
use tantivy::tokenizer::{Token, TokenStream, Tokenizer};
use tantivy::Index;

/// 注册到索引的分词器名称
pub const CODE_TOKENIZER: &str = "code";

/// 代码符号字符集：在源代码中具有语义的标点
const CODE_SYMBOLS: &str = "_.@#$&+-*/\\<>=!?:;,()[]{}|~^\"'";

fn is_code_char(c: char) -> bool {
    c.is_alphanumeric() || CODE_SYMBOLS.contains(c)
}

/// 代码分词器
#[derive(Clone, Default)]
pub struct CodeTokenizer;

impl Tokenizer for CodeTokenizer {
    type TokenStream<'a> = CodeTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        CodeTokenStream {
            text,
            chars: text.char_indices(),
            token: Token::default(),
        }
    }
}

pub struct CodeTokenStream<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
    token: Token,
}

impl CodeTokenStream<'_> {
    fn search_token_end(&mut self) -> usize {
        (&mut self.chars)
            .filter(|(_, c)| !is_code_char(*c))
            .map(|(offset, _)| offset)
            .next()
            .unwrap_or(self.text.len())
    }
}

impl TokenStream for CodeTokenStream<'_> {
    fn advance(&mut self) -> bool {
        self.token.text.clear();
        self.token.position = self.token.position.wrapping_add(1);
        while let Some((offset_from, c)) = self.chars.next() {
            if is_code_char(c) {
                let offset_to = self.search_token_end();
                self.token.offset_from = offset_from;
                self.token.offset_to = offset_to;
                self.token.text.push_str(&self.text[offset_from..offset_to]);
                return true;
            }
        }
        false
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

/// 将代码分词器注册到索引
pub fn register_code_tokenizer(index: &Index) {
    index
        .tokenizers()
        .register(CODE_TOKENIZER, CodeTokenizer::default());
}

/// 构建查询解析器，词项之间默认按 AND 组合
///
/// 解析器不跨线程共享，每次调用都返回新实例
pub fn code_query_parser(index: &Index, default_fields: Vec<Field>) -> QueryParser {
    let mut parser = QueryParser::for_index(index, default_fields);
    parser.set_conjunction_by_default();
    parser
}
