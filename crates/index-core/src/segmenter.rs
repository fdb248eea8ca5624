// index-core/src/segmenter.rs
//! 提示词切分
//!
//! 复用代码分词规则从内容中提取候选提示词，
//! 仅保留长度严格落在 (3, 200) 区间的 token。
//! 大小写保留；去重由构建器负责。

use tantivy::tokenizer::{TokenStream, Tokenizer};

use crate::analyzer::CodeTokenizer;

/// 提示词长度下界（不含）
pub const MIN_HINT_LEN: usize = 3;
/// 提示词长度上界（不含）
pub const MAX_HINT_LEN: usize = 200;

pub struct WordSegmenter;

impl WordSegmenter {
    /// 从内容中切分候选提示词
    pub fn segment(content: &str) -> Vec<String> {
        let mut tokenizer = CodeTokenizer::default();
        let mut stream = tokenizer.token_stream(content);
        let mut words = Vec::new();
        while stream.advance() {
            let text = stream.token().text.as_str();
            let len = text.chars().count();
            if len > MIN_HINT_LEN && len < MAX_HINT_LEN {
                words.push(text.to_string());
            }
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("abc", false)] // 长度 3，被排除
    #[case("abcd", true)] // 长度 4，入选
    #[case("ab", false)]
    fn test_lower_bound(#[case] word: &str, #[case] kept: bool) {
        let words = WordSegmenter::segment(word);
        assert_eq!(!words.is_empty(), kept);
    }

    #[test]
    fn test_upper_bound() {
        let at_limit = "a".repeat(200);
        assert!(WordSegmenter::segment(&at_limit).is_empty());
        let below_limit = "a".repeat(199);
        assert_eq!(WordSegmenter::segment(&below_limit), vec![below_limit]);
    }

    #[test]
    fn test_case_and_duplicates_preserved() {
        let words = WordSegmenter::segment("HashMap hashmap HashMap");
        assert_eq!(words, vec!["HashMap", "hashmap", "HashMap"]);
    }

    #[test]
    fn test_mixed_content() {
        let words = WordSegmenter::segment("fn read_file(path) { path }");
        // "fn" 太短；符号与标识符构成的长 token 符合区间
        assert!(words.contains(&"read_file(path)".to_string()));
        assert!(words.contains(&"path".to_string()));
        assert!(!words.contains(&"fn".to_string()));
    }
}
