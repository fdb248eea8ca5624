// index-core/tests/engine_scenarios.rs
//! 端到端场景验证
//!
//! 覆盖代码索引与提示索引的协同行为：批量摄取、按词项与按查询删除、
//! 提示词大小写敏感、文件与目录重命名以及取消传播。

use std::fs;
use std::path::Path;

use index_core::analyzer::code_query_parser;
use index_core::error::CancelToken;
use index_core::models::{canonical_path_string, now_ticks, CodeSource, CodeWord};
use index_core::schema::{code_document, code_source_from, hint_document, hint_word_from};
use index_core::{Cancelled, IndexEngine};
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::Term;
use tempfile::TempDir;

fn engine() -> (TempDir, IndexEngine) {
    let dir = TempDir::new().unwrap();
    let engine = IndexEngine::open(dir.path()).unwrap();
    (dir, engine)
}

fn dummy_source(n: usize) -> CodeSource {
    CodeSource {
        code_pk: None,
        file_name: format!("Dummy File {}", n),
        file_extension: "cs".to_string(),
        file_path: format!("C:\\dummy\\File{}.cs", n),
        content: format!("public class DummyFile{} {{ }}", n),
        index_date: now_ticks(),
        last_write_time_utc: now_ticks(),
        info: String::new(),
    }
}

/// 直接经代码索引池写入一组 CodeSource 并提交
fn index_sources(engine: &IndexEngine, sources: &mut [CodeSource]) {
    let fields = *engine.builder().code_fields();
    let docs = sources
        .iter_mut()
        .map(|source| code_document(source, &fields))
        .collect();
    engine
        .builder()
        .code_pool()
        .build(docs, true, false, false)
        .unwrap();
}

fn term_query(field: tantivy::schema::Field, text: &str) -> TermQuery {
    TermQuery::new(Term::from_field_text(field, text), IndexRecordOption::Basic)
}

// ============== 场景：代码索引 ==============

#[test]
fn scenario_build_then_term_search() {
    let (_dir, engine) = engine();
    let mut sources = vec![dummy_source(1), dummy_source(2)];
    index_sources(&engine, &mut sources);

    let pool = engine.builder().code_pool();
    let fields = engine.builder().code_fields();
    assert_eq!(pool.search(&AllQuery, 10).unwrap().len(), 2);

    // FileName 分词后 "2" 是独立词项，只命中第二个文档
    let hits = pool.search(&term_query(fields.file_name, "2"), 10).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn scenario_delete_by_query_then_by_term() {
    let (_dir, engine) = engine();
    let mut sources = vec![dummy_source(1), dummy_source(2)];
    index_sources(&engine, &mut sources);

    let pool = engine.builder().code_pool();
    let fields = engine.builder().code_fields();

    // 按解析查询删除第二个文档
    let parser = code_query_parser(pool.index(), vec![fields.file_name]);
    let query = parser.parse_query("2").unwrap();
    pool.delete_query(query).unwrap();
    pool.commit().unwrap();
    assert_eq!(pool.search(&AllQuery, 10).unwrap().len(), 1);

    // 按词项删除第一个文档
    pool.delete_term(Term::from_field_text(fields.file_name, "1"));
    pool.commit().unwrap();
    assert_eq!(pool.search(&AllQuery, 10).unwrap().len(), 0);
}

// ============== 场景：提示索引 ==============

#[test]
fn scenario_hint_index_is_case_sensitive() {
    let (_dir, engine) = engine();
    let pool = engine.builder().hint_pool();
    let fields = engine.builder().hint_fields();

    // upsert "ABC"、"Abc"、再次 "Abc"
    for word in ["ABC", "Abc", "Abc"] {
        let doc = hint_document(&CodeWord::new(word), fields);
        pool.update(Term::from_field_text(fields.word, word), doc).unwrap();
    }
    pool.commit().unwrap();

    let mut words: Vec<String> = pool
        .search(&AllQuery, 10)
        .unwrap()
        .iter()
        .map(|doc| hint_word_from(doc, fields).unwrap().word)
        .collect();
    words.sort();
    assert_eq!(words, vec!["ABC", "Abc"]);
}

// ============== 场景：重命名 ==============

#[test]
fn scenario_rename_folder_moves_all_paths() {
    let (_dir, engine) = engine();
    let mut source = dummy_source(1);
    source.file_path = "C:\\a\\x.cs".to_string();
    index_sources(&engine, &mut [source]);

    let cancel = CancelToken::new();
    let status = engine.builder().rename_folder("C:\\a", "C:\\b", &cancel).unwrap();
    assert!(status.is_successful());
    engine.builder().commit().unwrap();

    let pool = engine.builder().code_pool();
    let fields = engine.builder().code_fields();
    let on_new = pool
        .search(&term_query(fields.file_path_raw, "C:\\b\\x.cs"), 10)
        .unwrap();
    assert_eq!(on_new.len(), 1);
    let on_old = pool
        .search(&term_query(fields.file_path_raw, "C:\\a\\x.cs"), 10)
        .unwrap();
    assert!(on_old.is_empty());
}

#[test]
fn rename_file_keeps_primary_key() {
    let (_dir, engine) = engine();
    let mut source = dummy_source(1);
    source.file_path = "C:\\proj\\Old.cs".to_string();
    index_sources(&engine, &mut [source]);

    let pool = engine.builder().code_pool();
    let fields = engine.builder().code_fields();
    let before = code_source_from(&pool.search(&AllQuery, 1).unwrap()[0], fields).unwrap();
    let pk = before.code_pk.unwrap();

    let cancel = CancelToken::new();
    let status = engine
        .builder()
        .rename_file("C:\\proj\\Old.cs", "C:\\proj\\New.cs", &cancel)
        .unwrap();
    assert!(status.is_successful());
    engine.builder().commit().unwrap();

    let docs = pool
        .search(&term_query(fields.file_path_raw, "C:\\proj\\New.cs"), 10)
        .unwrap();
    assert_eq!(docs.len(), 1);
    let after = code_source_from(&docs[0], fields).unwrap();
    assert_eq!(after.code_pk, Some(pk));

    let on_old = pool
        .search(&term_query(fields.file_path_raw, "C:\\proj\\Old.cs"), 10)
        .unwrap();
    assert!(on_old.is_empty());
}

#[test]
fn rename_file_ambiguous_path_is_rejected() {
    let (_dir, engine) = engine();
    // 人为制造路径唯一性被破坏的索引状态
    let mut first = dummy_source(1);
    first.file_path = "C:\\proj\\Dup.cs".to_string();
    let mut second = dummy_source(2);
    second.file_path = "C:\\proj\\Dup.cs".to_string();
    index_sources(&engine, &mut [first, second]);

    let cancel = CancelToken::new();
    let status = engine
        .builder()
        .rename_file("C:\\proj\\Dup.cs", "C:\\proj\\Other.cs", &cancel)
        .unwrap();
    assert_eq!(status, index_core::OpStatus::FailedWithError);

    // 放弃改动：两个文档原样保留
    engine.builder().commit().unwrap();
    let pool = engine.builder().code_pool();
    let fields = engine.builder().code_fields();
    let on_old = pool
        .search(&term_query(fields.file_path_raw, "C:\\proj\\Dup.cs"), 10)
        .unwrap();
    assert_eq!(on_old.len(), 2);
}

#[test]
fn rename_file_missing_source_falls_back_to_create() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let new_file = work.path().join("renamed.rs");
    fs::write(&new_file, "pub fn renamed() {}").unwrap();
    let canonical = canonical_path_string(&new_file);

    let cancel = CancelToken::new();
    let status = engine
        .builder()
        .rename_file("/no/such/old.rs", &canonical, &cancel)
        .unwrap();
    assert!(status.is_successful());
    engine.builder().commit().unwrap();

    let pool = engine.builder().code_pool();
    let fields = engine.builder().code_fields();
    let docs = pool
        .search(&term_query(fields.file_path_raw, &canonical), 10)
        .unwrap();
    assert_eq!(docs.len(), 1);
}

// ============== 场景：磁盘文件生命周期 ==============

#[test]
fn scenario_delete_after_disk_removal() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let file = work.path().join("x.cs");
    fs::write(&file, "class X { }").unwrap();
    let canonical = canonical_path_string(&file);

    let cancel = CancelToken::new();
    assert!(engine.builder().create(&file, &cancel).unwrap().is_successful());
    engine.builder().commit().unwrap();
    assert_eq!(engine.builder().code_pool().search(&AllQuery, 10).unwrap().len(), 1);

    fs::remove_file(&file).unwrap();
    assert!(engine.builder().delete(&canonical).unwrap().is_successful());
    engine.builder().commit().unwrap();
    assert_eq!(engine.builder().code_pool().search(&AllQuery, 10).unwrap().len(), 0);
}

#[test]
fn create_on_missing_file_reports_io_failure() {
    let (_dir, engine) = engine();
    let cancel = CancelToken::new();
    let status = engine
        .builder()
        .create(Path::new("/no/such/file.rs"), &cancel)
        .unwrap();
    assert_eq!(status, index_core::OpStatus::FailedWithIo);
}

#[test]
fn update_preserves_primary_key_across_rewrites() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let file = work.path().join("service.rs");
    fs::write(&file, "pub fn first_version() {}").unwrap();

    let cancel = CancelToken::new();
    engine.builder().create(&file, &cancel).unwrap();
    engine.builder().commit().unwrap();

    let pool = engine.builder().code_pool();
    let fields = engine.builder().code_fields();
    let before = code_source_from(&pool.search(&AllQuery, 1).unwrap()[0], fields).unwrap();

    fs::write(&file, "pub fn second_version() {}").unwrap();
    assert!(engine.builder().update(&file, &cancel).unwrap().is_successful());
    engine.builder().commit().unwrap();

    let docs = pool.search(&AllQuery, 10).unwrap();
    assert_eq!(docs.len(), 1);
    let after = code_source_from(&docs[0], fields).unwrap();
    assert_eq!(after.code_pk, before.code_pk);
    assert!(after.content.contains("second_version"));
}

// ============== 场景：批量摄取 ==============

#[test]
fn batch_ingest_one_doc_per_file() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..5 {
        let path = work.path().join(format!("file{}.rs", i));
        fs::write(&path, format!("pub fn handler_{}() {{ }}", i)).unwrap();
        files.push(path);
    }

    let cancel = CancelToken::new();
    // 小批大小迫使循环中段多次刷写
    let failed = engine
        .builder()
        .build_by_batch(&files, true, false, false, &cancel, 2)
        .unwrap();
    assert!(failed.is_empty());

    let all = engine.builder().get_all_indexed().unwrap();
    assert_eq!(all.len(), 5);
    for path in &files {
        let canonical = canonical_path_string(path);
        assert_eq!(all.iter().filter(|(p, _)| *p == canonical).count(), 1);
    }
    assert!(all.iter().all(|(_, last_write)| *last_write > 0));
}

#[test]
fn batch_records_failed_files_and_continues() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let good = work.path().join("good.rs");
    fs::write(&good, "pub fn good() {}").unwrap();
    let missing = work.path().join("missing.rs");

    let cancel = CancelToken::new();
    let failed = engine
        .builder()
        .build_by_batch(
            &[good.clone(), missing.clone()],
            true,
            false,
            false,
            &cancel,
            100,
        )
        .unwrap();
    assert_eq!(failed, vec![missing]);
    assert_eq!(engine.builder().get_all_indexed().unwrap().len(), 1);
}

#[test]
fn batch_extracts_deduped_hint_words() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let first = work.path().join("a.rs");
    fs::write(&first, "alpha beta gamma shared").unwrap();
    let second = work.path().join("b.rs");
    fs::write(&second, "delta shared epsilon").unwrap();
    let files = vec![first, second];

    let cancel = CancelToken::new();
    engine
        .builder()
        .build_by_batch(&files, true, false, false, &cancel, 100)
        .unwrap();
    assert_eq!(engine.builder().hint_pool().num_docs().unwrap(), 6);

    // 重复摄取同一批文件：提示词 upsert 保持计数不变
    engine
        .builder()
        .build_by_batch(&files, true, false, false, &cancel, 100)
        .unwrap();
    assert_eq!(engine.builder().hint_pool().num_docs().unwrap(), 6);
}

#[test]
fn cancellation_propagates_out_of_band() {
    let (_dir, engine) = engine();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = engine
        .builder()
        .build_by_batch(&[], true, false, false, &cancel, 10)
        .unwrap_err();
    assert!(err.is::<Cancelled>());

    let err = engine.builder().create(Path::new("x.rs"), &cancel).unwrap_err();
    assert!(err.is::<Cancelled>());
}

// ============== 场景：引擎入口 ==============

#[test]
fn engine_search_code_is_and_by_default() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let file = work.path().join("calc.rs");
    fs::write(&file, "fn compute_answer() { let answer = 42; }").unwrap();

    let cancel = CancelToken::new();
    engine
        .builder()
        .build_by_batch(&[file], true, false, false, &cancel, 100)
        .unwrap();

    assert_eq!(engine.search_code("answer", 10).unwrap().len(), 1);
    assert_eq!(engine.search_code("let answer", 10).unwrap().len(), 1);
    // AND 语义：任一词项缺失即无命中
    assert!(engine.search_code("answer zzz_missing", 10).unwrap().is_empty());
}

#[test]
fn engine_hint_prefix_lookup_is_case_insensitive() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let file = work.path().join("calc.rs");
    fs::write(&file, "ComputeAnswer computed").unwrap();

    let cancel = CancelToken::new();
    engine
        .builder()
        .build_by_batch(&[file], true, false, false, &cancel, 100)
        .unwrap();

    let hints = engine.search_hints("comp", 10).unwrap();
    let words: Vec<&str> = hints.iter().map(|w| w.word.as_str()).collect();
    assert!(words.contains(&"ComputeAnswer"));
    assert!(words.contains(&"computed"));

    // 输入大小写不影响结果
    assert_eq!(engine.search_hints("COMP", 10).unwrap().len(), hints.len());
    assert!(engine.search_hints("", 10).unwrap().is_empty());
}

#[test]
fn delete_all_clears_both_indexes() {
    let (_dir, engine) = engine();
    let work = TempDir::new().unwrap();
    let file = work.path().join("main.rs");
    fs::write(&file, "principal secondary tertiary").unwrap();

    let cancel = CancelToken::new();
    engine
        .builder()
        .build_by_batch(&[file], true, false, false, &cancel, 100)
        .unwrap();
    assert!(engine.builder().code_pool().num_docs().unwrap() > 0);
    assert!(engine.builder().hint_pool().num_docs().unwrap() > 0);

    engine.builder().delete_all().unwrap();
    assert_eq!(engine.builder().code_pool().num_docs().unwrap(), 0);
    assert_eq!(engine.builder().hint_pool().num_docs().unwrap(), 0);
}
