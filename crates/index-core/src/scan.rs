// index-core/src/scan.rs
//! 初始扫描 - 遍历监控根目录并批量摄取

use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;

use crate::builder::CodeIndexBuilder;
use crate::config::CONFIG;
use crate::error::CancelToken;

/// 判断文件扩展名是否在索引范围内
pub fn is_supported_file(path: &Path) -> bool {
    if let Some(extension) = path.extension() {
        let ext = extension.to_string_lossy();
        CONFIG
            .walker
            .supported_extensions
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(&ext))
    } else {
        false
    }
}

/// 遍历根目录，收集待索引文件
pub fn collect_files(root: &Path) -> Vec<PathBuf> {
    let walker_config = &CONFIG.walker;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(walker_config.skip_hidden)
        // 用户明确指定要索引的目录，不受 .gitignore 排除，
        // 但保留其他 ignore 规则
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(walker_config.respect_ignore)
        .follow_links(walker_config.follow_symlinks);
    if walker_config.max_depth > 0 {
        builder.max_depth(Some(walker_config.max_depth));
    }

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                let path = entry.path();
                if !path.is_dir() && is_supported_file(path) {
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => tracing::warn!("遍历错误: {}", e),
        }
    }
    files
}

/// 全量扫描一个根目录并批量摄取，返回失败文件
pub fn scan_directory(
    builder: &CodeIndexBuilder,
    root: &Path,
    cancel: &CancelToken,
) -> Result<Vec<PathBuf>> {
    let files = collect_files(root);
    tracing::info!("开始初始索引: {:?} (共 {} 个受支持文件)", root, files.len());
    builder.build_by_batch(&files, true, false, false, cancel, CONFIG.index.batch_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extension_check() {
        assert!(is_supported_file(Path::new("/src/main.rs")));
        assert!(is_supported_file(Path::new("/src/Program.CS")));
        assert!(!is_supported_file(Path::new("/bin/app.exe")));
        assert!(!is_supported_file(Path::new("/etc/hosts")));
    }

    #[test]
    fn test_collect_files_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "pub fn a() {}").unwrap();
        std::fs::write(dir.path().join("notes.bin"), [0u8, 1]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/mod.rs"), "mod b;").unwrap();

        let mut files = collect_files(dir.path());
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.extension().unwrap() == "rs"));
    }
}
