// index-core/src/watcher.rs
//! 文件监控 - 把防抖后的文件系统事件映射到维护接口
//!
//! 监控线程接收底层事件，在时间窗口内折叠同一路径的重复事件，
//! 然后成批派发给构建器并提交。事件可能被重复投递，
//! 映射到的维护操作都按路径幂等。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::builder::CodeIndexBuilder;
use crate::config::CONFIG;
use crate::error::CancelToken;
use crate::models::canonical_path_string;
use crate::scan::is_supported_file;

/// 归一化后的文件变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Created,
    Modified,
    Deleted,
}

/// 防抖器：把时间窗口内同一路径的事件折叠为一次变更
pub struct EventDebouncer {
    window: Duration,
    pending: HashMap<PathBuf, PendingKind>,
    renames: Vec<(PathBuf, PathBuf)>,
    last_event: Option<Instant>,
}

impl EventDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            renames: Vec::new(),
            last_event: None,
        }
    }

    pub fn push(&mut self, event: FileEvent) {
        self.last_event = Some(Instant::now());
        match event {
            FileEvent::Created(path) => self.fold(path, PendingKind::Created),
            FileEvent::Modified(path) => self.fold(path, PendingKind::Modified),
            FileEvent::Deleted(path) => self.fold(path, PendingKind::Deleted),
            FileEvent::Renamed { from, to } => self.renames.push((from, to)),
        }
    }

    fn fold(&mut self, path: PathBuf, kind: PendingKind) {
        let next = match (self.pending.get(&path).copied(), kind) {
            // 创建后又修改仍视为创建
            (Some(PendingKind::Created), PendingKind::Modified) => PendingKind::Created,
            // 创建后又删除互相抵消
            (Some(PendingKind::Created), PendingKind::Deleted) => {
                self.pending.remove(&path);
                return;
            }
            // 删除后重建视为修改（文件被替换）
            (Some(PendingKind::Deleted), PendingKind::Created) => PendingKind::Modified,
            (_, kind) => kind,
        };
        self.pending.insert(path, next);
    }

    /// 窗口静默后有待处理变更即就绪
    pub fn ready(&self) -> bool {
        self.has_pending()
            && self.last_event.map_or(false, |t| t.elapsed() >= self.window)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.renames.is_empty()
    }

    /// 取出全部待处理变更，重命名排在前面
    pub fn drain(&mut self) -> Vec<FileEvent> {
        let mut out: Vec<FileEvent> = self
            .renames
            .drain(..)
            .map(|(from, to)| FileEvent::Renamed { from, to })
            .collect();
        for (path, kind) in self.pending.drain() {
            out.push(match kind {
                PendingKind::Created => FileEvent::Created(path),
                PendingKind::Modified => FileEvent::Modified(path),
                PendingKind::Deleted => FileEvent::Deleted(path),
            });
        }
        self.last_event = None;
        out
    }
}

/// 监控线程句柄
pub struct WatcherHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 启动对单个根目录的监控线程
pub fn start_watcher(
    root: PathBuf,
    builder: Arc<CodeIndexBuilder>,
    cancel: CancelToken,
) -> Result<WatcherHandle> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();

    let thread = thread::Builder::new().name("index-watcher".into()).spawn(move || {
        let (tx, rx) = channel();
        let mut watcher = match RecommendedWatcher::new(tx, NotifyConfig::default()) {
            Ok(w) => w,
            Err(e) => {
                tracing::error!("监控启动失败: {:?}", e);
                return;
            }
        };
        if let Err(e) = watcher.watch(&root, RecursiveMode::Recursive) {
            tracing::error!("监控启动失败: {:?}", e);
            return;
        }
        tracing::info!("文件监控已启动: {:?}", root);

        let mut debouncer = EventDebouncer::new(Duration::from_millis(CONFIG.index.debounce_ms));
        loop {
            if shutdown_flag.load(Ordering::SeqCst) || cancel.is_cancelled() {
                return;
            }
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(event)) => {
                    for file_event in map_event(&event) {
                        debouncer.push(file_event);
                    }
                }
                Ok(Err(e)) => tracing::error!("Watch error: {:?}", e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }

            if debouncer.ready() {
                for change in debouncer.drain() {
                    apply_change(&builder, &change, &cancel);
                }
                if let Err(e) = builder.commit() {
                    tracing::error!("事件批次提交失败: {}", e);
                }
            }
        }
    })?;

    Ok(WatcherHandle {
        shutdown,
        thread: Some(thread),
    })
}

/// 把底层事件映射为归一化变更
fn map_event(event: &notify::Event) -> Vec<FileEvent> {
    match &event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter(|p| is_supported_file(p))
            .map(|p| FileEvent::Created(p.clone()))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            // 目录重命名也要处理，这里不过滤扩展名
            vec![FileEvent::Renamed {
                from: event.paths[0].clone(),
                to: event.paths[1].clone(),
            }]
        }
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| is_supported_file(p))
            .map(|p| FileEvent::Modified(p.clone()))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter(|p| is_supported_file(p))
            .map(|p| FileEvent::Deleted(p.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// 将一次变更派发到构建器
fn apply_change(builder: &CodeIndexBuilder, change: &FileEvent, cancel: &CancelToken) {
    let status = match change {
        // 创建与修改统一走 update（按路径 upsert），重复投递安全
        FileEvent::Created(path) | FileEvent::Modified(path) => {
            if path.exists() {
                builder.update(path, cancel)
            } else {
                builder.delete(&canonical_path_string(path))
            }
        }
        FileEvent::Deleted(path) => builder.delete(&canonical_path_string(path)),
        FileEvent::Renamed { from, to } => {
            let old = canonical_path_string(from);
            let new = canonical_path_string(to);
            if to.is_dir() {
                builder.rename_folder(&old, &new, cancel)
            } else {
                builder.rename_file(&old, &new, cancel)
            }
        }
    };

    match status {
        Ok(s) if !s.is_successful() => {
            tracing::warn!("变更处理未成功: {:?} -> {:?}", change, s);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("变更处理中断: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_debouncer() -> EventDebouncer {
        EventDebouncer::new(Duration::from_millis(10))
    }

    #[test]
    fn test_debouncer_create_then_modify() {
        let mut debouncer = quick_debouncer();
        debouncer.push(FileEvent::Created(PathBuf::from("a.rs")));
        debouncer.push(FileEvent::Modified(PathBuf::from("a.rs")));

        let events = debouncer.drain();
        assert_eq!(events, vec![FileEvent::Created(PathBuf::from("a.rs"))]);
    }

    #[test]
    fn test_debouncer_create_then_delete_cancels() {
        let mut debouncer = quick_debouncer();
        debouncer.push(FileEvent::Created(PathBuf::from("a.rs")));
        debouncer.push(FileEvent::Deleted(PathBuf::from("a.rs")));

        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_debouncer_delete_then_create_is_modify() {
        let mut debouncer = quick_debouncer();
        debouncer.push(FileEvent::Deleted(PathBuf::from("a.rs")));
        debouncer.push(FileEvent::Created(PathBuf::from("a.rs")));

        let events = debouncer.drain();
        assert_eq!(events, vec![FileEvent::Modified(PathBuf::from("a.rs"))]);
    }

    #[test]
    fn test_debouncer_window() {
        let mut debouncer = quick_debouncer();
        debouncer.push(FileEvent::Modified(PathBuf::from("a.rs")));
        assert!(!debouncer.ready());

        std::thread::sleep(Duration::from_millis(15));
        assert!(debouncer.ready());

        debouncer.drain();
        assert!(!debouncer.ready());
    }

    #[test]
    fn test_debouncer_renames_first() {
        let mut debouncer = quick_debouncer();
        debouncer.push(FileEvent::Modified(PathBuf::from("b.rs")));
        debouncer.push(FileEvent::Renamed {
            from: PathBuf::from("old"),
            to: PathBuf::from("new"),
        });

        let events = debouncer.drain();
        assert!(matches!(events[0], FileEvent::Renamed { .. }));
        assert_eq!(events.len(), 2);
    }
}
