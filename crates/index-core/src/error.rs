// index-core/src/error.rs
//! 错误与取消语义
//!
//! 单文件操作以三态结果返回；取消是独立的信号，
//! 沿调用链向上传播，永远不会折叠为失败状态。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 单文件操作的结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    /// 操作成功
    Successful,
    /// 磁盘、权限或引擎 IO 失败
    FailedWithIo,
    /// 其他失败（解析、编码、引擎内部错误）
    FailedWithError,
}

impl OpStatus {
    /// 根据错误链分类失败状态
    pub fn from_error(err: &anyhow::Error) -> Self {
        if is_io_error(err) {
            OpStatus::FailedWithIo
        } else {
            OpStatus::FailedWithError
        }
    }

    pub fn is_successful(self) -> bool {
        matches!(self, OpStatus::Successful)
    }
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpStatus::Successful => write!(f, "Successful"),
            OpStatus::FailedWithIo => write!(f, "FailedWithIo"),
            OpStatus::FailedWithError => write!(f, "FailedWithError"),
        }
    }
}

/// 错误链中任意一环是 IO 错误即视为 IO 失败
fn is_io_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.downcast_ref::<std::io::Error>().is_some()
            || matches!(
                cause.downcast_ref::<tantivy::TantivyError>(),
                Some(tantivy::TantivyError::IoError(_))
            )
    })
}

/// 取消信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "操作已被取消")
    }
}

impl std::error::Error for Cancelled {}

/// 共享取消令牌，跨线程置位一次即全部生效
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// 观察点：已取消时返回 `Err(Cancelled)`
    pub fn bail_if_cancelled(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_io_error_classified() {
        let err = anyhow::Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(OpStatus::from_error(&err), OpStatus::FailedWithIo);
    }

    #[test]
    fn test_wrapped_io_error_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = anyhow::Error::from(io).context("读取文件失败");
        assert_eq!(OpStatus::from_error(&err), OpStatus::FailedWithIo);
    }

    #[test]
    fn test_other_error_classified() {
        let err = anyhow!("parse failure");
        assert_eq!(OpStatus::from_error(&err), OpStatus::FailedWithError);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.bail_if_cancelled().is_ok());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.bail_if_cancelled(), Err(Cancelled));
    }
}
