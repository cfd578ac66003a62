//! 错误定义模块

use thiserror::Error;

/// PACS系统统一错误类型
#[derive(Error, Debug)]
pub enum PacsError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("DICOM解析错误: {0}")]
    DicomParseError(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("无效状态: {0}")]
    InvalidState(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("字段已确认，不可修改: {0}")]
    AlreadyConfirmed(String),

    #[error("前置条件不满足: {0}")]
    Precondition(String),

    #[error("资源未找到: {0}")]
    NotFound(String),
}

/// 错误分类，供调用方映射为用户可见的提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidState,
    AlreadyConfirmed,
    Precondition,
    Other,
}

impl PacsError {
    /// 获取错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            PacsError::Validation(_) => ErrorKind::Validation,
            PacsError::InvalidState(_) | PacsError::InvalidStateTransition { .. } => {
                ErrorKind::InvalidState
            }
            PacsError::AlreadyConfirmed(_) => ErrorKind::AlreadyConfirmed,
            PacsError::Precondition(_) => ErrorKind::Precondition,
            _ => ErrorKind::Other,
        }
    }
}

/// PACS系统统一结果类型
pub type Result<T> = std::result::Result<T, PacsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(PacsError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(
            PacsError::InvalidStateTransition {
                from: "Final".into(),
                event: "Finalize".into()
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(PacsError::InvalidState("x".into()).kind(), ErrorKind::InvalidState);
        assert_eq!(PacsError::AlreadyConfirmed("x".into()).kind(), ErrorKind::AlreadyConfirmed);
        assert_eq!(PacsError::Precondition("x".into()).kind(), ErrorKind::Precondition);
        assert_eq!(PacsError::NotFound("x".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_display_carries_message() {
        let err = PacsError::Validation("approver required before finalizing".into());
        assert_eq!(err.to_string(), "验证错误: approver required before finalizing");
    }
}
