//! 统一错误处理模块
//!
//! 提供绑定层范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **绑定层错误** (`BindingError`): 句柄、类注册、方法分发与参数转换的错误
//! - **原生播放器错误** (`MovieError`): 原生播放对象报告的可恢复错误
//!
//! 所有 `MovieError` 都会以 `BindingError::NativeOperationFailure` 的形式
//! 传递给脚本，脚本可以捕获，进程永远不会因此终止。

use crate::bindings::value::ArgType;
use thiserror::Error;

/// 绑定层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Null handle: the native object was released or never created")]
    NullHandle,

    #[error("Method '{method}' not found on class '{class}'")]
    MethodNotFound { class: String, method: String },

    #[error("Bad argument #{index}: expected {expected}, got {found}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: ArgType,
        found: String,
    },

    #[error("Native operation failed: {0}")]
    NativeOperationFailure(String),

    #[error("Method '{method}' is already registered on class '{class}'")]
    DuplicateMethod { class: String, method: String },

    #[error("Class '{0}' is already registered")]
    DuplicateClass(String),

    #[error("Class '{0}' is finalized and can no longer be modified")]
    ClassFinalized(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Script error: {0}")]
    Script(String),
}

impl BindingError {
    /// 错误分类名称，脚本侧据此区分错误种类
    pub fn kind(&self) -> &'static str {
        match self {
            BindingError::TypeMismatch { .. } => "TypeMismatch",
            BindingError::NullHandle => "NullHandle",
            BindingError::MethodNotFound { .. } => "MethodNotFound",
            BindingError::ArgumentTypeMismatch { .. } => "ArgumentTypeMismatch",
            BindingError::NativeOperationFailure(_) => "NativeOperationFailure",
            BindingError::DuplicateMethod { .. } => "DuplicateMethod",
            BindingError::DuplicateClass(_) => "DuplicateClass",
            BindingError::ClassFinalized(_) => "ClassFinalized",
            BindingError::UnknownClass(_) => "UnknownClass",
            BindingError::Script(_) => "ScriptError",
        }
    }
}

/// 原生播放器错误
#[derive(Error, Debug)]
pub enum MovieError {
    #[error("Movie not found: {0}")]
    NotFound(String),

    #[error("Movie contains no decodable frames: {0}")]
    NoFrames(String),

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Invalid movie manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("Operation '{operation}' is not valid while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid destination rectangle {width}x{height}")]
    InvalidRect { width: i32, height: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MovieError> for BindingError {
    fn from(err: MovieError) -> Self {
        BindingError::NativeOperationFailure(err.to_string())
    }
}

/// 绑定层结果类型别名
pub type BindingResult<T> = Result<T, BindingError>;
pub type MovieResult<T> = Result<T, MovieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_error_conversion() {
        let movie_err = MovieError::NotFound("intro.png".to_string());
        let binding_err: BindingError = movie_err.into();
        assert!(matches!(binding_err, BindingError::NativeOperationFailure(_)));
        assert_eq!(binding_err.kind(), "NativeOperationFailure");
    }

    #[test]
    fn test_error_display() {
        let err = BindingError::ArgumentTypeMismatch {
            index: 2,
            expected: ArgType::Int,
            found: "string".to_string(),
        };
        assert_eq!(err.to_string(), "Bad argument #2: expected integer, got string");
    }
}
