//! # 错误类型
//!
//! 单个场景内的所有失败都汇总为 [`RenderError`]。调用方据此决定跳过当前场景
//! 还是以特殊退出码结束（资源不足）。

use std::collections::TryReserveError;
use thiserror::Error;

/// 渲染流水线的结果类型
pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    /// 必需的配置项缺失
    #[error("required value absent: [{section}] {key}")]
    MissingValue { section: String, key: String },

    /// 配置项存在但格式不正确
    #[error("malformed value for [{section}] {key}: {reason}")]
    MalformedValue {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown figure type '{value}' in [{section}]")]
    UnknownFigureType { section: String, value: String },

    #[error("unknown render mode '{0}'")]
    UnknownRenderMode(String),

    #[error("invalid L-system grammar: {0}")]
    InvalidGrammar(String),

    /// 三角化的前置条件：面至少包含3个顶点
    #[error("face {face} has {len} indices, at least 3 are required")]
    DegenerateFace { face: usize, len: usize },

    #[error("face index {index} out of range for a figure with {points} points")]
    FaceIndexOutOfRange { index: usize, points: usize },

    /// 海龟解释器在空栈上执行了出栈
    #[error("turtle state stack is empty at symbol {position}")]
    TurtleStackUnderflow { position: usize },

    /// 视点与原点重合，看向原点的方向无定义
    #[error("viewpoint coincides with the origin")]
    ViewpointAtOrigin,

    #[error("matrix is not invertible")]
    SingularMatrix,

    /// 大缓冲区分配失败，与普通错误区分（退出码100）
    #[error("insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl RenderError {
    pub fn missing(section: &str, key: &str) -> Self {
        RenderError::MissingValue {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn malformed(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RenderError::MalformedValue {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// 分配失败 -> 资源不足
    pub fn allocation(what: &str, err: TryReserveError) -> Self {
        RenderError::InsufficientResources(format!("{what}: {err}"))
    }

    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, RenderError::InsufficientResources(_))
    }
}

/// 按给定元素数量预留空间的 `Vec`，失败时返回资源不足错误
pub fn try_vec_with_capacity<T>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| RenderError::allocation(what, e))?;
    Ok(buffer)
}

/// 分配并填充固定长度的缓冲区
pub fn try_filled_vec<T: Clone>(len: usize, value: T, what: &str) -> Result<Vec<T>> {
    let mut buffer = try_vec_with_capacity(len, what)?;
    buffer.resize(len, value);
    Ok(buffer)
}
