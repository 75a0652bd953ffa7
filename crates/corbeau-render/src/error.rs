// SPDX-License-Identifier: CEPL-1.0
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures reported by a capability provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    /// The presentation surface changed underneath the swapchain and the
    /// swapchain has to be rebuilt before it can be used again.
    #[error("presentation surface is out of date")]
    OutOfDate,
    /// The surface currently has a zero-sized extent (minimised window).
    #[error("presentation surface has a zero extent")]
    ZeroExtent,
    #[error("operation timed out")]
    Timeout,
    #[error("device lost")]
    DeviceLost,
    #[error("no memory type satisfies the requested properties")]
    NoSuitableMemoryType,
    #[error("unknown handle 0x{0:x}")]
    UnknownHandle(u64),
    /// The provider rejected a call that breaks an API usage rule.
    #[error("invalid usage: {0}")]
    InvalidUsage(&'static str),
    #[error("vulkan error {0}")]
    Vulkan(i32),
}

pub type GpuResult<T> = Result<T, GpuError>;

/// Everything the renderer can fail with.
///
/// Only [`RenderError::StaleSurface`] is recoverable; the renderer handles
/// it internally by rebuilding swapchain-level resources, it is exposed so
/// that callers driving their own loop can see what happened.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no device exposes a queue family that supports graphics and presentation")]
    NoSuitableDevice,
    #[error("failed to load shader {path}")]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shader {name} is not valid SPIR-V: {reason}")]
    InvalidShader { name: String, reason: &'static str },
    #[error("invalid packed image data: {0}")]
    ImageData(&'static str),
    #[error("timed out after {timeout:?} waiting for {what}")]
    SyncTimeout { what: &'static str, timeout: Duration },
    #[error("presentation surface is stale and must be rebuilt")]
    StaleSurface,
    #[error("acquired image index {index} but only {count} images exist")]
    ImageIndexOutOfRange { index: u32, count: usize },
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl RenderError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RenderError::StaleSurface)
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
