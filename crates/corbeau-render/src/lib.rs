// SPDX-License-Identifier: CEPL-1.0
//! Rendering core of the corbeau display server.
//!
//! Picks a device, builds the static and swapchain-level resources, seeds
//! the background image once, then draws one textured full-screen quad per
//! frame. The graphics API is reached through the [`GpuInstance`] and
//! [`GpuDevice`] traits.
#![deny(unsafe_op_in_unsafe_fn)]

pub mod background;
pub mod command;
pub mod config;
pub mod desc;
mod error;
pub mod frame_loop;
mod gpu;
mod handle;
pub mod renderer;
pub mod resources;
pub mod select;
pub mod shader;
pub mod swapchain;
pub mod types;
pub mod upload;

#[cfg(test)]
mod mock;

pub use config::RendererConfig;
pub use error::{GpuError, GpuResult, RenderError, RenderResult};
pub use frame_loop::{run_until_stopped, StopToken};
pub use gpu::{GpuDevice, GpuInstance};
pub use handle::*;
pub use renderer::{FrameOutcome, Renderer};
pub use shader::ShaderSet;
pub use types::Extent2D;
