// SPDX-License-Identifier: CEPL-1.0
//! Vulkan capability provider for `corbeau-render`, built on ash.
mod convert;
mod device;
mod instance;
mod record;
mod swapchain;

use std::{fs, io, path::Path};

use corbeau_render::shader::{FRAGMENT_FILE, VERTEX_FILE};
use corbeau_render::{RenderResult, ShaderSet};

pub use device::VkDevice;
pub use instance::VkInstance;

/// SPIR-V compiled from `shaders/` at build time.
pub const VERTEX_SPIRV: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/basic.vert.spirv"));
pub const FRAGMENT_SPIRV: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/basic.frag.spirv"));

/// The shaders baked into the binary, validated like ones read from disk.
pub fn embedded_shaders() -> RenderResult<ShaderSet> {
  ShaderSet::from_bytes(VERTEX_SPIRV, FRAGMENT_SPIRV)
}

/// Writes the embedded SPIR-V into `dir` under the names the runtime
/// loader expects.
pub fn emit_shaders(dir: &Path) -> io::Result<()> {
  fs::create_dir_all(dir)?;
  fs::write(dir.join(VERTEX_FILE), VERTEX_SPIRV)?;
  fs::write(dir.join(FRAGMENT_FILE), FRAGMENT_SPIRV)?;
  Ok(())
}
