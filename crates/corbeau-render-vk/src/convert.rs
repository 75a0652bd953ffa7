// SPDX-License-Identifier: CEPL-1.0
//! Mapping between the renderer's plain types and ash's.
use std::time::Duration;

use ash::vk::{self, Handle};
use corbeau_render::types::{Extent2D, Rect2D};
use corbeau_render::*;

/// Our handles carry the raw Vulkan value, so conversion is a re-tag.
pub(crate) trait IntoVk {
  type Vk;
  fn vk(self) -> Self::Vk;
}

macro_rules! handle_map {
  ($($ours:ident => $theirs:ident),* $(,)?) => {$(
    impl IntoVk for $ours {
      type Vk = vk::$theirs;

      #[inline]
      fn vk(self) -> vk::$theirs {
        vk::$theirs::from_raw(self.0)
      }
    }
  )*};
}

handle_map!(
  PhysicalDeviceId => PhysicalDevice,
  Semaphore => Semaphore,
  Fence => Fence,
  CommandPool => CommandPool,
  CommandBuffer => CommandBuffer,
  DescriptorSetLayout => DescriptorSetLayout,
  DescriptorPool => DescriptorPool,
  DescriptorSet => DescriptorSet,
  PipelineLayout => PipelineLayout,
  ShaderModule => ShaderModule,
  Sampler => Sampler,
  Buffer => Buffer,
  Image => Image,
  ImageView => ImageView,
  DeviceMemory => DeviceMemory,
  RenderPass => RenderPass,
  Pipeline => Pipeline,
  Framebuffer => Framebuffer,
);

pub(crate) fn gpu_err(e: vk::Result) -> GpuError {
  match e {
    vk::Result::ERROR_OUT_OF_DATE_KHR => GpuError::OutOfDate,
    vk::Result::ERROR_DEVICE_LOST => GpuError::DeviceLost,
    vk::Result::TIMEOUT | vk::Result::NOT_READY => GpuError::Timeout,
    other => GpuError::Vulkan(other.as_raw()),
  }
}

pub(crate) fn timeout_ns(timeout: Duration) -> u64 {
  u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

pub(crate) fn vk_bool(b: bool) -> vk::Bool32 {
  if b { vk::TRUE } else { vk::FALSE }
}

pub(crate) fn extent(e: Extent2D) -> vk::Extent2D {
  vk::Extent2D { width: e.width, height: e.height }
}

pub(crate) fn rect(r: Rect2D) -> vk::Rect2D {
  vk::Rect2D {
    offset: vk::Offset2D { x: r.offset.x, y: r.offset.y },
    extent: extent(r.extent),
  }
}

pub(crate) fn color_range() -> vk::ImageSubresourceRange {
  vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0, level_count: 1,
    base_array_layer: 0, layer_count: 1,
  }
}
