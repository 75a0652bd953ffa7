// SPDX-License-Identifier: CEPL-1.0
use ash::khr::swapchain;
use ash::vk::{self, Handle};
use tracing::{debug, info};

use corbeau_render::desc::SwapchainInfo;
use corbeau_render::types::{Extent2D, Format};
use corbeau_render::{GpuError, GpuResult, ImageView};

use crate::convert::{color_range, gpu_err};
use crate::instance::InstanceShared;

pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
  formats.iter().copied().find(|f|
    f.format == vk::Format::B8G8R8A8_UNORM &&
    f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
  ).or_else(|| formats.first().copied())
}

pub(crate) fn extent_from_caps(caps: &vk::SurfaceCapabilitiesKHR, want: Extent2D) -> vk::Extent2D {
  if caps.current_extent.width != u32::MAX {
    caps.current_extent
  } else {
    vk::Extent2D {
      width:  want.width.clamp(caps.min_image_extent.width,  caps.max_image_extent.width),
      height: want.height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
  }
}

/// One more than the minimum so acquire rarely blocks on the presenter.
pub(crate) fn image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
  if caps.max_image_count == 0 {
    caps.min_image_count + 1
  } else {
    (caps.min_image_count + 1).min(caps.max_image_count)
  }
}

/// Presentation images of the surface and a view for each of them.
pub(crate) struct Swapchain {
  pub handle: vk::SwapchainKHR,
  pub format: vk::SurfaceFormatKHR,
  pub extent: vk::Extent2D,
  pub views: Vec<vk::ImageView>,
}

impl Swapchain {
  /// Builds a swapchain for the surface's current state. `old` is retired
  /// by the driver but still has to be destroyed by the caller.
  pub(crate) unsafe fn create(
    shared: &InstanceShared,
    device: &ash::Device,
    loader: &swapchain::Device,
    phys: vk::PhysicalDevice,
    hint: Extent2D,
    old: vk::SwapchainKHR,
  ) -> GpuResult<Self> {
    let surface_loader = &shared.surface_loader;
    let caps = surface_loader
      .get_physical_device_surface_capabilities(phys, shared.surface)
      .map_err(gpu_err)?;
    let formats = surface_loader
      .get_physical_device_surface_formats(phys, shared.surface)
      .map_err(gpu_err)?;

    let extent = extent_from_caps(&caps, hint);
    if extent.width == 0 || extent.height == 0 {
      return Err(GpuError::ZeroExtent);
    }
    let format = choose_surface_format(&formats)
      .ok_or(GpuError::InvalidUsage("surface reports no formats"))?;

    let swap_info = vk::SwapchainCreateInfoKHR {
      s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
      surface: shared.surface,
      min_image_count: image_count(&caps),
      image_format: format.format,
      image_color_space: format.color_space,
      image_extent: extent,
      image_array_layers: 1,
      image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
      image_sharing_mode: vk::SharingMode::EXCLUSIVE,
      pre_transform: caps.current_transform,
      composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
      // the only mode every driver has to support
      present_mode: vk::PresentModeKHR::FIFO,
      clipped: vk::TRUE,
      old_swapchain: old,
      ..Default::default()
    };
    let handle = loader.create_swapchain(&swap_info, None).map_err(gpu_err)?;

    let mut this = Swapchain { handle, format, extent, views: Vec::new() };
    let images = match loader.get_swapchain_images(handle) {
      Ok(images) => images,
      Err(e) => {
        this.destroy(device, loader);
        return Err(gpu_err(e));
      }
    };
    for img in images {
      let iv_info = vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        image: img,
        view_type: vk::ImageViewType::TYPE_2D,
        format: format.format,
        subresource_range: color_range(),
        ..Default::default()
      };
      match device.create_image_view(&iv_info, None) {
        Ok(view) => this.views.push(view),
        Err(e) => {
          this.destroy(device, loader);
          return Err(gpu_err(e));
        }
      }
    }

    info!(
      "Vulkan swapchain ready ({}x{}, fmt 0x{:x}, {} images)",
      extent.width, extent.height, format.format.as_raw(), this.views.len()
    );
    Ok(this)
  }

  pub(crate) fn info(&self) -> SwapchainInfo {
    SwapchainInfo {
      extent: Extent2D::new(self.extent.width, self.extent.height),
      format: Format(self.format.format.as_raw()),
      image_views: self.views.iter().map(|v| ImageView(v.as_raw())).collect(),
    }
  }

  pub(crate) unsafe fn destroy(self, device: &ash::Device, loader: &swapchain::Device) {
    debug!("destroying swapchain 0x{:x}", self.handle.as_raw());
    for &iv in &self.views { device.destroy_image_view(iv, None); }
    loader.destroy_swapchain(self.handle, None);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn caps(current: (u32, u32), min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
      current_extent: vk::Extent2D { width: current.0, height: current.1 },
      min_image_extent: vk::Extent2D { width: 1, height: 1 },
      max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
      min_image_count: min_count,
      max_image_count: max_count,
      ..Default::default()
    }
  }

  #[test]
  fn prefers_bgra_unorm_srgb_nonlinear() {
    let srgb = vk::SurfaceFormatKHR {
      format: vk::Format::B8G8R8A8_SRGB,
      color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    let unorm = vk::SurfaceFormatKHR {
      format: vk::Format::B8G8R8A8_UNORM,
      color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    let pick = |formats: &[vk::SurfaceFormatKHR]| choose_surface_format(formats).map(|f| f.format);
    assert_eq!(pick(&[srgb, unorm]), Some(vk::Format::B8G8R8A8_UNORM));
    assert_eq!(pick(&[srgb]), Some(vk::Format::B8G8R8A8_SRGB));
    assert_eq!(pick(&[]), None);
  }

  #[test]
  fn surface_extent_wins_over_hint() {
    let fixed = caps((800, 600), 2, 0);
    assert_eq!(extent_from_caps(&fixed, Extent2D::new(10, 10)), vk::Extent2D { width: 800, height: 600 });

    let free = caps((u32::MAX, u32::MAX), 2, 0);
    let e = extent_from_caps(&free, Extent2D::new(10_000, 300));
    assert_eq!((e.width, e.height), (4096, 300));
  }

  #[test]
  fn asks_for_one_image_above_minimum() {
    assert_eq!(image_count(&caps((1, 1), 2, 0)), 3);
    assert_eq!(image_count(&caps((1, 1), 2, 8)), 3);
    assert_eq!(image_count(&caps((1, 1), 3, 3)), 3);
  }
}
