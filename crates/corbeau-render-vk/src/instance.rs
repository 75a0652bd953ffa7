// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CStr;
use std::rc::Rc;

use anyhow::{Context, Result};
use ash::khr::surface;
use ash::vk::{self, Handle};
use ash::{Entry, Instance};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use tracing::{debug, info};

use corbeau_render::desc::{DeviceReport, QueueFamily};
use corbeau_render::types::{DeviceClass, Extent2D, QueueCapabilities};
use corbeau_render::{GpuInstance, GpuResult, PhysicalDeviceId};

use crate::convert::{gpu_err, IntoVk};
use crate::device::VkDevice;

const APP_NAME: &CStr = c"corbeau";

/// Instance-level objects. Devices keep a reference so the surface and the
/// instance outlive every swapchain and device created from them.
pub(crate) struct InstanceShared {
  pub _entry: Entry,
  pub instance: Instance,
  pub surface_loader: surface::Instance,
  pub surface: vk::SurfaceKHR,
}

impl Drop for InstanceShared {
  fn drop(&mut self) {
    unsafe {
      self.surface_loader.destroy_surface(self.surface, None);
      self.instance.destroy_instance(None);
    }
    debug!("Vulkan instance destroyed");
  }
}

unsafe fn create_instance(entry: &Entry, display_raw: RawDisplayHandle) -> Result<Instance> {
  let app_info = vk::ApplicationInfo {
    s_type: vk::StructureType::APPLICATION_INFO,
    p_application_name: APP_NAME.as_ptr(),
    application_version: 0,
    p_engine_name: APP_NAME.as_ptr(),
    engine_version: 0,
    api_version: vk::API_VERSION_1_0,
    ..Default::default()
  };

  let ext_slice = ash_window::enumerate_required_extensions(display_raw)
    .context("enumerate_required_extensions")?;

  let create_info = vk::InstanceCreateInfo {
    s_type: vk::StructureType::INSTANCE_CREATE_INFO,
    p_application_info: &app_info,
    enabled_extension_count: ext_slice.len() as u32,
    pp_enabled_extension_names: ext_slice.as_ptr(),
    ..Default::default()
  };

  Ok(entry.create_instance(&create_info, None)?)
}

/// The Vulkan instance plus the surface of one window.
pub struct VkInstance {
  shared: Rc<InstanceShared>,
  size: Extent2D,
}

impl VkInstance {
  /// `size` is the window's inner size, used when the surface leaves the
  /// swapchain extent to the application. The window has to outlive the
  /// instance and everything opened from it.
  pub fn new(window: &dyn HasWindowHandle, display: &dyn HasDisplayHandle, size: Extent2D) -> Result<Self> {
    let dh = display.display_handle().context("display_handle")?.as_raw();
    let wh = window.window_handle().context("window_handle")?.as_raw();

    unsafe {
      let entry = Entry::linked();
      let instance = create_instance(&entry, dh).context("create_instance")?;

      let surface = match ash_window::create_surface(&entry, &instance, dh, wh, None) {
        Ok(surface) => surface,
        Err(e) => {
          instance.destroy_instance(None);
          return Err(e).context("ash_window::create_surface");
        }
      };
      let surface_loader = surface::Instance::new(&entry, &instance);
      info!("Vulkan instance and surface ready");

      Ok(Self {
        shared: Rc::new(InstanceShared { _entry: entry, instance, surface_loader, surface }),
        size,
      })
    }
  }

  /// Size handed to the first swapchain of the next opened device.
  pub fn set_size(&mut self, size: Extent2D) {
    self.size = size;
  }
}

impl GpuInstance for VkInstance {
  type Device = VkDevice;

  fn enumerate_devices(&self) -> GpuResult<Vec<DeviceReport>> {
    let instance = &self.shared.instance;
    let phys = unsafe { instance.enumerate_physical_devices() }.map_err(gpu_err)?;

    Ok(phys.into_iter().map(|p| {
      let props = unsafe { instance.get_physical_device_properties(p) };
      let name = props.device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from("<unnamed>"));
      let queue_families = unsafe { instance.get_physical_device_queue_family_properties(p) }
        .iter()
        .map(|q| QueueFamily {
          capabilities: QueueCapabilities::from_bits_truncate(q.queue_flags.as_raw()),
          queue_count: q.queue_count,
        })
        .collect();
      DeviceReport {
        id: PhysicalDeviceId(p.as_raw()),
        name,
        class: DeviceClass::from_raw(props.device_type.as_raw()),
        queue_families,
      }
    }).collect())
  }

  fn supports_present(&self, device: PhysicalDeviceId, queue_family: u32) -> GpuResult<bool> {
    unsafe {
      self.shared.surface_loader
        .get_physical_device_surface_support(device.vk(), queue_family, self.shared.surface)
        .map_err(gpu_err)
    }
  }

  fn open_device(&mut self, device: PhysicalDeviceId, queue_family: u32) -> GpuResult<VkDevice> {
    unsafe { VkDevice::open(Rc::clone(&self.shared), device.vk(), queue_family, self.size) }
  }
}
