// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CString;
use std::rc::Rc;
use std::time::Duration;

use ash::khr::swapchain;
use ash::vk::{self, Handle};
use tracing::{debug, info};

use corbeau_render::command::Command;
use corbeau_render::desc::*;
use corbeau_render::types::*;
use corbeau_render::*;

use crate::convert::{color_range, extent, gpu_err, rect, timeout_ns, vk_bool, IntoVk};
use crate::instance::InstanceShared;
use crate::record;
use crate::swapchain::Swapchain;

/// First memory type allowed by `type_bits` that has all of `required`.
pub(crate) fn find_memory_type(
  mem: &vk::PhysicalDeviceMemoryProperties,
  type_bits: u32,
  required: vk::MemoryPropertyFlags,
) -> Option<u32> {
  (0..mem.memory_type_count).find(|&i| {
    (type_bits & (1 << i)) != 0
      && mem.memory_types[i as usize].property_flags.contains(required)
  })
}

/// Logical device with its single queue and the swapchain of the surface.
pub struct VkDevice {
  device: ash::Device,
  phys: vk::PhysicalDevice,
  queue_family: u32,
  queue: vk::Queue,
  memory_properties: vk::PhysicalDeviceMemoryProperties,
  swapchain_loader: swapchain::Device,
  swapchain: Option<Swapchain>,
  shared: Rc<InstanceShared>,
}

impl Drop for VkDevice {
  fn drop(&mut self) {
    unsafe {
      let d = &self.device;
      d.device_wait_idle().ok();
      if let Some(sc) = self.swapchain.take() {
        sc.destroy(d, &self.swapchain_loader);
      }
      d.destroy_device(None);
    }
    debug!("Vulkan device destroyed");
  }
}

impl VkDevice {
  pub(crate) unsafe fn open(
    shared: Rc<InstanceShared>,
    phys: vk::PhysicalDevice,
    queue_family: u32,
    size: Extent2D,
  ) -> GpuResult<Self> {
    let priorities = [1.0_f32];
    let qinfo = vk::DeviceQueueCreateInfo {
      s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
      queue_family_index: queue_family,
      queue_count: 1,
      p_queue_priorities: priorities.as_ptr(),
      ..Default::default()
    };

    let device_exts = [swapchain::NAME.as_ptr()];
    let dinfo = vk::DeviceCreateInfo {
      s_type: vk::StructureType::DEVICE_CREATE_INFO,
      queue_create_info_count: 1,
      p_queue_create_infos: &qinfo,
      enabled_extension_count: device_exts.len() as u32,
      pp_enabled_extension_names: device_exts.as_ptr(),
      ..Default::default()
    };

    let instance = &shared.instance;
    let device = instance.create_device(phys, &dinfo, None).map_err(gpu_err)?;
    let queue = device.get_device_queue(queue_family, 0);
    let memory_properties = instance.get_physical_device_memory_properties(phys);
    let swapchain_loader = swapchain::Device::new(instance, &device);

    let mut this = VkDevice {
      device,
      phys,
      queue_family,
      queue,
      memory_properties,
      swapchain_loader,
      swapchain: None,
      shared,
    };
    // on failure `this` drops and takes the device with it
    this.swapchain = Some(Swapchain::create(
      &this.shared,
      &this.device,
      &this.swapchain_loader,
      this.phys,
      size,
      vk::SwapchainKHR::null(),
    )?);
    info!("Vulkan device ready (queue family {queue_family})");
    Ok(this)
  }
}

impl GpuDevice for VkDevice {
  fn queue_family(&self) -> u32 {
    self.queue_family
  }

  fn create_semaphore(&self) -> GpuResult<Semaphore> {
    let info = vk::SemaphoreCreateInfo {
      s_type: vk::StructureType::SEMAPHORE_CREATE_INFO,
      ..Default::default()
    };
    let s = unsafe { self.device.create_semaphore(&info, None) }.map_err(gpu_err)?;
    Ok(Semaphore(s.as_raw()))
  }

  fn create_fence(&self, signaled: bool) -> GpuResult<Fence> {
    let info = vk::FenceCreateInfo {
      s_type: vk::StructureType::FENCE_CREATE_INFO,
      flags: if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() },
      ..Default::default()
    };
    let f = unsafe { self.device.create_fence(&info, None) }.map_err(gpu_err)?;
    Ok(Fence(f.as_raw()))
  }

  fn wait_for_fence(&self, fence: Fence, timeout: Duration) -> GpuResult<FenceWait> {
    match unsafe { self.device.wait_for_fences(&[fence.vk()], true, timeout_ns(timeout)) } {
      Ok(()) => Ok(FenceWait::Signaled),
      Err(vk::Result::TIMEOUT) => Ok(FenceWait::TimedOut),
      Err(e) => Err(gpu_err(e)),
    }
  }

  fn reset_fence(&self, fence: Fence) -> GpuResult<()> {
    unsafe { self.device.reset_fences(&[fence.vk()]) }.map_err(gpu_err)
  }

  fn create_command_pool(&self, resettable: bool) -> GpuResult<CommandPool> {
    let pool_info = vk::CommandPoolCreateInfo {
      s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
      flags: if resettable {
        vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER
      } else {
        vk::CommandPoolCreateFlags::empty()
      },
      queue_family_index: self.queue_family,
      ..Default::default()
    };
    let pool = unsafe { self.device.create_command_pool(&pool_info, None) }.map_err(gpu_err)?;
    Ok(CommandPool(pool.as_raw()))
  }

  fn allocate_command_buffers(&self, pool: CommandPool, count: u32) -> GpuResult<Vec<CommandBuffer>> {
    let alloc_info = vk::CommandBufferAllocateInfo {
      s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
      command_pool: pool.vk(),
      level: vk::CommandBufferLevel::PRIMARY,
      command_buffer_count: count,
      ..Default::default()
    };
    let bufs = unsafe { self.device.allocate_command_buffers(&alloc_info) }.map_err(gpu_err)?;
    Ok(bufs.into_iter().map(|b| CommandBuffer(b.as_raw())).collect())
  }

  fn record(&self, buffer: CommandBuffer, usage: RecordUsage, commands: &[Command]) -> GpuResult<()> {
    let cmd = buffer.vk();
    let begin = vk::CommandBufferBeginInfo {
      s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
      flags: match usage {
        RecordUsage::OneTimeSubmit => vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        RecordUsage::Reusable => vk::CommandBufferUsageFlags::empty(),
      },
      ..Default::default()
    };
    unsafe {
      // begin implicitly resets, the pool allows it
      self.device.begin_command_buffer(cmd, &begin).map_err(gpu_err)?;
      record::replay(&self.device, cmd, commands);
      self.device.end_command_buffer(cmd).map_err(gpu_err)
    }
  }

  fn submit(&self, submission: &Submission<'_>) -> GpuResult<()> {
    let wait: Vec<vk::Semaphore> = submission.wait.iter().map(|(s, _)| s.vk()).collect();
    let stages: Vec<vk::PipelineStageFlags> = submission.wait.iter()
      .map(|(_, st)| vk::PipelineStageFlags::from_raw(st.bits()))
      .collect();
    let cmds: Vec<vk::CommandBuffer> = submission.command_buffers.iter().map(|c| c.vk()).collect();
    let signal: Vec<vk::Semaphore> = submission.signal.iter().map(|s| s.vk()).collect();

    let submit = vk::SubmitInfo {
      s_type: vk::StructureType::SUBMIT_INFO,
      wait_semaphore_count: wait.len() as u32,
      p_wait_semaphores: wait.as_ptr(),
      p_wait_dst_stage_mask: stages.as_ptr(),
      command_buffer_count: cmds.len() as u32,
      p_command_buffers: cmds.as_ptr(),
      signal_semaphore_count: signal.len() as u32,
      p_signal_semaphores: signal.as_ptr(),
      ..Default::default()
    };
    unsafe {
      self.device
        .queue_submit(self.queue, std::slice::from_ref(&submit), submission.fence.vk())
        .map_err(gpu_err)
    }
  }

  fn create_descriptor_set_layout(&self, bindings: &[DescriptorBinding]) -> GpuResult<DescriptorSetLayout> {
    let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings.iter().map(|b| vk::DescriptorSetLayoutBinding {
      binding: b.binding,
      descriptor_type: vk::DescriptorType::from_raw(b.kind as i32),
      descriptor_count: b.count,
      stage_flags: vk::ShaderStageFlags::from_raw(b.stages.bits()),
      ..Default::default()
    }).collect();
    let info = vk::DescriptorSetLayoutCreateInfo {
      s_type: vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO,
      binding_count: vk_bindings.len() as u32,
      p_bindings: vk_bindings.as_ptr(),
      ..Default::default()
    };
    let layout = unsafe { self.device.create_descriptor_set_layout(&info, None) }.map_err(gpu_err)?;
    Ok(DescriptorSetLayout(layout.as_raw()))
  }

  fn create_pipeline_layout(&self, set_layouts: &[DescriptorSetLayout]) -> GpuResult<PipelineLayout> {
    let layouts: Vec<vk::DescriptorSetLayout> = set_layouts.iter().map(|l| l.vk()).collect();
    let info = vk::PipelineLayoutCreateInfo {
      s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
      set_layout_count: layouts.len() as u32,
      p_set_layouts: layouts.as_ptr(),
      ..Default::default()
    };
    let layout = unsafe { self.device.create_pipeline_layout(&info, None) }.map_err(gpu_err)?;
    Ok(PipelineLayout(layout.as_raw()))
  }

  fn create_descriptor_pool(&self, max_sets: u32, sizes: &[DescriptorPoolSize]) -> GpuResult<DescriptorPool> {
    let pool_sizes: Vec<vk::DescriptorPoolSize> = sizes.iter().map(|s| vk::DescriptorPoolSize {
      ty: vk::DescriptorType::from_raw(s.kind as i32),
      descriptor_count: s.count,
    }).collect();
    let info = vk::DescriptorPoolCreateInfo {
      s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
      max_sets,
      pool_size_count: pool_sizes.len() as u32,
      p_pool_sizes: pool_sizes.as_ptr(),
      ..Default::default()
    };
    let pool = unsafe { self.device.create_descriptor_pool(&info, None) }.map_err(gpu_err)?;
    Ok(DescriptorPool(pool.as_raw()))
  }

  fn allocate_descriptor_set(&self, pool: DescriptorPool, layout: DescriptorSetLayout) -> GpuResult<DescriptorSet> {
    let layouts = [layout.vk()];
    let info = vk::DescriptorSetAllocateInfo {
      s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
      descriptor_pool: pool.vk(),
      descriptor_set_count: 1,
      p_set_layouts: layouts.as_ptr(),
      ..Default::default()
    };
    let sets = unsafe { self.device.allocate_descriptor_sets(&info) }.map_err(gpu_err)?;
    let set = sets.first().ok_or(GpuError::InvalidUsage("descriptor pool returned no set"))?;
    Ok(DescriptorSet(set.as_raw()))
  }

  fn write_image_descriptor(
    &self,
    set: DescriptorSet,
    binding: u32,
    sampler: Sampler,
    view: ImageView,
    layout: ImageLayout,
  ) -> GpuResult<()> {
    let image_info = vk::DescriptorImageInfo {
      sampler: sampler.vk(),
      image_view: view.vk(),
      image_layout: vk::ImageLayout::from_raw(layout as i32),
    };
    let write = vk::WriteDescriptorSet {
      s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
      dst_set: set.vk(),
      dst_binding: binding,
      dst_array_element: 0,
      descriptor_count: 1,
      descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
      p_image_info: &image_info,
      ..Default::default()
    };
    unsafe { self.device.update_descriptor_sets(&[write], &[]) };
    Ok(())
  }

  fn create_shader_module(&self, code: &[u32]) -> GpuResult<ShaderModule> {
    let info = vk::ShaderModuleCreateInfo {
      s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
      p_code: code.as_ptr(),
      code_size: code.len() * 4,
      ..Default::default()
    };
    let module = unsafe { self.device.create_shader_module(&info, None) }.map_err(gpu_err)?;
    Ok(ShaderModule(module.as_raw()))
  }

  fn create_sampler(&self, desc: &SamplerDesc) -> GpuResult<Sampler> {
    let address_mode = vk::SamplerAddressMode::from_raw(desc.address_mode as i32);
    let info = vk::SamplerCreateInfo {
      s_type: vk::StructureType::SAMPLER_CREATE_INFO,
      mag_filter: vk::Filter::from_raw(desc.mag_filter as i32),
      min_filter: vk::Filter::from_raw(desc.min_filter as i32),
      mipmap_mode: vk::SamplerMipmapMode::NEAREST,
      address_mode_u: address_mode,
      address_mode_v: address_mode,
      address_mode_w: address_mode,
      max_anisotropy: 1.0,
      compare_op: vk::CompareOp::ALWAYS,
      border_color: vk::BorderColor::INT_OPAQUE_BLACK,
      unnormalized_coordinates: vk::FALSE,
      ..Default::default()
    };
    let sampler = unsafe { self.device.create_sampler(&info, None) }.map_err(gpu_err)?;
    Ok(Sampler(sampler.as_raw()))
  }

  fn create_buffer(&self, desc: &BufferDesc) -> GpuResult<Buffer> {
    let bci = vk::BufferCreateInfo {
      s_type: vk::StructureType::BUFFER_CREATE_INFO,
      size: desc.size,
      usage: vk::BufferUsageFlags::from_raw(desc.usage.bits()),
      sharing_mode: vk::SharingMode::EXCLUSIVE,
      ..Default::default()
    };
    let buf = unsafe { self.device.create_buffer(&bci, None) }.map_err(gpu_err)?;
    Ok(Buffer(buf.as_raw()))
  }

  fn buffer_memory_requirements(&self, buffer: Buffer) -> GpuResult<MemoryRequirements> {
    let req = unsafe { self.device.get_buffer_memory_requirements(buffer.vk()) };
    Ok(MemoryRequirements { size: req.size, alignment: req.alignment, type_bits: req.memory_type_bits })
  }

  fn create_image(&self, desc: &ImageDesc) -> GpuResult<Image> {
    let e = extent(desc.extent);
    let info = vk::ImageCreateInfo {
      s_type: vk::StructureType::IMAGE_CREATE_INFO,
      image_type: vk::ImageType::TYPE_2D,
      format: vk::Format::from_raw(desc.format.0),
      extent: vk::Extent3D { width: e.width, height: e.height, depth: 1 },
      mip_levels: 1,
      array_layers: 1,
      samples: vk::SampleCountFlags::TYPE_1,
      tiling: vk::ImageTiling::OPTIMAL,
      usage: vk::ImageUsageFlags::from_raw(desc.usage.bits()),
      sharing_mode: vk::SharingMode::EXCLUSIVE,
      initial_layout: vk::ImageLayout::UNDEFINED,
      ..Default::default()
    };
    let img = unsafe { self.device.create_image(&info, None) }.map_err(gpu_err)?;
    Ok(Image(img.as_raw()))
  }

  fn image_memory_requirements(&self, image: Image) -> GpuResult<MemoryRequirements> {
    let req = unsafe { self.device.get_image_memory_requirements(image.vk()) };
    Ok(MemoryRequirements { size: req.size, alignment: req.alignment, type_bits: req.memory_type_bits })
  }

  fn create_image_view(&self, image: Image, format: Format) -> GpuResult<ImageView> {
    let iv_info = vk::ImageViewCreateInfo {
      s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
      image: image.vk(),
      view_type: vk::ImageViewType::TYPE_2D,
      format: vk::Format::from_raw(format.0),
      subresource_range: color_range(),
      ..Default::default()
    };
    let view = unsafe { self.device.create_image_view(&iv_info, None) }.map_err(gpu_err)?;
    Ok(ImageView(view.as_raw()))
  }

  fn allocate_memory(
    &self,
    requirements: &MemoryRequirements,
    properties: MemoryProperties,
  ) -> GpuResult<DeviceMemory> {
    let required = vk::MemoryPropertyFlags::from_raw(properties.bits());
    let mem_type = find_memory_type(&self.memory_properties, requirements.type_bits, required)
      .ok_or(GpuError::NoSuitableMemoryType)?;
    let mai = vk::MemoryAllocateInfo {
      s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
      allocation_size: requirements.size,
      memory_type_index: mem_type,
      ..Default::default()
    };
    let mem = unsafe { self.device.allocate_memory(&mai, None) }.map_err(gpu_err)?;
    Ok(DeviceMemory(mem.as_raw()))
  }

  fn bind_buffer_memory(&self, buffer: Buffer, memory: DeviceMemory, offset: u64) -> GpuResult<()> {
    unsafe { self.device.bind_buffer_memory(buffer.vk(), memory.vk(), offset) }.map_err(gpu_err)
  }

  fn bind_image_memory(&self, image: Image, memory: DeviceMemory, offset: u64) -> GpuResult<()> {
    unsafe { self.device.bind_image_memory(image.vk(), memory.vk(), offset) }.map_err(gpu_err)
  }

  fn write_memory(&self, memory: DeviceMemory, offset: u64, data: &[u8]) -> GpuResult<()> {
    unsafe {
      let ptr = self.device
        .map_memory(memory.vk(), offset, data.len() as vk::DeviceSize, vk::MemoryMapFlags::empty())
        .map_err(gpu_err)?;
      std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
      self.device.unmap_memory(memory.vk());
    }
    Ok(())
  }

  fn create_render_pass(&self, desc: &RenderPassDesc) -> GpuResult<RenderPass> {
    let attachments: Vec<vk::AttachmentDescription> = desc.attachments.iter().map(|a| vk::AttachmentDescription {
      format: vk::Format::from_raw(a.format.0),
      samples: vk::SampleCountFlags::TYPE_1,
      load_op: vk::AttachmentLoadOp::from_raw(a.load_op as i32),
      store_op: vk::AttachmentStoreOp::from_raw(a.store_op as i32),
      stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
      stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
      initial_layout: vk::ImageLayout::from_raw(a.initial_layout as i32),
      final_layout: vk::ImageLayout::from_raw(a.final_layout as i32),
      ..Default::default()
    }).collect();
    let color_refs: Vec<vk::AttachmentReference> = desc.color_refs.iter().map(|r| vk::AttachmentReference {
      attachment: r.attachment,
      layout: vk::ImageLayout::from_raw(r.layout as i32),
    }).collect();

    let subpass = vk::SubpassDescription {
      pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
      color_attachment_count: color_refs.len() as u32,
      p_color_attachments: color_refs.as_ptr(),
      ..Default::default()
    };
    // the layout transition waits for the acquire semaphore, which is
    // waited on at the colour output stage
    let dependency = vk::SubpassDependency {
      src_subpass: vk::SUBPASS_EXTERNAL,
      dst_subpass: 0,
      src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
      dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
      src_access_mask: vk::AccessFlags::empty(),
      dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
      ..Default::default()
    };

    let rp_info = vk::RenderPassCreateInfo {
      s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
      attachment_count: attachments.len() as u32,
      p_attachments: attachments.as_ptr(),
      subpass_count: 1,
      p_subpasses: &subpass,
      dependency_count: 1,
      p_dependencies: &dependency,
      ..Default::default()
    };
    let rp = unsafe { self.device.create_render_pass(&rp_info, None) }.map_err(gpu_err)?;
    Ok(RenderPass(rp.as_raw()))
  }

  fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> GpuResult<Pipeline> {
    let names = desc.stages.iter()
      .map(|s| CString::new(s.entry_point))
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| GpuError::InvalidUsage("shader entry point contains a NUL byte"))?;

    // specialization data has to stay put until the pipeline exists
    let spec_entries: Vec<Vec<vk::SpecializationMapEntry>> = desc.stages.iter().map(|s| {
      s.specialization.iter().flat_map(|sp| &sp.entries).map(|e| vk::SpecializationMapEntry {
        constant_id: e.constant_id,
        offset: e.offset,
        size: e.size,
      }).collect()
    }).collect();
    let spec_infos: Vec<Option<vk::SpecializationInfo>> = desc.stages.iter().zip(&spec_entries).map(|(s, entries)| {
      s.specialization.as_ref().map(|sp| vk::SpecializationInfo {
        map_entry_count: entries.len() as u32,
        p_map_entries: entries.as_ptr(),
        data_size: sp.data.len(),
        p_data: sp.data.as_ptr().cast(),
        ..Default::default()
      })
    }).collect();

    let stages: Vec<vk::PipelineShaderStageCreateInfo> = desc.stages.iter().enumerate().map(|(i, s)| {
      vk::PipelineShaderStageCreateInfo {
        s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
        stage: vk::ShaderStageFlags::from_raw(s.stage.bits()),
        module: s.module.vk(),
        p_name: names[i].as_ptr(),
        p_specialization_info: spec_infos[i].as_ref().map_or(std::ptr::null(), |info| info as *const _),
        ..Default::default()
      }
    }).collect();

    let bindings: Vec<vk::VertexInputBindingDescription> = desc.vertex_bindings.iter().map(|b| {
      vk::VertexInputBindingDescription {
        binding: b.binding,
        stride: b.stride,
        input_rate: vk::VertexInputRate::VERTEX,
      }
    }).collect();
    let attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_attributes.iter().map(|a| {
      vk::VertexInputAttributeDescription {
        location: a.location,
        binding: a.binding,
        format: vk::Format::from_raw(a.format.0),
        offset: a.offset,
      }
    }).collect();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo {
      s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
      vertex_binding_description_count: bindings.len() as u32,
      p_vertex_binding_descriptions: bindings.as_ptr(),
      vertex_attribute_description_count: attributes.len() as u32,
      p_vertex_attribute_descriptions: attributes.as_ptr(),
      ..Default::default()
    };
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
      s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
      topology: vk::PrimitiveTopology::from_raw(desc.topology as i32),
      primitive_restart_enable: vk_bool(desc.primitive_restart),
      ..Default::default()
    };

    let vp = desc.viewport;
    let viewport = vk::Viewport {
      x: vp.x,
      y: vp.y,
      width: vp.width,
      height: vp.height,
      min_depth: vp.min_depth,
      max_depth: vp.max_depth,
    };
    let scissor = rect(desc.scissor);
    let viewport_state = vk::PipelineViewportStateCreateInfo {
      s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
      viewport_count: 1,
      p_viewports: &viewport,
      scissor_count: 1,
      p_scissors: &scissor,
      ..Default::default()
    };

    let r = desc.rasterization;
    let raster = vk::PipelineRasterizationStateCreateInfo {
      s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
      depth_clamp_enable: vk_bool(r.depth_clamp),
      rasterizer_discard_enable: vk_bool(r.rasterizer_discard),
      polygon_mode: vk::PolygonMode::from_raw(r.polygon_mode as i32),
      cull_mode: vk::CullModeFlags::from_raw(r.cull_mode as u32),
      front_face: vk::FrontFace::from_raw(r.front_face as i32),
      depth_bias_enable: vk_bool(r.depth_bias),
      line_width: r.line_width,
      ..Default::default()
    };
    let multisample = vk::PipelineMultisampleStateCreateInfo {
      s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
      rasterization_samples: vk::SampleCountFlags::from_raw(desc.sample_count),
      ..Default::default()
    };
    let blend_attachment = vk::PipelineColorBlendAttachmentState {
      blend_enable: vk_bool(desc.color_blend.blend_enable),
      color_write_mask: vk::ColorComponentFlags::from_raw(desc.color_blend.write_mask.bits()),
      ..Default::default()
    };
    let color_blend = vk::PipelineColorBlendStateCreateInfo {
      s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
      attachment_count: 1,
      p_attachments: &blend_attachment,
      ..Default::default()
    };

    let info = vk::GraphicsPipelineCreateInfo {
      s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
      stage_count: stages.len() as u32,
      p_stages: stages.as_ptr(),
      p_vertex_input_state: &vertex_input,
      p_input_assembly_state: &input_assembly,
      p_viewport_state: &viewport_state,
      p_rasterization_state: &raster,
      p_multisample_state: &multisample,
      p_color_blend_state: &color_blend,
      layout: desc.layout.vk(),
      render_pass: desc.render_pass.vk(),
      subpass: desc.subpass,
      ..Default::default()
    };

    let pipelines = unsafe {
      self.device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
    }.map_err(|(_, e)| gpu_err(e))?;
    let pipeline = pipelines.first().ok_or(GpuError::InvalidUsage("driver returned no pipeline"))?;
    Ok(Pipeline(pipeline.as_raw()))
  }

  fn create_framebuffer(
    &self,
    render_pass: RenderPass,
    attachment: ImageView,
    size: Extent2D,
  ) -> GpuResult<Framebuffer> {
    let view = attachment.vk();
    let fb_info = vk::FramebufferCreateInfo {
      s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
      render_pass: render_pass.vk(),
      attachment_count: 1,
      p_attachments: &view,
      width: size.width,
      height: size.height,
      layers: 1,
      ..Default::default()
    };
    let fb = unsafe { self.device.create_framebuffer(&fb_info, None) }.map_err(gpu_err)?;
    Ok(Framebuffer(fb.as_raw()))
  }

  fn swapchain(&self) -> SwapchainInfo {
    match &self.swapchain {
      Some(sc) => sc.info(),
      None => SwapchainInfo {
        extent: Extent2D::default(),
        format: Format::UNDEFINED,
        image_views: Vec::new(),
      },
    }
  }

  fn recreate_swapchain(&mut self, extent_hint: Extent2D) -> GpuResult<SwapchainInfo> {
    let old = self.swapchain.take();
    let old_handle = old.as_ref().map_or(vk::SwapchainKHR::null(), |sc| sc.handle);
    unsafe {
      let created = Swapchain::create(
        &self.shared,
        &self.device,
        &self.swapchain_loader,
        self.phys,
        extent_hint,
        old_handle,
      );
      if let Some(old) = old {
        old.destroy(&self.device, &self.swapchain_loader);
      }
      let sc = created?;
      let info = sc.info();
      self.swapchain = Some(sc);
      Ok(info)
    }
  }

  fn acquire_next_image(&self, signal: Semaphore, timeout: Duration) -> GpuResult<Acquired> {
    let sc = self.swapchain.as_ref().ok_or(GpuError::OutOfDate)?;
    let (index, suboptimal) = unsafe {
      self.swapchain_loader.acquire_next_image(sc.handle, timeout_ns(timeout), signal.vk(), vk::Fence::null())
    }.map_err(gpu_err)?;
    Ok(Acquired { index, suboptimal })
  }

  fn present(&self, image_index: u32, wait: Semaphore) -> GpuResult<bool> {
    let sc = self.swapchain.as_ref().ok_or(GpuError::OutOfDate)?;
    let wait = wait.vk();
    let present = vk::PresentInfoKHR {
      s_type: vk::StructureType::PRESENT_INFO_KHR,
      wait_semaphore_count: 1,
      p_wait_semaphores: &wait,
      swapchain_count: 1,
      p_swapchains: &sc.handle,
      p_image_indices: &image_index,
      ..Default::default()
    };
    unsafe { self.swapchain_loader.queue_present(self.queue, &present) }.map_err(gpu_err)
  }

  fn destroy(&self, object: GpuObject) -> GpuResult<()> {
    let d = &self.device;
    unsafe {
      match object {
        GpuObject::Semaphore(s) => d.destroy_semaphore(s.vk(), None),
        GpuObject::Fence(f) => d.destroy_fence(f.vk(), None),
        GpuObject::CommandPool(p) => d.destroy_command_pool(p.vk(), None),
        GpuObject::CommandBuffer { pool, buffer } => d.free_command_buffers(pool.vk(), &[buffer.vk()]),
        GpuObject::DescriptorSetLayout(l) => d.destroy_descriptor_set_layout(l.vk(), None),
        GpuObject::DescriptorPool(p) => d.destroy_descriptor_pool(p.vk(), None),
        GpuObject::PipelineLayout(l) => d.destroy_pipeline_layout(l.vk(), None),
        GpuObject::ShaderModule(m) => d.destroy_shader_module(m.vk(), None),
        GpuObject::Sampler(s) => d.destroy_sampler(s.vk(), None),
        GpuObject::Buffer(b) => d.destroy_buffer(b.vk(), None),
        GpuObject::Image(i) => d.destroy_image(i.vk(), None),
        GpuObject::ImageView(v) => d.destroy_image_view(v.vk(), None),
        GpuObject::Memory(m) => d.free_memory(m.vk(), None),
        GpuObject::RenderPass(rp) => d.destroy_render_pass(rp.vk(), None),
        GpuObject::Pipeline(p) => d.destroy_pipeline(p.vk(), None),
        GpuObject::Framebuffer(fb) => d.destroy_framebuffer(fb.vk(), None),
      }
    }
    Ok(())
  }
}
