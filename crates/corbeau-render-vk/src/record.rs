// SPDX-License-Identifier: CEPL-1.0
//! Replays a recorded command list into a Vulkan command buffer.
use ash::vk;

use corbeau_render::command::Command;

use crate::convert::{color_range, extent, rect, IntoVk};

pub(crate) unsafe fn replay(device: &ash::Device, cmd: vk::CommandBuffer, commands: &[Command]) {
  for command in commands {
    match command {
      Command::PipelineBarrier { src_stage, dst_stage, image_barriers } => {
        let barriers: Vec<vk::ImageMemoryBarrier> = image_barriers.iter().map(|b| vk::ImageMemoryBarrier {
          s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
          src_access_mask: vk::AccessFlags::from_raw(b.src_access.bits()),
          dst_access_mask: vk::AccessFlags::from_raw(b.dst_access.bits()),
          old_layout: vk::ImageLayout::from_raw(b.old_layout as i32),
          new_layout: vk::ImageLayout::from_raw(b.new_layout as i32),
          src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
          dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
          image: b.image.vk(),
          subresource_range: color_range(),
          ..Default::default()
        }).collect();
        device.cmd_pipeline_barrier(
          cmd,
          vk::PipelineStageFlags::from_raw(src_stage.bits()),
          vk::PipelineStageFlags::from_raw(dst_stage.bits()),
          vk::DependencyFlags::empty(),
          &[],
          &[],
          &barriers,
        );
      }
      Command::CopyBufferToImage { buffer, image, layout, region } => {
        let e = extent(region.extent);
        let copy = vk::BufferImageCopy {
          buffer_offset: region.buffer_offset,
          // tightly packed
          buffer_row_length: 0,
          buffer_image_height: 0,
          image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
          },
          image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
          image_extent: vk::Extent3D { width: e.width, height: e.height, depth: 1 },
        };
        device.cmd_copy_buffer_to_image(
          cmd,
          buffer.vk(),
          image.vk(),
          vk::ImageLayout::from_raw(*layout as i32),
          &[copy],
        );
      }
      Command::BindVertexBuffers { first_binding, buffers } => {
        let handles: Vec<vk::Buffer> = buffers.iter().map(|(b, _)| b.vk()).collect();
        let offsets: Vec<vk::DeviceSize> = buffers.iter().map(|&(_, o)| o).collect();
        device.cmd_bind_vertex_buffers(cmd, *first_binding, &handles, &offsets);
      }
      Command::BindDescriptorSets { layout, first_set, sets } => {
        let sets: Vec<vk::DescriptorSet> = sets.iter().map(|s| s.vk()).collect();
        device.cmd_bind_descriptor_sets(
          cmd,
          vk::PipelineBindPoint::GRAPHICS,
          layout.vk(),
          *first_set,
          &sets,
          &[],
        );
      }
      Command::BeginRenderPass { render_pass, framebuffer, area, clear_color } => {
        let clears = [vk::ClearValue { color: vk::ClearColorValue { float32: *clear_color } }];
        let rp_begin = vk::RenderPassBeginInfo {
          s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
          render_pass: render_pass.vk(),
          framebuffer: framebuffer.vk(),
          render_area: rect(*area),
          clear_value_count: clears.len() as u32,
          p_clear_values: clears.as_ptr(),
          ..Default::default()
        };
        device.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);
      }
      Command::BindGraphicsPipeline(pipeline) => {
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.vk());
      }
      Command::Draw { vertex_count, instance_count, first_vertex, first_instance } => {
        device.cmd_draw(cmd, *vertex_count, *instance_count, *first_vertex, *first_instance);
      }
      Command::EndRenderPass => device.cmd_end_render_pass(cmd),
    }
  }
}
