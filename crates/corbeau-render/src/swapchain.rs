// SPDX-License-Identifier: CEPL-1.0
//! Resources tied to the current swapchain configuration.
//!
//! Everything here depends on the surface extent or format and is rebuilt
//! from scratch whenever the swapchain is recreated.
use tracing::info;

use crate::desc::*;
use crate::error::RenderResult;
use crate::gpu::GpuDevice;
use crate::handle::*;
use crate::resources::{release, Rollback, StaticResources};
use crate::types::*;

/// Two floats per vertex.
const VERTEX_STRIDE: u32 = 2 * std::mem::size_of::<f32>() as u32;

/// Single colour attachment, cleared on load and handed to the
/// presentation engine at the end of the pass.
pub fn render_pass_desc(format: Format) -> RenderPassDesc {
    RenderPassDesc {
        attachments: vec![AttachmentDesc {
            format,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::PresentSrc,
        }],
        color_refs: vec![AttachmentRef {
            attachment: 0,
            layout: ImageLayout::ColorAttachmentOptimal,
        }],
    }
}

/// Width and height as the vertex stage's constants 0 and 1. The output
/// size of a compositor practically never changes, so it is baked into
/// the pipeline rather than pushed per draw.
pub fn extent_specialization(extent: Extent2D) -> Specialization {
    let size = std::mem::size_of::<f32>();
    let dims = [extent.width as f32, extent.height as f32];
    Specialization {
        entries: vec![
            SpecializationEntry {
                constant_id: 0,
                offset: 0,
                size,
            },
            SpecializationEntry {
                constant_id: 1,
                offset: size as u32,
                size,
            },
        ],
        data: bytemuck::cast_slice(&dims).to_vec(),
    }
}

/// Viewport twice the size of the surface, shifted up and left by a full
/// extent. NDC 0..1 then lands on framebuffer 0..extent, which is where
/// the vertex stage puts quad space 0..100.
pub fn flipped_viewport(extent: Extent2D) -> Viewport {
    let (w, h) = (extent.width as f32, extent.height as f32);
    Viewport {
        x: -w,
        y: -h,
        width: w * 2.0,
        height: h * 2.0,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

pub fn pipeline_desc(
    extent: Extent2D,
    statics: &StaticResources,
    render_pass: RenderPass,
) -> GraphicsPipelineDesc {
    GraphicsPipelineDesc {
        stages: vec![
            ShaderStageDesc {
                stage: ShaderStages::VERTEX,
                module: statics.vertex_shader,
                entry_point: "main",
                specialization: Some(extent_specialization(extent)),
            },
            ShaderStageDesc {
                stage: ShaderStages::FRAGMENT,
                module: statics.fragment_shader,
                entry_point: "main",
                specialization: None,
            },
        ],
        // Binding 1 aliases binding 0: the same buffer feeds the position
        // and the texture coordinate.
        vertex_bindings: vec![
            VertexBinding {
                binding: 0,
                stride: VERTEX_STRIDE,
            },
            VertexBinding {
                binding: 1,
                stride: VERTEX_STRIDE,
            },
        ],
        vertex_attributes: vec![
            VertexAttribute {
                location: 0,
                binding: 0,
                format: Format::R32G32_SFLOAT,
                offset: 0,
            },
            VertexAttribute {
                location: 1,
                binding: 1,
                format: Format::R32G32_SFLOAT,
                offset: 0,
            },
        ],
        topology: PrimitiveTopology::TriangleStrip,
        primitive_restart: false,
        viewport: flipped_viewport(extent),
        scissor: Rect2D::covering(extent),
        rasterization: RasterizationState {
            depth_clamp: false,
            rasterizer_discard: false,
            polygon_mode: PolygonMode::Fill,
            cull_mode: CullMode::None,
            front_face: FrontFace::CounterClockwise,
            depth_bias: false,
            line_width: 1.0,
        },
        sample_count: 1,
        color_blend: ColorBlendAttachment {
            blend_enable: false,
            write_mask: ColorComponents::all(),
        },
        layout: statics.pipeline_layout,
        render_pass,
        subpass: 0,
    }
}

#[derive(Debug)]
pub struct SwapchainResources {
    pub extent: Extent2D,
    pub format: Format,
    pub render_pass: RenderPass,
    pub pipeline: Pipeline,
    /// One primary command buffer per presentable image.
    pub command_buffers: Vec<CommandBuffer>,
}

/// Per presentable image: the fence of its last submission and the
/// framebuffer wrapping its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameState {
    pub fence: Fence,
    pub framebuffer: Framebuffer,
}

/// Swapchain resources plus the per-image state built on top of them.
#[derive(Debug)]
pub struct Presentation {
    pub resources: SwapchainResources,
    pub frames: Vec<FrameState>,
}

impl Presentation {
    pub fn build<D: GpuDevice>(
        device: &D,
        statics: &StaticResources,
        swapchain: &SwapchainInfo,
    ) -> RenderResult<Self> {
        info!(
            "creating pipeline for swapchain with extent {}x{} ({} images)",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.image_count()
        );
        let mut rollback = Rollback::new(device);

        let command_buffers = device
            .allocate_command_buffers(statics.command_pool, swapchain.image_count() as u32)?;
        for &buffer in &command_buffers {
            rollback.track(GpuObject::CommandBuffer {
                pool: statics.command_pool,
                buffer,
            });
        }

        let render_pass = device.create_render_pass(&render_pass_desc(swapchain.format))?;
        rollback.track(GpuObject::RenderPass(render_pass));

        let pipeline =
            device.create_graphics_pipeline(&pipeline_desc(swapchain.extent, statics, render_pass))?;
        rollback.track(GpuObject::Pipeline(pipeline));

        let mut frames = Vec::with_capacity(swapchain.image_count());
        for &view in &swapchain.image_views {
            // signalled, so the first wait on every image returns at once
            let fence = device.create_fence(true)?;
            rollback.track(GpuObject::Fence(fence));
            let framebuffer = device.create_framebuffer(render_pass, view, swapchain.extent)?;
            rollback.track(GpuObject::Framebuffer(framebuffer));
            frames.push(FrameState { fence, framebuffer });
        }

        rollback.commit();
        Ok(Self {
            resources: SwapchainResources {
                extent: swapchain.extent,
                format: swapchain.format,
                render_pass,
                pipeline,
                command_buffers,
            },
            frames,
        })
    }

    /// The device must be idle with respect to every command buffer here.
    pub fn release<D: GpuDevice>(self, device: &D, pool: CommandPool) {
        for frame in self.frames {
            release(device, GpuObject::Framebuffer(frame.framebuffer));
            release(device, GpuObject::Fence(frame.fence));
        }
        let r = self.resources;
        release(device, GpuObject::Pipeline(r.pipeline));
        release(device, GpuObject::RenderPass(r.render_pass));
        for buffer in r.command_buffers {
            release(device, GpuObject::CommandBuffer { pool, buffer });
        }
    }
}
