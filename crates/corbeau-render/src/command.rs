// SPDX-License-Identifier: CEPL-1.0
use crate::handle::*;
use crate::types::*;

/// Layout transition of the whole colour subresource of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: Image,
    pub src_access: Access,
    pub dst_access: Access,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
}

/// Tightly packed copy into mip 0, layer 0 at the image origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferImageCopy {
    pub buffer_offset: u64,
    pub extent: Extent2D,
}

/// One recorded command. A provider replays a slice of these into a
/// native command buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    PipelineBarrier {
        src_stage: PipelineStages,
        dst_stage: PipelineStages,
        image_barriers: Vec<ImageBarrier>,
    },
    CopyBufferToImage {
        buffer: Buffer,
        image: Image,
        layout: ImageLayout,
        region: BufferImageCopy,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<(Buffer, u64)>,
    },
    BindDescriptorSets {
        layout: PipelineLayout,
        first_set: u32,
        sets: Vec<DescriptorSet>,
    },
    BeginRenderPass {
        render_pass: RenderPass,
        framebuffer: Framebuffer,
        area: Rect2D,
        clear_color: [f32; 4],
    },
    BindGraphicsPipeline(Pipeline),
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    EndRenderPass,
}
