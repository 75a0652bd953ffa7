// SPDX-License-Identifier: CEPL-1.0
//! Creation descriptions passed to [`GpuDevice`](crate::GpuDevice).
use crate::handle::*;
use crate::types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamily {
    pub capabilities: QueueCapabilities,
    pub queue_count: u32,
}

/// Capability report for one enumerated device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceReport {
    pub id: PhysicalDeviceId,
    pub name: String,
    pub class: DeviceClass,
    pub queue_families: Vec<QueueFamily>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub kind: DescriptorType,
    pub count: u32,
    pub stages: ShaderStages,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorPoolSize {
    pub kind: DescriptorType,
    pub count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub address_mode: AddressMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
}

/// A single-mip, single-layer, optimally tiled 2D image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDesc {
    pub extent: Extent2D,
    pub format: Format,
    pub usage: ImageUsage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
    pub type_bits: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub format: Format,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentRef {
    pub attachment: u32,
    pub layout: ImageLayout,
}

/// Single-sample attachments and one graphics subpass with colour
/// references only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub attachments: Vec<AttachmentDesc>,
    pub color_refs: Vec<AttachmentRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecializationEntry {
    pub constant_id: u32,
    pub offset: u32,
    pub size: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Specialization {
    pub entries: Vec<SpecializationEntry>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderStageDesc {
    pub stage: ShaderStages,
    pub module: ShaderModule,
    pub entry_point: &'static str,
    pub specialization: Option<Specialization>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: Format,
    pub offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Framebuffer coordinates of a point in normalised device coordinates.
    pub fn to_framebuffer(&self, ndc: glam::Vec2) -> glam::Vec2 {
        glam::Vec2::new(
            self.x + (ndc.x + 1.0) * self.width * 0.5,
            self.y + (ndc.y + 1.0) * self.height * 0.5,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterizationState {
    pub depth_clamp: bool,
    pub rasterizer_discard: bool,
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_bias: bool,
    pub line_width: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorBlendAttachment {
    pub blend_enable: bool,
    pub write_mask: ColorComponents,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsPipelineDesc {
    pub stages: Vec<ShaderStageDesc>,
    pub vertex_bindings: Vec<VertexBinding>,
    pub vertex_attributes: Vec<VertexAttribute>,
    pub topology: PrimitiveTopology,
    pub primitive_restart: bool,
    pub viewport: Viewport,
    pub scissor: Rect2D,
    pub rasterization: RasterizationState,
    pub sample_count: u32,
    pub color_blend: ColorBlendAttachment,
    pub layout: PipelineLayout,
    pub render_pass: RenderPass,
    pub subpass: u32,
}

/// Queue submission of one batch.
#[derive(Clone, Copy, Debug)]
pub struct Submission<'a> {
    /// Semaphores to wait on, and the stage at which each wait applies.
    pub wait: &'a [(Semaphore, PipelineStages)],
    pub command_buffers: &'a [CommandBuffer],
    pub signal: &'a [Semaphore],
    /// Signalled once every command buffer completed; may be `Fence::NULL`.
    pub fence: Fence,
}

/// Current state of the presentation images.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapchainInfo {
    pub extent: Extent2D,
    pub format: Format,
    pub image_views: Vec<ImageView>,
}

impl SwapchainInfo {
    pub fn image_count(&self) -> usize {
        self.image_views.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Acquired {
    pub index: u32,
    /// The image is usable but the swapchain no longer matches the surface.
    pub suboptimal: bool,
}
