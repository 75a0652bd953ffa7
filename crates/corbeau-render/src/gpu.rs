// SPDX-License-Identifier: CEPL-1.0
//! The capability provider seam.
//!
//! The renderer never talks to a graphics API directly. It asks a
//! [`GpuInstance`] for devices and a [`GpuDevice`] for everything else, so
//! the same code drives the Vulkan backend and the test mock.
use std::time::Duration;

use crate::command::Command;
use crate::desc::*;
use crate::error::GpuResult;
use crate::handle::*;
use crate::types::*;

/// Instance-level half of the provider: knows the presentation surface
/// and the devices that could render to it.
pub trait GpuInstance {
    type Device: GpuDevice;

    fn enumerate_devices(&self) -> GpuResult<Vec<DeviceReport>>;

    /// Whether `queue_family` of `device` can present to the surface.
    fn supports_present(&self, device: PhysicalDeviceId, queue_family: u32) -> GpuResult<bool>;

    /// Creates the logical device with one queue from `queue_family` and
    /// the initial swapchain for the surface.
    fn open_device(&mut self, device: PhysicalDeviceId, queue_family: u32)
        -> GpuResult<Self::Device>;
}

/// Device-level half of the provider. All calls go to the single queue
/// chosen when the device was opened.
pub trait GpuDevice {
    fn queue_family(&self) -> u32;

    fn create_semaphore(&self) -> GpuResult<Semaphore>;
    fn create_fence(&self, signaled: bool) -> GpuResult<Fence>;
    fn wait_for_fence(&self, fence: Fence, timeout: Duration) -> GpuResult<FenceWait>;
    fn reset_fence(&self, fence: Fence) -> GpuResult<()>;

    fn create_command_pool(&self, resettable: bool) -> GpuResult<CommandPool>;
    fn allocate_command_buffers(&self, pool: CommandPool, count: u32)
        -> GpuResult<Vec<CommandBuffer>>;
    /// Begins `buffer`, replays `commands` into it and ends it.
    fn record(&self, buffer: CommandBuffer, usage: RecordUsage, commands: &[Command])
        -> GpuResult<()>;
    fn submit(&self, submission: &Submission<'_>) -> GpuResult<()>;

    fn create_descriptor_set_layout(&self, bindings: &[DescriptorBinding])
        -> GpuResult<DescriptorSetLayout>;
    fn create_pipeline_layout(&self, set_layouts: &[DescriptorSetLayout])
        -> GpuResult<PipelineLayout>;
    fn create_descriptor_pool(&self, max_sets: u32, sizes: &[DescriptorPoolSize])
        -> GpuResult<DescriptorPool>;
    fn allocate_descriptor_set(&self, pool: DescriptorPool, layout: DescriptorSetLayout)
        -> GpuResult<DescriptorSet>;
    fn write_image_descriptor(
        &self,
        set: DescriptorSet,
        binding: u32,
        sampler: Sampler,
        view: ImageView,
        layout: ImageLayout,
    ) -> GpuResult<()>;

    /// `code` is SPIR-V in native word order.
    fn create_shader_module(&self, code: &[u32]) -> GpuResult<ShaderModule>;
    fn create_sampler(&self, desc: &SamplerDesc) -> GpuResult<Sampler>;

    fn create_buffer(&self, desc: &BufferDesc) -> GpuResult<Buffer>;
    fn buffer_memory_requirements(&self, buffer: Buffer) -> GpuResult<MemoryRequirements>;
    fn create_image(&self, desc: &ImageDesc) -> GpuResult<Image>;
    fn image_memory_requirements(&self, image: Image) -> GpuResult<MemoryRequirements>;
    fn create_image_view(&self, image: Image, format: Format) -> GpuResult<ImageView>;

    fn allocate_memory(
        &self,
        requirements: &MemoryRequirements,
        properties: MemoryProperties,
    ) -> GpuResult<DeviceMemory>;
    fn bind_buffer_memory(&self, buffer: Buffer, memory: DeviceMemory, offset: u64)
        -> GpuResult<()>;
    fn bind_image_memory(&self, image: Image, memory: DeviceMemory, offset: u64)
        -> GpuResult<()>;
    /// Maps host-visible `memory`, copies `data` in at `offset` and unmaps.
    fn write_memory(&self, memory: DeviceMemory, offset: u64, data: &[u8]) -> GpuResult<()>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> GpuResult<RenderPass>;
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> GpuResult<Pipeline>;
    fn create_framebuffer(
        &self,
        render_pass: RenderPass,
        attachment: ImageView,
        extent: Extent2D,
    ) -> GpuResult<Framebuffer>;

    fn swapchain(&self) -> SwapchainInfo;
    /// Throws away the current presentation images and builds new ones.
    /// `extent_hint` is used when the surface leaves the size to us.
    fn recreate_swapchain(&mut self, extent_hint: Extent2D) -> GpuResult<SwapchainInfo>;
    /// Returns the next image index; `signal` fires once the presentation
    /// engine released the image.
    fn acquire_next_image(&self, signal: Semaphore, timeout: Duration) -> GpuResult<Acquired>;
    /// Queues `image_index` for presentation after `wait` fires. Returns
    /// `true` when the swapchain is suboptimal.
    fn present(&self, image_index: u32, wait: Semaphore) -> GpuResult<bool>;

    fn destroy(&self, object: GpuObject) -> GpuResult<()>;
}
