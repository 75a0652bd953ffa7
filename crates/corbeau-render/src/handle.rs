// SPDX-License-Identifier: CEPL-1.0
//! Opaque object handles handed out by a capability provider.
//!
//! Each handle is the provider's raw 64 bit value. Zero is never a live
//! object, which matches Vulkan's `VK_NULL_HANDLE`.

macro_rules! gpu_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const NULL: Self = Self(0);

            #[inline]
            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    )*};
}

gpu_handle!(
    PhysicalDeviceId,
    Semaphore,
    Fence,
    CommandPool,
    CommandBuffer,
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet,
    PipelineLayout,
    ShaderModule,
    Sampler,
    Buffer,
    Image,
    ImageView,
    DeviceMemory,
    RenderPass,
    Pipeline,
    Framebuffer,
);

/// Anything that can be handed back to the provider for destruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuObject {
    Semaphore(Semaphore),
    Fence(Fence),
    CommandPool(CommandPool),
    CommandBuffer { pool: CommandPool, buffer: CommandBuffer },
    DescriptorSetLayout(DescriptorSetLayout),
    /// Also frees every set allocated from it.
    DescriptorPool(DescriptorPool),
    PipelineLayout(PipelineLayout),
    ShaderModule(ShaderModule),
    Sampler(Sampler),
    Buffer(Buffer),
    Image(Image),
    ImageView(ImageView),
    Memory(DeviceMemory),
    RenderPass(RenderPass),
    Pipeline(Pipeline),
    Framebuffer(Framebuffer),
}
