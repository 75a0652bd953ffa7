// SPDX-License-Identifier: CEPL-1.0
//! In-memory capability provider for tests.
//!
//! Submissions execute immediately on the CPU but only complete when their
//! fence is waited on, which is enough to catch fence protocol mistakes.
//! Copies and layout transitions are applied to per-image texel storage so
//! uploads can be read back.
use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use crate::command::Command;
use crate::desc::*;
use crate::error::{GpuError, GpuResult};
use crate::gpu::{GpuDevice, GpuInstance};
use crate::handle::*;
use crate::types::*;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    OpenDevice { device: PhysicalDeviceId, queue_family: u32 },
    WaitFence(Fence),
    ResetFence(Fence),
    Record { buffer: CommandBuffer },
    Submit {
        command_buffers: Vec<CommandBuffer>,
        wait: Vec<Semaphore>,
        signal: Vec<Semaphore>,
        fence: Fence,
    },
    Acquire { index: u32 },
    Present { index: u32 },
    RecreateSwapchain(Extent2D),
    Destroy(GpuObject),
}

#[derive(Clone, Copy, Debug, Default)]
struct FenceState {
    signaled: bool,
    pending: bool,
}

#[derive(Clone, Debug)]
struct MockBuffer {
    size: u64,
    bound: Option<(DeviceMemory, u64)>,
}

#[derive(Clone, Debug)]
struct MockImage {
    extent: Extent2D,
    layout: ImageLayout,
    bound: Option<DeviceMemory>,
    texels: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MockState {
    next_handle: u64,
    /// Number of objects created through the device.
    pub created: u32,
    pub events: Vec<Event>,
    /// API usage errors that do not fail the call, e.g. freeing memory
    /// that still backs a live buffer.
    pub violations: Vec<String>,
    live: HashSet<u64>,
    fences: HashMap<Fence, FenceState>,
    memory: HashMap<DeviceMemory, Vec<u8>>,
    buffers: HashMap<Buffer, MockBuffer>,
    images: HashMap<Image, MockImage>,
    views: HashMap<ImageView, Image>,
    pool_of: HashMap<CommandBuffer, CommandPool>,
    set_pool: HashMap<DescriptorSet, DescriptorPool>,
    last_fence: HashMap<CommandBuffer, Fence>,
    pub recorded: HashMap<CommandBuffer, Vec<Command>>,
    pub pipelines: HashMap<Pipeline, GraphicsPipelineDesc>,
    descriptors: HashMap<DescriptorSet, ImageView>,

    image_count: u32,
    extent: Extent2D,
    swapchain_views: Vec<ImageView>,
    next_index: u32,

    /// Extent the surface reports; overrides the recreate hint when set.
    pub surface_extent: Option<Extent2D>,
    pub acquire_failures: VecDeque<GpuError>,
    pub present_failures: VecDeque<GpuError>,
    /// Number of upcoming acquires, then presents, reporting a suboptimal
    /// swapchain.
    pub suboptimal_acquires: u32,
    pub suboptimal_presents: u32,
    /// Index handed out by the next acquire instead of the rotating one.
    pub forced_index: Option<u32>,
    /// Submitted work never completes; fence waits time out.
    pub hang: bool,
}

impl MockState {
    /// Objects still alive, not counting the swapchain's own images.
    pub fn leaked(&self) -> usize {
        self.live.len() - self.swapchain_views.len()
    }

    pub fn destroyed(&self) -> Vec<GpuObject> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Destroy(object) => Some(*object),
                _ => None,
            })
            .collect()
    }

    fn in_flight(&self, buffer: CommandBuffer) -> bool {
        self.last_fence
            .get(&buffer)
            .and_then(|fence| self.fences.get(fence))
            .is_some_and(|f| f.pending)
    }

    fn alloc(&mut self) -> u64 {
        self.next_handle += 1;
        self.created += 1;
        self.live.insert(self.next_handle);
        self.next_handle
    }

    fn make_swapchain_views(&mut self) {
        self.swapchain_views = (0..self.image_count)
            .map(|_| ImageView(self.alloc()))
            .collect();
        self.next_index = 0;
    }

    fn swapchain_info(&self) -> SwapchainInfo {
        SwapchainInfo {
            extent: self.extent,
            format: Format::B8G8R8A8_UNORM,
            image_views: self.swapchain_views.clone(),
        }
    }

    fn execute(&mut self, commands: &[Command]) -> GpuResult<()> {
        for command in commands {
            match command {
                Command::PipelineBarrier { image_barriers, .. } => {
                    for barrier in image_barriers {
                        let image = self
                            .images
                            .get_mut(&barrier.image)
                            .ok_or(GpuError::UnknownHandle(barrier.image.0))?;
                        if barrier.old_layout != ImageLayout::Undefined
                            && barrier.old_layout != image.layout
                        {
                            return Err(GpuError::InvalidUsage("barrier from the wrong layout"));
                        }
                        image.layout = barrier.new_layout;
                    }
                }
                Command::CopyBufferToImage {
                    buffer,
                    image,
                    layout,
                    region,
                } => {
                    let src = self
                        .buffers
                        .get(buffer)
                        .ok_or(GpuError::UnknownHandle(buffer.0))?;
                    let (memory, offset) = src
                        .bound
                        .ok_or(GpuError::InvalidUsage("copy from unbound buffer"))?;
                    let len = region.extent.width as usize * region.extent.height as usize * 4;
                    let start = (offset + region.buffer_offset) as usize;
                    let bytes = self.memory[&memory][start..start + len].to_vec();

                    let dst = self
                        .images
                        .get_mut(image)
                        .ok_or(GpuError::UnknownHandle(image.0))?;
                    if dst.bound.is_none() {
                        return Err(GpuError::InvalidUsage("copy into unbound image"));
                    }
                    if dst.layout != ImageLayout::TransferDstOptimal || *layout != dst.layout {
                        return Err(GpuError::InvalidUsage("copy into image not in transfer layout"));
                    }
                    dst.texels = bytes;
                }
                Command::BindVertexBuffers { buffers, .. } => {
                    for (buffer, _) in buffers {
                        let bound = self.buffers.get(buffer).and_then(|b| b.bound);
                        if bound.is_none() {
                            return Err(GpuError::InvalidUsage("vertex buffer without memory"));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn raw(object: &GpuObject) -> u64 {
    match *object {
        GpuObject::Semaphore(h) => h.0,
        GpuObject::Fence(h) => h.0,
        GpuObject::CommandPool(h) => h.0,
        GpuObject::CommandBuffer { buffer, .. } => buffer.0,
        GpuObject::DescriptorSetLayout(h) => h.0,
        GpuObject::DescriptorPool(h) => h.0,
        GpuObject::PipelineLayout(h) => h.0,
        GpuObject::ShaderModule(h) => h.0,
        GpuObject::Sampler(h) => h.0,
        GpuObject::Buffer(h) => h.0,
        GpuObject::Image(h) => h.0,
        GpuObject::ImageView(h) => h.0,
        GpuObject::Memory(h) => h.0,
        GpuObject::RenderPass(h) => h.0,
        GpuObject::Pipeline(h) => h.0,
        GpuObject::Framebuffer(h) => h.0,
    }
}

#[derive(Clone, Debug)]
pub struct MockDeviceSpec {
    pub name: &'static str,
    pub class: DeviceClass,
    /// Capabilities of each queue family and whether it can present.
    pub families: Vec<(QueueCapabilities, bool)>,
}

impl MockDeviceSpec {
    pub fn suitable(name: &'static str, class: DeviceClass) -> Self {
        Self {
            name,
            class,
            families: vec![(QueueCapabilities::GRAPHICS | QueueCapabilities::TRANSFER, true)],
        }
    }

    pub fn headless(name: &'static str, class: DeviceClass) -> Self {
        Self {
            name,
            class,
            families: vec![(QueueCapabilities::GRAPHICS, false), (QueueCapabilities::COMPUTE, true)],
        }
    }
}

pub struct MockInstance {
    pub devices: Vec<MockDeviceSpec>,
    pub state: Rc<RefCell<MockState>>,
}

impl MockInstance {
    pub fn new(devices: Vec<MockDeviceSpec>) -> Self {
        Self::with_swapchain(devices, 3, Extent2D::new(800, 600))
    }

    pub fn with_swapchain(devices: Vec<MockDeviceSpec>, image_count: u32, extent: Extent2D) -> Self {
        let state = MockState {
            image_count,
            extent,
            ..Default::default()
        };
        Self {
            devices,
            state: Rc::new(RefCell::new(state)),
        }
    }

    fn spec(&self, device: PhysicalDeviceId) -> GpuResult<&MockDeviceSpec> {
        (device.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.devices.get(i))
            .ok_or(GpuError::UnknownHandle(device.0))
    }
}

impl GpuInstance for MockInstance {
    type Device = MockDevice;

    fn enumerate_devices(&self) -> GpuResult<Vec<DeviceReport>> {
        Ok(self
            .devices
            .iter()
            .enumerate()
            .map(|(i, spec)| DeviceReport {
                id: PhysicalDeviceId(i as u64 + 1),
                name: spec.name.to_owned(),
                class: spec.class,
                queue_families: spec
                    .families
                    .iter()
                    .map(|&(capabilities, _)| QueueFamily {
                        capabilities,
                        queue_count: 1,
                    })
                    .collect(),
            })
            .collect())
    }

    fn supports_present(&self, device: PhysicalDeviceId, queue_family: u32) -> GpuResult<bool> {
        let spec = self.spec(device)?;
        Ok(spec
            .families
            .get(queue_family as usize)
            .is_some_and(|&(_, present)| present))
    }

    fn open_device(&mut self, device: PhysicalDeviceId, queue_family: u32) -> GpuResult<MockDevice> {
        self.spec(device)?;
        let mut state = self.state.borrow_mut();
        state.events.push(Event::OpenDevice {
            device,
            queue_family,
        });
        state.make_swapchain_views();
        drop(state);
        Ok(MockDevice {
            state: Rc::clone(&self.state),
            queue_family,
        })
    }
}

pub struct MockDevice {
    pub state: Rc<RefCell<MockState>>,
    queue_family: u32,
}

impl MockDevice {
    fn create(&self) -> u64 {
        self.state.borrow_mut().alloc()
    }

    pub fn state(&self) -> Ref<'_, MockState> {
        self.state.borrow()
    }

    pub fn memory_contents(&self, memory: DeviceMemory) -> Vec<u8> {
        self.state().memory[&memory].clone()
    }

    /// What the fragment stage would read through `set`, `None` when the
    /// image is not in a sampleable layout.
    pub fn sample_descriptor(&self, set: DescriptorSet) -> Option<Vec<u8>> {
        let state = self.state();
        let view = state.descriptors.get(&set)?;
        let image = state.images.get(state.views.get(view)?)?;
        (image.layout == ImageLayout::ShaderReadOnlyOptimal).then(|| image.texels.clone())
    }

    pub fn image_extent(&self, image: Image) -> Option<Extent2D> {
        self.state().images.get(&image).map(|i| i.extent)
    }
}

impl GpuDevice for MockDevice {
    fn queue_family(&self) -> u32 {
        self.queue_family
    }

    fn create_semaphore(&self) -> GpuResult<Semaphore> {
        Ok(Semaphore(self.create()))
    }

    fn create_fence(&self, signaled: bool) -> GpuResult<Fence> {
        let fence = Fence(self.create());
        self.state.borrow_mut().fences.insert(
            fence,
            FenceState {
                signaled,
                pending: false,
            },
        );
        Ok(fence)
    }

    fn wait_for_fence(&self, fence: Fence, _timeout: Duration) -> GpuResult<FenceWait> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::WaitFence(fence));
        let hang = state.hang;
        let f = state
            .fences
            .get_mut(&fence)
            .ok_or(GpuError::UnknownHandle(fence.0))?;
        if f.pending && !hang {
            f.pending = false;
            f.signaled = true;
        }
        Ok(if f.signaled {
            FenceWait::Signaled
        } else {
            FenceWait::TimedOut
        })
    }

    fn reset_fence(&self, fence: Fence) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::ResetFence(fence));
        let f = state
            .fences
            .get_mut(&fence)
            .ok_or(GpuError::UnknownHandle(fence.0))?;
        if f.pending {
            return Err(GpuError::InvalidUsage("reset of a fence still in flight"));
        }
        f.signaled = false;
        Ok(())
    }

    fn create_command_pool(&self, _resettable: bool) -> GpuResult<CommandPool> {
        Ok(CommandPool(self.create()))
    }

    fn allocate_command_buffers(&self, pool: CommandPool, count: u32) -> GpuResult<Vec<CommandBuffer>> {
        let mut state = self.state.borrow_mut();
        if !state.live.contains(&pool.0) {
            return Err(GpuError::UnknownHandle(pool.0));
        }
        Ok((0..count)
            .map(|_| {
                let buffer = CommandBuffer(state.alloc());
                state.pool_of.insert(buffer, pool);
                buffer
            })
            .collect())
    }

    fn record(&self, buffer: CommandBuffer, _usage: RecordUsage, commands: &[Command]) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.live.contains(&buffer.0) {
            return Err(GpuError::UnknownHandle(buffer.0));
        }
        if let Some(fence) = state.last_fence.get(&buffer) {
            if state.fences.get(fence).is_some_and(|f| f.pending) {
                return Err(GpuError::InvalidUsage("re-recording a command buffer in flight"));
            }
        }
        state.events.push(Event::Record { buffer });
        state.recorded.insert(buffer, commands.to_vec());
        Ok(())
    }

    fn submit(&self, submission: &Submission<'_>) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        let fence = submission.fence;
        if !fence.is_null() {
            let f = state
                .fences
                .get(&fence)
                .ok_or(GpuError::UnknownHandle(fence.0))?;
            if f.signaled || f.pending {
                return Err(GpuError::InvalidUsage("submitted with a fence that is not reset"));
            }
        }

        for buffer in submission.command_buffers {
            let commands = state
                .recorded
                .get(buffer)
                .cloned()
                .ok_or(GpuError::InvalidUsage("submitted a command buffer never recorded"))?;
            state.execute(&commands)?;
            state.last_fence.insert(*buffer, fence);
        }

        if !fence.is_null() {
            if let Some(f) = state.fences.get_mut(&fence) {
                f.pending = true;
            }
        }
        state.events.push(Event::Submit {
            command_buffers: submission.command_buffers.to_vec(),
            wait: submission.wait.iter().map(|&(s, _)| s).collect(),
            signal: submission.signal.to_vec(),
            fence,
        });
        Ok(())
    }

    fn create_descriptor_set_layout(&self, _bindings: &[DescriptorBinding]) -> GpuResult<DescriptorSetLayout> {
        Ok(DescriptorSetLayout(self.create()))
    }

    fn create_pipeline_layout(&self, _set_layouts: &[DescriptorSetLayout]) -> GpuResult<PipelineLayout> {
        Ok(PipelineLayout(self.create()))
    }

    fn create_descriptor_pool(&self, _max_sets: u32, _sizes: &[DescriptorPoolSize]) -> GpuResult<DescriptorPool> {
        Ok(DescriptorPool(self.create()))
    }

    fn allocate_descriptor_set(&self, pool: DescriptorPool, _layout: DescriptorSetLayout) -> GpuResult<DescriptorSet> {
        let set = DescriptorSet(self.create());
        self.state.borrow_mut().set_pool.insert(set, pool);
        Ok(set)
    }

    fn write_image_descriptor(
        &self,
        set: DescriptorSet,
        _binding: u32,
        _sampler: Sampler,
        view: ImageView,
        _layout: ImageLayout,
    ) -> GpuResult<()> {
        self.state.borrow_mut().descriptors.insert(set, view);
        Ok(())
    }

    fn create_shader_module(&self, code: &[u32]) -> GpuResult<ShaderModule> {
        if code.is_empty() {
            return Err(GpuError::InvalidUsage("empty shader module"));
        }
        Ok(ShaderModule(self.create()))
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> GpuResult<Sampler> {
        Ok(Sampler(self.create()))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> GpuResult<Buffer> {
        let buffer = Buffer(self.create());
        self.state.borrow_mut().buffers.insert(
            buffer,
            MockBuffer {
                size: desc.size,
                bound: None,
            },
        );
        Ok(buffer)
    }

    fn buffer_memory_requirements(&self, buffer: Buffer) -> GpuResult<MemoryRequirements> {
        let state = self.state();
        let b = state.buffers.get(&buffer).ok_or(GpuError::UnknownHandle(buffer.0))?;
        Ok(MemoryRequirements {
            size: b.size,
            alignment: 4,
            type_bits: 0x1,
        })
    }

    fn create_image(&self, desc: &ImageDesc) -> GpuResult<Image> {
        let image = Image(self.create());
        self.state.borrow_mut().images.insert(
            image,
            MockImage {
                extent: desc.extent,
                layout: ImageLayout::Undefined,
                bound: None,
                texels: Vec::new(),
            },
        );
        Ok(image)
    }

    fn image_memory_requirements(&self, image: Image) -> GpuResult<MemoryRequirements> {
        let state = self.state();
        let i = state.images.get(&image).ok_or(GpuError::UnknownHandle(image.0))?;
        Ok(MemoryRequirements {
            size: i.extent.width as u64 * i.extent.height as u64 * 4,
            alignment: 16,
            type_bits: 0x1,
        })
    }

    fn create_image_view(&self, image: Image, _format: Format) -> GpuResult<ImageView> {
        let view = ImageView(self.create());
        self.state.borrow_mut().views.insert(view, image);
        Ok(view)
    }

    fn allocate_memory(
        &self,
        requirements: &MemoryRequirements,
        _properties: MemoryProperties,
    ) -> GpuResult<DeviceMemory> {
        let memory = DeviceMemory(self.create());
        self.state
            .borrow_mut()
            .memory
            .insert(memory, vec![0; requirements.size as usize]);
        Ok(memory)
    }

    fn bind_buffer_memory(&self, buffer: Buffer, memory: DeviceMemory, offset: u64) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.memory.contains_key(&memory) {
            return Err(GpuError::UnknownHandle(memory.0));
        }
        let b = state
            .buffers
            .get_mut(&buffer)
            .ok_or(GpuError::UnknownHandle(buffer.0))?;
        b.bound = Some((memory, offset));
        Ok(())
    }

    fn bind_image_memory(&self, image: Image, memory: DeviceMemory, _offset: u64) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.memory.contains_key(&memory) {
            return Err(GpuError::UnknownHandle(memory.0));
        }
        let i = state
            .images
            .get_mut(&image)
            .ok_or(GpuError::UnknownHandle(image.0))?;
        i.bound = Some(memory);
        Ok(())
    }

    fn write_memory(&self, memory: DeviceMemory, offset: u64, data: &[u8]) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        let bytes = state
            .memory
            .get_mut(&memory)
            .ok_or(GpuError::UnknownHandle(memory.0))?;
        let start = offset as usize;
        let dst = bytes
            .get_mut(start..start + data.len())
            .ok_or(GpuError::InvalidUsage("write past the end of the allocation"))?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn create_render_pass(&self, _desc: &RenderPassDesc) -> GpuResult<RenderPass> {
        Ok(RenderPass(self.create()))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> GpuResult<Pipeline> {
        let pipeline = Pipeline(self.create());
        self.state.borrow_mut().pipelines.insert(pipeline, desc.clone());
        Ok(pipeline)
    }

    fn create_framebuffer(&self, _render_pass: RenderPass, attachment: ImageView, _extent: Extent2D) -> GpuResult<Framebuffer> {
        if !self.state().live.contains(&attachment.0) {
            return Err(GpuError::UnknownHandle(attachment.0));
        }
        Ok(Framebuffer(self.create()))
    }

    fn swapchain(&self) -> SwapchainInfo {
        self.state().swapchain_info()
    }

    fn recreate_swapchain(&mut self, extent_hint: Extent2D) -> GpuResult<SwapchainInfo> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::RecreateSwapchain(extent_hint));
        for view in std::mem::take(&mut state.swapchain_views) {
            state.live.remove(&view.0);
        }
        let extent = state.surface_extent.unwrap_or(extent_hint);
        if extent.is_empty() {
            return Err(GpuError::ZeroExtent);
        }
        state.extent = extent;
        state.make_swapchain_views();
        Ok(state.swapchain_info())
    }

    fn acquire_next_image(&self, _signal: Semaphore, _timeout: Duration) -> GpuResult<Acquired> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.acquire_failures.pop_front() {
            return Err(err);
        }
        if state.swapchain_views.is_empty() {
            return Err(GpuError::OutOfDate);
        }
        let index = match state.forced_index.take() {
            Some(index) => index,
            None => {
                let index = state.next_index % state.image_count;
                state.next_index += 1;
                index
            }
        };
        let suboptimal = state.suboptimal_acquires > 0;
        state.suboptimal_acquires = state.suboptimal_acquires.saturating_sub(1);
        state.events.push(Event::Acquire { index });
        Ok(Acquired { index, suboptimal })
    }

    fn present(&self, image_index: u32, _wait: Semaphore) -> GpuResult<bool> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Present { index: image_index });
        if let Some(err) = state.present_failures.pop_front() {
            return Err(err);
        }
        let suboptimal = state.suboptimal_presents > 0;
        state.suboptimal_presents = state.suboptimal_presents.saturating_sub(1);
        Ok(suboptimal)
    }

    fn destroy(&self, object: GpuObject) -> GpuResult<()> {
        let mut state = self.state.borrow_mut();
        let handle = raw(&object);
        if !state.live.remove(&handle) {
            return Err(GpuError::UnknownHandle(handle));
        }
        match object {
            GpuObject::Memory(memory) => {
                let still_bound = state
                    .buffers
                    .iter()
                    .any(|(b, buf)| state.live.contains(&b.0) && buf.bound.map(|(m, _)| m) == Some(memory))
                    || state
                        .images
                        .iter()
                        .any(|(i, img)| state.live.contains(&i.0) && img.bound == Some(memory));
                if still_bound {
                    state
                        .violations
                        .push(format!("memory 0x{handle:x} freed while still bound"));
                }
            }
            GpuObject::CommandBuffer { buffer, .. } => {
                if state.in_flight(buffer) {
                    state
                        .violations
                        .push(format!("command buffer 0x{handle:x} freed in flight"));
                }
            }
            GpuObject::CommandPool(pool) => {
                let busy = state
                    .pool_of
                    .iter()
                    .any(|(&b, &p)| p == pool && state.live.contains(&b.0) && state.in_flight(b));
                if busy {
                    state
                        .violations
                        .push(format!("command pool 0x{handle:x} destroyed with work in flight"));
                }
                let orphans: Vec<u64> = state
                    .pool_of
                    .iter()
                    .filter(|&(_, &p)| p == pool)
                    .map(|(b, _)| b.0)
                    .collect();
                for buffer in orphans {
                    state.live.remove(&buffer);
                }
            }
            GpuObject::DescriptorPool(pool) => {
                let sets: Vec<u64> = state
                    .set_pool
                    .iter()
                    .filter(|&(_, &p)| p == pool)
                    .map(|(s, _)| s.0)
                    .collect();
                for set in sets {
                    state.live.remove(&set);
                }
            }
            GpuObject::Fence(fence) => {
                if state.fences.get(&fence).is_some_and(|f| f.pending) {
                    state.violations.push(format!("fence 0x{handle:x} destroyed in flight"));
                }
            }
            _ => {}
        }
        state.events.push(Event::Destroy(object));
        Ok(())
    }
}
