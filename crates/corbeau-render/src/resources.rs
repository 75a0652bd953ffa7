// SPDX-License-Identifier: CEPL-1.0
//! Device-lifetime resources.
use glam::Vec2;
use tracing::{debug, warn};

use crate::desc::*;
use crate::error::RenderResult;
use crate::gpu::GpuDevice;
use crate::handle::*;
use crate::shader::ShaderSet;
use crate::types::*;

/// Quad corners in quad space, in triangle strip order.
pub const QUAD_VERTICES: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(100.0, 0.0),
    Vec2::new(0.0, 100.0),
    Vec2::new(100.0, 100.0),
];

/// Destroys `object`, logging instead of failing. Teardown never aborts.
pub(crate) fn release<D: GpuDevice>(device: &D, object: GpuObject) {
    if let Err(e) = device.destroy(object) {
        warn!("swallowing error: failed to destroy {object:?}: {e}");
    }
}

/// Objects created so far by a multi-step build. Dropping it releases
/// them newest first, so a failed step leaves nothing behind.
pub(crate) struct Rollback<'d, D: GpuDevice> {
    device: &'d D,
    objects: Vec<GpuObject>,
}

impl<'d, D: GpuDevice> Rollback<'d, D> {
    pub fn new(device: &'d D) -> Self {
        Self {
            device,
            objects: Vec::new(),
        }
    }

    pub fn track(&mut self, object: GpuObject) {
        self.objects.push(object);
    }

    /// Tracks memory backing objects that are already tracked; it is
    /// released after all of them.
    pub fn track_backing(&mut self, memory: DeviceMemory) {
        self.objects.insert(0, GpuObject::Memory(memory));
    }

    /// Tracks a bound resource so that the resource goes before its memory.
    pub fn track_bound(&mut self, resource: GpuObject, memory: DeviceMemory) {
        self.objects.push(GpuObject::Memory(memory));
        self.objects.push(resource);
    }

    /// Keeps everything that was tracked.
    pub fn commit(mut self) {
        self.objects.clear();
    }
}

impl<D: GpuDevice> Drop for Rollback<'_, D> {
    fn drop(&mut self) {
        if !self.objects.is_empty() {
            debug!("rolling back {} objects", self.objects.len());
        }
        for object in self.objects.drain(..).rev() {
            release(self.device, object);
        }
    }
}

/// A buffer together with the memory backing it. Owning both halves means
/// the buffer always goes away before its memory.
#[derive(Debug, PartialEq, Eq)]
pub struct BoundBuffer {
    pub buffer: Buffer,
    pub memory: DeviceMemory,
    pub size: u64,
}

impl BoundBuffer {
    pub fn new<D: GpuDevice>(
        device: &D,
        desc: &BufferDesc,
        properties: MemoryProperties,
    ) -> RenderResult<Self> {
        let mut rollback = Rollback::new(device);
        let buffer = device.create_buffer(desc)?;
        rollback.track(GpuObject::Buffer(buffer));

        let requirements = device.buffer_memory_requirements(buffer)?;
        let memory = device.allocate_memory(&requirements, properties)?;
        rollback.track_backing(memory);
        device.bind_buffer_memory(buffer, memory, 0)?;

        rollback.commit();
        Ok(Self {
            buffer,
            memory,
            size: desc.size,
        })
    }

    pub fn write<D: GpuDevice>(&self, device: &D, data: &[u8]) -> RenderResult<()> {
        Ok(device.write_memory(self.memory, 0, data)?)
    }

    /// Destroys the buffer, then frees its memory. The handles are dead
    /// afterwards.
    pub fn release<D: GpuDevice>(&self, device: &D) {
        release(device, GpuObject::Buffer(self.buffer));
        release(device, GpuObject::Memory(self.memory));
    }
}

/// An image together with its backing memory, see [`BoundBuffer`].
#[derive(Debug, PartialEq, Eq)]
pub struct BoundImage {
    pub image: Image,
    pub memory: DeviceMemory,
    pub extent: Extent2D,
    pub format: Format,
}

impl BoundImage {
    pub fn new<D: GpuDevice>(
        device: &D,
        desc: &ImageDesc,
        properties: MemoryProperties,
    ) -> RenderResult<Self> {
        let mut rollback = Rollback::new(device);
        let image = device.create_image(desc)?;
        rollback.track(GpuObject::Image(image));

        let requirements = device.image_memory_requirements(image)?;
        let memory = device.allocate_memory(&requirements, properties)?;
        rollback.track_backing(memory);
        device.bind_image_memory(image, memory, 0)?;

        rollback.commit();
        Ok(Self {
            image,
            memory,
            extent: desc.extent,
            format: desc.format,
        })
    }

    pub fn release<D: GpuDevice>(&self, device: &D) {
        release(device, GpuObject::Image(self.image));
        release(device, GpuObject::Memory(self.memory));
    }
}

/// Everything that lives as long as the logical device.
#[derive(Debug)]
pub struct StaticResources {
    pub command_pool: CommandPool,
    pub descriptor_set_layout: DescriptorSetLayout,
    pub pipeline_layout: PipelineLayout,
    pub vertex_shader: ShaderModule,
    pub fragment_shader: ShaderModule,
    pub sampler: Sampler,
    pub background: BoundImage,
    pub background_view: ImageView,
    pub descriptor_pool: DescriptorPool,
    pub descriptor_set: DescriptorSet,
    pub quad: BoundBuffer,
}

impl StaticResources {
    /// Creates the static set in dependency order. The background image is
    /// left in `UNDEFINED` layout; seeding it is the upload step's job.
    pub fn build<D: GpuDevice>(
        device: &D,
        shaders: &ShaderSet,
        background_extent: Extent2D,
    ) -> RenderResult<Self> {
        let mut rollback = Rollback::new(device);

        let command_pool = device.create_command_pool(true)?;
        rollback.track(GpuObject::CommandPool(command_pool));

        let descriptor_set_layout = device.create_descriptor_set_layout(&[DescriptorBinding {
            binding: 0,
            kind: DescriptorType::CombinedImageSampler,
            count: 1,
            stages: ShaderStages::FRAGMENT,
        }])?;
        rollback.track(GpuObject::DescriptorSetLayout(descriptor_set_layout));

        let pipeline_layout = device.create_pipeline_layout(&[descriptor_set_layout])?;
        rollback.track(GpuObject::PipelineLayout(pipeline_layout));

        let vertex_shader = device.create_shader_module(&shaders.vertex)?;
        rollback.track(GpuObject::ShaderModule(vertex_shader));
        let fragment_shader = device.create_shader_module(&shaders.fragment)?;
        rollback.track(GpuObject::ShaderModule(fragment_shader));

        let sampler = device.create_sampler(&SamplerDesc {
            mag_filter: Filter::Nearest,
            min_filter: Filter::Nearest,
            address_mode: AddressMode::ClampToEdge,
        })?;
        rollback.track(GpuObject::Sampler(sampler));

        let background = BoundImage::new(
            device,
            &ImageDesc {
                extent: background_extent,
                format: Format::R8G8B8A8_UNORM,
                usage: ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
            },
            MemoryProperties::DEVICE_LOCAL,
        )?;
        rollback.track_bound(GpuObject::Image(background.image), background.memory);

        let background_view = device.create_image_view(background.image, background.format)?;
        rollback.track(GpuObject::ImageView(background_view));

        let descriptor_pool = device.create_descriptor_pool(
            1,
            &[DescriptorPoolSize {
                kind: DescriptorType::CombinedImageSampler,
                count: 1,
            }],
        )?;
        rollback.track(GpuObject::DescriptorPool(descriptor_pool));
        let descriptor_set = device.allocate_descriptor_set(descriptor_pool, descriptor_set_layout)?;
        device.write_image_descriptor(
            descriptor_set,
            0,
            sampler,
            background_view,
            ImageLayout::ShaderReadOnlyOptimal,
        )?;

        let vertices: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let quad = BoundBuffer::new(
            device,
            &BufferDesc {
                size: vertices.len() as u64,
                usage: BufferUsage::VERTEX_BUFFER,
            },
            MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
        )?;
        rollback.track_bound(GpuObject::Buffer(quad.buffer), quad.memory);
        quad.write(device, vertices)?;

        rollback.commit();
        Ok(Self {
            command_pool,
            descriptor_set_layout,
            pipeline_layout,
            vertex_shader,
            fragment_shader,
            sampler,
            background,
            background_view,
            descriptor_pool,
            descriptor_set,
            quad,
        })
    }

    /// Must only run once no command buffer referencing these objects is
    /// pending on the device, and only once.
    pub fn release<D: GpuDevice>(&self, device: &D) {
        release(device, GpuObject::DescriptorPool(self.descriptor_pool));
        release(device, GpuObject::ImageView(self.background_view));
        self.background.release(device);
        self.quad.release(device);
        release(device, GpuObject::Sampler(self.sampler));
        release(device, GpuObject::ShaderModule(self.fragment_shader));
        release(device, GpuObject::ShaderModule(self.vertex_shader));
        release(device, GpuObject::PipelineLayout(self.pipeline_layout));
        release(device, GpuObject::DescriptorSetLayout(self.descriptor_set_layout));
        release(device, GpuObject::CommandPool(self.command_pool));
    }
}
