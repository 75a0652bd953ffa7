// SPDX-License-Identifier: CEPL-1.0
//! Plain value types shared by the renderer and its providers.
//!
//! Numeric values mirror the Vulkan enums and flag bits so a Vulkan
//! provider can convert with `from_raw` instead of a lookup table.
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offset2D {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect2D {
    pub offset: Offset2D,
    pub extent: Extent2D,
}

impl Rect2D {
    pub fn covering(extent: Extent2D) -> Self {
        Self {
            offset: Offset2D::default(),
            extent,
        }
    }
}

/// Kind of device as reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    #[serde(rename = "other")]
    Other = 0,
    #[serde(rename = "integrated")]
    IntegratedGpu = 1,
    #[serde(rename = "discrete")]
    DiscreteGpu = 2,
    #[serde(rename = "virtual")]
    VirtualGpu = 3,
    #[serde(rename = "cpu")]
    Cpu = 4,
}

impl DeviceClass {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => DeviceClass::IntegratedGpu,
            2 => DeviceClass::DiscreteGpu,
            3 => DeviceClass::VirtualGpu,
            4 => DeviceClass::Cpu,
            _ => DeviceClass::Other,
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct QueueCapabilities: u32 {
        const GRAPHICS = 0x1;
        const COMPUTE = 0x2;
        const TRANSFER = 0x4;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MemoryProperties: u32 {
        const DEVICE_LOCAL = 0x1;
        const HOST_VISIBLE = 0x2;
        const HOST_COHERENT = 0x4;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 0x1;
        const TRANSFER_DST = 0x2;
        const UNIFORM_BUFFER = 0x10;
        const VERTEX_BUFFER = 0x80;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 0x1;
        const TRANSFER_DST = 0x2;
        const SAMPLED = 0x4;
        const COLOR_ATTACHMENT = 0x10;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 0x1;
        const FRAGMENT = 0x10;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 0x1;
        const VERTEX_INPUT = 0x4;
        const FRAGMENT_SHADER = 0x80;
        const COLOR_ATTACHMENT_OUTPUT = 0x400;
        const TRANSFER = 0x1000;
        const BOTTOM_OF_PIPE = 0x2000;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        const SHADER_READ = 0x20;
        const COLOR_ATTACHMENT_WRITE = 0x100;
        const TRANSFER_READ = 0x800;
        const TRANSFER_WRITE = 0x1000;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ColorComponents: u32 {
        const R = 0x1;
        const G = 0x2;
        const B = 0x4;
        const A = 0x8;
    }
}

/// Pixel/vertex format, carried as the raw Vulkan `VkFormat` value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Format(pub i32);

impl Format {
    pub const UNDEFINED: Self = Self(0);
    pub const R8G8B8A8_UNORM: Self = Self(37);
    pub const B8G8R8A8_UNORM: Self = Self(44);
    pub const B8G8R8A8_SRGB: Self = Self(50);
    pub const R32G32_SFLOAT: Self = Self(103);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ImageLayout {
    #[default]
    Undefined = 0,
    ColorAttachmentOptimal = 2,
    ShaderReadOnlyOptimal = 5,
    TransferDstOptimal = 7,
    PresentSrc = 1_000_001_002,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum DescriptorType {
    CombinedImageSampler = 1,
    SampledImage = 2,
    UniformBuffer = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Filter {
    Nearest = 0,
    Linear = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum AddressMode {
    Repeat = 0,
    MirroredRepeat = 1,
    ClampToEdge = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum LoadOp {
    Load = 0,
    Clear = 1,
    DontCare = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum StoreOp {
    Store = 0,
    DontCare = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum PrimitiveTopology {
    PointList = 0,
    LineList = 1,
    TriangleList = 3,
    TriangleStrip = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum PolygonMode {
    Fill = 0,
    Line = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CullMode {
    None = 0,
    Front = 1,
    Back = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum FrontFace {
    CounterClockwise = 0,
    Clockwise = 1,
}

/// How a recorded command buffer is going to be submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordUsage {
    OneTimeSubmit,
    Reusable,
}

/// Outcome of a bounded fence wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceWait {
    Signaled,
    TimedOut,
}
