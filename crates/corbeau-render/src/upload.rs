// SPDX-License-Identifier: CEPL-1.0
//! One-shot upload of the background image.
use std::time::Duration;

use tracing::info;

use crate::background::Pixmap;
use crate::command::*;
use crate::desc::{BufferDesc, Submission};
use crate::error::{GpuError, RenderError, RenderResult};
use crate::gpu::GpuDevice;
use crate::handle::*;
use crate::resources::{BoundBuffer, BoundImage, Rollback};
use crate::types::*;

/// Undefined -> transfer destination, copy, -> shader read-only.
pub fn upload_commands(staging: Buffer, target: &BoundImage) -> Vec<Command> {
    vec![
        Command::PipelineBarrier {
            src_stage: PipelineStages::TOP_OF_PIPE,
            dst_stage: PipelineStages::TRANSFER,
            image_barriers: vec![ImageBarrier {
                image: target.image,
                src_access: Access::empty(),
                dst_access: Access::TRANSFER_WRITE,
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::TransferDstOptimal,
            }],
        },
        Command::CopyBufferToImage {
            buffer: staging,
            image: target.image,
            layout: ImageLayout::TransferDstOptimal,
            region: BufferImageCopy {
                buffer_offset: 0,
                extent: target.extent,
            },
        },
        Command::PipelineBarrier {
            src_stage: PipelineStages::TRANSFER,
            dst_stage: PipelineStages::FRAGMENT_SHADER,
            image_barriers: vec![ImageBarrier {
                image: target.image,
                src_access: Access::TRANSFER_WRITE,
                dst_access: Access::SHADER_READ,
                old_layout: ImageLayout::TransferDstOptimal,
                new_layout: ImageLayout::ShaderReadOnlyOptimal,
            }],
        },
    ]
}

/// Copies `pixels` into `target` and blocks until the copy finished.
///
/// The command buffer and fence are private to this call. Running out of
/// `timeout` is fatal: without the image there is nothing to sample.
pub fn seed_image<D: GpuDevice>(
    device: &D,
    pool: CommandPool,
    target: &BoundImage,
    pixels: &Pixmap,
    timeout: Duration,
) -> RenderResult<()> {
    let staging = BoundBuffer::new(
        device,
        &BufferDesc {
            size: pixels.byte_len(),
            usage: BufferUsage::TRANSFER_SRC,
        },
        MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
    )?;
    let result = submit_and_wait(device, pool, &staging, target, pixels, timeout);
    // a timed out copy may still read from the staging buffer
    if !matches!(result, Err(RenderError::SyncTimeout { .. })) {
        staging.release(device);
    }
    result
}

fn submit_and_wait<D: GpuDevice>(
    device: &D,
    pool: CommandPool,
    staging: &BoundBuffer,
    target: &BoundImage,
    pixels: &Pixmap,
    timeout: Duration,
) -> RenderResult<()> {
    staging.write(device, &pixels.rgba)?;

    let mut scratch = Rollback::new(device);
    let cmd = device
        .allocate_command_buffers(pool, 1)?
        .into_iter()
        .next()
        .ok_or(GpuError::InvalidUsage("no command buffer allocated"))?;
    scratch.track(GpuObject::CommandBuffer { pool, buffer: cmd });
    let fence = device.create_fence(false)?;
    scratch.track(GpuObject::Fence(fence));

    device.record(
        cmd,
        RecordUsage::OneTimeSubmit,
        &upload_commands(staging.buffer, target),
    )?;
    device.submit(&Submission {
        wait: &[],
        command_buffers: &[cmd],
        signal: &[],
        fence,
    })?;

    match device.wait_for_fence(fence, timeout)? {
        FenceWait::Signaled => {
            info!(
                "uploaded {}x{} background image",
                target.extent.width, target.extent.height
            );
            // the scratch objects are released when `scratch` drops
            Ok(())
        }
        FenceWait::TimedOut => {
            // still in flight, leak rather than free under the GPU
            scratch.commit();
            Err(RenderError::SyncTimeout {
                what: "background upload",
                timeout,
            })
        }
    }
}
