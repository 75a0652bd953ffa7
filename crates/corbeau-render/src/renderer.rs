// SPDX-License-Identifier: CEPL-1.0
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::background::Pixmap;
use crate::command::Command;
use crate::config::RendererConfig;
use crate::desc::Submission;
use crate::error::{GpuError, RenderError, RenderResult};
use crate::gpu::{GpuDevice, GpuInstance};
use crate::handle::*;
use crate::resources::{release, Rollback, StaticResources};
use crate::select::select_device;
use crate::shader::ShaderSet;
use crate::swapchain::{FrameState, Presentation, SwapchainResources};
use crate::types::*;
use crate::upload;

/// Vertices in the quad's triangle strip.
pub const QUAD_VERTEX_COUNT: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented { image_index: u32 },
    /// The surface went stale; swapchain resources were rebuilt and nothing
    /// was presented.
    Rebuilt,
    /// The surface has no area; nothing to draw into.
    Skipped,
}

/// Commands drawing the quad into `framebuffer`.
pub fn frame_commands(
    statics: &StaticResources,
    swapchain: &SwapchainResources,
    framebuffer: Framebuffer,
    clear_color: [f32; 4],
) -> Vec<Command> {
    let quad = statics.quad.buffer;
    vec![
        Command::BindVertexBuffers {
            first_binding: 0,
            buffers: vec![(quad, 0)],
        },
        Command::BindVertexBuffers {
            first_binding: 1,
            buffers: vec![(quad, 0)],
        },
        Command::BindDescriptorSets {
            layout: statics.pipeline_layout,
            first_set: 0,
            sets: vec![statics.descriptor_set],
        },
        Command::BeginRenderPass {
            render_pass: swapchain.render_pass,
            framebuffer,
            area: Rect2D::covering(swapchain.extent),
            clear_color,
        },
        Command::BindGraphicsPipeline(swapchain.pipeline),
        Command::Draw {
            vertex_count: QUAD_VERTEX_COUNT,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        },
        Command::EndRenderPass,
    ]
}

/// Owns the device and everything created on it, and draws the background
/// quad once per [`render_frame`](Self::render_frame).
pub struct Renderer<D: GpuDevice> {
    device: D,
    device_name: String,
    image_available: Semaphore,
    render_done: Semaphore,
    statics: StaticResources,
    presentation: Option<Presentation>,
    clear_color: [f32; 4],
    fence_timeout: Duration,
    extent_hint: Extent2D,
    /// Set once a bounded wait expired. Work may still be in flight, so
    /// nothing the GPU can touch is destroyed afterwards.
    hung: bool,
}

impl<D: GpuDevice> Renderer<D> {
    /// Selects a device, opens it and builds every resource. The background
    /// image is fully uploaded when this returns.
    pub fn new<I>(instance: &mut I, config: &RendererConfig, shaders: &ShaderSet) -> RenderResult<Self>
    where
        I: GpuInstance<Device = D>,
    {
        let selected = select_device(instance, &config.ranking())?;
        let device = instance.open_device(selected.id, selected.score.best_queue_index)?;
        Self::with_device(device, selected.name, config, shaders)
    }

    fn with_device(
        device: D,
        device_name: String,
        config: &RendererConfig,
        shaders: &ShaderSet,
    ) -> RenderResult<Self> {
        let fence_timeout = config.fence_timeout();
        let pixmap = Pixmap::embedded()?;

        let mut rollback = Rollback::new(&device);
        let image_available = device.create_semaphore()?;
        rollback.track(GpuObject::Semaphore(image_available));
        let render_done = device.create_semaphore()?;
        rollback.track(GpuObject::Semaphore(render_done));

        let statics = StaticResources::build(&device, shaders, pixmap.extent)?;
        let swapchain = device.swapchain();
        let built = upload::seed_image(
            &device,
            statics.command_pool,
            &statics.background,
            &pixmap,
            fence_timeout,
        )
        .and_then(|()| Presentation::build(&device, &statics, &swapchain));
        let presentation = match built {
            Ok(presentation) => presentation,
            Err(e) => {
                if !matches!(e, RenderError::SyncTimeout { .. }) {
                    statics.release(&device);
                }
                return Err(e);
            }
        };
        rollback.commit();

        info!("renderer ready on `{}`", device_name);
        Ok(Self {
            device,
            device_name,
            image_available,
            render_done,
            statics,
            presentation: Some(presentation),
            clear_color: config.clear_color,
            fence_timeout,
            extent_hint: swapchain.extent,
            hung: false,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Current output size, `None` while paused on an empty surface.
    pub fn extent(&self) -> Option<Extent2D> {
        self.presentation.as_ref().map(|p| p.resources.extent)
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    #[cfg(test)]
    pub(crate) fn statics(&self) -> &StaticResources {
        &self.statics
    }

    #[cfg(test)]
    pub(crate) fn presentation(&self) -> Option<&Presentation> {
        self.presentation.as_ref()
    }

    /// Acquire, wait for the image's previous frame, record, submit and
    /// present. A stale surface rebuilds the swapchain resources instead of
    /// failing.
    ///
    /// After a timeout every later call fails as well.
    pub fn render_frame(&mut self) -> RenderResult<FrameOutcome> {
        if self.hung {
            return Err(RenderError::SyncTimeout {
                what: "an earlier frame",
                timeout: self.fence_timeout,
            });
        }
        let outcome = self.next_frame();
        if matches!(outcome, Err(RenderError::SyncTimeout { .. })) {
            self.hung = true;
        }
        outcome
    }

    fn next_frame(&mut self) -> RenderResult<FrameOutcome> {
        if self.presentation.is_none() {
            return Ok(FrameOutcome::Skipped);
        }

        let acquired = match self
            .device
            .acquire_next_image(self.image_available, self.fence_timeout)
        {
            Ok(acquired) => acquired,
            Err(GpuError::OutOfDate) => {
                self.recover("acquire")?;
                return Ok(FrameOutcome::Rebuilt);
            }
            Err(GpuError::Timeout) => {
                return Err(RenderError::SyncTimeout {
                    what: "next presentable image",
                    timeout: self.fence_timeout,
                })
            }
            Err(e) => return Err(e.into()),
        };

        self.submit_frame(acquired.index)?;

        match self.device.present(acquired.index, self.render_done) {
            Ok(suboptimal) => {
                if suboptimal || acquired.suboptimal {
                    self.recover("suboptimal present")?;
                }
                Ok(FrameOutcome::Presented {
                    image_index: acquired.index,
                })
            }
            Err(GpuError::OutOfDate) => {
                self.recover("present")?;
                Ok(FrameOutcome::Rebuilt)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn submit_frame(&self, image_index: u32) -> RenderResult<()> {
        let Some(presentation) = &self.presentation else {
            return Err(RenderError::StaleSurface);
        };
        let out_of_range = RenderError::ImageIndexOutOfRange {
            index: image_index,
            count: presentation.frames.len(),
        };
        let index = image_index as usize;
        let FrameState { fence, framebuffer } =
            *presentation.frames.get(index).ok_or(out_of_range)?;
        let cmd = presentation.resources.command_buffers[index];

        // at most one submission in flight per image
        match self.device.wait_for_fence(fence, self.fence_timeout)? {
            FenceWait::Signaled => {}
            FenceWait::TimedOut => {
                return Err(RenderError::SyncTimeout {
                    what: "per-image fence",
                    timeout: self.fence_timeout,
                })
            }
        }
        self.device.reset_fence(fence)?;

        let commands = frame_commands(
            &self.statics,
            &presentation.resources,
            framebuffer,
            self.clear_color,
        );
        self.device.record(cmd, RecordUsage::OneTimeSubmit, &commands)?;

        self.device.submit(&Submission {
            wait: &[(self.image_available, PipelineStages::COLOR_ATTACHMENT_OUTPUT)],
            command_buffers: &[cmd],
            signal: &[self.render_done],
            fence,
        })?;
        debug!("submitted frame for image {image_index}");
        Ok(())
    }

    /// Rebuilds the swapchain resources for a new surface size. An empty
    /// extent pauses rendering until the next non-empty resize.
    pub fn resize(&mut self, extent: Extent2D) -> RenderResult<()> {
        if self.extent() == Some(extent) {
            return Ok(());
        }
        self.extent_hint = extent;
        let rebuilt = self.rebuild();
        if matches!(rebuilt, Err(RenderError::SyncTimeout { .. })) {
            self.hung = true;
        }
        rebuilt
    }

    fn recover(&mut self, during: &str) -> RenderResult<()> {
        info!("surface went stale during {during}, rebuilding swapchain resources");
        self.rebuild()
    }

    /// Waits, bounded by the fence timeout, until no frame is in flight.
    fn settle(&self) -> RenderResult<()> {
        let Some(presentation) = &self.presentation else {
            return Ok(());
        };
        for frame in &presentation.frames {
            if let FenceWait::TimedOut = self.device.wait_for_fence(frame.fence, self.fence_timeout)? {
                return Err(RenderError::SyncTimeout {
                    what: "in-flight frames",
                    timeout: self.fence_timeout,
                });
            }
        }
        Ok(())
    }

    fn rebuild(&mut self) -> RenderResult<()> {
        self.settle()?;
        if let Some(old) = self.presentation.take() {
            old.release(&self.device, self.statics.command_pool);
        }

        match self.device.recreate_swapchain(self.extent_hint) {
            Ok(swapchain) => {
                self.presentation = Some(Presentation::build(&self.device, &self.statics, &swapchain)?);
                self.extent_hint = swapchain.extent;
                Ok(())
            }
            Err(GpuError::ZeroExtent) => {
                info!("surface has no area, pausing until it is resized");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<D: GpuDevice> Drop for Renderer<D> {
    fn drop(&mut self) {
        if !self.hung {
            if let Err(e) = self.settle() {
                warn!("teardown could not wait for the GPU: {e}");
                self.hung = true;
            }
        }
        if self.hung {
            warn!("GPU work may still be in flight, leaking device objects");
            return;
        }
        if let Some(presentation) = self.presentation.take() {
            presentation.release(&self.device, self.statics.command_pool);
        }
        self.statics.release(&self.device);
        release(&self.device, GpuObject::Semaphore(self.render_done));
        release(&self.device, GpuObject::Semaphore(self.image_available));
        info!("renderer torn down");
    }
}
