// SPDX-License-Identifier: CEPL-1.0
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::error::RenderResult;
use crate::gpu::GpuDevice;
use crate::renderer::{FrameOutcome, Renderer};

/// Cloneable stop flag shared between the render loop and whoever decides
/// it is time to quit.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Renders until `stop` is set or a fatal error occurs and returns the
/// number of presented frames.
///
/// `between_frames` runs at the top of every iteration, before the stop
/// check, so it can pump window events, resize the renderer or stop.
pub fn run_until_stopped<D, F>(
    renderer: &mut Renderer<D>,
    stop: &StopToken,
    mut between_frames: F,
) -> RenderResult<u64>
where
    D: GpuDevice,
    F: FnMut(&mut Renderer<D>) -> RenderResult<()>,
{
    info!("entering render loop");
    let mut presented = 0u64;
    loop {
        between_frames(renderer)?;
        if stop.is_stopped() {
            break;
        }
        if let FrameOutcome::Presented { .. } = renderer.render_frame()? {
            presented += 1;
        }
    }
    info!("render loop stopped after {presented} frames");
    Ok(presented)
}
