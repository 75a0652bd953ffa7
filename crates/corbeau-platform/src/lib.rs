// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! The OS window the compositor draws into.
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{error, info};

pub use winit;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    error::OsError,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window, WindowId},
};

/// Owns the window and collects the events the renderer cares about. The
/// caller drives it by pumping the event loop between frames.
pub struct WindowHost {
    title: String,
    window: Option<Window>,
    create_error: Option<OsError>,
    close_requested: bool,
    resized: Option<PhysicalSize<u32>>,
}

impl WindowHost {
    pub fn new(title: impl Into<String>) -> Self {
        WindowHost {
            title: title.into(),
            window: None,
            create_error: None,
            close_requested: false,
            resized: None,
        }
    }

    /// Pumps `event_loop` until the window exists.
    pub fn open(event_loop: &mut EventLoop<()>, title: impl Into<String>) -> Result<Self> {
        let mut host = WindowHost::new(title);
        while host.window.is_none() {
            if let Some(e) = host.create_error.take() {
                return Err(anyhow!("create_window: {e}"));
            }
            if !host.pump(event_loop, Some(Duration::from_millis(10))) || host.close_requested {
                return Err(anyhow!("event loop exited before the window was created"));
            }
        }
        Ok(host)
    }

    /// Handles pending events, waiting at most `timeout` for new ones.
    /// Returns false once the event loop has exited.
    pub fn pump(&mut self, event_loop: &mut EventLoop<()>, timeout: Option<Duration>) -> bool {
        match event_loop.pump_app_events(timeout, self) {
            PumpStatus::Continue => true,
            PumpStatus::Exit(code) => {
                info!("event loop exited with {code}");
                false
            }
        }
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Latest size reported since the previous call.
    pub fn take_resize(&mut self) -> Option<PhysicalSize<u32>> {
        self.resized.take()
    }
}

impl ApplicationHandler for WindowHost {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(Window::default_attributes().with_title(self.title.as_str())) {
            Ok(window) => {
                let size = window.inner_size();
                info!("window created ({}x{})", size.width, size.height);
                self.window = Some(window);
            }
            Err(e) => {
                error!("create_window failed: {e}");
                self.create_error = Some(e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.close_requested = true;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                info!("Resized → {}x{}", size.width, size.height);
                self.resized = Some(size);
            }
            _ => {}
        }
    }
}
