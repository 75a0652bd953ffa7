// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn, Level};

use corbeau_core::init_tracing;
use corbeau_platform::winit::event_loop::EventLoop;
use corbeau_platform::WindowHost;
use corbeau_render::shader::DEFAULT_DIR;
use corbeau_render::{run_until_stopped, Extent2D, Renderer, RendererConfig, ShaderSet, StopToken};
use corbeau_render_vk::VkInstance;

/// How long to sleep in the event loop while there is nothing to draw.
const PAUSED_WAIT: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "corbeau.toml")]
    config: PathBuf,
    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,
    /// Directory holding basic.vert.spirv and basic.frag.spirv
    #[arg(long)]
    shader_dir: Option<PathBuf>,
    /// Use the shaders compiled into the binary
    #[arg(long)]
    embedded_shaders: bool,
    /// Write the compiled-in shaders to DIR and exit
    #[arg(long, value_name = "DIR")]
    emit_shaders: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ShaderSource {
    #[default]
    Directory,
    Embedded,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RenderCfg {
    #[serde(flatten)]
    renderer: RendererConfig,
    shaders: ShaderSource,
    shader_dir: PathBuf,
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            renderer: RendererConfig::default(),
            shaders: ShaderSource::Directory,
            shader_dir: PathBuf::from(DEFAULT_DIR),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct AppCfg {
    #[serde(default)]
    render: RenderCfg,
}

fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => toml::from_str::<AppCfg>(&s).unwrap_or_else(|e| {
            warn!("ignoring {}: {e}", path.display());
            AppCfg::default()
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("no {}, using defaults", path.display());
            AppCfg::default()
        }
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            AppCfg::default()
        }
    }
}

/// Flags win over the config file.
fn load_shaders(args: &Args, cfg: &RenderCfg) -> Result<ShaderSet> {
    if args.embedded_shaders || (args.shader_dir.is_none() && cfg.shaders == ShaderSource::Embedded) {
        info!("using embedded shaders");
        return Ok(corbeau_render_vk::embedded_shaders()?);
    }
    let dir = args.shader_dir.as_deref().unwrap_or(&cfg.shader_dir);
    ShaderSet::from_dir(dir).with_context(|| format!("loading shaders from {}", dir.display()))
}

/// Logs the frame rate once per second.
struct FpsCounter {
    frames: u32,
    last: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        FpsCounter { frames: 0, last: Instant::now() }
    }

    fn tick(&mut self) {
        self.frames = self.frames.saturating_add(1);
        let now = Instant::now();
        if now.duration_since(self.last).as_secs_f32() >= 1.0 {
            info!("fps ~ {}", self.frames);
            self.frames = 0;
            self.last = now;
        }
    }
}

fn main() -> Result<()> {
    init_tracing(Level::INFO);
    let args = Args::parse();

    if let Some(dir) = &args.emit_shaders {
        corbeau_render_vk::emit_shaders(dir)
            .with_context(|| format!("writing shaders to {}", dir.display()))?;
        info!("wrote shaders to {}", dir.display());
        return Ok(());
    }

    let cfg = load_cfg(&args.config);
    // before any GPU object exists, so a bad file costs nothing
    let shaders = load_shaders(&args, &cfg.render)?;

    let mut event_loop: EventLoop<()> = EventLoop::new()?;
    let mut host = WindowHost::open(&mut event_loop, "corbeau")?;

    let mut instance = {
        let window = host.window().context("window was not created")?;
        let size = window.inner_size();
        VkInstance::new(window, window, Extent2D::new(size.width, size.height))?
    };
    let mut renderer = Renderer::new(&mut instance, &cfg.render.renderer, &shaders)
        .context("renderer initialisation")?;
    info!("rendering on `{}`", renderer.device_name());

    let stop = StopToken::new();
    let mut fps = FpsCounter::new();
    let mut frames = 0u64;
    let presented = run_until_stopped(&mut renderer, &stop, |renderer| {
        let timeout = if renderer.extent().is_some() { Duration::ZERO } else { PAUSED_WAIT };
        if !host.pump(&mut event_loop, Some(timeout)) || host.close_requested() {
            stop.stop();
            return Ok(());
        }
        if let Some(size) = host.take_resize() {
            renderer.resize(Extent2D::new(size.width, size.height))?;
        }
        if args.frames.is_some_and(|limit| frames >= limit) {
            stop.stop();
            return Ok(());
        }
        frames += 1;
        fps.tick();
        Ok(())
    })
    .context("render loop")?;

    info!("presented {presented} frames, shutting down");
    Ok(())
}
