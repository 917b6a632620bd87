// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use lumen_core::{init_tracing, FrameCounter};
use lumen_render::{FrameStatus, Renderer};
use lumen_render_vk::VkRenderer;
use tracing::{debug, error, info};

use lumen_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

mod config;
mod demo;

use config::{AppCfg, DEFAULT_CONFIG_PATH};
use demo::DemoScene;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Override `[render] enable_validation`
    #[arg(long)]
    validation: Option<bool>,
    /// Override `[render] frames_in_flight`
    #[arg(long)]
    frames_in_flight: Option<u32>,
}

impl Args {
    fn apply(&self, cfg: &mut AppCfg) {
        if let Some(v) = self.validation {
            cfg.render.enable_validation = v;
        }
        if let Some(n) = self.frames_in_flight {
            cfg.render.frames_in_flight = n;
        }
    }
}

struct App {
    cfg: AppCfg,
    scene: DemoScene,
    window: Option<Window>,
    renderer: VkRenderer,
    size: (u32, u32),
    started: Instant,
    fps: FrameCounter,
    exiting: bool,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(cfg: AppCfg) -> Self {
        Self {
            scene: DemoScene::new(&cfg.scene),
            cfg,
            window: None,
            renderer: VkRenderer::new(),
            size: (0, 0),
            started: Instant::now(),
            fps: FrameCounter::new(Duration::from_secs(1)),
            exiting: false,
            fatal: None,
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        self.renderer.deinitialize();
        self.window = None;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.fatal = Some(err);
        self.shutdown(event_loop);
    }

    fn init_renderer(&mut self, window: &Window) -> Result<()> {
        let (w, h) = lumen_platform::framebuffer_size(window);
        self.size = (w, h);
        let info = self.cfg.create_info(w, h);
        self.renderer
            .initialize(window, window, &info)
            .context("initializing the Vulkan renderer")
    }

    fn draw(&mut self) -> Result<()> {
        let t = self.started.elapsed().as_secs_f32();
        let (w, h) = self.size;
        self.renderer
            .update_scene(demo::view_projection(w, h), &self.scene.instances(t));
        match self.renderer.render_frame().context("render_frame")? {
            FrameStatus::Presented { .. } => self.fps.record_frame(),
            FrameStatus::Skipped(reason) => debug!("frame skipped: {reason:?}"),
        }
        Ok(())
    }

    fn minimized(&self) -> bool {
        self.size.0 == 0 || self.size.1 == 0
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = lumen_platform::window_attributes(
            &self.cfg.window.title,
            self.cfg.window.width,
            self.cfg.window.height,
        );
        let window = match event_loop.create_window(attrs).context("creating the window") {
            Ok(w) => w,
            Err(e) => return self.fail(event_loop, e),
        };
        if let Err(e) = self.init_renderer(&window) {
            return self.fail(event_loop, e);
        }
        window.request_redraw();
        self.window = Some(window);
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window.as_ref().is_some_and(|w| w.id() != window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                // 0x0 while minimized goes through as is.
                self.size = (new_size.width, new_size.height);
                debug!("Resized → {}x{}", new_size.width, new_size.height);
                self.renderer
                    .set_back_buffer_size(new_size.width, new_size.height);
                if !self.minimized() {
                    if let Some(w) = &self.window {
                        w.request_redraw();
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if self.exiting {
                    return;
                }
                if let Err(e) = self.draw() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }
        let now = Instant::now();
        if self.minimized() {
            event_loop.set_control_flow(ControlFlow::Wait);
            self.fps.reset(now);
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(w) = &self.window {
            w.request_redraw();
        }
        if let Some(fps) = self.fps.poll(now) {
            info!("fps ~ {fps:.0}");
        }
    }
}

fn main() -> Result<()> {
    init_tracing("info");
    let args = Args::parse();
    let mut cfg = AppCfg::load(&args.config);
    args.apply(&mut cfg);
    info!(
        "config: {} ({}x{}), validation={}, frames_in_flight={}",
        args.config.display(),
        cfg.window.width,
        cfg.window.height,
        cfg.render.enable_validation,
        cfg.frames_in_flight()
    );

    let event_loop: EventLoop<()> = EventLoop::new().context("creating the event loop")?;
    let mut app = App::new(cfg);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_values() {
        let args = Args::parse_from(["lumen", "--validation", "false", "--frames-in-flight", "3"]);
        let mut cfg = AppCfg::default();
        cfg.render.enable_validation = true;
        args.apply(&mut cfg);
        assert!(!cfg.render.enable_validation);
        assert_eq!(cfg.render.frames_in_flight, 3);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let args = Args::parse_from(["lumen", "--config", "alt.toml"]);
        let mut cfg = AppCfg::default();
        let before = cfg.clone();
        args.apply(&mut cfg);
        assert_eq!(cfg, before);
        assert_eq!(args.config, PathBuf::from("alt.toml"));
    }
}
