//! Window and event loop glue.
//!
//! [`App`] owns the window, the GPU state, the scene and the audio player
//! and drives them from winit's [`ApplicationHandler`] callbacks. A redraw
//! is requested every `tick_interval`; each redraw runs one scene tick and
//! renders it.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::{Window, WindowId};

use crate::audio::{NullAudio, Player};
use crate::config::Config;
use crate::error::AppError;
use crate::fps_graph::FpsGraph;
use crate::gpu::GpuState;
use crate::input::{Command, Input};
use crate::overlay::{spectrum_trace, OverlayBatch};
use crate::playlist::Playlist;
use crate::scene::Scene;

const APP_NAME: &str = "FyreWare";

pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    scene: Scene,
    input: Input,
    /// `None` when no output device could be opened.
    player: Option<Player>,
    fps_graph: FpsGraph,
    overlay: OverlayBatch,
    show_fps_graph: bool,
    show_spectrum: bool,
    last_tick: Option<Instant>,
    next_tick: Instant,
    /// First fatal error; returned once the loop has exited.
    error: Option<AppError>,
}

impl App {
    pub fn new(config: Config, playlist: Playlist) -> Result<Self, AppError> {
        let scene = Scene::new(config.clone())?;

        let empty = playlist.is_empty();
        let player = match Player::new(playlist, config.sound.clone()) {
            Ok(mut player) => {
                if !empty {
                    if let Err(e) = player.play_song() {
                        log::warn!("Could not start playback: {}", e);
                    }
                }
                Some(player)
            }
            Err(e) => {
                log::warn!("Audio disabled: {}", e);
                None
            }
        };

        Ok(Self {
            fps_graph: FpsGraph::new(config.fps_graph.clone()),
            show_fps_graph: config.show_fps_graph,
            show_spectrum: config.show_spectrum,
            window: None,
            gpu_state: None,
            scene,
            input: Input::new(),
            player,
            overlay: OverlayBatch::new(),
            last_tick: None,
            next_tick: Instant::now(),
            error: None,
            config,
        })
    }

    /// Take the error that stopped the loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    fn title(&self) -> String {
        match self.player.as_ref().and_then(Player::title) {
            Some(song) => format!("{} - {}", song, APP_NAME),
            None => APP_NAME.to_string(),
        }
    }

    fn update_title(&self) {
        if let Some(window) = &self.window {
            window.set_title(&self.title());
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{}", error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn run_commands(&mut self, event_loop: &ActiveEventLoop) {
        for command in self.input.drain_commands() {
            let result = match (command, self.player.as_mut()) {
                (Command::TogglePause, Some(player)) => player.toggle_pause(),
                (Command::Next, Some(player)) => player.next(),
                (Command::Prev, Some(player)) => player.prev(),
                (Command::TogglePause | Command::Next | Command::Prev, None) => Ok(()),
                (Command::ToggleFpsGraph, _) => {
                    self.show_fps_graph = !self.show_fps_graph;
                    Ok(())
                }
                (Command::Quit, _) => {
                    event_loop.exit();
                    Ok(())
                }
            };
            if let Err(e) = result {
                log::warn!("{:?} failed: {}", command, e);
            }
            if matches!(command, Command::TogglePause | Command::Next | Command::Prev) {
                self.update_title();
            }
        }
    }

    /// One simulation tick followed by one frame.
    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let raw_dt = self
            .last_tick
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(self.config.tick_interval.as_secs_f32());
        self.last_tick = Some(now);

        if let Some(player) = &mut self.player {
            match player.poll() {
                Ok(true) => self.update_title(),
                Ok(false) => {}
                Err(e) => log::error!("Could not continue the playlist: {}", e),
            }
        }

        self.input.apply(self.scene.camera_mut());
        self.run_commands(event_loop);
        self.input.begin_frame();

        let result = match &mut self.player {
            Some(player) => self.scene.tick_with(raw_dt, player),
            None => self.scene.tick_with(raw_dt, &mut NullAudio),
        };
        let report = match result {
            Ok(report) => report,
            Err(e) => return self.fail(event_loop, e.into()),
        };
        self.fps_graph.add_sample(report.delta.raw, report.delta.smoothed);

        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        let viewport = gpu_state.viewport();
        self.overlay.clear();
        if self.show_spectrum {
            spectrum_trace(&mut self.overlay, self.scene.spectrum(), viewport);
        }
        if self.show_fps_graph {
            self.fps_graph.draw(&mut self.overlay, viewport);
        }

        match gpu_state.render(&self.scene, &self.overlay) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu_state.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory");
                event_loop.exit();
            }
            Err(e) => log::error!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title(self.title())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        self.window = Some(window.clone());

        match pollster::block_on(GpuState::new(window, &self.config)) {
            Ok(gpu_state) => self.gpu_state = Some(gpu_state),
            Err(e) => return self.fail(event_loop, e.into()),
        }
        self.next_tick = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_event(&event);
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_tick {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_tick = now + self.config.tick_interval;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }
}
