//! Simulation builder and runner

use std::path::PathBuf;
use std::sync::Arc;

use glam::Vec3;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::FluidConfig;
use crate::environment::EnvironmentImage;
use crate::error::SimulationError;
use crate::gpu::GpuState;
use crate::input::{Command, FluidInput};
use crate::shape::ShapeKind;
use crate::time::Time;

/// A liquid-metal particle simulation in a window.
///
/// Use method chaining to configure, then call `.run()` to start.
///
/// ```ignore
/// use quicksilver::prelude::*;
///
/// FluidSimulation::new()
///     .with_particle_count(32_768)
///     .with_shape(ShapeKind::Torus)
///     .run()?;
/// ```
pub struct FluidSimulation {
    config: FluidConfig,
    environment: Option<PathBuf>,
    title: String,
}

impl FluidSimulation {
    /// Create a new simulation with default settings.
    pub fn new() -> Self {
        Self {
            config: FluidConfig::default(),
            environment: None,
            title: "Quicksilver".to_string(),
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: FluidConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.config.particle_count = count;
        self
    }

    /// Set the box half-extent on every axis.
    pub fn with_bounds(mut self, half_bounds: Vec3) -> Self {
        self.config.half_bounds = half_bounds;
        self
    }

    /// Shape the particles gather into at startup.
    pub fn with_shape(mut self, shape: ShapeKind) -> Self {
        self.config.initial_shape = shape;
        self
    }

    /// Reflect an equirectangular image in the metal surface.
    pub fn with_environment_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment = Some(path.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Run the simulation. This blocks until the window is closed.
    pub fn run(self) -> Result<(), SimulationError> {
        self.config.validate()?;
        let environment = self
            .environment
            .as_ref()
            .map(EnvironmentImage::from_file)
            .transpose()?;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            config: self.config,
            environment,
            title: self.title,
            running: None,
            error: None,
        };
        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for FluidSimulation {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that exists only while the window is open.
struct Running {
    window: Arc<Window>,
    gpu: GpuState,
    input: FluidInput,
    time: Time,
}

struct App {
    config: FluidConfig,
    environment: Option<EnvironmentImage>,
    title: String,
    running: Option<Running>,
    error: Option<SimulationError>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Running, SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            &self.config,
            self.environment.as_ref(),
        ))?;
        let size = window.inner_size();

        Ok(Running {
            input: FluidInput::new(&self.config.sim, size.width, size.height),
            time: Time::new(self.config.max_delta),
            window,
            gpu,
        })
    }

    /// Record a fatal error and tear everything down at once.
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: SimulationError) {
        error!("{}", e);
        self.error = Some(e);
        self.running = None;
        event_loop.exit();
    }

    fn command(running: &mut Running, command: Command, event_loop: &ActiveEventLoop) {
        match command {
            Command::SelectShape(shape) => running.gpu.set_shape(shape),
            Command::TogglePause => {
                let paused = running.time.toggle_pause();
                info!("{}", if paused { "Paused" } else { "Resumed" });
            }
            Command::Exit => event_loop.exit(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        if let Some(command) = running.input.handle_event(&event) {
            Self::command(running, command, event_loop);
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = running.gpu.resize(size.width, size.height) {
                    self.fail(event_loop, e.into());
                }
            }
            WindowEvent::RedrawRequested => {
                let dt = running.time.update();
                running.input.update(dt);
                running.input.apply_camera(&mut running.gpu.camera);

                match running.gpu.frame(dt, &running.input.step_inputs()) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        warn!("Surface lost or outdated, reconfiguring");
                        running.gpu.reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("Out of GPU memory");
                        event_loop.exit();
                    }
                    Err(e) => warn!("Skipping frame: {:?}", e),
                }
                running.window.request_redraw();
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = self.running.take() {
            info!("Shutting down after {} frames", running.time.frame());
        }
    }
}
