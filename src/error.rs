//! Error types for quicksilver.
//!
//! GPU setup, pipeline construction, environment textures and configuration
//! each get their own error enum; [`SimulationError`] wraps them for
//! [`crate::FluidSimulation::run`].

use std::fmt;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// The adapter cannot present to the window surface.
    SurfaceUnsupported,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found (Vulkan, Metal, DX12 or WebGPU required)"),
            GpuError::SurfaceUnsupported => write!(f, "The selected adapter reports no formats for this surface"),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to read back GPU buffer: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors raised while building or resizing the fluid pipeline.
///
/// Both variants are fatal: a pipeline is never handed out with a missing
/// program or a render target that failed validation.
#[derive(Debug)]
pub enum PipelineError {
    /// A shader module or the pipeline built from it failed validation.
    ShaderCompilation {
        /// Label of the program that failed.
        label: &'static str,
        /// Message reported by the driver / validator.
        message: String,
    },
    /// A render target could not be allocated in a usable state.
    IncompleteTarget {
        /// Label of the target that failed.
        label: &'static str,
        /// Message reported by the driver / validator.
        message: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ShaderCompilation { label, message } => {
                write!(f, "Failed to compile {}: {}", label, message)
            }
            PipelineError::IncompleteTarget { label, message } => {
                write!(f, "Render target {} is incomplete: {}", label, message)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Errors that can occur during texture loading.
#[derive(Debug)]
pub enum TextureError {
    /// Failed to load image file.
    ImageLoad(image::ImageError),
    /// Failed to read file from disk.
    Io(std::io::Error),
    /// Pixel data does not match the stated dimensions.
    SizeMismatch {
        /// Bytes required for the stated width and height.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::ImageLoad(e) => write!(f, "Failed to load image: {}", e),
            TextureError::Io(e) => write!(f, "Failed to read texture file: {}", e),
            TextureError::SizeMismatch { expected, actual } => {
                write!(f, "RGBA data has {} bytes, expected {}", actual, expected)
            }
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::ImageLoad(e) => Some(e),
            TextureError::Io(e) => Some(e),
            TextureError::SizeMismatch { .. } => None,
        }
    }
}

impl From<image::ImageError> for TextureError {
    fn from(e: image::ImageError) -> Self {
        TextureError::ImageLoad(e)
    }
}

impl From<std::io::Error> for TextureError {
    fn from(e: std::io::Error) -> Self {
        TextureError::Io(e)
    }
}

/// A configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Name of the offending field.
    pub field: &'static str,
    /// What was wrong with it.
    pub message: String,
}

impl ConfigError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration for `{}`: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Errors that can occur when running a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// The rendering pipeline could not be built.
    Pipeline(PipelineError),
    /// The environment image could not be loaded.
    Texture(TextureError),
    /// The configuration was rejected before startup.
    Config(ConfigError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
            SimulationError::Pipeline(e) => write!(f, "Pipeline error: {}", e),
            SimulationError::Texture(e) => write!(f, "Texture error: {}", e),
            SimulationError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
            SimulationError::Pipeline(e) => Some(e),
            SimulationError::Texture(e) => Some(e),
            SimulationError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

impl From<PipelineError> for SimulationError {
    fn from(e: PipelineError) -> Self {
        SimulationError::Pipeline(e)
    }
}

impl From<TextureError> for SimulationError {
    fn from(e: TextureError) -> Self {
        SimulationError::Texture(e)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}
