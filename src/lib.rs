pub mod capture;
#[cfg(feature = "sdl-host")]
pub mod display;
pub mod error;
pub mod filter;
pub mod gpu;
pub mod render;
pub mod stats;
pub mod ui;

use std::path::Path;

use arc_swap::ArcSwap;
use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

pub use error::{GlError, RenderError, ShaderError};
pub use filter::{FilterKind, ShaderDialect};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub render: RenderConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraKind {
    TestPattern,
    V4l2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub source: CameraKind,
    /// V4L2 device path, empty to auto-detect
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub dialect: ShaderDialect,
    /// Filter built when the surface is created
    pub default_filter: FilterKind,
    pub clear_color: [f32; 4],
    /// CPU core for the render thread
    pub pin_core: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub show_overlay: bool,
    pub overlay_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                source: CameraKind::TestPattern,
                device: String::new(),
                // Portrait, matching the preview surface
                width: 1080,
                height: 1920,
                fps: 30,
                format: PixelFormat::Mjpeg,
                buffer_count: 4,
            },
            display: DisplayConfig::default(),
            render: RenderConfig::default(),
            metrics: MetricsConfig {
                show_overlay: false,
                overlay_interval_ms: 500,
            },
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "iris".into(),
            width: 540,
            height: 960,
            vsync: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dialect: ShaderDialect::Desktop,
            default_filter: FilterKind::Normal,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            pin_core: None,
        }
    }
}

impl Config {
    /// Defaults, then `path` (or `iris.toml` if present), then `IRIS__*`
    /// environment variables, e.g. `IRIS__RENDER__DEFAULT_FILTER=sepia`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;
        let file = match path {
            Some(path) => config::File::from(path),
            None => config::File::with_name("iris").required(false),
        };

        config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("IRIS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
