//! Data models and structures
//!
//! Defines the task list that drives the resizer, the attachment record the
//! upload layer hands over, and the environment-driven server configuration.

use crate::{Error, Result};
use image::imageops::FilterType;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Resampling filter used when scaling an image.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    #[serde(alias = "nearest")]
    NearestNeighbor,
    /// `grid` and `moving-average` have no dedicated filter and resample
    /// with the triangle filter.
    #[default]
    #[serde(alias = "grid", alias = "moving-average")]
    Linear,
    Cubic,
    Gaussian,
    Lanczos,
}

impl Interpolation {
    pub fn filter_type(self) -> FilterType {
        match self {
            Interpolation::NearestNeighbor => FilterType::Nearest,
            Interpolation::Linear => FilterType::Triangle,
            Interpolation::Cubic => FilterType::CatmullRom,
            Interpolation::Gaussian => FilterType::Gaussian,
            Interpolation::Lanczos => FilterType::Lanczos3,
        }
    }
}

/// Encoding of a derived image. Also decides the file extension.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
    Gif,
    Webp,
    Bmp,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Gif => "gif",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpg => ImageFormat::Jpeg,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Webp => ImageFormat::WebP,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Target geometry and encoding for one derived image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<Interpolation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl TaskSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            suffix: None,
            interpolation: None,
            format: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn interpolation_or_default(&self) -> Interpolation {
        self.interpolation.unwrap_or_default()
    }

    pub fn format_or_default(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Resize,
    Cover,
    Thumbnail,
}

impl TaskKind {
    pub fn key(self) -> &'static str {
        match self {
            TaskKind::Resize => "resize",
            TaskKind::Cover => "cover",
            TaskKind::Thumbnail => "thumbnail",
        }
    }

    pub fn default_suffix(self) -> &'static str {
        match self {
            TaskKind::Resize => "resized",
            TaskKind::Cover => "cover",
            TaskKind::Thumbnail => "thumbnail",
        }
    }
}

/// One entry of the task list, serialized as `{"<kind>": {..spec..}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Resize(TaskSpec),
    Cover(TaskSpec),
    Thumbnail(TaskSpec),
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Resize(_) => TaskKind::Resize,
            Task::Cover(_) => TaskKind::Cover,
            Task::Thumbnail(_) => TaskKind::Thumbnail,
        }
    }

    pub fn spec(&self) -> &TaskSpec {
        match self {
            Task::Resize(spec) | Task::Cover(spec) | Task::Thumbnail(spec) => spec,
        }
    }

    /// Decide the task variant for a loosely shaped entry.
    ///
    /// Keys are tried as `resize`, `cover`, `thumbnail`; the first one holding
    /// an object wins. `Ok(None)` means the entry names no known task.
    pub fn from_entry(entry: &Value) -> Result<Option<Task>> {
        let kinds: [(TaskKind, fn(TaskSpec) -> Task); 3] = [
            (TaskKind::Resize, Task::Resize),
            (TaskKind::Cover, Task::Cover),
            (TaskKind::Thumbnail, Task::Thumbnail),
        ];

        for (kind, build) in kinds {
            if let Some(spec @ Value::Object(_)) = entry.get(kind.key()) {
                let spec = TaskSpec::deserialize(spec).map_err(|e| {
                    Error::Config(format!("invalid `{}` task: {}", kind.key(), e))
                })?;
                return Ok(Some(build(spec)));
            }
        }

        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct RawResizerConfig {
    #[serde(default)]
    tasks: Vec<Value>,
}

/// Immutable resizer configuration: the ordered task list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawResizerConfig")]
pub struct ResizerConfig {
    pub tasks: Vec<Task>,
}

impl TryFrom<RawResizerConfig> for ResizerConfig {
    type Error = Error;

    fn try_from(raw: RawResizerConfig) -> Result<Self> {
        let mut tasks = Vec::with_capacity(raw.tasks.len());
        for (index, entry) in raw.tasks.iter().enumerate() {
            match Task::from_entry(entry)? {
                Some(task) => tasks.push(task),
                None => tracing::debug!("Skipping task #{} with no recognized kind", index),
            }
        }
        Ok(Self { tasks })
    }
}

impl ResizerConfig {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// One uploaded file, plus the paths of every variant derived from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub path: PathBuf,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resized_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,
}

impl Attachment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn derived_path(&self, kind: TaskKind) -> Option<&Path> {
        match kind {
            TaskKind::Resize => self.resized_path.as_deref(),
            TaskKind::Cover => self.cover_path.as_deref(),
            TaskKind::Thumbnail => self.thumbnail_path.as_deref(),
        }
    }

    pub fn set_derived_path(&mut self, kind: TaskKind, path: PathBuf) {
        let slot = match kind {
            TaskKind::Resize => &mut self.resized_path,
            TaskKind::Cover => &mut self.cover_path,
            TaskKind::Thumbnail => &mut self.thumbnail_path,
        };
        *slot = Some(path);
    }
}

// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub tasks_file: Option<PathBuf>,
    pub max_files: usize,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        load_dotenv(dotenvy::dotenv().map(|_| ()))?;

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            tasks_file: std::env::var("RESIZER_TASKS").ok().map(PathBuf::from),
            max_files: env_or("MAX_FILES", 10)?,
            max_body_bytes: env_or("MAX_BODY_BYTES", 25 * 1024 * 1024)?,
        })
    }
}

/// A missing `.env` is fine; one that fails to parse is not.
fn load_dotenv(result: std::result::Result<(), dotenvy::Error>) -> Result<()> {
    match result {
        Err(e) if !e.not_found() => Err(e.into()),
        _ => Ok(()),
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{} is invalid ({}): {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}
