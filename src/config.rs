use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::media::{CameraConstraints, FacingMode};
use crate::notify::DEFAULT_NOTICE_TTL;

const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 360;

#[derive(Debug, Deserialize, Default)]
struct TriviewConfigFile {
    camera: Option<CameraConfigFile>,
    notifications: Option<NotificationConfigFile>,
    detection: Option<DetectionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    facing: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct NotificationConfigFile {
    ttl_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriviewConfig {
    pub camera: CameraSettings,
    pub notice_ttl: Duration,
    /// `None` lets a stalled model keep the loading indicator up indefinitely.
    pub detect_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub facing: String,
}

impl TriviewConfig {
    /// Read `TRIVIEW_CONFIG` (JSON, or TOML by extension), then apply
    /// `TRIVIEW_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TRIVIEW_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TriviewConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let camera = CameraSettings {
            width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            facing: camera.facing.unwrap_or_else(|| "environment".to_string()),
        };
        let notice_ttl = file
            .notifications
            .and_then(|notifications| notifications.ttl_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_NOTICE_TTL);
        let detect_timeout = file
            .detection
            .and_then(|detection| detection.timeout_ms)
            .and_then(timeout_from_millis);
        Self {
            camera,
            notice_ttl,
            detect_timeout,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(width) = std::env::var("TRIVIEW_CAMERA_WIDTH") {
            self.camera.width = parse_env("TRIVIEW_CAMERA_WIDTH", &width)?;
        }
        if let Ok(height) = std::env::var("TRIVIEW_CAMERA_HEIGHT") {
            self.camera.height = parse_env("TRIVIEW_CAMERA_HEIGHT", &height)?;
        }
        if let Ok(facing) = std::env::var("TRIVIEW_CAMERA_FACING") {
            if !facing.trim().is_empty() {
                self.camera.facing = facing;
            }
        }
        if let Ok(ttl) = std::env::var("TRIVIEW_NOTICE_TTL_MS") {
            self.notice_ttl = Duration::from_millis(parse_env("TRIVIEW_NOTICE_TTL_MS", &ttl)?);
        }
        if let Ok(timeout) = std::env::var("TRIVIEW_DETECT_TIMEOUT_MS") {
            self.detect_timeout = if timeout.trim().is_empty() {
                None
            } else {
                timeout_from_millis(parse_env("TRIVIEW_DETECT_TIMEOUT_MS", &timeout)?)
            };
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        let facing = FacingMode::parse(&self.camera.facing).ok_or_else(|| {
            anyhow!(
                "camera facing must be 'user' or 'environment', got '{}'",
                self.camera.facing
            )
        })?;
        self.camera.facing = facing_name(facing).to_string();
        if self.notice_ttl.is_zero() {
            return Err(anyhow!("notification ttl must be greater than zero"));
        }
        Ok(())
    }

    pub fn facing_mode(&self) -> FacingMode {
        FacingMode::parse(&self.camera.facing).unwrap_or_default()
    }

    pub fn camera_constraints(&self) -> CameraConstraints {
        CameraConstraints {
            ideal_width: self.camera.width,
            ideal_height: self.camera.height,
            facing: self.facing_mode(),
        }
    }
}

impl Default for TriviewConfig {
    fn default() -> Self {
        Self::from_file(TriviewConfigFile::default())
    }
}

fn facing_name(facing: FacingMode) -> &'static str {
    match facing {
        FacingMode::User => "user",
        FacingMode::Environment => "environment",
    }
}

fn timeout_from_millis(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{key} must be a non-negative integer"))
}

fn read_config_file(path: &Path) -> Result<TriviewConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
