//! Raspberry Pi still camera driven through the `rpicam-still` CLI.

use super::{Camera, HardwareError};
use crate::config::Settings;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Camera that shells out to a libcamera still-capture program.
///
/// Every capture overwrites the same file.
#[derive(Debug, Clone)]
pub struct RpiCamera {
    program: String,
    output: PathBuf,
    vflip: bool,
    hflip: bool,
    warmup_ms: u64,
}

impl RpiCamera {
    /// Create a camera writing to `output` with the given capture program
    #[must_use]
    pub fn new(program: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output: output.into(),
            vflip: false,
            hflip: false,
            warmup_ms: 1000,
        }
    }

    /// Build the camera described by the settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.camera_command.clone(), settings.photo_path.clone())
            .with_flip(settings.camera_vflip, settings.camera_hflip)
            .with_warmup_ms(settings.camera_warmup_ms)
    }

    /// Set image orientation
    #[must_use]
    pub const fn with_flip(mut self, vflip: bool, hflip: bool) -> Self {
        self.vflip = vflip;
        self.hflip = hflip;
        self
    }

    /// Set the exposure settle time
    #[must_use]
    pub const fn with_warmup_ms(mut self, warmup_ms: u64) -> Self {
        self.warmup_ms = warmup_ms;
        self
    }

    /// Path of the transient photo file
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Arguments passed to the capture program
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--nopreview".to_string(),
            "--timeout".to_string(),
            self.warmup_ms.to_string(),
        ];
        if self.vflip {
            args.push("--vflip".to_string());
        }
        if self.hflip {
            args.push("--hflip".to_string());
        }
        args.push("--output".to_string());
        args.push(self.output.display().to_string());
        args
    }
}

#[async_trait]
impl Camera for RpiCamera {
    async fn capture(&self) -> Result<PathBuf, HardwareError> {
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // A stale file must not pass for a fresh capture
        match tokio::fs::remove_file(&self.output).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(program = %self.program, "Camera taking picture");
        let output = Command::new(&self.program)
            .args(self.args())
            .output()
            .await
            .map_err(HardwareError::CameraSpawn)?;

        if !output.status.success() {
            return Err(HardwareError::CameraExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if tokio::fs::metadata(&self.output).await.is_err() {
            return Err(HardwareError::MissingOutput(self.output.clone()));
        }

        info!("Picture stored to {}", self.output.display());
        Ok(self.output.clone())
    }
}
