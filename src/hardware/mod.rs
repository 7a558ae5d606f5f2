//! Hardware collaborators: the PIR motion sensor and the still camera.
//!
//! The core only sees the [`MotionSensor`] and [`Camera`] traits, so the
//! dispatcher and the detection job can be exercised with fakes.

pub mod camera;
pub mod pir;

pub use camera::RpiCamera;
pub use pir::PirSensor;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the sensor or the camera
#[derive(Error, Debug)]
pub enum HardwareError {
    /// GPIO access failed (pin busy, no `/dev/gpiomem`, ...)
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    /// The capture program could not be started
    #[error("Camera spawn error: {0}")]
    CameraSpawn(std::io::Error),
    /// The capture program exited unsuccessfully
    #[error("Camera exited with {status}: {stderr}")]
    CameraExit {
        /// Exit status as reported by the OS
        status: String,
        /// Trimmed standard error of the program
        stderr: String,
    },
    /// The capture program succeeded but left no image behind
    #[error("Camera produced no image at {}", .0.display())]
    MissingOutput(PathBuf),
    /// Filesystem error around the photo file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Edge-triggered motion sensor
#[cfg_attr(test, mockall::automock)]
pub trait MotionSensor: Send + Sync {
    /// Whether motion was detected since the previous poll.
    ///
    /// Reading resets the detection flag.
    ///
    /// # Errors
    ///
    /// Returns a `HardwareError` if the sensor cannot be read.
    fn poll(&self) -> Result<bool, HardwareError>;
}

/// Still camera producing one fresh image per call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Camera: Send + Sync {
    /// Capture a picture and return the path of the written image.
    ///
    /// # Errors
    ///
    /// Returns a `HardwareError` if the capture fails.
    async fn capture(&self) -> Result<PathBuf, HardwareError>;
}
