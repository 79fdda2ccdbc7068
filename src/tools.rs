//! One-shot helper processes: offline encoding and static image overlay.
//!
//! These have no command surface and no output parsing; they are spawned
//! from a configured template, checked for liveness and killed.

use crate::config::PlayerConfig;
use crate::process::{ProcessError, ProcessHandle};

/// Offline re-encode of a media file through the configured pipeline.
pub struct Encoder {
  process: ProcessHandle,
}

impl Encoder {
  pub fn start(
    config: &PlayerConfig,
    source_file: &str,
    target_file: &str,
    width: u32,
    height: u32,
  ) -> Result<Self, ProcessError> {
    let command_line = config.encode_command_line(source_file, target_file, width, height);
    let process = ProcessHandle::spawn_silent(&command_line)?;
    Ok(Self { process })
  }

  /// True while the encode is still running.
  pub fn is_active(&self) -> bool {
    self.process.is_alive()
  }

  /// Kill the encode process.
  pub fn stop(&self) {
    self.process.terminate();
  }
}

/// Static image rendered on a display layer by an external viewer.
pub struct PhotoOverlay {
  process: ProcessHandle,
  photo_file: String,
  layer: u32,
  x: i32,
  y: i32,
}

impl PhotoOverlay {
  pub fn start(
    config: &PlayerConfig,
    photo_file: &str,
    layer: u32,
    x: i32,
    y: i32,
  ) -> Result<Self, ProcessError> {
    let command_line = config.overlay_command_line(photo_file, layer, x, y);
    let process = ProcessHandle::spawn_silent(&command_line)?;
    Ok(Self {
      process,
      photo_file: photo_file.to_string(),
      layer,
      x,
      y,
    })
  }

  pub fn photo_file(&self) -> &str {
    &self.photo_file
  }

  pub fn layer(&self) -> u32 {
    self.layer
  }

  pub fn position(&self) -> (i32, i32) {
    (self.x, self.y)
  }

  /// True while the overlay viewer is still running.
  pub fn is_active(&self) -> bool {
    self.process.is_alive()
  }

  /// Kill the overlay viewer.
  pub fn stop(&self) {
    self.process.terminate();
  }
}
