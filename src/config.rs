//! Playback configuration: command templates and timing.
//!
//! The external binaries are reached through injected command templates
//! rather than hardcoded paths, so tests can substitute a fake player.

use serde::{Deserialize, Serialize};

use crate::process::find_player;

/// Configuration for the player, encoder and overlay processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
  /// Playback command template. `{media_file}` is replaced with the local
  /// file to play; extra arguments are appended verbatim.
  #[serde(default = "default_player_command")]
  pub player_command: String,

  /// Encode command template with `{source_file}`, `{target_file}`,
  /// `{width}` and `{height}` placeholders.
  #[serde(default = "default_encode_command")]
  pub encode_command: String,

  /// Overlay command template with `{layer}`, `{photo_file}`, `{x}` and
  /// `{y}` placeholders.
  #[serde(default = "default_overlay_command")]
  pub overlay_command: String,

  /// How long to wait for each startup metadata line, in milliseconds.
  #[serde(default = "default_metadata_timeout_ms")]
  pub metadata_timeout_ms: u64,

  /// How long each status-loop read waits before retrying, in milliseconds.
  #[serde(default = "default_status_timeout_ms")]
  pub status_timeout_ms: u64,

  /// Pause between status-loop iterations, in milliseconds.
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
}

fn default_player_command() -> String {
  let player = find_player()
    .map(|p| p.display().to_string())
    .unwrap_or_else(|| "/usr/bin/omxplayer".to_string());
  format!("{} -s {{media_file}}", player)
}

fn default_encode_command() -> String {
  "/usr/bin/gst-launch-1.0 filesrc location={source_file} ! \
   decodebin ! videoconvert ! videoscale ! \
   video/x-raw,width={width},height={height} ! \
   omxh264enc ! h264parse ! mp4mux ! \
   filesink location={target_file}"
    .to_string()
}

fn default_overlay_command() -> String {
  "/usr/local/bin/pngview -l {layer} {photo_file} -x {x} -y {y}".to_string()
}

fn default_metadata_timeout_ms() -> u64 {
  2000
}

fn default_status_timeout_ms() -> u64 {
  10000
}

fn default_poll_interval_ms() -> u64 {
  50
}

impl Default for PlayerConfig {
  fn default() -> Self {
    Self {
      player_command: default_player_command(),
      encode_command: default_encode_command(),
      overlay_command: default_overlay_command(),
      metadata_timeout_ms: default_metadata_timeout_ms(),
      status_timeout_ms: default_status_timeout_ms(),
      poll_interval_ms: default_poll_interval_ms(),
    }
  }
}

impl PlayerConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if !self.player_command.contains("{media_file}") {
      return Err("Player command must contain {media_file}".to_string());
    }
    for placeholder in ["{source_file}", "{target_file}", "{width}", "{height}"] {
      if !self.encode_command.contains(placeholder) {
        return Err(format!("Encode command must contain {}", placeholder));
      }
    }
    for placeholder in ["{layer}", "{photo_file}", "{x}", "{y}"] {
      if !self.overlay_command.contains(placeholder) {
        return Err(format!("Overlay command must contain {}", placeholder));
      }
    }
    if self.poll_interval_ms == 0 || self.poll_interval_ms > 1000 {
      return Err("Poll interval must be between 1 and 1000 milliseconds".to_string());
    }
    if self.status_timeout_ms < 100 {
      return Err("Status timeout must be at least 100 milliseconds".to_string());
    }
    Ok(())
  }

  /// Render the playback command line for a media file.
  pub fn player_command_line(&self, media_file: &str, extra_args: &[String]) -> String {
    let mut cmd = self.player_command.replace("{media_file}", media_file);
    for arg in extra_args {
      cmd.push(' ');
      cmd.push_str(arg);
    }
    cmd
  }

  /// Render the encode command line.
  pub fn encode_command_line(
    &self,
    source_file: &str,
    target_file: &str,
    width: u32,
    height: u32,
  ) -> String {
    self
      .encode_command
      .replace("{source_file}", source_file)
      .replace("{target_file}", target_file)
      .replace("{width}", &width.to_string())
      .replace("{height}", &height.to_string())
  }

  /// Render the overlay command line.
  pub fn overlay_command_line(&self, photo_file: &str, layer: u32, x: i32, y: i32) -> String {
    self
      .overlay_command
      .replace("{layer}", &layer.to_string())
      .replace("{photo_file}", photo_file)
      .replace("{x}", &x.to_string())
      .replace("{y}", &y.to_string())
  }

  pub fn metadata_timeout(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.metadata_timeout_ms)
  }

  pub fn status_timeout(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.status_timeout_ms)
  }

  pub fn poll_interval(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.poll_interval_ms)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config_is_valid() {
    assert!(PlayerConfig::default().validate().is_ok());
  }

  #[test]
  fn test_player_command_line_rendering() {
    let config = PlayerConfig {
      player_command: "/usr/bin/omxplayer -s {media_file}".to_string(),
      ..PlayerConfig::default()
    };
    let cmd = config.player_command_line("/tmp/clip.mp4", &["--no-osd".to_string()]);
    assert_eq!(cmd, "/usr/bin/omxplayer -s /tmp/clip.mp4 --no-osd");
  }

  #[test]
  fn test_encode_command_line_rendering() {
    let config = PlayerConfig::default();
    let cmd = config.encode_command_line("in.avi", "out.mp4", 800, 600);
    assert!(cmd.contains("location=in.avi"));
    assert!(cmd.contains("location=out.mp4"));
    assert!(cmd.contains("width=800,height=600"));
  }

  #[test]
  fn test_overlay_command_line_rendering() {
    let config = PlayerConfig::default();
    let cmd = config.overlay_command_line("logo.png", 2, 10, 20);
    assert_eq!(cmd, "/usr/local/bin/pngview -l 2 logo.png -x 10 -y 20");
  }

  #[test]
  fn test_validate_rejects_missing_placeholder() {
    let config = PlayerConfig {
      player_command: "/usr/bin/omxplayer -s".to_string(),
      ..PlayerConfig::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_partial_config_parses_with_defaults() {
    let config: PlayerConfig = serde_json::from_str(r#"{"pollIntervalMs": 25}"#).unwrap();
    assert_eq!(config.poll_interval_ms, 25);
    assert_eq!(config.status_timeout_ms, 10000);
    assert!(config.player_command.contains("{media_file}"));
  }
}
