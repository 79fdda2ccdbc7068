//! Shared fixtures: fake player scripts standing in for the real binary.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use omxplay::PlayerConfig;

/// Write an executable shell script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  let mut perms = std::fs::metadata(&path).unwrap().permissions();
  perms.set_mode(0o755);
  std::fs::set_permissions(&path, perms).unwrap();
  path
}

/// A config whose playback command runs the given script with short test
/// timeouts.
pub fn script_config(script: &Path) -> PlayerConfig {
  PlayerConfig {
    player_command: format!("{} {{media_file}}", script.display()),
    metadata_timeout_ms: 300,
    status_timeout_ms: 500,
    poll_interval_ms: 10,
    ..PlayerConfig::default()
  }
}

/// A long-lived fake player: prints the full metadata preamble and a few
/// status lines, then idles until killed.
pub const FAKE_PLAYER: &str = "\
echo 'file props: audio streams 1 video streams 1 chapters 0 subtitles 1'
echo 'Video codec omx-h264 width 1280 height 720 profile 8 fps 25.000000'
echo 'Audio codec aac channels 2 samplerate 44100 bitspersample 16'
echo 'M: 100000'
echo 'M: 200000'
echo 'M: 300000'
sleep 30";

/// A fake player that finishes on its own shortly after starting.
pub const FINISHING_PLAYER: &str = "\
sleep 0.5
echo 'M: 9'
echo 'have a nice day ;)'";

/// Poll `check` until it returns true or `wait` elapses.
pub async fn wait_until<F: FnMut() -> bool>(wait: Duration, mut check: F) -> bool {
  let deadline = tokio::time::Instant::now() + wait;
  loop {
    if check() {
      return true;
    }
    if tokio::time::Instant::now() >= deadline {
      return false;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
}
