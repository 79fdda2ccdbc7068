//! Control keys and output line patterns of the omxplayer binary.
//!
//! The player is driven by single-character commands written to its stdin
//! and observed through a fixed set of line-oriented stdout messages. Both
//! sides of this surface are unversioned, so the patterns here mirror the
//! binary's output verbatim and must not be generalized.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Single-character commands accepted on the player's stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
  TogglePause,
  ToggleSubtitles,
  Quit,
  SpeedUp,
  SpeedDown,
}

impl ControlKey {
  /// The byte written to the player's input stream.
  pub fn byte(self) -> u8 {
    match self {
      ControlKey::TogglePause => b'p',
      ControlKey::ToggleSubtitles => b's',
      ControlKey::Quit => b'q',
      ControlKey::SpeedUp => b'2',
      ControlKey::SpeedDown => b'1',
    }
  }
}

/// Stream counts reported on the player's file-properties line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCounts {
  pub audio: u32,
  pub video: u32,
  pub chapters: u32,
  pub subtitles: u32,
}

/// Video track description from the one-time video-properties line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProperties {
  pub decoder: String,
  pub width: u32,
  pub height: u32,
  pub profile: i32,
  pub fps: f64,
}

/// Audio track description from the one-time audio-properties line.
/// Absent entirely for media without an audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioProperties {
  pub decoder: String,
  pub channels: u32,
  pub sample_rate: u32,
  pub bits_per_sample: u32,
}

fn stream_counts_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"audio streams (\d+) video streams (\d+) chapters (\d+) subtitles (\d+)")
      .expect("valid stream counts pattern")
  })
}

fn video_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"Video codec ([\w-]+) width (\d+) height (\d+) profile (-?\d+) fps ([\d.]+)")
      .expect("valid video properties pattern")
  })
}

fn audio_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"Audio codec (\w+) channels (\d+) samplerate (\d+) bitspersample (\d+)")
      .expect("valid audio properties pattern")
  })
}

fn position_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"M:\s*(\d+)").expect("valid position pattern"))
}

/// Parse the one-time file-properties line (stream counts).
pub fn parse_stream_counts(line: &str) -> Option<StreamCounts> {
  let caps = stream_counts_pattern().captures(line)?;
  Some(StreamCounts {
    audio: caps[1].parse().ok()?,
    video: caps[2].parse().ok()?,
    chapters: caps[3].parse().ok()?,
    subtitles: caps[4].parse().ok()?,
  })
}

/// Parse the one-time video-properties line.
pub fn parse_video_properties(line: &str) -> Option<VideoProperties> {
  let caps = video_pattern().captures(line)?;
  Some(VideoProperties {
    decoder: caps[1].to_string(),
    width: caps[2].parse().ok()?,
    height: caps[3].parse().ok()?,
    profile: caps[4].parse().ok()?,
    fps: caps[5].parse().ok()?,
  })
}

/// Parse the one-time audio-properties line.
pub fn parse_audio_properties(line: &str) -> Option<AudioProperties> {
  let caps = audio_pattern().captures(line)?;
  Some(AudioProperties {
    decoder: caps[1].to_string(),
    channels: caps[2].parse().ok()?,
    sample_rate: caps[3].parse().ok()?,
    bits_per_sample: caps[4].parse().ok()?,
  })
}

/// Parse a repeating status line. The captured value is the player's raw
/// playback clock, stored without unit conversion.
pub fn parse_position(line: &str) -> Option<f64> {
  let caps = position_pattern().captures(line)?;
  caps[1].parse().ok()
}

/// Check for the terminal phrase the player prints on a normal end of
/// playback.
pub fn is_end_of_playback(line: &str) -> bool {
  line.contains("have a nice day")
}
