//! Startup metadata extraction from the player's first output lines.

use std::time::Duration;

use tokio::io::AsyncRead;

use crate::process::{LineRead, OutputLines};
use crate::protocol::{
  parse_audio_properties, parse_stream_counts, parse_video_properties, AudioProperties,
  StreamCounts, VideoProperties,
};

/// Metadata the player prints once, immediately after startup. Every field
/// is best-effort: a missing or non-matching line leaves it absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
  pub streams: Option<StreamCounts>,
  pub video: Option<VideoProperties>,
  pub audio: Option<AudioProperties>,
}

impl Metadata {
  fn is_complete(&self) -> bool {
    self.streams.is_some() && self.video.is_some() && self.audio.is_some()
  }

  /// Try to fill one field from a line. False means the line belongs to the
  /// status stream, not the metadata preamble.
  fn absorb(&mut self, line: &str) -> bool {
    if self.streams.is_none() {
      if let Some(counts) = parse_stream_counts(line) {
        self.streams = Some(counts);
        return true;
      }
    }
    if self.video.is_none() {
      if let Some(video) = parse_video_properties(line) {
        self.video = Some(video);
        return true;
      }
    }
    if self.audio.is_none() {
      if let Some(audio) = parse_audio_properties(line) {
        self.audio = Some(audio);
        return true;
      }
    }
    false
  }
}

/// Read the metadata preamble from a freshly spawned player.
///
/// At most one read is attempted per property type, so a silent or
/// non-standard process still yields a valid (empty) result. A line that
/// matches none of the metadata patterns ends the preamble and is handed
/// back for the status loop to classify.
pub async fn read_metadata<R: AsyncRead + Unpin>(
  lines: &mut OutputLines<R>,
  wait: Duration,
) -> (Metadata, Option<String>) {
  let mut metadata = Metadata::default();

  for _ in 0..3 {
    if metadata.is_complete() {
      break;
    }
    match lines.next_line(wait).await {
      LineRead::Line(line) => {
        if !metadata.absorb(&line) {
          return (metadata, Some(line));
        }
      }
      LineRead::Timeout | LineRead::Eof => break,
    }
  }

  (metadata, None)
}

#[cfg(test)]
mod tests {
  use super::*;

  const WAIT: Duration = Duration::from_millis(100);

  #[tokio::test]
  async fn test_full_preamble() {
    let input: &[u8] = b"file props: audio streams 1 video streams 1 chapters 0 subtitles 0\n\
      Video codec omx-h264 width 1920 height 1080 profile 41 fps 23.976\n\
      Audio codec dts channels 6 samplerate 48000 bitspersample 16\n\
      M: 0\n";
    let mut lines = OutputLines::new(input);
    let (metadata, leftover) = read_metadata(&mut lines, WAIT).await;

    let video = metadata.video.unwrap();
    assert_eq!(video.width, 1920);
    assert_eq!(video.height, 1080);
    assert_eq!(video.profile, 41);
    let audio = metadata.audio.unwrap();
    assert_eq!(audio.channels, 6);
    assert_eq!(metadata.streams.unwrap().subtitles, 0);
    // The status line after the preamble stays unread
    assert_eq!(leftover, None);
    assert!(matches!(lines.next_line(WAIT).await, LineRead::Line(l) if l == "M: 0"));
  }

  #[tokio::test]
  async fn test_no_audio_track_is_absent_not_error() {
    let input: &[u8] = b"Video codec omx-h264 width 1280 height 720 profile 8 fps 25.0\n\
      M: 100\n";
    let mut lines = OutputLines::new(input);
    let (metadata, leftover) = read_metadata(&mut lines, WAIT).await;

    assert!(metadata.video.is_some());
    assert!(metadata.audio.is_none());
    assert!(metadata.streams.is_none());
    // The status line is handed back, not swallowed
    assert_eq!(leftover.as_deref(), Some("M: 100"));
  }

  #[tokio::test]
  async fn test_silent_process_yields_empty_metadata() {
    let input: &[u8] = b"";
    let mut lines = OutputLines::new(input);
    let (metadata, leftover) = read_metadata(&mut lines, WAIT).await;

    assert_eq!(metadata, Metadata::default());
    assert_eq!(leftover, None);
  }

  #[tokio::test]
  async fn test_finish_phrase_is_handed_back() {
    let input: &[u8] = b"have a nice day ;)\n";
    let mut lines = OutputLines::new(input);
    let (metadata, leftover) = read_metadata(&mut lines, WAIT).await;

    assert_eq!(metadata, Metadata::default());
    assert_eq!(leftover.as_deref(), Some("have a nice day ;)"));
  }
}
