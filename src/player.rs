//! Playback supervisor: owns the player process and its status loop.

use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use parking_lot::Mutex;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;

use crate::config::PlayerConfig;
use crate::metadata::{read_metadata, Metadata};
use crate::process::{LineRead, OutputLines, ProcessError, ProcessHandle};
use crate::protocol::{
  is_end_of_playback, parse_position, AudioProperties, ControlKey, StreamCounts, VideoProperties,
};

/// Event emitted by a supervisor's status loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
  /// Playback reached its end (finish phrase or output stream closed).
  /// Sent at most once per player, and never after an owner-initiated
  /// `stop()`.
  Finished,
}

/// Options for starting a player.
#[derive(Debug, Default)]
pub struct PlayerOptions {
  /// Extra arguments appended to the playback command line.
  pub extra_args: Vec<String>,
  /// Issue a pause command immediately after startup.
  pub pause_playback: bool,
  /// Channel notified when playback finishes.
  pub on_finished: Option<Sender<PlayerEvent>>,
}

#[derive(Debug, Default)]
struct PlayerState {
  media_file: Option<String>,
  streams: Option<StreamCounts>,
  video: Option<VideoProperties>,
  audio: Option<AudioProperties>,
  paused: bool,
  subtitles_visible: bool,
  finished: bool,
  position: f64,
}

/// Supervises one playback process.
///
/// A background task classifies the player's output stream: status lines
/// update `position`, a finish phrase or closed stream marks the player
/// finished and delivers the `Finished` event. The task has no cancellation
/// signal of its own; `stop()` kills the process, which drives the next
/// read to end-of-stream.
pub struct Player {
  process: Arc<ProcessHandle>,
  state: Arc<Mutex<PlayerState>>,
  notify: Arc<Mutex<Option<Sender<PlayerEvent>>>>,
  _status_handle: JoinHandle<()>,
}

impl Player {
  /// Spawn the playback process for `media_file`, read its metadata
  /// preamble and launch the status loop.
  pub async fn start(
    config: &PlayerConfig,
    media_file: &str,
    options: PlayerOptions,
  ) -> Result<Self, ProcessError> {
    let command_line = config.player_command_line(media_file, &options.extra_args);
    let (process, mut lines) = ProcessHandle::spawn(&command_line)?;

    let (metadata, leftover) = read_metadata(&mut lines, config.metadata_timeout()).await;
    let Metadata {
      streams,
      video,
      audio,
    } = metadata;
    if video.is_none() {
      log::debug!("No video properties reported for {}", media_file);
    }

    let state = Arc::new(Mutex::new(PlayerState {
      media_file: Some(media_file.to_string()),
      streams,
      video,
      audio,
      paused: false,
      subtitles_visible: true,
      finished: false,
      position: 0.0,
    }));
    let notify = Arc::new(Mutex::new(options.on_finished));

    let status_handle = tokio::spawn(status_loop(
      lines,
      leftover,
      state.clone(),
      notify.clone(),
      config.status_timeout(),
      config.poll_interval(),
    ));

    let player = Self {
      process: Arc::new(process),
      state,
      notify,
      _status_handle: status_handle,
    };

    if options.pause_playback {
      player.toggle_pause().await;
    }
    // The binary starts with subtitles shown; hide them by default
    player.toggle_subtitles().await;

    log::info!("Playback started: {}", media_file);
    Ok(player)
  }

  /// True while the playback process is running.
  pub fn is_active(&self) -> bool {
    self.process.is_alive()
  }

  /// Process ID of the playback process, captured at spawn.
  pub fn pid(&self) -> Option<u32> {
    self.process.pid()
  }

  /// Send the pause-toggle key. The flag flips only when the key was
  /// delivered; a dead process leaves state unchanged.
  pub async fn toggle_pause(&self) -> bool {
    if !self.process.send(ControlKey::TogglePause).await {
      return false;
    }
    let mut state = self.state.lock();
    state.paused = !state.paused;
    true
  }

  /// Send the subtitle-toggle key, same contract as [`toggle_pause`].
  ///
  /// [`toggle_pause`]: Player::toggle_pause
  pub async fn toggle_subtitles(&self) -> bool {
    if !self.process.send(ControlKey::ToggleSubtitles).await {
      return false;
    }
    let mut state = self.state.lock();
    state.subtitles_visible = !state.subtitles_visible;
    true
  }

  /// Send the speed-up key.
  pub async fn speed_up(&self) -> bool {
    self.process.send(ControlKey::SpeedUp).await
  }

  /// Send the speed-down key.
  pub async fn speed_down(&self) -> bool {
    self.process.send(ControlKey::SpeedDown).await
  }

  /// Stop playback: suppress the finished event, clear the media identity,
  /// ask the player to quit and kill it. Idempotent; the status loop exits
  /// asynchronously once it observes the closed stream.
  pub async fn stop(&self) {
    self.notify.lock().take();
    {
      let mut state = self.state.lock();
      state.media_file = None;
      state.streams = None;
      state.video = None;
      state.audio = None;
    }
    // Best-effort graceful quit; ignored if the process is already dead
    self.process.send(ControlKey::Quit).await;
    self.process.terminate();
    log::info!("Playback stopped");
  }

  pub fn media_file(&self) -> Option<String> {
    self.state.lock().media_file.clone()
  }

  pub fn stream_counts(&self) -> Option<StreamCounts> {
    self.state.lock().streams
  }

  pub fn video(&self) -> Option<VideoProperties> {
    self.state.lock().video.clone()
  }

  pub fn audio(&self) -> Option<AudioProperties> {
    self.state.lock().audio.clone()
  }

  pub fn paused(&self) -> bool {
    self.state.lock().paused
  }

  pub fn subtitles_visible(&self) -> bool {
    self.state.lock().subtitles_visible
  }

  /// Terminal flag, set exactly once by the status loop.
  pub fn is_finished(&self) -> bool {
    self.state.lock().finished
  }

  /// Last playback clock value seen on the status stream. Monotonically
  /// non-decreasing for the lifetime of the player.
  pub fn position(&self) -> f64 {
    self.state.lock().position
  }
}

/// Background worker classifying the player's output lines.
async fn status_loop<R: AsyncRead + Unpin>(
  mut lines: OutputLines<R>,
  mut pending: Option<String>,
  state: Arc<Mutex<PlayerState>>,
  notify: Arc<Mutex<Option<Sender<PlayerEvent>>>>,
  read_timeout: Duration,
  poll_interval: Duration,
) {
  loop {
    let read = match pending.take() {
      Some(line) => LineRead::Line(line),
      None => lines.next_line(read_timeout).await,
    };
    match read {
      LineRead::Timeout => continue,
      LineRead::Eof => break,
      LineRead::Line(line) => {
        if is_end_of_playback(&line) {
          break;
        }
        if let Some(position) = parse_position(&line) {
          let mut s = state.lock();
          if position > s.position {
            s.position = position;
          }
        }
        tokio::time::sleep(poll_interval).await;
      }
    }
  }

  state.lock().finished = true;
  let tx = notify.lock().take();
  if let Some(tx) = tx {
    let _ = tx.send(PlayerEvent::Finished).await;
  }
  log::debug!("Status loop finished");
}
