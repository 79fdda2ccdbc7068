//! Ordered/looping playlist driving one playback supervisor at a time.

use std::collections::VecDeque;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PlayerConfig;
use crate::player::{Player, PlayerEvent, PlayerOptions};
use crate::process::ProcessError;

/// One playlist entry: a source reference resolvable to a local playable
/// file by the media cache. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
  pub source: String,
}

impl MediaItem {
  pub fn new(source: impl Into<String>) -> Self {
    Self {
      source: source.into(),
    }
  }
}

#[derive(Error, Debug)]
pub enum CacheError {
  #[error("media not available: {0}")]
  Unavailable(String),
}

/// Resolves a media source reference to a local playable path.
pub trait MediaCache: Send + Sync {
  fn resolve(&self, source: &str) -> Result<String, CacheError>;
}

/// Cache for media that is already local: the source reference is the path.
pub struct LocalCache;

impl MediaCache for LocalCache {
  fn resolve(&self, source: &str) -> Result<String, CacheError> {
    Ok(source.to_string())
  }
}

#[derive(Error, Debug)]
pub enum PlayError {
  #[error("cache resolve failed: {0}")]
  Cache(#[from] CacheError),
  #[error("player spawn failed: {0}")]
  Spawn(#[from] ProcessError),
}

struct QueueState {
  queue: VecDeque<MediaItem>,
  player: Option<Player>,
  stopped: bool,
}

struct Inner {
  config: PlayerConfig,
  cache: Arc<dyn MediaCache>,
  items: Vec<MediaItem>,
  loop_playback: bool,
  state: Mutex<QueueState>,
  finished_tx: Sender<PlayerEvent>,
  finished_rx: Mutex<Option<Receiver<PlayerEvent>>>,
}

/// Drives an ordered queue of media items through playback.
///
/// Each started player reports its finished event on a channel owned by the
/// controller; a listener task maps events to [`next`], so queue advance
/// never runs on the stack of the worker that detected the finish.
///
/// [`next`]: PlaylistController::next
#[derive(Clone)]
pub struct PlaylistController {
  inner: Arc<Inner>,
}

impl PlaylistController {
  /// Create a controller over a static item list. In loop mode the queue is
  /// rotated on advance and never shrinks; otherwise items are played once
  /// and dropped.
  pub fn new(
    items: Vec<MediaItem>,
    loop_playback: bool,
    config: PlayerConfig,
    cache: Arc<dyn MediaCache>,
  ) -> Self {
    let (finished_tx, finished_rx) = async_channel::unbounded();
    let queue: VecDeque<MediaItem> = items.iter().cloned().collect();
    Self {
      inner: Arc::new(Inner {
        config,
        cache,
        items,
        loop_playback,
        state: Mutex::new(QueueState {
          queue,
          player: None,
          stopped: true,
        }),
        finished_tx,
        finished_rx: Mutex::new(Some(finished_rx)),
      }),
    }
  }

  /// The items the controller was constructed with, in original order.
  pub fn items(&self) -> &[MediaItem] {
    &self.inner.items
  }

  /// Current queue contents, head first.
  pub fn queue_snapshot(&self) -> Vec<MediaItem> {
    self.inner.state.lock().queue.iter().cloned().collect()
  }

  /// Whether a playback supervisor is currently held.
  pub fn has_current(&self) -> bool {
    self.inner.state.lock().player.is_some()
  }

  /// Process ID of the current playback process, if any.
  pub fn current_pid(&self) -> Option<u32> {
    self.inner.state.lock().player.as_ref().and_then(Player::pid)
  }

  /// Playback clock of the current player, if any.
  pub fn current_position(&self) -> Option<f64> {
    self.inner.state.lock().player.as_ref().map(Player::position)
  }

  /// Start playing the head of the queue, clearing any earlier `stop()`.
  /// An empty queue is not an error; the controller is simply left idle.
  pub async fn play(&self) -> Result<(), PlayError> {
    self.arm_finished_listener();
    {
      let mut s = self.inner.state.lock();
      if s.queue.is_empty() {
        log::info!("Playlist queue is empty, nothing to play");
        return Ok(());
      }
      s.stopped = false;
    }
    self.spawn_head().await
  }

  /// Spawn a player for the current queue head. Any previous player is
  /// fully stopped before the new process is spawned, so at most one
  /// playback process is alive per controller.
  ///
  /// The stopped flag is re-checked under the state lock when the new
  /// player is installed; a `stop()` that landed while the spawn was in
  /// flight wins, and the fresh player is torn down instead of kept.
  ///
  /// A resolve or spawn failure is reported to the caller and additionally
  /// treated as an immediate finish, so the listener advances past the bad
  /// item instead of sticking on it.
  async fn spawn_head(&self) -> Result<(), PlayError> {
    let previous = self.inner.state.lock().player.take();
    if let Some(player) = previous {
      player.stop().await;
    }

    let head = self.inner.state.lock().queue.front().cloned();
    let Some(item) = head else {
      return Ok(());
    };

    match self.start_item(&item).await {
      Ok(player) => {
        let stale = {
          let mut s = self.inner.state.lock();
          if s.stopped {
            Some(player)
          } else {
            s.player = Some(player);
            None
          }
        };
        if let Some(player) = stale {
          log::info!("Stopped while starting {}, discarding player", item.source);
          player.stop().await;
        }
        Ok(())
      }
      Err(e) => {
        log::error!("Failed to play {}: {}, skipping", item.source, e);
        if !self.inner.state.lock().stopped {
          let _ = self.inner.finished_tx.send(PlayerEvent::Finished).await;
        }
        Err(e)
      }
    }
  }

  async fn start_item(&self, item: &MediaItem) -> Result<Player, PlayError> {
    let media_file = self.inner.cache.resolve(&item.source)?;
    let options = PlayerOptions {
      on_finished: Some(self.inner.finished_tx.clone()),
      ..PlayerOptions::default()
    };
    let player = Player::start(&self.inner.config, &media_file, options).await?;
    Ok(player)
  }

  /// Advance past the head item and play the new head. No-op when the
  /// controller was explicitly stopped, which guards against a finished
  /// event racing an owner `stop()`.
  pub async fn next(&self) {
    let advance = {
      let mut s = self.inner.state.lock();
      if s.stopped {
        false
      } else {
        advance_queue(&mut s.queue, self.inner.loop_playback);
        true
      }
    };
    if advance {
      if let Err(e) = self.spawn_head().await {
        log::error!("Failed to start next item: {}", e);
      }
    }
  }

  /// Stop playback and mark the controller stopped. The stopped flag is
  /// written before the player teardown, so a concurrently delivered
  /// finished event cannot advance the queue.
  pub async fn stop(&self) {
    let player = {
      let mut s = self.inner.state.lock();
      s.stopped = true;
      s.player.take()
    };
    if let Some(player) = player {
      player.stop().await;
    }
    log::info!("Playlist stopped");
  }

  /// Take the finished receiver (first call only) and spawn the listener
  /// task translating finished events into queue advances.
  fn arm_finished_listener(&self) {
    let rx = self.inner.finished_rx.lock().take();
    let Some(rx) = rx else {
      return;
    };
    let controller = self.clone();
    tokio::spawn(async move {
      while rx.recv().await.is_ok() {
        controller.next().await;
      }
    });
  }
}

/// Rotate the head to the tail in loop mode, drop it otherwise.
fn advance_queue(queue: &mut VecDeque<MediaItem>, loop_playback: bool) {
  match queue.pop_front() {
    Some(head) if loop_playback => queue.push_back(head),
    _ => {}
  }
}
