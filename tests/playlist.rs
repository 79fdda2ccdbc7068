//! Playlist advance, rotation and teardown behavior.
#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use omxplay::{CacheError, LocalCache, MediaCache, MediaItem, PlaylistController};

use common::{script_config, wait_until, write_script, FAKE_PLAYER, FINISHING_PLAYER};

fn items(names: &[&str]) -> Vec<MediaItem> {
  names.iter().map(|n| MediaItem::new(*n)).collect()
}

/// A passthrough cache with a deliberately slow resolve, leaving a wide
/// window for calls to interleave with a spawn in flight.
struct SlowCache;

impl MediaCache for SlowCache {
  fn resolve(&self, source: &str) -> Result<String, CacheError> {
    std::thread::sleep(Duration::from_millis(300));
    Ok(source.to_string())
  }
}

#[tokio::test]
async fn loop_mode_rotates_through_a_full_cycle() {
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "fakeplayer", FAKE_PLAYER);
  let controller = PlaylistController::new(
    items(&["a", "b", "c"]),
    true,
    script_config(&script),
    Arc::new(LocalCache),
  );

  controller.play().await.unwrap();
  assert_eq!(controller.queue_snapshot(), items(&["a", "b", "c"]));
  assert!(controller.has_current());

  controller.next().await;
  assert_eq!(controller.queue_snapshot(), items(&["b", "c", "a"]));
  controller.next().await;
  controller.next().await;
  // Three completions bring the queue back to its original phase
  assert_eq!(controller.queue_snapshot(), items(&["a", "b", "c"]));
  assert!(controller.has_current());

  controller.stop().await;
}

#[tokio::test]
async fn one_shot_mode_drains_the_queue() {
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "fakeplayer", FAKE_PLAYER);
  let controller = PlaylistController::new(
    items(&["a", "b", "c"]),
    false,
    script_config(&script),
    Arc::new(LocalCache),
  );

  controller.play().await.unwrap();
  controller.next().await;
  assert_eq!(controller.queue_snapshot(), items(&["b", "c"]));
  controller.next().await;
  controller.next().await;

  assert!(controller.queue_snapshot().is_empty());
  assert!(!controller.has_current());

  // A further advance on the drained queue is a no-op
  controller.next().await;
  assert!(controller.queue_snapshot().is_empty());
  assert!(!controller.has_current());
}

#[tokio::test]
async fn replacing_the_player_never_keeps_two_processes() {
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "fakeplayer", FAKE_PLAYER);
  let controller = PlaylistController::new(
    items(&["a", "b"]),
    true,
    script_config(&script),
    Arc::new(LocalCache),
  );

  controller.play().await.unwrap();
  let first_pid = controller.current_pid().unwrap();

  controller.next().await;
  let second_pid = controller.current_pid().unwrap();
  assert_ne!(first_pid, second_pid);

  controller.stop().await;
}

#[tokio::test]
async fn stop_blocks_a_stale_advance() {
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "fakeplayer", FAKE_PLAYER);
  let controller = PlaylistController::new(
    items(&["a", "b", "c"]),
    true,
    script_config(&script),
    Arc::new(LocalCache),
  );

  controller.play().await.unwrap();
  controller.stop().await;
  assert!(!controller.has_current());

  // A completion arriving after stop() must not advance the queue
  controller.next().await;
  assert_eq!(controller.queue_snapshot(), items(&["a", "b", "c"]));
  assert!(!controller.has_current());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_during_an_in_flight_advance_discards_the_new_player() {
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "fakeplayer", FAKE_PLAYER);
  let controller = PlaylistController::new(
    items(&["a", "b", "c"]),
    true,
    script_config(&script),
    Arc::new(SlowCache),
  );

  controller.play().await.unwrap();

  // Drive an advance whose spawn is still resolving when stop() lands
  let advancing = controller.clone();
  let advance = tokio::spawn(async move { advancing.next().await });
  let advanced = wait_until(Duration::from_secs(2), || {
    controller.queue_snapshot() == items(&["b", "c", "a"])
  })
  .await;
  assert!(advanced, "advance never moved the queue");

  controller.stop().await;
  advance.await.unwrap();

  // The stop wins: the freshly spawned player is torn down, not kept
  assert!(!controller.has_current());
  assert_eq!(controller.queue_snapshot(), items(&["b", "c", "a"]));
}

#[tokio::test]
async fn spawn_failure_skips_past_the_bad_items() {
  let dir = tempfile::tempdir().unwrap();
  let missing = dir.path().join("no-such-player");
  let controller = PlaylistController::new(
    items(&["a", "b"]),
    false,
    script_config(&missing),
    Arc::new(LocalCache),
  );

  assert!(controller.play().await.is_err());

  // Each failure counts as an immediate finish, so the one-shot queue drains
  let drained = wait_until(Duration::from_secs(2), || {
    controller.queue_snapshot().is_empty()
  })
  .await;
  assert!(drained, "queue stuck on unplayable items");
  assert!(!controller.has_current());
}

#[tokio::test]
async fn single_item_loop_replays_itself() {
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "finisher", FINISHING_PLAYER);
  let controller = PlaylistController::new(
    items(&["a"]),
    true,
    script_config(&script),
    Arc::new(LocalCache),
  );

  controller.play().await.unwrap();
  let first_pid = controller.current_pid().unwrap();

  // The item finishes on its own; the loop rotates the single-entry queue
  // and starts a fresh supervisor for the same item
  let replayed = wait_until(Duration::from_secs(5), || {
    matches!(controller.current_pid(), Some(pid) if pid != first_pid)
  })
  .await;
  assert!(replayed, "playlist never chained into a new supervisor");

  assert_eq!(controller.queue_snapshot(), items(&["a"]));
  // The new supervisor starts from a fresh playback clock
  assert_eq!(controller.current_position(), Some(0.0));

  controller.stop().await;
}
