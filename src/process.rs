//! Child process spawning and line-oriented output reading.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as AsyncMutex;

use crate::protocol::ControlKey;

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("empty command line")]
  EmptyCommand,
  #[error("player stdout was not captured")]
  NoOutput,
  #[error("failed to spawn process: {0}")]
  SpawnFailed(#[from] std::io::Error),
}

/// Find the omxplayer executable in common locations.
pub fn find_player() -> Option<PathBuf> {
  // Check PATH first
  if let Ok(path) = which::which("omxplayer") {
    return Some(path);
  }

  let common_paths = ["/usr/bin/omxplayer", "/usr/local/bin/omxplayer"];
  for path in common_paths {
    let p = PathBuf::from(path);
    if p.exists() {
      return Some(p);
    }
  }

  None
}

fn build_command(command_line: &str) -> Result<Command, ProcessError> {
  let mut parts = command_line.split_whitespace();
  let program = parts.next().ok_or(ProcessError::EmptyCommand)?;
  let mut cmd = Command::new(program);
  cmd.args(parts);
  Ok(cmd)
}

/// One classified read from a child's output stream.
#[derive(Debug)]
pub enum LineRead {
  Line(String),
  Timeout,
  Eof,
}

/// Line reader over a child's stdout.
pub struct OutputLines<R = ChildStdout> {
  lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> OutputLines<R> {
  pub fn new(reader: R) -> Self {
    Self {
      lines: BufReader::new(reader).lines(),
    }
  }

  /// Wait up to `wait` for the next output line. A read error is reported
  /// as end-of-stream; the pipe is unusable either way.
  pub async fn next_line(&mut self, wait: Duration) -> LineRead {
    match tokio::time::timeout(wait, self.lines.next_line()).await {
      Err(_) => LineRead::Timeout,
      Ok(Ok(Some(line))) => LineRead::Line(line),
      Ok(Ok(None)) => LineRead::Eof,
      Ok(Err(e)) => {
        log::warn!("Output read error: {}", e);
        LineRead::Eof
      }
    }
  }
}

/// Handle to a spawned child process.
///
/// Owns the child and its stdin writer; the stdout reader is handed to the
/// caller at spawn time so a worker task can consume it independently.
pub struct ProcessHandle {
  child: Mutex<Child>,
  stdin: AsyncMutex<Option<ChildStdin>>,
  pid: Option<u32>,
}

impl ProcessHandle {
  /// Spawn a command line with piped stdin/stdout, returning the handle and
  /// the output line reader.
  pub fn spawn(command_line: &str) -> Result<(Self, OutputLines), ProcessError> {
    log::info!("Spawning: {}", command_line);
    let mut cmd = build_command(command_line)?;
    cmd
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::null())
      .kill_on_drop(true);
    // Own process group, so terminate() can take down forked helpers that
    // would otherwise keep the output pipe open
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    let stdin = child.stdin.take();
    let stdout = child.stdout.take().ok_or(ProcessError::NoOutput)?;
    let pid = child.id();

    let handle = Self {
      child: Mutex::new(child),
      stdin: AsyncMutex::new(stdin),
      pid,
    };
    Ok((handle, OutputLines::new(stdout)))
  }

  /// Spawn a command line with all standard streams detached. Used for the
  /// one-shot encode/overlay helpers, which are never read or written.
  pub fn spawn_silent(command_line: &str) -> Result<Self, ProcessError> {
    log::info!("Spawning (silent): {}", command_line);
    let mut cmd = build_command(command_line)?;
    cmd
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn()?;
    let pid = child.id();
    Ok(Self {
      child: Mutex::new(child),
      stdin: AsyncMutex::new(None),
      pid,
    })
  }

  /// Process ID captured at spawn time.
  pub fn pid(&self) -> Option<u32> {
    self.pid
  }

  /// Check whether the child is still running.
  pub fn is_alive(&self) -> bool {
    matches!(self.child.lock().try_wait(), Ok(None))
  }

  /// Write a single control key to the child's stdin. Returns whether the
  /// byte was delivered; a dead process is reported, not an error.
  pub async fn send(&self, key: ControlKey) -> bool {
    let mut guard = self.stdin.lock().await;
    let Some(stdin) = guard.as_mut() else {
      return false;
    };

    let written = match stdin.write_all(&[key.byte()]).await {
      Ok(()) => stdin.flush().await,
      Err(e) => Err(e),
    };
    match written {
      Ok(()) => true,
      Err(e) => {
        log::warn!("Control key {:?} not delivered: {}", key, e);
        // The pipe is broken, further writes cannot succeed
        *guard = None;
        false
      }
    }
  }

  /// Kill the child and its process group. The group kill covers
  /// descendants that inherited the output pipe; without it a surviving
  /// grandchild would keep the stream open and the reader would never see
  /// end-of-stream. The exit is collected on a later liveness check or when
  /// the handle is dropped.
  pub fn terminate(&self) {
    #[cfg(unix)]
    if let Some(pid) = self.pid {
      unsafe {
        libc::kill(-(pid as i32), libc::SIGKILL);
      }
    }
    let mut child = self.child.lock();
    if let Err(e) = child.start_kill() {
      log::debug!("Kill skipped (process already gone): {}", e);
    }
  }
}
