//! Upgrade control channel between the hosting page and the agent.
//!
//! Inbound messages are JSON lines ({"type": "SKIP_WAITING"}, fetch and push
//! envelopes); outbound signals mirror the same framing. The channel is
//! fire-and-forget in both directions: a promotion sent to an agent that is
//! not waiting is dropped, and the controller-change reload on the page side
//! is guarded by a one-shot latch.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::warn;

/// Messages the hosting page sends to the agent.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
  /// Promote a waiting agent version to active immediately
  #[serde(rename = "SKIP_WAITING")]
  SkipWaiting,

  /// An outbound application request to intercept
  #[serde(rename = "FETCH")]
  Fetch {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    accept: Option<String>,
  },

  /// An inbound push payload to deliver as a notification
  #[serde(rename = "PUSH")]
  Push { payload: serde_json::Value },

  /// The user interacted with a displayed notification
  #[serde(rename = "NOTIFICATION_CLICK")]
  NotificationClick {
    #[serde(default)]
    action: Option<String>,
  },
}

fn default_method() -> String {
  "GET".to_string()
}

/// Signals the agent sends back to the hosting page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AgentSignal {
  /// The active agent version changed; the page should reload (once)
  #[serde(rename = "CONTROLLER_CHANGE")]
  ControllerChange,

  /// Resolved response for an intercepted request
  #[serde(rename = "RESPONSE")]
  Response {
    status: u16,
    source: String,
    /// Body bytes, hex-encoded for the line framing
    body: String,
  },

  /// A parsed push message ready to display
  #[serde(rename = "NOTIFICATION")]
  Notification {
    title: String,
    body: String,
    actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
  },

  /// Close the currently displayed notification
  #[serde(rename = "CLOSE_NOTIFICATION")]
  CloseNotification,

  /// Open or focus an application window at the given path
  #[serde(rename = "OPEN_WINDOW")]
  OpenWindow { path: String },

  /// A passthrough request failed; the application sees a plain error
  #[serde(rename = "ERROR")]
  Error { message: String },
}

/// Reads control messages from an async line source (stdin in the binary).
pub struct ControlChannel {
  rx: mpsc::UnboundedReceiver<ControlMessage>,
}

impl ControlChannel {
  /// Spawn a reader over the given source. Malformed lines are logged and
  /// skipped; the channel closes when the source does.
  pub fn from_lines<R>(reader: R) -> Self
  where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      let mut lines = tokio::io::BufReader::new(reader).lines();
      loop {
        match lines.next_line().await {
          Ok(Some(line)) => {
            let line = line.trim();
            if line.is_empty() {
              continue;
            }
            match serde_json::from_str::<ControlMessage>(line) {
              Ok(msg) => {
                if tx.send(msg).is_err() {
                  break;
                }
              }
              Err(e) => warn!("ignoring malformed control message: {}", e),
            }
          }
          Ok(None) => break,
          Err(e) => {
            warn!("control channel read failed: {}", e);
            break;
          }
        }
      }
    });

    Self { rx }
  }

  /// Receive the next control message.
  pub async fn next(&mut self) -> Option<ControlMessage> {
    self.rx.recv().await
  }
}

/// Fired when the active agent version changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerChange;

/// Agent-side handle used by the lifecycle controller to announce takeover.
#[derive(Clone)]
pub struct ControllerHandle {
  tx: mpsc::UnboundedSender<ControllerChange>,
}

impl ControllerHandle {
  pub fn notify(&self) {
    // The page may already be gone; that is not an error.
    let _ = self.tx.send(ControllerChange);
  }
}

/// Page-side stream of controller-change signals.
pub struct ControllerEvents {
  rx: mpsc::UnboundedReceiver<ControllerChange>,
}

impl ControllerEvents {
  pub async fn next(&mut self) -> Option<ControllerChange> {
    self.rx.recv().await
  }
}

/// Create the controller-change signal pair.
pub fn controller_channel() -> (ControllerHandle, ControllerEvents) {
  let (tx, rx) = mpsc::unbounded_channel();
  (ControllerHandle { tx }, ControllerEvents { rx })
}

/// One-shot latch guarding the page reload on controller change.
///
/// Two signals in quick succession must produce exactly one reload.
#[derive(Default)]
pub struct ReloadGuard {
  fired: AtomicBool,
}

impl ReloadGuard {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run the reload action unless it already ran. Returns whether it ran.
  pub fn on_change<F: FnOnce()>(&self, reload: F) -> bool {
    if self.fired.swap(true, Ordering::SeqCst) {
      return false;
    }
    reload();
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicU32;

  #[test]
  fn test_skip_waiting_wire_format() {
    let msg: ControlMessage = serde_json::from_str(r#"{"type": "SKIP_WAITING"}"#).unwrap();
    assert!(matches!(msg, ControlMessage::SkipWaiting));
  }

  #[test]
  fn test_fetch_message_defaults_to_get() {
    let msg: ControlMessage =
      serde_json::from_str(r#"{"type": "FETCH", "url": "https://app.example/"}"#).unwrap();
    match msg {
      ControlMessage::Fetch { method, url, .. } => {
        assert_eq!(method, "GET");
        assert_eq!(url, "https://app.example/");
      }
      other => panic!("unexpected message: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_channel_skips_malformed_lines() {
    let input = b"not json\n{\"type\": \"SKIP_WAITING\"}\n" as &[u8];
    let mut channel = ControlChannel::from_lines(input);

    let msg = channel.next().await.unwrap();
    assert!(matches!(msg, ControlMessage::SkipWaiting));
    assert!(channel.next().await.is_none());
  }

  #[tokio::test]
  async fn test_controller_signal_delivery() {
    let (handle, mut events) = controller_channel();
    handle.notify();
    assert_eq!(events.next().await, Some(ControllerChange));
  }

  #[test]
  fn test_reload_guard_fires_exactly_once() {
    let guard = ReloadGuard::new();
    let reloads = AtomicU32::new(0);

    // Two controller-change signals in quick succession
    let first = guard.on_change(|| {
      reloads.fetch_add(1, Ordering::SeqCst);
    });
    let second = guard.on_change(|| {
      reloads.fetch_add(1, Ordering::SeqCst);
    });

    assert!(first);
    assert!(!second);
    assert_eq!(reloads.load(Ordering::SeqCst), 1);
  }
}
