//! Push payload parsing and notification actions.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Raw push payload as delivered. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct PushPayload {
  title: Option<String>,
  body: Option<String>,
  data: Option<Value>,
}

/// Action buttons attached to every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
  Open,
  Close,
}

impl NotificationAction {
  /// Resolve an action identifier. Absence of an id is treated as close.
  pub fn from_id(id: Option<&str>) -> Self {
    match id {
      Some("open") => NotificationAction::Open,
      _ => NotificationAction::Close,
    }
  }

  pub fn id(&self) -> &'static str {
    match self {
      NotificationAction::Open => "open",
      NotificationAction::Close => "close",
    }
  }
}

/// A notification ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub actions: [NotificationAction; 2],
  pub data: Option<Value>,
}

/// Parse an inbound push payload into a displayable notification.
///
/// Malformed JSON or missing/empty title/body yields `None`; a broken push
/// must never surface as an empty notification.
pub fn parse(raw: &[u8]) -> Option<Notification> {
  let payload: PushPayload = match serde_json::from_slice(raw) {
    Ok(payload) => payload,
    Err(e) => {
      debug!("dropping malformed push payload: {}", e);
      return None;
    }
  };

  let title = payload.title.filter(|t| !t.is_empty())?;
  let body = payload.body.filter(|b| !b.is_empty())?;

  Some(Notification {
    title,
    body,
    actions: [NotificationAction::Open, NotificationAction::Close],
    data: payload.data,
  })
}

/// Surface the notification actions act against.
pub trait WindowSurface {
  /// Dismiss the displayed notification.
  fn close_notification(&mut self);
  /// Open a new application window at `path`, or focus an existing one.
  fn open_or_focus(&mut self, path: &str);
}

/// Handle a notification interaction. The notification is always closed
/// first; only the open action touches windows.
pub fn handle_action<W: WindowSurface>(action: Option<&str>, windows: &mut W) {
  windows.close_notification();

  if NotificationAction::from_id(action) == NotificationAction::Open {
    windows.open_or_focus("/");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct RecordingSurface {
    closed: u32,
    opened: Vec<String>,
  }

  impl WindowSurface for RecordingSurface {
    fn close_notification(&mut self) {
      self.closed += 1;
    }

    fn open_or_focus(&mut self, path: &str) {
      self.opened.push(path.to_string());
    }
  }

  #[test]
  fn test_parse_valid_payload() {
    let notification = parse(br#"{"title": "T", "body": "B"}"#).unwrap();
    assert_eq!(notification.title, "T");
    assert_eq!(notification.body, "B");
    assert_eq!(
      notification.actions,
      [NotificationAction::Open, NotificationAction::Close]
    );
    assert!(notification.data.is_none());
  }

  #[test]
  fn test_parse_carries_opaque_data() {
    let notification =
      parse(br#"{"title": "T", "body": "B", "data": {"issue": 42}}"#).unwrap();
    assert_eq!(notification.data.unwrap()["issue"], 42);
  }

  #[test]
  fn test_parse_ignores_unknown_fields() {
    let notification =
      parse(br#"{"title": "T", "body": "B", "badge": "/icon.png"}"#).unwrap();
    assert_eq!(notification.title, "T");
  }

  #[test]
  fn test_missing_title_or_body_is_noop() {
    assert!(parse(br#"{"body": "B"}"#).is_none());
    assert!(parse(br#"{"title": "T"}"#).is_none());
    assert!(parse(br#"{"title": "", "body": "B"}"#).is_none());
    assert!(parse(br#"{}"#).is_none());
  }

  #[test]
  fn test_malformed_json_is_noop() {
    assert!(parse(b"not json at all").is_none());
    assert!(parse(b"").is_none());
  }

  #[test]
  fn test_open_action_closes_then_opens_root() {
    let mut surface = RecordingSurface::default();
    handle_action(Some("open"), &mut surface);

    assert_eq!(surface.closed, 1);
    assert_eq!(surface.opened, vec!["/"]);
  }

  #[test]
  fn test_close_action_only_closes() {
    let mut surface = RecordingSurface::default();
    handle_action(Some("close"), &mut surface);

    assert_eq!(surface.closed, 1);
    assert!(surface.opened.is_empty());
  }

  #[test]
  fn test_default_action_is_close() {
    let mut surface = RecordingSurface::default();
    handle_action(None, &mut surface);

    assert_eq!(surface.closed, 1);
    assert!(surface.opened.is_empty());
  }
}
