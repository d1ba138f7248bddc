//! Desktop notifications around workflows.
//!
//! Delivery is best-effort: a notifier never fails the workflow it reports
//! on. [`with_notifications`] is the wrapping contract every notified
//! workflow goes through.

use log::{debug, info, warn};
use notify_rust::{Notification, Timeout};

/// A titled message for the host user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
  pub title: String,
  pub message: String,
}

impl NotificationEvent {
  pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      message: message.into(),
    }
  }
}

pub trait Notifier {
  /// Deliver `event`. Implementations swallow their own failures.
  fn send(&self, event: NotificationEvent);
}

/// Native notifications through the host's notification center.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
  fn send(&self, event: NotificationEvent) {
    let result = Notification::new()
      .summary(&event.title)
      .body(&event.message)
      .timeout(Timeout::Milliseconds(5000))
      .show();
    if let Err(err) = result {
      warn!("Notification '{}' not delivered: {err}", event.title);
    }
  }
}

/// Used when notifications are disabled: events only reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn send(&self, event: NotificationEvent) {
    debug!("[{}] {}", event.title, event.message);
  }
}

/// Run `workflow` between a pre and a post notification.
///
/// The pre notification `(title, pre_message)` is sent before the workflow
/// runs. Only when it returns `Ok` is the post notification sent, carrying
/// the returned message. An `Err` is returned untouched and no post
/// notification is emitted.
pub fn with_notifications<N, F, E>(
  notifier: &N,
  title: &str,
  pre_message: &str,
  workflow: F,
) -> Result<String, E>
where
  N: Notifier + ?Sized,
  F: FnOnce() -> Result<String, E>,
{
  notifier.send(NotificationEvent::new(title, pre_message));
  let result = workflow()?;
  info!("{result}");
  notifier.send(NotificationEvent::new(title, result.as_str()));
  Ok(result)
}
