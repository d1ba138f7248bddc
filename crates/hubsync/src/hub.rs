use crate::command::Workflows;
use crate::config::HubConfig;
use crate::error::Result;
use crate::notify::{DesktopNotifier, LogNotifier, Notifier, with_notifications};
use crate::service::ServiceRegistrar;
use crate::sync::{self, SyncConfig};

const PULL_STARTED: &str = "Configs - pulling";
const PUSH_STARTED: &str = "Configs - pushing";
const SERVICE_STARTED: &str = "Configs - starting server";

/// The concrete workflow set served over the command socket.
pub struct Hub {
  sync: SyncConfig,
  registrar: ServiceRegistrar,
  notifier: Box<dyn Notifier>,
  title: String,
}

impl Hub {
  pub fn new(
    sync: SyncConfig,
    registrar: ServiceRegistrar,
    notifier: Box<dyn Notifier>,
    title: impl Into<String>,
  ) -> Self {
    Self {
      sync,
      registrar,
      notifier,
      title: title.into(),
    }
  }

  #[must_use]
  pub fn from_config(cfg: &HubConfig) -> Self {
    let notifier: Box<dyn Notifier> = if cfg.notifications.enabled {
      Box::new(DesktopNotifier)
    } else {
      Box::new(LogNotifier)
    };
    Self::new(
      cfg.sync_config(),
      ServiceRegistrar::new(cfg.service_config()),
      notifier,
      cfg.notifications.title.clone(),
    )
  }
}

impl Workflows for Hub {
  fn pull(&self) -> Result<String> {
    with_notifications(self.notifier.as_ref(), &self.title, PULL_STARTED, || {
      sync::pull(&self.sync)
    })
  }

  fn push(&self) -> Result<String> {
    with_notifications(self.notifier.as_ref(), &self.title, PUSH_STARTED, || {
      sync::push(&self.sync)
    })
  }

  /// Rewrites the descriptor every time, then loads and starts it. Only the
  /// start step is notified.
  fn start_service(&self) -> Result<String> {
    let descriptor = self.registrar.write_descriptor()?;
    with_notifications(self.notifier.as_ref(), &self.title, SERVICE_STARTED, || {
      self.registrar.start(&descriptor)
    })
  }
}
