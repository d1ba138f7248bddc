use log::info;

use crate::error::Result;

/// One message received on the command socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Pull,
  Push,
  StartService,
  /// Anything else, kept verbatim for the log.
  Unknown(Vec<u8>),
}

impl Command {
  /// Decode exactly the bytes of one read. Invalid UTF-8 is `Unknown`.
  #[must_use]
  pub fn parse(raw: &[u8]) -> Self {
    let Ok(text) = std::str::from_utf8(raw) else {
      return Self::Unknown(raw.to_vec());
    };
    match text.trim() {
      "pull" => Self::Pull,
      "push" => Self::Push,
      "emacs" => Self::StartService,
      _ => Self::Unknown(raw.to_vec()),
    }
  }

  #[must_use]
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pull => "pull",
      Self::Push => "push",
      Self::StartService => "emacs",
      Self::Unknown(_) => "unknown",
    }
  }
}

/// The workflows a command can trigger.
pub trait Workflows {
  fn pull(&self) -> Result<String>;
  fn push(&self) -> Result<String>;
  fn start_service(&self) -> Result<String>;
}

/// Parse `raw` and run the matching workflow. Unknown input is logged and
/// nothing runs. Nothing is written back to the caller.
pub fn dispatch<W: Workflows + ?Sized>(raw: &[u8], workflows: &W) -> Result<Command> {
  let command = Command::parse(raw);
  match &command {
    Command::Pull => {
      workflows.pull()?;
    }
    Command::Push => {
      workflows.push()?;
    }
    Command::StartService => {
      workflows.start_service()?;
    }
    Command::Unknown(bytes) => {
      info!("Invalid command {:?}", String::from_utf8_lossy(bytes));
    }
  }
  Ok(command)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::HubError;
  use std::cell::RefCell;
  use std::path::PathBuf;

  #[derive(Default)]
  struct Calls {
    seen: RefCell<Vec<&'static str>>,
    fail: bool,
  }

  impl Calls {
    fn record(&self, name: &'static str) -> Result<String> {
      self.seen.borrow_mut().push(name);
      if self.fail {
        Err(HubError::FileMissing(PathBuf::from("init.el")))
      } else {
        Ok(format!("{name} done"))
      }
    }
  }

  impl Workflows for Calls {
    fn pull(&self) -> Result<String> {
      self.record("pull")
    }
    fn push(&self) -> Result<String> {
      self.record("push")
    }
    fn start_service(&self) -> Result<String> {
      self.record("start_service")
    }
  }

  #[test]
  fn parses_the_fixed_vocabulary() {
    assert_eq!(Command::parse(b"pull"), Command::Pull);
    assert_eq!(Command::parse(b"push"), Command::Push);
    assert_eq!(Command::parse(b"emacs"), Command::StartService);
    assert_eq!(Command::parse(b"push\n"), Command::Push);
  }

  #[test]
  fn everything_else_is_unknown() {
    for raw in [
      &b"status"[..],
      b"",
      b"   ",
      b"PULL",
      b"pull push",
      b"\xff\xfe",
    ] {
      assert_eq!(Command::parse(raw), Command::Unknown(raw.to_vec()), "{raw:?}");
    }
  }

  #[test]
  fn each_command_runs_exactly_one_workflow() {
    let calls = Calls::default();
    dispatch(b"pull", &calls).expect("pull");
    dispatch(b"push", &calls).expect("push");
    dispatch(b"emacs", &calls).expect("emacs");
    assert_eq!(*calls.seen.borrow(), vec!["pull", "push", "start_service"]);
  }

  #[test]
  fn unknown_command_runs_nothing() {
    let calls = Calls::default();
    let cmd = dispatch(b"status", &calls).expect("no error");
    assert_eq!(cmd, Command::Unknown(b"status".to_vec()));
    assert!(calls.seen.borrow().is_empty());
  }

  #[test]
  fn workflow_errors_propagate_to_the_caller() {
    let calls = Calls {
      fail: true,
      ..Default::default()
    };
    assert!(matches!(
      dispatch(b"push", &calls),
      Err(HubError::FileMissing(_))
    ));
    assert_eq!(*calls.seen.borrow(), vec!["push"]);
  }
}
