use std::convert::Infallible;
use std::fs;
use std::io::{ErrorKind, Read};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::command::{Workflows, dispatch};
use crate::error::{HubError, Result};

/// Largest message read from one connection. Whatever one read returns is
/// the whole message.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Bind `endpoint` and serve commands until the process dies.
pub fn start<W: Workflows + ?Sized>(endpoint: &Path, workflows: &W) -> Result<Infallible> {
  let server = CommandServer::bind(endpoint)?;
  info!("Running server on {}", endpoint.display());
  server.serve_forever(workflows)
}

pub struct CommandServer {
  listener: UnixListener,
  path: PathBuf,
}

impl CommandServer {
  /// Remove whatever a previous run left at `path`, then bind it.
  pub fn bind(path: &Path) -> Result<Self> {
    let bind_err = |source: std::io::Error| HubError::Bind {
      path: path.to_path_buf(),
      source,
    };
    if let Some(dir) = path.parent()
      && !dir.as_os_str().is_empty()
      && !dir.exists()
    {
      fs::create_dir_all(dir).map_err(bind_err)?;
      let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
    }
    if UnixStream::connect(path).is_ok() {
      return Err(bind_err(std::io::Error::new(
        ErrorKind::AddrInUse,
        "another server is already listening",
      )));
    }
    remove_stale_endpoint(path).map_err(bind_err)?;
    let listener = UnixListener::bind(path).map_err(bind_err)?;
    Ok(Self {
      listener,
      path: path.to_path_buf(),
    })
  }

  #[must_use]
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn serve_forever<W: Workflows + ?Sized>(&self, workflows: &W) -> Result<Infallible> {
    loop {
      self.serve_one(workflows);
    }
  }

  /// Accept one connection and process its command. Failures are logged,
  /// never returned, so the loop keeps going.
  pub fn serve_one<W: Workflows + ?Sized>(&self, workflows: &W) {
    match self.listener.accept() {
      Ok((mut stream, _)) => {
        debug!("Connection accepted");
        if let Err(err) = handle_connection(&mut stream, workflows) {
          error!("Command failed: {err}");
        }
      }
      Err(err) => error!("Accept error: {err}"),
    }
  }
}

fn remove_stale_endpoint(path: &Path) -> std::io::Result<()> {
  match fs::remove_file(path) {
    Ok(()) => {
      info!("Removed stale endpoint {}", path.display());
      Ok(())
    }
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
    Err(err) => {
      if fs::symlink_metadata(path).is_ok() {
        Err(err)
      } else {
        Ok(())
      }
    }
  }
}

/// Read one message from `stream` and dispatch it. The stream is closed by
/// the caller dropping it.
fn handle_connection<S: Read, W: Workflows + ?Sized>(stream: &mut S, workflows: &W) -> Result<()> {
  let mut buf = [0_u8; READ_BUFFER_SIZE];
  let n = stream.read(&mut buf)?;
  if n == 0 {
    debug!("Peer closed without sending a command");
    return Ok(());
  }
  let command = dispatch(&buf[..n], workflows)?;
  debug!("Handled {}", command.as_str());
  Ok(())
}
