use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

const SERVER_NOT_RUNNING_MSG: &str = "Server not running. Start it with `hubsync serve`";

/// Write `command` to the server and close the connection. The server sends
/// nothing back, so success only means the bytes were delivered.
pub fn send_command(socket: &Path, command: &str) -> Result<()> {
  let mut stream = UnixStream::connect(socket).map_err(|_| anyhow!(SERVER_NOT_RUNNING_MSG))?;
  stream
    .write_all(command.as_bytes())
    .context("failed to write command")?;
  let _ = stream.shutdown(std::net::Shutdown::Both);
  Ok(())
}
