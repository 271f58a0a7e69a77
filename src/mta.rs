use log::{debug, error, info, warn};
use nix::unistd::{setegid, Gid, Group};
use std::io::{self, BufWriter, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::error::BounceError;

/// How to start the downstream mail agent.
#[derive(Debug, Clone)]
pub struct MtaCommand {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Group the child switches its effective gid to before exec. `None` keeps ours.
    pub trust_group: Option<String>,
}

/// Exim flags for injecting a bounce: read the message from stdin with a null
/// envelope sender, take recipients from the headers, and stamp the given
/// sender ident and host.
pub fn exim_args(sender_ident: &str, sender_host: &str) -> Vec<String> {
    vec![
        "-bm".to_string(),
        "-f".to_string(),
        "<>".to_string(),
        "-oi".to_string(),
        "-oMt".to_string(),
        sender_ident.to_string(),
        "-oMs".to_string(),
        sender_host.to_string(),
        "-t".to_string(),
    ]
}

/// How the mail agent ended once its input was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
    Abnormal,
    WaitFailed,
}

impl ExitOutcome {
    /// Only a normal exit is passed through; everything else happened after
    /// the message was handed off and counts as success.
    pub fn exit_code(self) -> i32 {
        match self {
            ExitOutcome::Exited(code) => code,
            ExitOutcome::Signaled(_) | ExitOutcome::Abnormal | ExitOutcome::WaitFailed => 0,
        }
    }
}

/// A running mail agent and the write end of its stdin.
///
/// All output to the agent goes through the `Write` impl. A failed write kills
/// the agent at once so it never queues a truncated message, and dropping a
/// pipe that was not `finish`ed does the same.
#[derive(Debug)]
pub struct MtaPipe {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    reaped: bool,
}

impl MtaPipe {
    pub fn spawn(cmd: &MtaCommand) -> Result<Self, BounceError> {
        let gid = match cmd.trust_group.as_deref() {
            Some(name) => Some(lookup_group(name)?),
            None => None,
        };

        let mut command = Command::new(&cmd.path);
        command.args(&cmd.args).stdin(Stdio::piped());
        if let Some(gid) = gid {
            // SAFETY: setegid is async-signal-safe and only touches the child's credentials.
            unsafe {
                command.pre_exec(move || setegid(gid).map_err(io::Error::from));
            }
        }

        debug!("[mta] spawning {} {:?}", cmd.path.display(), cmd.args);
        let mut child = command.spawn().map_err(|source| BounceError::Spawn {
            path: cmd.path.clone(),
            source,
        })?;
        info!("[mta] started {} as pid {}", cmd.path.display(), child.id());

        let stdin = child.stdin.take().map(BufWriter::new);
        let pipe = MtaPipe {
            child,
            stdin,
            reaped: false,
        };
        if pipe.stdin.is_none() {
            return Err(BounceError::Spawn {
                path: cmd.path.clone(),
                source: io::Error::new(io::ErrorKind::BrokenPipe, "child stdin not captured"),
            });
        }
        Ok(pipe)
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Close the agent's input and wait for it to exit.
    pub fn finish(mut self) -> Result<ExitOutcome, BounceError> {
        self.flush().map_err(BounceError::PipeWrite)?;
        // Dropping the writer closes our end of the pipe.
        self.stdin = None;

        let outcome = match self.child.wait() {
            Err(e) => {
                error!("[mta] wait: {}", e);
                ExitOutcome::WaitFailed
            }
            Ok(status) => {
                if let Some(sig) = status.signal() {
                    error!("[mta] MTA crashed with signal {}", sig);
                    ExitOutcome::Signaled(sig)
                } else if let Some(code) = status.code() {
                    debug!("[mta] MTA exited with status {}", code);
                    ExitOutcome::Exited(code)
                } else {
                    error!("[mta] MTA exited abnormally ({})", status);
                    ExitOutcome::Abnormal
                }
            }
        };
        self.reaped = true;
        Ok(outcome)
    }

    fn abort(&mut self, err: io::Error) -> io::Error {
        error!("[mta] write to pid {} failed: {}", self.child.id(), err);
        self.kill();
        self.discard_input();
        err
    }

    fn kill(&mut self) {
        match self.child.kill() {
            Ok(()) => warn!("[mta] killed pid {}", self.child.id()),
            Err(e) => warn!("[mta] could not kill pid {}: {}", self.child.id(), e),
        }
    }

    // Drops buffered bytes without trying to write them.
    fn discard_input(&mut self) {
        if let Some(stdin) = self.stdin.take() {
            drop(stdin.into_parts());
        }
    }
}

impl Write for MtaPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = match self.stdin.as_mut() {
            Some(stdin) => stdin.write(buf),
            None => return Err(io::Error::new(io::ErrorKind::BrokenPipe, "MTA input is closed")),
        };
        match result {
            Ok(0) if !buf.is_empty() => Err(self.abort(io::ErrorKind::WriteZero.into())),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = match self.stdin.as_mut() {
            Some(stdin) => stdin.flush(),
            None => return Ok(()),
        };
        result.map_err(|e| self.abort(e))
    }
}

impl Drop for MtaPipe {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        warn!("[mta] message not completed, stopping pid {}", self.child.id());
        self.kill();
        self.discard_input();
        if let Err(e) = self.child.wait() {
            error!("[mta] wait: {}", e);
        }
    }
}

fn lookup_group(name: &str) -> Result<Gid, BounceError> {
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid),
        Ok(None) => Err(BounceError::NoSuchGroup(name.to_string())),
        Err(source) => Err(BounceError::GroupLookup {
            group: name.to_string(),
            source,
        }),
    }
}
