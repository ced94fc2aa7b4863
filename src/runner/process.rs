use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::RunError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long to keep reading output once the process is gone.
///
/// A descendant that inherited the pipes can keep them open after the
/// direct child exits or is killed; whatever it writes after this is lost.
const OUTPUT_GRACE: Duration = Duration::from_secs(1);

/// How the output streams of a process are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCapture {
    /// stderr is redirected into stdout, keeping the order of lines.
    Merged,
    /// stdout and stderr are captured separately.
    Separate,
}

/// Result of running an external executable.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// `true` if the process exited with code 0 before the timeout.
    pub success: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
    /// Captured stdout, interleaved with stderr for [`OutputCapture::Merged`].
    pub output: String,
    /// Captured stderr; always empty for [`OutputCapture::Merged`].
    pub stderr: String,
}

/// Runs `exe` with `args`, killing it once `timeout` has passed.
///
/// Output is read on background threads, so a process that leaves
/// descendants holding its pipes open cannot block the caller for longer
/// than the timeout plus a short grace period.
///
/// # Errors
///
/// Returns [`RunError::Spawn`] if the process cannot be started.
pub fn run_with_timeout<S: AsRef<OsStr>>(
    exe: &Path,
    args: &[S],
    timeout: Duration,
    capture: OutputCapture,
) -> Result<RunOutcome, RunError> {
    let spawn_error = |source| RunError::Spawn {
        exe: exe.to_path_buf(),
        source,
    };

    let start = Instant::now();
    let (tx, rx) = mpsc::channel();
    // The command is dropped right after spawning so that its copies of
    // the pipe write ends are closed.
    let mut child = match capture {
        OutputCapture::Merged => {
            let (reader, writer) = std::io::pipe().map_err(spawn_error)?;
            let writer_err = writer.try_clone().map_err(spawn_error)?;
            let child = Command::new(exe)
                .args(args)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(writer_err)
                .spawn()
                .map_err(spawn_error)?;
            read_stream(reader, Stream::Out, tx);
            child
        }
        OutputCapture::Separate => {
            let mut child = Command::new(exe)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(spawn_error)?;
            if let Some(out) = child.stdout.take() {
                read_stream(out, Stream::Out, tx.clone());
            }
            if let Some(err) = child.stderr.take() {
                read_stream(err, Stream::Err, tx);
            }
            child
        }
    };
    debug!(exe = %exe.display(), pid = child.id(), "process started");

    let (status, timed_out) = wait_or_kill(&mut child, timeout);
    let elapsed = start.elapsed();

    let (mut output, stderr) = collect_output(&rx, Instant::now() + OUTPUT_GRACE);
    if timed_out {
        let msg = format!(
            "The process took too long (more than {} seconds) and was terminated.",
            timeout.as_secs()
        );
        warn!(exe = %exe.display(), "{msg}");
        output.push_str(&msg);
        output.push('\n');
    }

    let success = !timed_out && status.is_some_and(|code| code == 0);
    debug!(exe = %exe.display(), ?status, ?elapsed, success, "process finished");

    Ok(RunOutcome {
        success,
        timed_out,
        elapsed,
        output,
        stderr,
    })
}

/// Polls `child` until it exits or `timeout` passes.
///
/// Returns the exit code (if any) and whether the process was killed.
fn wait_or_kill(child: &mut Child, timeout: Duration) -> (Option<i32>, bool) {
    // No deadline if the timeout does not fit in an `Instant`.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return (status.code(), false),
            Ok(None) if deadline.is_some_and(|d| Instant::now() >= d) => {
                let _ = child.kill();
                let _ = child.wait();
                return (None, true);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                warn!(error = %e, "failed to poll child process");
                let _ = child.kill();
                return (None, false);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Out,
    Err,
}

/// Forwards chunks read from `pipe` until it closes or the receiver is gone.
fn read_stream<R: Read + Send + 'static>(
    mut pipe: R,
    stream: Stream,
    tx: Sender<(Stream, Vec<u8>)>,
) {
    thread::spawn(move || {
        let mut buf = [0_u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Gathers output until every reader has finished or `deadline` passes.
fn collect_output(rx: &Receiver<(Stream, Vec<u8>)>, deadline: Instant) -> (String, String) {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Out, chunk)) => out.extend_from_slice(&chunk),
            Ok((Stream::Err, chunk)) => err.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!("output pipes still open after the process ended");
                break;
            }
        }
    }
    (
        String::from_utf8_lossy(&out).into_owned(),
        String::from_utf8_lossy(&err).into_owned(),
    )
}
