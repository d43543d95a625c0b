use std::io::Read;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::cancel::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. Stdout and stderr are drained on helper threads so a chatty
/// child cannot block on a full pipe.
pub(crate) fn output_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
) -> std::io::Result<Option<Output>> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    let stdout_drain = spawn_drain(child.stdout.take());
    let stderr_drain = spawn_drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_drain(stdout_drain)?;
    let stderr = join_drain(stderr_drain)?;
    Ok(status.map(|status| Output {
        status,
        stdout,
        stderr,
    }))
}

pub(crate) fn spawn_drain<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

pub(crate) fn join_drain(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> std::io::Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| std::io::Error::other("pipe drain thread panicked"))?
}

/// Shared handle to a spawned child so another thread can kill it.
///
/// The lock is only held for `try_wait`/`kill`, never across blocking IO on the child's pipes.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChildSlot(Arc<Mutex<Option<Child>>>);

impl ChildSlot {
    fn lock(&self) -> MutexGuard<'_, Option<Child>> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn put(&self, child: Child) {
        *self.lock() = Some(child);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    /// Kill and reap the child if it is still held. No-op otherwise.
    pub(crate) fn kill(&self) {
        if let Some(mut child) = self.lock().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Poll the child until it exits or `cancel` trips (in which case it is killed).
    pub(crate) fn wait(&self, cancel: &CancelToken) -> std::io::Result<ExitStatus> {
        loop {
            {
                let mut guard = self.lock();
                let Some(child) = guard.as_mut() else {
                    return Err(std::io::Error::other("child process was already reaped"));
                };
                if let Some(status) = child.try_wait()? {
                    guard.take();
                    return Ok(status);
                }
            }
            if cancel.is_cancelled() {
                self.kill();
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "child process killed after cancellation",
                ));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}
