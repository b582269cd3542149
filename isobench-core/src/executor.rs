//! Trial Execution
//!
//! One trial = one timed invocation of the work unit. Two strategies:
//!
//! - **In-process (`InProcess`)**: calls the work unit on the current thread.
//!   Cheap, but every trial shares the heap state left by the previous ones.
//!
//! - **Child process (`ChildProcess`)**: forks a fresh process per trial and
//!   ships the outcome back over a pipe as a single frame.
//!
//! ```text
//!   parent                          child (fork)
//!   ──────                          ────────────
//!   pipe()
//!   fork() ───────────────────────▶ heap.collect()
//!                                   heap.suspend()    (disable_gc)
//!                                   time_once(work)
//!                                   write TrialOutcome frame
//!                                   heap.resume()     (disable_gc)
//!   read to EOF  ◀───────────────── _exit(0)
//!   waitpid()
//!   decode frame
//! ```

use crate::config::MeasureConfig;
use crate::error::{MeasureError, TrialFailure};
use crate::measure::time_once;
use tracing::{debug, warn};

/// Type-erased work unit as seen by executors
pub type WorkFn<'a> = dyn FnMut() -> Result<(), TrialFailure> + 'a;

/// Strategy for running a single trial
pub trait TrialExecutor {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Invoke `work` exactly once and return the elapsed seconds
    fn run_trial(&self, work: &mut WorkFn<'_>) -> Result<f64, MeasureError>;
}

/// Whether this host can isolate trials in child processes
pub fn isolation_supported() -> bool {
    cfg!(unix)
}

/// Pick the executor for a run, once, from config and host capability
pub fn select_executor(config: &MeasureConfig) -> Box<dyn TrialExecutor> {
    #[cfg(unix)]
    if config.subprocess {
        debug!(disable_gc = config.disable_gc, "isolating trials in child processes");
        return Box::new(ChildProcess::new(config.disable_gc));
    }

    #[cfg(not(unix))]
    if config.subprocess {
        warn!("process isolation is not supported on this host, running trials in-process");
    }

    debug!("running trials in-process");
    Box::new(InProcess)
}

/// Runs the work unit directly on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcess;

impl TrialExecutor for InProcess {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn run_trial(&self, work: &mut WorkFn<'_>) -> Result<f64, MeasureError> {
        time_once(work).map_err(MeasureError::WorkUnit)
    }
}

#[cfg(unix)]
pub use child::ChildProcess;

#[cfg(unix)]
mod child {
    use super::{TrialExecutor, WorkFn, warn};
    use crate::error::{MeasureError, TrialFailure};
    use crate::heap::{HeapControl, SystemHeap};
    use crate::measure::time_once;
    use isobench_ipc::{FrameError, FrameWriter, TrialOutcome, decode_frame};
    use std::fs::File;
    use std::io::Read;
    use std::os::unix::io::{FromRawFd, OwnedFd, RawFd};

    /// Both ends of an anonymous pipe; each end closes when dropped.
    pub(super) struct Pipe {
        pub(super) read: OwnedFd,
        pub(super) write: OwnedFd,
    }

    impl Pipe {
        /// Create a pipe pair with close-on-exec set on both ends.
        pub(super) fn new() -> Result<Self, std::io::Error> {
            let mut fds = [0 as RawFd; 2];
            let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
            if ret != 0 {
                return Err(std::io::Error::last_os_error());
            }
            let (read, write) =
                unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
            // Commands spawned by the work unit must not inherit the write end,
            // or the parent would wait for them to exit before seeing EOF.
            for fd in fds {
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFD);
                    libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
                }
            }
            Ok(Self { read, write })
        }
    }

    /// Reap `pid`, retrying on EINTR. Returns the raw wait status.
    fn wait_for_child(pid: libc::pid_t) -> Result<libc::c_int, std::io::Error> {
        let mut status: libc::c_int = 0;
        loop {
            let ret = unsafe { libc::waitpid(pid, &mut status, 0) };
            if ret == pid {
                return Ok(status);
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    fn describe_status(status: libc::c_int) -> String {
        if libc::WIFEXITED(status) {
            format!("exit code {}", libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            format!("signal {}", libc::WTERMSIG(status))
        } else {
            format!("wait status {status}")
        }
    }

    /// Forks a fresh child process for every trial
    #[derive(Debug, Clone, Copy)]
    pub struct ChildProcess {
        disable_gc: bool,
        heap: SystemHeap,
    }

    impl ChildProcess {
        /// Create a child-process executor; `disable_gc` suspends heap trimming
        /// while the work unit runs in the child
        pub fn new(disable_gc: bool) -> Self {
            Self {
                disable_gc,
                heap: SystemHeap,
            }
        }

        /// Child side: time the work unit, report, and exit without running hooks.
        ///
        /// Nothing here may log: the parent's subscriber state was copied
        /// mid-flight and its locks may be held by threads that do not exist
        /// in the child.
        fn run_child(&self, write: OwnedFd, work: &mut WorkFn<'_>) -> ! {
            self.heap.collect();
            if self.disable_gc {
                self.heap.suspend();
            }

            let outcome = match time_once(work) {
                Ok(seconds) => TrialOutcome::elapsed(seconds),
                Err(TrialFailure { kind, message }) => TrialOutcome::failure(kind, message),
            };

            let mut writer = FrameWriter::new(File::from(write));
            let code = match writer.write(&outcome) {
                Ok(()) => 0,
                Err(_) => 1,
            };

            if self.disable_gc {
                self.heap.resume();
            }

            unsafe { libc::_exit(code) }
        }
    }

    impl Default for ChildProcess {
        fn default() -> Self {
            Self::new(false)
        }
    }

    impl TrialExecutor for ChildProcess {
        fn name(&self) -> &'static str {
            "child-process"
        }

        fn run_trial(&self, work: &mut WorkFn<'_>) -> Result<f64, MeasureError> {
            let Pipe { read, write } = Pipe::new().map_err(MeasureError::Isolation)?;

            let pid = unsafe { libc::fork() };
            if pid < 0 {
                return Err(MeasureError::Isolation(std::io::Error::last_os_error()));
            }

            if pid == 0 {
                drop(read);
                self.run_child(write, work);
            }

            drop(write);

            // Drain before reaping so a large failure message cannot fill the
            // pipe and block the child forever.
            let mut reader = File::from(read);
            let mut payload = Vec::new();
            let read_result = reader.read_to_end(&mut payload);
            drop(reader);

            let status = wait_for_child(pid).map_err(MeasureError::Isolation)?;
            if !(libc::WIFEXITED(status) && libc::WEXITSTATUS(status) == 0) {
                warn!(pid, status = %describe_status(status), "trial child exited abnormally");
            }

            read_result.map_err(|e| MeasureError::Transport(FrameError::Io(e)))?;

            match decode_frame::<TrialOutcome>(&payload).map_err(MeasureError::Transport)? {
                TrialOutcome::Elapsed { seconds } => Ok(seconds),
                TrialOutcome::Failure { kind, message } => {
                    Err(MeasureError::WorkUnit(TrialFailure { kind, message }))
                }
            }
        }
    }
}
