//! Master/worker process topology.
//!
//! In parallel mode the builder forks `N` workers before constructing the
//! input module. One *ready* pipe is shared by all workers (workers write,
//! master reads); each worker additionally gets its own *data* pipe (master
//! writes, worker reads). The wire protocol on the pipes belongs to the
//! input modules; the core only establishes the topology, publishes the
//! descriptors through configuration, and installs the master's signal
//! handling:
//!
//! - `SIGCHLD` is ignored with `SA_NOCLDWAIT`, so finished workers never
//!   become zombies;
//! - `SIGPIPE` is ignored, so a dead worker's closed pipe surfaces as a
//!   write error instead of killing the master.

use crate::{Error, Result};
use std::os::unix::io::RawFd;
use tracing::{debug, info};
use xana_env::ConfigStore;

/// Upper bound on the worker count.
pub const MAX_WORKERS: u32 = 255;

/// One worker from the master's point of view.
#[derive(Debug, Clone, Copy)]
pub struct MpWorkerId {
    worker_id: i32,
    pid: libc::pid_t,
    data_pipe_fd: RawFd,
}

impl MpWorkerId {
    /// Worker identifier, a small non-negative number.
    #[must_use]
    pub fn worker_id(&self) -> i32 {
        self.worker_id
    }

    #[must_use]
    pub fn pid(&self) -> libc::pid_t {
        self.pid
    }

    /// Master-side (write-only) end of this worker's data pipe.
    #[must_use]
    pub fn data_pipe_fd(&self) -> RawFd {
        self.data_pipe_fd
    }
}

/// Process topology established by [`fork_workers`].
#[derive(Debug)]
pub enum MpTopology {
    /// No workers; everything runs in this process.
    Serial,
    /// This process is the master.
    Master {
        /// Read end of the shared ready pipe.
        ready_pipe_fd: RawFd,
        workers: Vec<MpWorkerId>,
    },
    /// This process is a forked worker.
    Worker {
        worker_id: i32,
        /// Write end of the shared ready pipe.
        ready_pipe_fd: RawFd,
        /// Read end of this worker's data pipe.
        data_pipe_fd: RawFd,
    },
}

impl MpTopology {
    #[must_use]
    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master { .. })
    }

    #[must_use]
    pub fn is_worker(&self) -> bool {
        matches!(self, Self::Worker { .. })
    }

    /// Worker identifier for the environment: `-1` unless this process is a
    /// worker.
    #[must_use]
    pub fn worker_id(&self) -> i32 {
        match self {
            Self::Worker { worker_id, .. } => *worker_id,
            _ => -1,
        }
    }

    /// Publishes the pipe descriptors under the input module's config
    /// section so the input can pick them up on construction.
    pub fn publish(&self, store: &ConfigStore, section: &str) {
        match self {
            Self::Serial => {}
            Self::Master {
                ready_pipe_fd,
                workers,
            } => {
                store.put(section, "ready-pipe-fd", ready_pipe_fd.to_string());
                let fds: Vec<String> = workers
                    .iter()
                    .map(|w| w.data_pipe_fd().to_string())
                    .collect();
                store.put(section, "data-pipe-fds", fds.join(" "));
            }
            Self::Worker {
                worker_id,
                ready_pipe_fd,
                data_pipe_fd,
            } => {
                store.put(section, "worker-id", worker_id.to_string());
                store.put(section, "ready-pipe-fd", ready_pipe_fd.to_string());
                store.put(section, "data-pipe-fd", data_pipe_fd.to_string());
            }
        }
    }
}

/// Forks `count` workers and returns this process's view of the topology.
///
/// With `count == 0` no processes are created. In the master, returns after
/// installing the signal dispositions described in the module docs; in each
/// child, returns immediately with the worker's descriptors, all master-side
/// ends closed.
///
/// # Errors
///
/// [`Error::TooManyWorkers`] above [`MAX_WORKERS`]; [`Error::Os`] with the
/// errno description when `pipe`, `fork` or `sigaction` fail.
pub fn fork_workers(count: u32) -> Result<MpTopology> {
    if count == 0 {
        return Ok(MpTopology::Serial);
    }
    if count > MAX_WORKERS {
        return Err(Error::TooManyWorkers(count));
    }

    let (ready_read, ready_write) = make_pipe()?;
    let mut workers: Vec<MpWorkerId> = Vec::with_capacity(count as usize);

    for worker_id in 0..count as i32 {
        let (data_read, data_write) = make_pipe()?;
        match unsafe { libc::fork() } {
            -1 => return Err(Error::os("fork")),
            0 => {
                // Worker: keep the shared ready write end and our data read
                // end; everything master-side goes away, including the data
                // pipes of previously forked siblings.
                close_fd(ready_read);
                close_fd(data_write);
                for sibling in &workers {
                    close_fd(sibling.data_pipe_fd());
                }
                debug!(worker_id, "worker process started");
                return Ok(MpTopology::Worker {
                    worker_id,
                    ready_pipe_fd: ready_write,
                    data_pipe_fd: data_read,
                });
            }
            pid => {
                close_fd(data_read);
                workers.push(MpWorkerId {
                    worker_id,
                    pid,
                    data_pipe_fd: data_write,
                });
                debug!(worker_id, pid, "forked worker");
            }
        }
    }

    close_fd(ready_write);
    ignore_signal(libc::SIGCHLD, libc::SA_NOCLDWAIT)?;
    ignore_signal(libc::SIGPIPE, 0)?;
    info!(workers = workers.len(), "master/worker topology established");

    Ok(MpTopology::Master {
        ready_pipe_fd: ready_read,
        workers,
    })
}

fn make_pipe() -> Result<(RawFd, RawFd)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(Error::os("pipe"));
    }
    Ok((fds[0], fds[1]))
}

fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

fn ignore_signal(signal: libc::c_int, flags: libc::c_int) -> Result<()> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = libc::SIG_IGN;
    action.sa_flags = flags;
    if unsafe { libc::sigaction(signal, &action, std::ptr::null_mut()) } != 0 {
        return Err(Error::os("sigaction"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_serial() {
        let topology = fork_workers(0).unwrap();
        assert!(matches!(topology, MpTopology::Serial));
        assert_eq!(topology.worker_id(), -1);
        assert!(!topology.is_master());
        assert!(!topology.is_worker());
    }

    #[test]
    fn worker_count_is_capped() {
        let err = fork_workers(MAX_WORKERS + 1).unwrap_err();
        assert!(matches!(err, Error::TooManyWorkers(256)));
    }

    #[test]
    fn master_publishes_fd_list() {
        let topology = MpTopology::Master {
            ready_pipe_fd: 10,
            workers: vec![
                MpWorkerId {
                    worker_id: 0,
                    pid: 100,
                    data_pipe_fd: 11,
                },
                MpWorkerId {
                    worker_id: 1,
                    pid: 101,
                    data_pipe_fd: 12,
                },
            ],
        };
        let store = ConfigStore::new();
        topology.publish(&store, "XtcInput.XtcMasterInput");

        assert_eq!(
            store.get_str("XtcInput.XtcMasterInput", "ready-pipe-fd").unwrap(),
            "10"
        );
        assert_eq!(
            store
                .get_list("XtcInput.XtcMasterInput", "data-pipe-fds")
                .unwrap(),
            vec!["11", "12"]
        );
        assert_eq!(topology.worker_id(), -1);
    }

    #[test]
    fn worker_publishes_its_descriptors() {
        let topology = MpTopology::Worker {
            worker_id: 3,
            ready_pipe_fd: 7,
            data_pipe_fd: 8,
        };
        let store = ConfigStore::new();
        topology.publish(&store, "XtcInput.XtcWorkerInput");

        assert_eq!(
            store.get::<i32>("XtcInput.XtcWorkerInput", "worker-id").unwrap(),
            3
        );
        assert_eq!(
            store.get::<i32>("XtcInput.XtcWorkerInput", "data-pipe-fd").unwrap(),
            8
        );
        assert_eq!(topology.worker_id(), 3);
    }

    #[test]
    fn serial_publishes_nothing() {
        let store = ConfigStore::new();
        MpTopology::Serial.publish(&store, "XtcInput.XtcInputModule");
        assert!(!store.has_section("XtcInput.XtcInputModule"));
    }
}
