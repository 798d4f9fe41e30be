//! Graceful-then-forced process termination.
//!
//! A request walks `Requested -> WaitingGraceful -> Escalated` and ends in
//! `Confirmed` or `Failed`. The whole sequence is bounded by the wait budget
//! plus the settle time; callers await it inline.

use crate::error::SignalError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

const AUDIT: &str = "hostwatch_audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// SIGTERM
    Graceful,
    /// SIGKILL
    Forceful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Requested,
    WaitingGraceful,
    Escalated,
    Confirmed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Confirmed | Phase::Failed)
    }
}

/// Delivers signals and checks liveness.
pub trait Signaller: Send + Sync {
    fn signal(&self, pid: u32, kind: SignalKind) -> Result<(), SignalError>;

    /// Existence check that does not enumerate the process table.
    fn is_alive(&self, pid: u32) -> bool;
}

/// `kill(2)`-based signaller.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibcSignaller;

impl Signaller for LibcSignaller {
    fn signal(&self, pid: u32, kind: SignalKind) -> Result<(), SignalError> {
        let sig = match kind {
            SignalKind::Graceful => libc::SIGTERM,
            SignalKind::Forceful => libc::SIGKILL,
        };
        // pid 0 and negative values address process groups.
        let target = match libc::pid_t::try_from(pid) {
            Ok(p) if p > 0 => p,
            _ => return Err(SignalError::NoSuchProcess(pid)),
        };

        // SAFETY: kill has no memory-safety preconditions.
        if unsafe { libc::kill(target, sig) } == 0 {
            return Ok(());
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::EPERM) => Err(SignalError::PermissionDenied(pid)),
            Some(libc::ESRCH) => Err(SignalError::NoSuchProcess(pid)),
            errno => Err(SignalError::Os {
                pid,
                errno: errno.unwrap_or(0),
            }),
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Ok(target) = libc::pid_t::try_from(pid) else {
            return false;
        };
        if target <= 0 {
            return false;
        }
        // SAFETY: signal 0 performs the permission and existence checks only.
        let exists = unsafe { libc::kill(target, 0) } == 0
            || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
        // A zombie has already exited; it only awaits reaping by its parent.
        exists && !is_zombie(target)
    }
}

fn is_zombie(pid: libc::pid_t) -> bool {
    procfs::process::Process::new(pid)
        .and_then(|p| p.stat())
        .map(|stat| stat.state == 'Z')
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub wait_budget: Duration,
    pub poll_interval: Duration,
    pub settle: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            wait_budget: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
            settle: Duration::from_millis(100),
        }
    }
}

/// One in-flight request.
#[derive(Debug, Clone, Copy)]
pub struct TerminationRequest {
    pub pid: u32,
    pub phase: Phase,
    /// End of the graceful wait.
    pub deadline: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationOutcome {
    pub pid: u32,
    pub phase: Phase,
    pub escalated: bool,
    pub elapsed: Duration,
    pub message: String,
}

impl TerminationOutcome {
    pub fn confirmed(&self) -> bool {
        self.phase == Phase::Confirmed
    }
}

#[derive(Clone)]
pub struct Terminator {
    signaller: Arc<dyn Signaller>,
    policy: TerminationPolicy,
}

impl Terminator {
    pub fn new(signaller: Arc<dyn Signaller>, policy: TerminationPolicy) -> Self {
        Self { signaller, policy }
    }

    /// Run a request to a terminal phase.
    pub async fn terminate(&self, pid: u32) -> TerminationOutcome {
        let started = Instant::now();
        let mut request = TerminationRequest {
            pid,
            phase: Phase::Requested,
            deadline: started + self.policy.wait_budget,
        };
        let mut escalated = false;

        loop {
            request.phase = match request.phase {
                Phase::Requested => self.request_graceful(pid),
                Phase::WaitingGraceful => self.wait_graceful(pid, request.deadline).await,
                Phase::Escalated => {
                    escalated = true;
                    self.escalate(pid).await
                }
                Phase::Confirmed | Phase::Failed => break,
            };
            log::debug!("[kill] pid {pid} -> {:?}", request.phase);
        }

        let elapsed = started.elapsed();
        let message = match request.phase {
            Phase::Confirmed => format!("Process {pid} terminated successfully."),
            _ => format!("Failed to terminate process {pid}. Check permissions."),
        };

        if request.phase == Phase::Confirmed {
            log::info!(
                target: AUDIT,
                "TERMINATED pid={pid} escalated={escalated} elapsed_ms={}",
                elapsed.as_millis()
            );
        } else {
            log::warn!(
                target: AUDIT,
                "TERMINATE_FAILED pid={pid} elapsed_ms={}",
                elapsed.as_millis()
            );
        }

        TerminationOutcome {
            pid,
            phase: request.phase,
            escalated,
            elapsed,
            message,
        }
    }

    fn request_graceful(&self, pid: u32) -> Phase {
        match self.signaller.signal(pid, SignalKind::Graceful) {
            Ok(()) => Phase::WaitingGraceful,
            Err(e) => {
                log::warn!("[kill] graceful signal to {pid} failed ({e}), escalating");
                Phase::Escalated
            }
        }
    }

    async fn wait_graceful(&self, pid: u32, deadline: Instant) -> Phase {
        loop {
            if !self.signaller.is_alive(pid) {
                return Phase::Confirmed;
            }
            let now = Instant::now();
            if now >= deadline {
                return Phase::Escalated;
            }
            sleep(self.policy.poll_interval.min(deadline - now)).await;
        }
    }

    async fn escalate(&self, pid: u32) -> Phase {
        if let Err(e) = self.signaller.signal(pid, SignalKind::Forceful) {
            log::warn!("[kill] forceful signal to {pid} failed: {e}");
        }
        sleep(self.policy.settle).await;
        if self.signaller.is_alive(pid) {
            Phase::Failed
        } else {
            Phase::Confirmed
        }
    }
}
