//! Detector process supervisor
//!
//! Starts the face tracker and object watcher as child processes, checks
//! that each survives a startup grace period, reaps detectors that die,
//! and stops them with a terminate signal followed by a bounded wait.
//!
//! Each detector's stdin is a pipe held open by the supervisor, so a
//! detector reading collaborator output from stdin waits for input instead
//! of seeing end of input at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AgentError;

/// Command line for one detector process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl DetectorCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub face: DetectorCommand,
    pub object: DetectorCommand,
    /// Time a detector must survive after spawning
    pub startup_grace_ms: u64,
    /// Wait after the terminate signal before killing
    pub stop_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            face: DetectorCommand::new("face-tracker"),
            object: DetectorCommand::new("object-watcher"),
            startup_grace_ms: 3000,
            stop_timeout_ms: 5000,
        }
    }
}

/// Overall session state derived from detector liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Both detectors alive
    Running,
    /// One detector alive
    Partial,
    Idle,
    /// A start or stop is in progress
    Busy,
}

/// Liveness of each detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectorLiveness {
    pub face: bool,
    pub object: bool,
}

impl DetectorLiveness {
    pub fn status(&self) -> SessionStatus {
        match (self.face, self.object) {
            (true, true) => SessionStatus::Running,
            (false, false) => SessionStatus::Idle,
            _ => SessionStatus::Partial,
        }
    }
}

/// Current proctoring session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Detector {
    name: &'static str,
    child: Child,
    /// Write end of the detector's stdin; dropping it closes the pipe
    stdin: Option<ChildStdin>,
}

/// Owns the detector child processes
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    face: Option<Detector>,
    object: Option<Detector>,
    session: Option<Session>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            face: None,
            object: None,
            session: None,
        }
    }

    /// Start both detectors; rejected while any detector is alive
    pub async fn start(&mut self) -> Result<Session, AgentError> {
        self.reap();
        if self.face.is_some() || self.object.is_some() {
            return Err(AgentError::AlreadyRunning);
        }

        let grace = Duration::from_millis(self.config.startup_grace_ms);

        let face = spawn_checked("face tracker", &self.config.face, grace).await?;
        self.face = Some(face);

        match spawn_checked("object watcher", &self.config.object, grace).await {
            Ok(object) => self.object = Some(object),
            Err(e) => {
                self.stop().await;
                return Err(e);
            }
        }

        let session = Session {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        info!("Proctoring session {} started", session.id);
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Stop both detectors; returns false when nothing was running
    pub async fn stop(&mut self) -> bool {
        let timeout = Duration::from_millis(self.config.stop_timeout_ms);
        let mut stopped = false;

        for detector in [self.face.take(), self.object.take()].into_iter().flatten() {
            terminate(detector, timeout).await;
            stopped = true;
        }

        if let Some(session) = self.session.take() {
            info!("Proctoring session {} stopped", session.id);
            stopped = true;
        }
        stopped
    }

    /// Clear detectors that exited on their own; returns their names
    pub fn reap(&mut self) -> Vec<&'static str> {
        let mut dead = Vec::new();
        for slot in [&mut self.face, &mut self.object] {
            let exited = match slot.as_mut() {
                Some(detector) => match detector.child.try_wait() {
                    Ok(Some(status)) => {
                        warn!("{} exited unexpectedly ({})", detector.name, status);
                        true
                    }
                    Ok(None) => false,
                    Err(e) => {
                        warn!("{} status check failed: {}", detector.name, e);
                        true
                    }
                },
                None => false,
            };
            if exited {
                if let Some(detector) = slot.take() {
                    dead.push(detector.name);
                }
            }
        }
        dead
    }

    pub fn liveness(&self) -> DetectorLiveness {
        DetectorLiveness {
            face: self.face.is_some(),
            object: self.object.is_some(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

async fn spawn_checked(
    name: &'static str,
    command: &DetectorCommand,
    grace: Duration,
) -> Result<Detector, AgentError> {
    info!("Starting {}: {} {:?}", name, command.program, command.args);
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AgentError::SpawnFailed {
            name,
            reason: e.to_string(),
        })?;

    let stdin = child.stdin.take();
    let mut detector = Detector { name, child, stdin };
    tokio::time::sleep(grace).await;

    match detector.child.try_wait() {
        Ok(None) => {
            info!("{} running (pid {:?})", name, detector.child.id());
            Ok(detector)
        }
        Ok(Some(status)) => {
            error!("{} exited during startup ({})", name, status);
            Err(AgentError::DetectorExited {
                name,
                status: status.to_string(),
            })
        }
        Err(e) => Err(AgentError::SpawnFailed {
            name,
            reason: e.to_string(),
        }),
    }
}

async fn terminate(mut detector: Detector, timeout: Duration) {
    send_terminate(&mut detector.child);
    drop(detector.stdin.take());

    match tokio::time::timeout(timeout, detector.child.wait()).await {
        Ok(Ok(status)) => info!("{} stopped ({})", detector.name, status),
        Ok(Err(e)) => warn!("{} wait failed: {}", detector.name, e),
        Err(_) => {
            warn!("{} did not stop in {:?}, killing", detector.name, timeout);
            if let Err(e) = detector.child.kill().await {
                error!("Failed to kill {}: {}", detector.name, e);
            }
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: pid belongs to a child we have not yet reaped
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            warn!("SIGTERM to pid {} failed", pid);
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    let _ = child.start_kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn config(face: DetectorCommand, object: DetectorCommand) -> SupervisorConfig {
        SupervisorConfig {
            face,
            object,
            startup_grace_ms: 100,
            stop_timeout_ms: 2000,
        }
    }

    fn sleeper() -> DetectorCommand {
        DetectorCommand::new("sleep").arg("30")
    }

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let mut supervisor = Supervisor::new(config(sleeper(), sleeper()));
        assert_eq!(supervisor.liveness().status(), SessionStatus::Idle);

        let session = supervisor.start().await.unwrap();
        assert_eq!(supervisor.liveness().status(), SessionStatus::Running);
        assert_eq!(supervisor.session().map(|s| s.id), Some(session.id));

        assert!(matches!(
            supervisor.start().await,
            Err(AgentError::AlreadyRunning)
        ));

        assert!(supervisor.stop().await);
        assert_eq!(supervisor.liveness().status(), SessionStatus::Idle);
        assert!(supervisor.session().is_none());

        // Stopping when idle is a no-op
        assert!(!supervisor.stop().await);
    }

    #[tokio::test]
    async fn test_detector_exiting_fails_start() {
        let mut supervisor = Supervisor::new(config(sleeper(), DetectorCommand::new("true")));
        let result = supervisor.start().await;
        assert!(matches!(
            result,
            Err(AgentError::DetectorExited {
                name: "object watcher",
                ..
            })
        ));
        // The face tracker that did start is stopped again
        assert_eq!(supervisor.liveness().status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_stdin_reader_stays_alive() {
        // `cat` exits as soon as its stdin reaches end of input
        let mut supervisor = Supervisor::new(config(
            DetectorCommand::new("cat"),
            DetectorCommand::new("cat"),
        ));
        supervisor.start().await.unwrap();
        assert!(supervisor.reap().is_empty());
        assert_eq!(supervisor.liveness().status(), SessionStatus::Running);
        assert!(supervisor.stop().await);
    }

    #[tokio::test]
    async fn test_missing_program_fails_spawn() {
        let mut supervisor = Supervisor::new(config(
            DetectorCommand::new("/nonexistent/face-tracker"),
            sleeper(),
        ));
        assert!(matches!(
            supervisor.start().await,
            Err(AgentError::SpawnFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_reap_reports_dead_detector() {
        let mut supervisor = Supervisor::new(config(
            DetectorCommand::new("sh").arg("-c").arg("sleep 0.3"),
            sleeper(),
        ));
        supervisor.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(supervisor.reap(), vec!["face tracker"]);
        assert_eq!(supervisor.liveness().status(), SessionStatus::Partial);
        assert!(supervisor.stop().await);
    }
}
