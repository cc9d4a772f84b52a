//! Layered agent settings
//!
//! Defaults, then an optional TOML file (`cheatguard.toml`, or the path in
//! `CHEATGUARD_CONFIG`), then `CHEATGUARD__SECTION__KEY` environment
//! variables. The detector binaries read the same settings as the agent.

use config::{Config, Environment, File};
use decision::DecisionConfig;
use detectors::{FaceTrackerConfig, ObjectWatcherConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use telemetry::{ListenerConfig, SenderConfig};

use crate::supervisor::SupervisorConfig;
use crate::AgentError;

/// Default settings file
pub const DEFAULT_SETTINGS_FILE: &str = "cheatguard.toml";

/// Environment variable overriding the settings file path
pub const SETTINGS_PATH_ENV: &str = "CHEATGUARD_CONFIG";

/// Environment variable prefix for individual keys
pub const ENV_PREFIX: &str = "CHEATGUARD";

/// Agent and detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// trace, debug, info, warn or error
    pub log_level: String,
    /// Status API bind address
    pub http_addr: String,
    /// Aggregator tick interval
    pub tick_ms: u64,
    /// Events included in a status snapshot
    pub status_events: usize,
    pub face_listener: ListenerConfig,
    pub object_listener: ListenerConfig,
    pub decision: DecisionConfig,
    pub supervisor: SupervisorConfig,
    pub face_tracker: FaceTrackerConfig,
    pub object_watcher: ObjectWatcherConfig,
    pub face_sender: SenderConfig,
    pub object_sender: SenderConfig,
    /// Collaborator output for the face tracker (stdin when unset)
    pub face_input: Option<PathBuf>,
    /// Collaborator output for the object watcher (stdin when unset)
    pub object_input: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http_addr: "127.0.0.1:8080".to_string(),
            tick_ms: 100,
            status_events: 10,
            face_listener: ListenerConfig::face(),
            object_listener: ListenerConfig::object(),
            decision: DecisionConfig::default(),
            supervisor: SupervisorConfig::default(),
            face_tracker: FaceTrackerConfig::default(),
            object_watcher: ObjectWatcherConfig::default(),
            face_sender: SenderConfig::face(),
            object_sender: SenderConfig::object(),
            face_input: None,
            object_input: None,
        }
    }
}

impl Settings {
    /// Load from the default locations
    pub fn load() -> Result<Self, AgentError> {
        let path = std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Self::load_from(&path)
    }

    /// Load with `path` as the settings file; a missing file is not an error
    pub fn load_from(path: &Path) -> Result<Self, AgentError> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.tick_ms, 100);
        assert_eq!(settings.face_listener.port, telemetry::FACE_PORT);
        assert_eq!(settings.object_sender.port, telemetry::OBJECT_PORT);
        assert_eq!(settings.decision.window_secs, 300);
    }

    #[test]
    fn test_file_overrides_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"
tick_ms = 50

[decision]
window_secs = 60

[object_watcher]
prohibited = ["Phone", "Calculator"]

[supervisor.face]
program = "sh"
args = ["-c", "vision-face | face-tracker"]
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.tick_ms, 50);
        assert_eq!(settings.decision.window_secs, 60);
        assert_eq!(settings.decision.face_threshold, 3);
        assert_eq!(settings.object_watcher.prohibited.len(), 2);
        assert_eq!(settings.supervisor.face.program, "sh");
        assert_eq!(settings.supervisor.object.program, "object-watcher");
    }
}
