//! Durable calibration storage

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{CalibrationError, CalibrationResult};

/// Well-known calibration file name
pub const DEFAULT_CALIBRATION_FILE: &str = "calibration_data.json";

/// JSON file store for the session calibration
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a calibration (write to a temp file, then rename over the old one)
    pub fn save(&self, result: &CalibrationResult) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| CalibrationError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        info!("Calibration data saved to {}", self.path.display());
        Ok(())
    }

    /// Load and validate the stored calibration
    pub fn load(&self) -> Result<CalibrationResult, CalibrationError> {
        if !self.path.exists() {
            return Err(CalibrationError::NotFound(self.path.display().to_string()));
        }

        let raw = fs::read_to_string(&self.path)?;
        let result: CalibrationResult =
            serde_json::from_str(&raw).map_err(|e| CalibrationError::Corrupt(e.to_string()))?;
        result.validate()?;

        let now = Utc::now();
        if result.is_stale(now) {
            warn!(
                "Calibration is {} days old. Consider recalibrating.",
                result.age(now).num_days()
            );
        }

        info!(
            "Calibration data loaded from {} ({} points)",
            self.path.display(),
            result.sample_count()
        );
        Ok(result)
    }

    /// Load the stored calibration, treating missing or invalid files as absent
    pub fn load_valid(&self) -> Option<CalibrationResult> {
        match self.load() {
            Ok(result) => Some(result),
            Err(CalibrationError::NotFound(path)) => {
                debug!("No calibration data at {}", path);
                None
            }
            Err(e) => {
                warn!("Ignoring calibration at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Remove the stored calibration
    pub fn clear(&self) -> Result<(), CalibrationError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for CalibrationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_FILE)
    }
}
