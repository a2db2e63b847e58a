//! Metrics reports for CI artifacts.
//!
//! A [`MetricsReport`] summarises one harness run: how many jets were spawned
//! and retired, what the audio engine accepted or dropped, particle totals and
//! the smoothed per-subsystem tick cost. Reports are written as pretty JSON.

use crate::harness::TickLog;
use anyhow::{Context, Result};
use mdambient_effects::AmbientEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Overall result of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Every check passed.
    Pass,
    /// At least one check failed.
    Fail,
    /// Not run.
    Skip,
}

/// Jet engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JetMetrics {
    /// Jets accepted.
    pub spawned: u64,
    /// Jets that finished.
    pub retired: u64,
    /// Jets refused because their voxel was taken.
    pub rejected: u64,
    /// Jets alive at the end.
    pub alive: usize,
}

/// Audio engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMetrics {
    /// Sounds accepted by the backend.
    pub submitted: u64,
    /// Sounds dropped before submission.
    pub blocked: u64,
    /// Sounds silenced or attenuated by occlusion.
    pub occluded: u64,
    /// Sounds the backend rejected.
    pub errors: u64,
}

/// Summary of one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test identifier.
    pub test_name: String,
    /// Seconds since the Unix epoch when the report was built.
    pub timestamp: u64,
    /// Overall result.
    pub result: TestResult,
    /// Ticks run.
    pub ticks: u64,
    /// Jet counters.
    pub jets: JetMetrics,
    /// Audio counters.
    pub audio: AudioMetrics,
    /// Entity managers with effects at the end.
    pub managers: usize,
    /// Particles per kind.
    pub particles: BTreeMap<String, u64>,
    /// Smoothed tick cost per subsystem, in milliseconds.
    pub tick_cost_ms: BTreeMap<String, f64>,
}

impl MetricsReport {
    /// Collect a report from a finished run.
    pub fn collect(test_name: impl Into<String>, engine: &AmbientEngine, log: &TickLog) -> Self {
        let jet_stats = engine.jets().stats();
        let audio_stats = engine.audio().stats();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            test_name: test_name.into(),
            timestamp,
            result: TestResult::Pass,
            ticks: log.reports.len() as u64,
            jets: JetMetrics {
                spawned: jet_stats.spawned,
                retired: jet_stats.retired,
                rejected: jet_stats.rejected,
                alive: engine.jets().len(),
            },
            audio: AudioMetrics {
                submitted: audio_stats.submitted,
                blocked: audio_stats.blocked,
                occluded: audio_stats.occluded,
                errors: audio_stats.errors,
            },
            managers: engine.diagnostics().managers,
            particles: log
                .particle_totals
                .iter()
                .map(|(kind, n)| (format!("{kind:?}").to_lowercase(), *n))
                .collect(),
            tick_cost_ms: engine
                .timers()
                .averages()
                .map(|(name, ms)| (name.to_string(), ms))
                .collect(),
        }
    }

    /// Mark the report failed.
    pub fn failed(mut self) -> Self {
        self.result = TestResult::Fail;
        self
    }

    /// Write pretty JSON to `path`, creating parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Read a report back.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Scene;
    use crate::harness::run_ticks;
    use mdambient_effects::EffectsConfig;

    #[test]
    fn report_survives_a_trip_to_disk() {
        let mut engine = AmbientEngine::simulated(EffectsConfig::default());
        let log = run_ticks(&mut engine, &mut Scene::flat(8), 5);
        let report = MetricsReport::collect("flat", &engine, &log);
        assert_eq!(report.ticks, 5);
        assert_eq!(report.managers, 1);
        assert!(report.tick_cost_ms.contains_key("scan"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci/metrics.json");
        report.clone().failed().write_to(&path).unwrap();
        let back = MetricsReport::read_from(&path).unwrap();
        assert_eq!(back.result, TestResult::Fail);
        assert_eq!(back.jets, report.jets);
        assert_eq!(back.test_name, "flat");
    }
}
