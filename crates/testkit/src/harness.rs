//! Deterministic tick harness.
//!
//! Steps an [`AmbientEngine`] through a scripted [`Scene`] and collects what
//! came out of each tick. With the simulated audio backend and a fixed seed
//! the collected log is identical across runs, which makes it suitable for
//! golden snapshots.

use crate::fixtures::Scene;
use crate::snapshot::{check_json_snapshot, SnapshotMode};
use crate::{EventRecord, JsonlSink};
use anyhow::Result;
use mdambient_effects::{AmbientEngine, Diagnostics, ParticleBatch, ParticleKind, TickReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-tick summary kept by the harness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickFrame {
    /// Tick number.
    pub tick: u64,
    /// Live jets after the tick.
    pub jets: usize,
    /// Entity managers with effects.
    pub managers: usize,
    /// Sounds tracked by the audio engine.
    pub sounds: usize,
    /// Particles spawned this tick, per kind.
    pub particles: BTreeMap<ParticleKind, usize>,
}

/// Everything [`run_ticks`] saw.
#[derive(Debug, Clone, Default)]
pub struct TickLog {
    /// Raw reports, one per tick.
    pub reports: Vec<TickReport>,
    /// Summaries, one per tick.
    pub frames: Vec<TickFrame>,
    /// Particles per kind over the whole run.
    pub particle_totals: BTreeMap<ParticleKind, u64>,
}

impl TickLog {
    /// Particles of `kind` over the whole run.
    pub fn particles(&self, kind: ParticleKind) -> u64 {
        self.particle_totals.get(&kind).copied().unwrap_or(0)
    }

    /// Number of ticks in which the configuration was reapplied.
    pub fn reloads(&self) -> usize {
        self.reports.iter().filter(|r| r.reloaded).count()
    }
}

/// Run `ticks` engine ticks over `scene`, advancing every script after each.
pub fn run_ticks(engine: &mut AmbientEngine, scene: &mut Scene, ticks: u64) -> TickLog {
    run_ticks_with(engine, scene, ticks, |_, _| {})
}

/// [`run_ticks`] calling `observe` after each tick.
pub fn run_ticks_with<F>(
    engine: &mut AmbientEngine,
    scene: &mut Scene,
    ticks: u64,
    mut observe: F,
) -> TickLog
where
    F: FnMut(&TickReport, &AmbientEngine),
{
    let mut log = TickLog::default();
    let mut particles = ParticleBatch::new();
    for _ in 0..ticks {
        let view = scene.view();
        let report = engine.tick(&scene.world, &view, scene.viewer(), &scene.flags, &mut particles);
        observe(&report, engine);

        let mut spawned = BTreeMap::new();
        for particle in particles.drain() {
            *spawned.entry(particle.kind).or_insert(0) += 1;
        }
        log.frames.push(TickFrame {
            tick: report.tick.0,
            jets: report.jets,
            managers: report.entities.active,
            sounds: report.sounds,
            particles: spawned,
        });
        log.reports.push(report);
        scene.step();
    }
    log.particle_totals = particles.totals().collect();
    log
}

/// [`run_ticks`] that also writes one `tick` event per tick to `sink`.
pub fn record_ticks(
    engine: &mut AmbientEngine,
    scene: &mut Scene,
    ticks: u64,
    sink: &mut JsonlSink,
) -> Result<TickLog> {
    let log = run_ticks(engine, scene, ticks);
    for (report, frame) in log.reports.iter().zip(&log.frames) {
        if report.reloaded {
            sink.write(&EventRecord {
                tick: report.tick,
                kind: "reload",
                payload: serde_json::Value::Null,
            })?;
        }
        sink.write(&EventRecord {
            tick: report.tick,
            kind: "tick",
            payload: serde_json::to_value(frame)?,
        })?;
    }
    sink.flush()?;
    Ok(log)
}

/// Settings for a golden-snapshot engine run.
#[derive(Debug, Clone)]
pub struct WorldtestConfig {
    /// Name written into the report.
    pub name: String,
    /// Ticks to run.
    pub ticks: u64,
    /// Golden JSON file.
    pub snapshot_path: PathBuf,
    /// Compare or rewrite the golden.
    pub mode: SnapshotMode,
}

#[derive(Debug, Serialize)]
struct WorldtestReport<'a> {
    name: &'a str,
    frames: &'a [TickFrame],
    last: Diagnostics,
}

/// Run the scene and compare its frames and final diagnostics with the golden
/// file.
pub fn run_worldtest(
    config: &WorldtestConfig,
    engine: &mut AmbientEngine,
    scene: &mut Scene,
) -> Result<TickLog> {
    let log = run_ticks(engine, scene, config.ticks);
    let report = WorldtestReport {
        name: &config.name,
        frames: &log.frames,
        last: engine.diagnostics(),
    };
    check_json_snapshot(&config.snapshot_path, &report, config.mode)?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdambient_core::SimTick;
    use crate::fixtures::{Action, FLOOR_Y};
    use glam::DVec3;
    use mdambient_effects::EffectsConfig;
    use mdambient_world::{BlockPos, BLOCK_AIR, BLOCK_LAVA};

    fn lava_scene() -> Scene {
        let mut scene = Scene::flat(12);
        scene
            .fill(BlockPos::new(-2, FLOOR_Y - 2, 3), BlockPos::new(2, FLOOR_Y - 2, 6), BLOCK_LAVA)
            .fill(BlockPos::new(-2, FLOOR_Y - 1, 3), BlockPos::new(2, FLOOR_Y - 1, 6), BLOCK_AIR);
        scene.player().push(Action::MoveTo {
            target: DVec3::new(0.5, FLOOR_Y as f64, -4.5),
            speed: 0.2,
        });
        scene
    }

    #[test]
    fn same_seed_same_log() {
        let a = run_ticks(&mut AmbientEngine::simulated(EffectsConfig::default()), &mut lava_scene(), 60);
        let b = run_ticks(&mut AmbientEngine::simulated(EffectsConfig::default()), &mut lava_scene(), 60);
        assert_eq!(a.frames, b.frames);
        assert_eq!(a.frames.len(), 60);
        assert_eq!(a.frames[59].tick, 59);
        assert_eq!(a.reloads(), 0);
    }

    #[test]
    fn walking_player_leaves_footprints() {
        let mut engine = AmbientEngine::simulated(EffectsConfig::default());
        let log = run_ticks(&mut engine, &mut lava_scene(), 40);
        assert!(log.particles(ParticleKind::Footprint) > 0);
        assert_eq!(engine.current_tick(), SimTick(40));
        assert_eq!(log.frames[0].managers, 1);
    }

    #[test]
    fn record_and_snapshot_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::create(dir.path().join("events.jsonl")).unwrap();
        let mut engine = AmbientEngine::simulated(EffectsConfig::default());
        record_ticks(&mut engine, &mut lava_scene(), 10, &mut sink).unwrap();
        assert_eq!(sink.written(), 10);

        let mut config = WorldtestConfig {
            name: "lava".to_string(),
            ticks: 20,
            snapshot_path: dir.path().join("lava.json"),
            mode: SnapshotMode::Update,
        };
        run_worldtest(&config, &mut AmbientEngine::simulated(EffectsConfig::default()), &mut lava_scene()).unwrap();
        config.mode = SnapshotMode::Assert;
        run_worldtest(&config, &mut AmbientEngine::simulated(EffectsConfig::default()), &mut lava_scene()).unwrap();
    }
}
