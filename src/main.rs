//! mdambient - ambient particle and acoustic effects for voxel worlds
//!
//! Headless demo: builds a small scene with lava, fire and a waterfall, walks
//! the player past a zombie and reports what the effect engine produced.

use anyhow::{Context, Result};
use clap::Parser;
use glam::DVec3;
use mdambient_audio::AudioEngine;
use mdambient_core::ItemStack;
use mdambient_core::{ItemType, ToolMaterial, ToolType};
use mdambient_effects::{AmbientEngine, ConfigHandle, EffectsConfig, ParticleBatch};
use mdambient_testkit::{Action, EventRecord, JsonlSink, MetricsReport, Scene, TickLog, FLOOR_Y};
use mdambient_world::{
    BlockPos, BlockRegistry, BLOCK_AIR, BLOCK_FIRE, BLOCK_LAVA, BLOCK_NETHERRACK, BLOCK_STONE,
    BLOCK_WATER, STATE_FLUID_FALLING,
};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// Ticks between checks of the config file's modification time.
const RELOAD_CHECK_INTERVAL: u64 = 20;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the ambient effect engine over a demo scene", long_about = None)]
struct Args {
    /// Effects config (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 400)]
    ticks: u64,

    /// Override the config's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write one JSON line per tick to this file
    #[arg(long)]
    events: Option<PathBuf>,

    /// Write a metrics report to this file
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Write the default config to this path and exit
    #[arg(long)]
    write_default_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // WARN by default; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    info!("Starting mdambient v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = &args.write_default_config {
        EffectsConfig::default().save_to_path(path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => EffectsConfig::try_load_from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => EffectsConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;
    let handle = ConfigHandle::new(config);
    let mut engine = AmbientEngine::new(
        handle.clone(),
        BlockRegistry::with_defaults(),
        AudioEngine::simulated(seed),
    );

    let mut scene = demo_scene();
    let mut sink = args.events.as_deref().map(JsonlSink::create).transpose()?;
    let mut watcher = args.config.as_deref().map(ConfigWatcher::new);

    let log = run(&mut engine, &mut scene, args.ticks, &handle, watcher.as_mut(), sink.as_mut())?;

    let diagnostics = engine.diagnostics();
    info!(
        ticks = args.ticks,
        jets = diagnostics.jets,
        managers = diagnostics.managers,
        sounds = engine.audio().stats().submitted,
        "Demo finished"
    );
    println!("{}", serde_json::to_string_pretty(&diagnostics)?);

    if let Some(path) = &args.metrics {
        MetricsReport::collect("demo", &engine, &log).write_to(path)?;
        println!("Wrote metrics to {}", path.display());
    }
    Ok(())
}

fn run(
    engine: &mut AmbientEngine,
    scene: &mut Scene,
    ticks: u64,
    handle: &ConfigHandle,
    mut watcher: Option<&mut ConfigWatcher>,
    mut sink: Option<&mut JsonlSink>,
) -> Result<TickLog> {
    let mut log = TickLog::default();
    let mut particles = ParticleBatch::new();
    for _ in 0..ticks {
        if let Some(watcher) = watcher.as_deref_mut() {
            if engine.current_tick().0 % RELOAD_CHECK_INTERVAL == 0 {
                watcher.poll(handle);
            }
        }

        let view = scene.view();
        let report = engine.tick(&scene.world, &view, scene.viewer(), &scene.flags, &mut particles);
        let spawned = particles.drain().len();
        if let Some(sink) = sink.as_deref_mut() {
            sink.write(&EventRecord {
                tick: report.tick,
                kind: if report.reloaded { "reload" } else { "tick" },
                payload: serde_json::json!({
                    "jets": report.jets,
                    "sounds": report.sounds,
                    "particles": spawned,
                    "attached": report.entities.attached,
                    "detached": report.entities.detached,
                }),
            })?;
        }
        log.reports.push(report);
        scene.step();
    }
    log.particle_totals = particles.totals().collect();
    Ok(log)
}

/// Reloads the config file when its modification time changes.
struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl ConfigWatcher {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            modified: modified(path),
        }
    }

    fn poll(&mut self, handle: &ConfigHandle) {
        let now = modified(&self.path);
        if now.is_none() || now == self.modified {
            return;
        }
        self.modified = now;
        if let Err(err) = handle.reload_from_path(&self.path) {
            warn!(path = %self.path.display(), %err, "Keeping previous effects config");
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Stone floor with a lava pool, a fire patch and a waterfall, a zombie
/// wandering about and the player walking across with a sword.
fn demo_scene() -> Scene {
    let mut scene = Scene::flat(20);
    let floor = FLOOR_Y - 1;
    scene
        .fill(BlockPos::new(-4, floor - 1, 6), BlockPos::new(2, floor - 1, 10), BLOCK_LAVA)
        .fill(BlockPos::new(-4, floor, 6), BlockPos::new(2, floor, 10), BLOCK_AIR)
        .fill(BlockPos::new(6, floor, -3), BlockPos::new(8, floor, -1), BLOCK_NETHERRACK)
        .fill(BlockPos::new(6, FLOOR_Y, -3), BlockPos::new(8, FLOOR_Y, -1), BLOCK_FIRE)
        .fill(BlockPos::new(-8, FLOOR_Y, -6), BlockPos::new(-8, FLOOR_Y + 5, -6), BLOCK_STONE);
    for y in FLOOR_Y..FLOOR_Y + 5 {
        scene
            .world
            .set_block_state(BlockPos::new(-7, y, -6), BLOCK_WATER, STATE_FLUID_FALLING);
    }
    scene.world.set_block(BlockPos::new(-7, FLOOR_Y + 5, -6), BLOCK_WATER);

    let sword = ItemStack::new(ItemType::Tool(ToolType::Sword, ToolMaterial::Iron), 1);
    scene
        .player()
        .push(Action::Hold(Some(sword)))
        .push(Action::MoveTo {
            target: DVec3::new(0.5, FLOOR_Y as f64, -8.5),
            speed: 0.2,
        })
        .push(Action::Swing)
        .push(Action::Wait(20))
        .push(Action::SelectSlot(1))
        .push(Action::MoveTo {
            target: DVec3::new(8.5, FLOOR_Y as f64, 12.5),
            speed: 0.28,
        });
    scene.spawn("zombie", DVec3::new(4.5, FLOOR_Y as f64, 4.5), |zombie| {
        zombie
            .then(Action::MoveTo {
                target: DVec3::new(-3.5, FLOOR_Y as f64, 4.5),
                speed: 0.1,
            })
            .then(Action::Wait(40))
            .then(Action::MoveTo {
                target: DVec3::new(4.5, FLOOR_Y as f64, 4.5),
                speed: 0.1,
            })
    });
    scene
}
