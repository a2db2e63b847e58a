//! Ambient effects for mdambient.
//!
//! Everything that reacts to the world around the viewer lives here:
//!
//! - [`jets`] - Block effects found by a random voxel scan and the particle
//!   jets they spawn (fire, steam, bubbles, dust, fountains, waterfalls)
//! - [`entity`] - Per-entity effect managers (breath, footsteps, item sounds)
//! - [`AmbientEngine`] - Owns the subsystems and runs them once per tick
//!
//! The engine reads the world through [`mdambient_world::VoxelAccessor`] and
//! plays sounds through [`mdambient_audio::AudioEngine`]. Particles go to a
//! caller supplied [`ParticleSink`].

pub mod config;
pub mod context;
pub mod defaults;
pub mod diagnostics;
mod engine;
pub mod entity;
pub mod jets;
pub mod particles;

pub use config::{
    BlockEffectAssignment, BlockSoundAssignment, ConfigError, ConfigHandle, EffectToggles,
    EffectsConfig, ParticleDensity, DEFAULT_CONFIG_PATH,
};
pub use context::{EngineContext, TickContext, Viewer, PLAYER_EYE_HEIGHT};
pub use diagnostics::TickTimer;
pub use engine::{AmbientEngine, Diagnostics, TickReport};
pub use entity::{EntitySnapshot, EntityView};
pub use particles::{NullParticles, Particle, ParticleBatch, ParticleKind, ParticleSink};
