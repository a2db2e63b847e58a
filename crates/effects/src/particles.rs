//! Particle backend seam and a buffering implementation.

use glam::{DVec3, Vec4};
use serde::Serialize;
use std::collections::BTreeMap;

/// Visual particle families the engine can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// Rising flame.
    Flame,
    /// Rising lava droplet.
    LavaFlame,
    /// Steam cloud.
    Steam,
    /// Underwater bubble.
    Bubble,
    /// Falling dust grain.
    Dust,
    /// Lava fountain drop.
    Fountain,
    /// Water spray at the foot of a waterfall.
    Splash,
    /// Frosty breath puff.
    FrostBreath,
    /// Print left by a footstep.
    Footprint,
}

/// One particle spawn request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Particle {
    /// Particle family.
    pub kind: ParticleKind,
    /// World-space spawn point.
    pub position: DVec3,
    /// Initial motion in blocks per tick.
    pub velocity: DVec3,
    /// Billboard scale.
    pub scale: f32,
    /// RGBA tint.
    pub color: Vec4,
}

impl Particle {
    /// Particle with unit scale and a white tint.
    pub fn new(kind: ParticleKind, position: DVec3, velocity: DVec3) -> Self {
        Self {
            kind,
            position,
            velocity,
            scale: 1.0,
            color: Vec4::ONE,
        }
    }

    /// Builder-style scale override.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Builder-style tint override.
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }
}

/// Fire-and-forget particle backend.
pub trait ParticleSink {
    /// Spawn one particle. No handle is returned.
    fn spawn(&mut self, particle: Particle);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullParticles;

impl ParticleSink for NullParticles {
    fn spawn(&mut self, _particle: Particle) {}
}

/// CPU-side buffer of particles spawned since the last drain.
///
/// A renderer drains it once per frame; tests inspect it directly.
#[derive(Debug, Default, Clone)]
pub struct ParticleBatch {
    particles: Vec<Particle>,
    totals: BTreeMap<ParticleKind, u64>,
}

impl ParticleBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Particles spawned since the last drain.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Take the buffered particles.
    pub fn drain(&mut self) -> Vec<Particle> {
        std::mem::take(&mut self.particles)
    }

    /// Clear accumulated particles.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Buffered particles of one kind.
    pub fn count(&self, kind: ParticleKind) -> usize {
        self.particles.iter().filter(|p| p.kind == kind).count()
    }

    /// Particles of one kind spawned since creation, drains included.
    pub fn total(&self, kind: ParticleKind) -> u64 {
        self.totals.get(&kind).copied().unwrap_or(0)
    }

    /// Running totals per kind.
    pub fn totals(&self) -> impl Iterator<Item = (ParticleKind, u64)> + '_ {
        self.totals.iter().map(|(k, v)| (*k, *v))
    }

    /// Buffered particle count.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

impl ParticleSink for ParticleBatch {
    fn spawn(&mut self, particle: Particle) {
        *self.totals.entry(particle.kind).or_default() += 1;
        self.particles.push(particle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_counts_survive_drain() {
        let mut batch = ParticleBatch::new();
        batch.spawn(Particle::new(ParticleKind::Steam, DVec3::ZERO, DVec3::Y));
        batch.spawn(Particle::new(ParticleKind::Bubble, DVec3::ONE, DVec3::Y).with_scale(2.0));
        assert_eq!(batch.count(ParticleKind::Steam), 1);
        let drained = batch.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].scale, 2.0);
        assert!(batch.is_empty());
        assert_eq!(batch.total(ParticleKind::Bubble), 1);
    }
}
