//! Sound submission: range gating, occlusion, volume and state tracking.

use crate::backend::{AudioBackend, SimulatedBackend};
use crate::instance::{Attenuation, SoundHandle, SoundInstance, SoundState};
use crate::{AudioSettings, SoundCategory};
use glam::DVec3;
use mdambient_physics::{BlockMode, BlockRayTrace, FluidMode, RayTraceIterator};
use mdambient_world::{BlockPos, VoxelAccessor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Volumes below this are not worth a voice.
pub const MIN_AUDIBLE_VOLUME: f32 = 0.01;

/// Smallest volume change worth pushing to the backend.
const VOLUME_EPSILON: f32 = 1e-4;

/// Default number of sounds the engine lets the backend hold at once.
pub const DEFAULT_SOUND_LIMIT: usize = 128;

/// What blocks between the listener and a source do to a sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OcclusionPolicy {
    /// Blocks have no effect.
    Ignore,
    /// Each occluding block scales the volume by `1 - per_block`.
    Attenuate {
        /// Fraction of volume removed per block
        per_block: f32,
    },
    /// Any occluding block blocks the sound.
    Silence,
}

impl Default for OcclusionPolicy {
    fn default() -> Self {
        OcclusionPolicy::Attenuate { per_block: 0.25 }
    }
}

/// True when the listener is inside a sound's audible range, widened by `pad`.
///
/// Global and non-attenuated sounds are always in range.
pub fn in_range(listener: DVec3, sound: &SoundInstance, pad: f64) -> bool {
    if sound.global || sound.attenuation == Attenuation::None {
        return true;
    }
    let range = f64::from(sound.attenuation_distance) + pad;
    listener.distance_squared(sound.position()) < range * range
}

/// Linear falloff of a positional sound at `listener`; 1 for global and
/// non-attenuated sounds.
pub fn distance_gain(listener: DVec3, sound: &SoundInstance) -> f32 {
    if sound.global || sound.attenuation == Attenuation::None {
        return 1.0;
    }
    let max = f64::from(sound.attenuation_distance.max(1));
    let distance = listener.distance(sound.position());
    (1.0 - distance / max).clamp(0.0, 1.0) as f32
}

/// Submission result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    /// State right after submission
    pub state: SoundState,
    /// Handle when the backend accepted the sound
    pub handle: Option<SoundHandle>,
}

impl PlayOutcome {
    fn blocked() -> Self {
        Self {
            state: SoundState::Blocked,
            handle: None,
        }
    }
}

/// A sound the engine is still watching.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSound {
    /// What was submitted
    pub sound: SoundInstance,
    /// Last observed state
    pub state: SoundState,
    /// Volume after category scale and occlusion, before distance falloff
    pub base_volume: f32,
    /// Volume last passed to the backend
    pub volume: f32,
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStats {
    /// Sounds accepted by the backend
    pub submitted: u64,
    /// Sounds dropped before submission
    pub blocked: u64,
    /// Sounds silenced or attenuated by occlusion
    pub occluded: u64,
    /// Sounds rejected by the backend
    pub errors: u64,
}

/// Front end to an [`AudioBackend`].
///
/// Owns the listener position, per-category scales and the set of sounds it
/// has submitted. Every step runs on the tick thread and never waits on the
/// backend.
pub struct AudioEngine {
    backend: Box<dyn AudioBackend>,
    settings: AudioSettings,
    scales: BTreeMap<SoundCategory, f32>,
    listener: DVec3,
    occlusion: OcclusionPolicy,
    sound_limit: usize,
    tracked: BTreeMap<SoundHandle, TrackedSound>,
    stats: AudioStats,
}

impl AudioEngine {
    /// Engine over a backend.
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        debug!(backend = backend.name(), "Audio engine initialized");
        let mut engine = Self {
            backend,
            settings: AudioSettings::default(),
            scales: BTreeMap::new(),
            listener: DVec3::new(0.0, 64.0, 0.0),
            occlusion: OcclusionPolicy::default(),
            sound_limit: DEFAULT_SOUND_LIMIT,
            tracked: BTreeMap::new(),
            stats: AudioStats::default(),
        };
        engine.push_settings();
        engine
    }

    /// Engine over a [`SimulatedBackend`]. Useful for tests and headless runs.
    pub fn simulated(seed: u64) -> Self {
        Self::new(Box::new(SimulatedBackend::new(seed)))
    }

    /// Backend name.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current listener settings.
    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Replace listener settings and push the new gains to the backend.
    pub fn update_settings(&mut self, settings: AudioSettings) {
        self.settings = settings;
        self.push_settings();
    }

    fn push_settings(&mut self) {
        for category in SoundCategory::ALL {
            let gain = self.settings.effective_volume(category);
            self.backend.set_volume_scale(category, gain);
        }
    }

    /// Per-category scale from effect configuration, as a 0 to 100 percent.
    pub fn set_category_scale(&mut self, category: SoundCategory, percent: u8) {
        self.scales
            .insert(category, f32::from(percent.min(100)) / 100.0);
    }

    /// Scale applied to a category before clamping.
    pub fn category_scale(&self, category: SoundCategory) -> f32 {
        self.scales.get(&category).copied().unwrap_or(1.0)
    }

    /// Occlusion policy.
    pub fn set_occlusion(&mut self, policy: OcclusionPolicy) {
        self.occlusion = policy;
    }

    /// Maximum sounds held by the backend before new ones are blocked.
    pub fn set_sound_limit(&mut self, limit: usize) {
        self.sound_limit = limit.max(1);
    }

    /// Move the listener.
    pub fn set_listener_position(&mut self, pos: DVec3) {
        self.listener = pos;
    }

    /// Listener position.
    pub fn listener_position(&self) -> DVec3 {
        self.listener
    }

    /// Base volume times the category scale, clamped to 1.
    pub fn clamped_volume(&self, sound: &SoundInstance) -> f32 {
        (sound.volume * self.category_scale(sound.category)).clamp(0.0, 1.0)
    }

    /// Number of voxels between the listener and a positional source,
    /// excluding the voxel the source sits in.
    fn occluders<W: VoxelAccessor + ?Sized>(&self, world: &W, sound: &SoundInstance) -> u32 {
        let source = sound.position();
        let source_voxel = BlockPos::containing(source);
        let trace = BlockRayTrace::between(
            world,
            self.listener,
            source,
            BlockMode::Collider,
            FluidMode::None,
        );
        RayTraceIterator::new(trace)
            .filter(|hit| hit.pos != source_voxel)
            .count() as u32
    }

    /// Submit a sound.
    ///
    /// Silent, out of range and fully occluded sounds come back
    /// [`SoundState::Blocked`]; a backend refusal comes back
    /// [`SoundState::Error`]. Neither is an error for the caller.
    pub fn play<W: VoxelAccessor + ?Sized>(&mut self, sound: SoundInstance, world: &W) -> PlayOutcome {
        if self.settings.master_gain() <= 0.0 || sound.volume <= 0.0 {
            self.stats.blocked += 1;
            return PlayOutcome::blocked();
        }
        if !in_range(self.listener, &sound, 0.0) {
            trace!(sound = %sound.sound, "Out of range");
            self.stats.blocked += 1;
            return PlayOutcome::blocked();
        }

        let mut volume = sound.volume * self.category_scale(sound.category);
        let positional = !sound.global && sound.attenuation != Attenuation::None;
        if positional && self.occlusion != OcclusionPolicy::Ignore {
            let blocks = self.occluders(world, &sound);
            if blocks > 0 {
                self.stats.occluded += 1;
                match self.occlusion {
                    OcclusionPolicy::Silence => {
                        self.stats.blocked += 1;
                        return PlayOutcome::blocked();
                    }
                    OcclusionPolicy::Attenuate { per_block } => {
                        let keep = (1.0 - per_block).clamp(0.0, 1.0);
                        volume *= keep.powi(blocks.min(i32::MAX as u32) as i32);
                    }
                    OcclusionPolicy::Ignore => {}
                }
            }
        }
        let base_volume = volume.clamp(0.0, 1.0);
        if base_volume < MIN_AUDIBLE_VOLUME {
            self.stats.blocked += 1;
            return PlayOutcome::blocked();
        }
        if self.backend.active_count() >= self.sound_limit {
            debug!(sound = %sound.sound, limit = self.sound_limit, "Sound limit reached");
            self.stats.blocked += 1;
            return PlayOutcome::blocked();
        }

        let volume = base_volume * distance_gain(self.listener, &sound);
        match self.backend.submit(&sound, volume) {
            Ok(handle) => {
                let state = if sound.is_delayed() {
                    SoundState::Delayed
                } else {
                    SoundState::Playing
                };
                trace!(%handle, %sound, volume, "Submitted");
                self.tracked.insert(
                    handle,
                    TrackedSound {
                        sound,
                        state,
                        base_volume,
                        volume,
                    },
                );
                self.stats.submitted += 1;
                PlayOutcome {
                    state,
                    handle: Some(handle),
                }
            }
            Err(err) => {
                debug!(sound = %sound.sound, %err, "Backend dropped sound");
                self.stats.errors += 1;
                PlayOutcome {
                    state: SoundState::Error,
                    handle: None,
                }
            }
        }
    }

    /// Request a stop. Delayed sounds finish immediately.
    pub fn stop(&mut self, handle: SoundHandle) {
        self.backend.stop(handle);
        if let Some(tracked) = self.tracked.get_mut(&handle) {
            tracked.state = if tracked.state == SoundState::Delayed {
                SoundState::Done
            } else {
                SoundState::Stopping
            };
        }
    }

    /// Stop everything the engine is tracking.
    pub fn stop_all(&mut self) {
        let handles: Vec<SoundHandle> = self.tracked.keys().copied().collect();
        for handle in handles {
            self.stop(handle);
        }
    }

    /// Last observed state. Sounds no longer tracked report
    /// [`SoundState::Done`].
    pub fn state(&self, handle: SoundHandle) -> SoundState {
        self.tracked
            .get(&handle)
            .map(|t| t.state)
            .unwrap_or(SoundState::Done)
    }

    /// True while the sound is playing, delayed or stopping.
    pub fn is_active(&self, handle: SoundHandle) -> bool {
        self.state(handle).is_active()
    }

    /// Advance the backend, refresh observed states, follow the listener
    /// with the distance falloff of live sounds and forget finished ones.
    pub fn tick(&mut self) {
        self.backend.tick();
        let listener = self.listener;
        let backend = &mut self.backend;
        for (handle, tracked) in self.tracked.iter_mut() {
            let observed = backend.state(*handle);
            tracked.state = match (tracked.state, observed) {
                (SoundState::Stopping, s) if s.is_active() => SoundState::Stopping,
                (SoundState::Done, _) => SoundState::Done,
                (_, s) => s,
            };
            if !matches!(tracked.state, SoundState::Playing | SoundState::Delayed) {
                continue;
            }
            let volume = tracked.base_volume * distance_gain(listener, &tracked.sound);
            if (volume - tracked.volume).abs() > VOLUME_EPSILON {
                backend.set_volume(*handle, volume);
                tracked.volume = volume;
            }
        }
        self.tracked.retain(|_, t| !t.state.is_terminal());
    }

    /// Sounds still tracked.
    pub fn tracked(&self) -> impl Iterator<Item = (&SoundHandle, &TrackedSound)> {
        self.tracked.iter()
    }

    /// Number of tracked sounds.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Counters since creation.
    pub fn stats(&self) -> AudioStats {
        self.stats
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::simulated(0)
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("backend", &self.backend.name())
            .field("listener", &self.listener)
            .field("occlusion", &self.occlusion)
            .field("tracked", &self.tracked.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdambient_core::RegistryKey;
    use mdambient_world::{SparseWorld, BLOCK_STONE};

    fn sound_at(pos: DVec3) -> SoundInstance {
        let mut s = SoundInstance::new(RegistryKey::local("hiss"), SoundCategory::Block);
        s.target = crate::SoundTarget::Position(pos);
        s
    }

    fn engine() -> AudioEngine {
        let mut engine = AudioEngine::simulated(1);
        engine.set_listener_position(DVec3::new(0.5, 64.5, 0.5));
        engine
    }

    #[test]
    fn range_check_respects_pad_and_global() {
        let listener = DVec3::ZERO;
        let mut s = sound_at(DVec3::new(16.0, 0.0, 0.0));
        assert!(!in_range(listener, &s, 0.0));
        assert!(in_range(listener, &s, 1.0));
        s.global = true;
        assert!(in_range(listener, &s, 0.0));
        s.global = false;
        s.attenuation = Attenuation::None;
        assert!(in_range(listener, &s, 0.0));
    }

    #[test]
    fn plays_and_finishes() {
        let world = SparseWorld::new();
        let mut engine = engine();
        let out = engine.play(sound_at(DVec3::new(3.5, 64.5, 0.5)), &world);
        assert_eq!(out.state, SoundState::Playing);
        let handle = out.handle.unwrap();
        for _ in 0..SimulatedBackend::DEFAULT_LENGTH {
            engine.tick();
        }
        assert_eq!(engine.state(handle), SoundState::Done);
        assert_eq!(engine.tracked_count(), 0);
        assert_eq!(engine.stats().submitted, 1);
    }

    #[test]
    fn silent_or_distant_sounds_are_blocked() {
        let world = SparseWorld::new();
        let mut engine = engine();
        let far = engine.play(sound_at(DVec3::new(100.0, 64.0, 0.0)), &world);
        assert_eq!(far.state, SoundState::Blocked);

        let mut quiet = sound_at(DVec3::new(1.0, 64.0, 0.0));
        quiet.volume = 0.0;
        assert_eq!(engine.play(quiet, &world).state, SoundState::Blocked);

        let mut settings = AudioSettings::default();
        settings.toggle_mute();
        engine.update_settings(settings);
        let muted = engine.play(sound_at(DVec3::new(1.0, 64.0, 0.0)), &world);
        assert_eq!(muted.state, SoundState::Blocked);
        assert_eq!(engine.stats().blocked, 3);
    }

    #[test]
    fn occlusion_policies() {
        let mut world = SparseWorld::new();
        world.set_block(BlockPos::new(2, 64, 0), BLOCK_STONE);
        let source = DVec3::new(4.5, 64.5, 0.5);

        let mut engine = engine();
        engine.set_occlusion(OcclusionPolicy::Ignore);
        let open = engine.play(sound_at(source), &world);
        let open_volume = engine.tracked().next().map(|(_, t)| t.volume).unwrap();
        assert_eq!(open.state, SoundState::Playing);

        let mut engine = self::engine();
        engine.set_occlusion(OcclusionPolicy::Attenuate { per_block: 0.5 });
        engine.play(sound_at(source), &world);
        let muffled = engine.tracked().next().map(|(_, t)| t.volume).unwrap();
        assert!((muffled - open_volume * 0.5).abs() < 1e-6);

        let mut engine = self::engine();
        engine.set_occlusion(OcclusionPolicy::Silence);
        assert_eq!(engine.play(sound_at(source), &world).state, SoundState::Blocked);
        assert_eq!(engine.stats().occluded, 1);
    }

    #[test]
    fn source_voxel_does_not_occlude_itself() {
        let mut world = SparseWorld::new();
        world.set_block(BlockPos::new(4, 64, 0), BLOCK_STONE);
        let mut engine = engine();
        engine.set_occlusion(OcclusionPolicy::Silence);
        let out = engine.play(sound_at(DVec3::new(4.5, 64.5, 0.5)), &world);
        assert_eq!(out.state, SoundState::Playing);
    }

    #[test]
    fn looping_sound_follows_the_listener() {
        let world = SparseWorld::new();
        let source = DVec3::new(0.5, 64.5, 15.5);
        let mut looping = sound_at(source);
        looping.repeat = true;

        let mut engine = engine();
        let handle = engine.play(looping, &world).handle.unwrap();
        let far = engine.tracked().next().map(|(_, t)| t.volume).unwrap();
        assert!(far > 0.0 && far < 0.1);

        engine.set_listener_position(DVec3::new(0.5, 64.5, 14.5));
        for _ in 0..200 {
            engine.tick();
        }
        assert!(engine.is_active(handle));
        let near = engine.tracked().next().map(|(_, t)| t.volume).unwrap();
        assert!(near > 0.9, "near volume {near}");
        assert!(near <= 1.0);
    }

    #[test]
    fn stopping_a_delayed_sound_finishes_it() {
        let world = SparseWorld::new();
        let mut engine = engine();
        let mut s = sound_at(DVec3::new(1.0, 64.0, 0.0));
        s.play_delay = 10;
        let handle = engine.play(s, &world).handle.unwrap();
        assert_eq!(engine.state(handle), SoundState::Delayed);
        engine.stop(handle);
        assert_eq!(engine.state(handle), SoundState::Done);

        let playing = engine.play(sound_at(DVec3::new(1.0, 64.0, 0.0)), &world).handle.unwrap();
        engine.stop(playing);
        assert_eq!(engine.state(playing), SoundState::Stopping);
        engine.tick();
        assert_eq!(engine.state(playing), SoundState::Done);
    }

    #[test]
    fn sound_limit_blocks_extra_sounds() {
        let world = SparseWorld::new();
        let mut engine = engine();
        engine.set_sound_limit(2);
        for _ in 0..2 {
            assert_eq!(
                engine.play(sound_at(DVec3::new(1.0, 64.0, 0.0)), &world).state,
                SoundState::Playing
            );
        }
        assert_eq!(
            engine.play(sound_at(DVec3::new(1.0, 64.0, 0.0)), &world).state,
            SoundState::Blocked
        );
    }

    #[test]
    fn backend_refusal_is_reported_not_raised() {
        let world = SparseWorld::new();
        let mut engine = AudioEngine::new(Box::new(SimulatedBackend::new(0).with_capacity(0)));
        let out = engine.play(sound_at(DVec3::new(0.0, 64.0, 0.0)), &world);
        assert_eq!(out.state, SoundState::Error);
        assert_eq!(engine.stats().errors, 1);
    }

    #[test]
    fn category_scale_clamps() {
        let mut engine = engine();
        engine.set_category_scale(SoundCategory::Block, 250);
        let mut s = sound_at(DVec3::ZERO);
        s.volume = 0.5;
        assert_eq!(engine.clamped_volume(&s), 0.5);
        engine.set_category_scale(SoundCategory::Block, 40);
        assert!((engine.clamped_volume(&s) - 0.2).abs() < 1e-6);
    }
}
