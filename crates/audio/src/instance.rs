//! Concrete, positioned sound instances and their lifecycle state.

use crate::SoundCategory;
use glam::DVec3;
use mdambient_core::{EntityId, RegistryKey};
use std::fmt;

/// Lifecycle of a submitted sound as observed by the engine.
///
/// Observation may lag the backend by one or more ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoundState {
    /// Built but never submitted.
    #[default]
    None,
    /// Submission in progress.
    Queuing,
    /// Audible.
    Playing,
    /// Waiting out a play or repeat delay.
    Delayed,
    /// Stop requested; the backend has not confirmed yet.
    Stopping,
    /// Finished normally or after a stop.
    Done,
    /// Dropped before playing (out of range, occluded, silent, no room).
    Blocked,
    /// The backend substituted another sound.
    Replaced,
    /// The backend rejected the sound.
    Error,
}

impl SoundState {
    /// The backend is still holding the sound.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            SoundState::Playing | SoundState::Delayed | SoundState::Stopping
        )
    }

    /// No further transitions will happen.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            SoundState::Queuing
                | SoundState::Done
                | SoundState::Blocked
                | SoundState::Replaced
                | SoundState::Error
        )
    }
}

/// Distance model applied by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Attenuation {
    /// Same loudness everywhere.
    None,
    /// Fades linearly to silence at the sound's attenuation distance.
    #[default]
    Linear,
}

/// Where a sound is emitted from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundTarget {
    /// Fixed world position.
    Position(DVec3),
    /// Follows an entity; `position` is its location at build time.
    Entity {
        /// Entity the sound is attached to
        id: EntityId,
        /// Entity position when the sound was built
        position: DVec3,
    },
    /// Non-positional ambience.
    Background,
}

impl SoundTarget {
    /// Current emission point; background sounds report the origin.
    pub fn position(&self) -> DVec3 {
        match *self {
            SoundTarget::Position(p) => p,
            SoundTarget::Entity { position, .. } => position,
            SoundTarget::Background => DVec3::ZERO,
        }
    }
}

/// Opaque handle for a submitted sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundHandle(pub u64);

impl fmt::Display for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// A configured but unstarted sound.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundInstance {
    /// Sound resource to play
    pub sound: RegistryKey,
    /// Mixer category
    pub category: SoundCategory,
    /// Emission point
    pub target: SoundTarget,
    /// Base volume before category scaling
    pub volume: f32,
    /// Playback pitch
    pub pitch: f32,
    /// Distance model
    pub attenuation: Attenuation,
    /// Audible distance for [`Attenuation::Linear`]
    pub attenuation_distance: u32,
    /// Plays relative to the listener, ignoring position
    pub global: bool,
    /// Restarts after finishing
    pub repeat: bool,
    /// Ticks to wait before the first repeat
    pub repeat_delay: u32,
    /// Range a fresh repeat delay is drawn from on each natural end
    pub repeat_delay_range: (u32, u32),
    /// Ticks to wait before first playing
    pub play_delay: u32,
    /// A music fader may mute this sound
    pub can_mute: bool,
}

impl SoundInstance {
    /// Unpositioned instance with neutral defaults.
    pub fn new(sound: RegistryKey, category: SoundCategory) -> Self {
        Self {
            sound,
            category,
            target: SoundTarget::Position(DVec3::ZERO),
            volume: 1.0,
            pitch: 1.0,
            attenuation: Attenuation::Linear,
            attenuation_distance: crate::registry::DEFAULT_ATTENUATION_DISTANCE,
            global: false,
            repeat: false,
            repeat_delay: 0,
            repeat_delay_range: (0, 0),
            play_delay: 0,
            can_mute: category.can_mute(),
        }
    }

    /// Emission point.
    pub fn position(&self) -> DVec3 {
        self.target.position()
    }

    /// True when the first play waits on a delay.
    pub fn is_delayed(&self) -> bool {
        self.play_delay > 0
    }
}

impl fmt::Display for SoundInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position();
        write!(
            f,
            "{} [{}] v={:.2} p={:.2} at ({:.1}, {:.1}, {:.1})",
            self.sound, self.category, self.volume, self.pitch, p.x, p.y, p.z
        )
    }
}
