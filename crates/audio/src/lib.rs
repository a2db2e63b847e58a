//! Acoustics and sound playback for mdambient.
//!
//! Turns symbolic sound names into randomized, positioned sound instances and
//! submits them to an audio backend with range, occlusion and volume gating.
//!
//! # Architecture
//!
//! - [`AcousticLibrary`] - Resolves names and composite definitions into shared [`Acoustic`]s
//! - [`SoundBuilder`] - Template that draws volume, pitch and repeat delay per instance
//! - [`AudioEngine`] - Submits [`SoundInstance`]s to an [`AudioBackend`] and tracks their state
//! - [`AudioSettings`] - Master and per-category volume controls
//!
//! The default backend is [`SimulatedBackend`]. Real playback through rodio is
//! available with the `rodio_backend` feature.
//!
//! # Example
//!
//! ```ignore
//! let mut library = AcousticLibrary::from_registry(SoundRegistry::with_defaults());
//! let fire = library.resolve("mdambient", "@block.fire.ambient");
//! for sound in fire.collect(AcousticEvent::None, &PlayTarget::At(pos), &flags, &mut rng) {
//!     audio.play(sound, &world);
//! }
//! ```

#![warn(missing_docs)]

mod acoustic;
mod backend;
mod builder;
mod category;
mod compiler;
mod engine;
mod instance;
mod library;
mod registry;
mod settings;

pub use acoustic::{
    Acoustic, AcousticEvent, AcousticFactory, AcousticKind, PlayTarget, WeightedAcoustic,
};
#[cfg(feature = "rodio_backend")]
pub use backend::RodioBackend;
pub use backend::{AudioBackend, BackendError, SimulatedBackend, Submission};
pub use builder::SoundBuilder;
pub use category::SoundCategory;
pub use compiler::{AcousticCompiler, AcousticError, DEFAULT_DELAY, DEFAULT_PITCH, DEFAULT_VOLUME};
pub use engine::{
    distance_gain, in_range, AudioEngine, AudioStats, OcclusionPolicy, PlayOutcome, TrackedSound,
    DEFAULT_SOUND_LIMIT, MIN_AUDIBLE_VOLUME,
};
pub use instance::{Attenuation, SoundHandle, SoundInstance, SoundState, SoundTarget};
pub use library::AcousticLibrary;
pub use registry::{SoundEvent, SoundRegistry, DEFAULT_ATTENUATION_DISTANCE};
pub use settings::AudioSettings;
