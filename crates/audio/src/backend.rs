//! Audio backends: where submitted sounds actually go.
//!
//! The engine only submits sounds and polls their state. Observed state may
//! lag the backend by a tick or more; nothing here blocks.

use crate::instance::{SoundHandle, SoundInstance, SoundState};
use crate::registry::SoundRegistry;
use crate::SoundCategory;
use mdambient_core::RegistryKey;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reason a backend refused a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No free voice.
    #[error("no free voice for `{0}`")]
    Full(RegistryKey),
    /// Nothing is loaded for the sound.
    #[error("no sound data for `{0}`")]
    MissingData(RegistryKey),
    /// The output device is gone or failed.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
}

/// Sink for sound submissions.
pub trait AudioBackend {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Start a sound at `volume` (already scaled and clamped by the engine).
    fn submit(&mut self, sound: &SoundInstance, volume: f32) -> Result<SoundHandle, BackendError>;

    /// Latest known state. Unknown handles report [`SoundState::Done`].
    fn state(&self, handle: SoundHandle) -> SoundState;

    /// Request a stop. Fire and forget.
    fn stop(&mut self, handle: SoundHandle);

    /// Change the volume of a submitted sound. Unknown handles are ignored.
    fn set_volume(&mut self, handle: SoundHandle, volume: f32);

    /// Listener-side gain for a category.
    fn set_volume_scale(&mut self, category: SoundCategory, scale: f32);

    /// Advance one tick.
    fn tick(&mut self);

    /// Sounds the backend is still holding.
    fn active_count(&self) -> usize;
}

/// A sound accepted by [`SimulatedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Handle issued for the sound
    pub handle: SoundHandle,
    /// The submitted instance
    pub sound: SoundInstance,
    /// Volume passed by the engine
    pub volume: f32,
}

#[derive(Debug, Clone)]
struct Voice {
    sound: SoundInstance,
    state: SoundState,
    volume: f32,
    delay: u32,
    remaining: u32,
    length: u32,
    reported: bool,
}

/// Deterministic in-memory backend.
///
/// Sounds advance `DELAYED -> PLAYING -> DONE` one tick at a time using clip
/// lengths from the sound registry. Repeating sounds go back to `DELAYED`
/// with a fresh delay drawn from their repeat range. A stop takes effect on
/// the next tick.
#[derive(Debug)]
pub struct SimulatedBackend {
    voices: BTreeMap<SoundHandle, Voice>,
    lengths: BTreeMap<RegistryKey, u32>,
    default_length: u32,
    capacity: usize,
    scales: BTreeMap<SoundCategory, f32>,
    next: u64,
    rng: StdRng,
    submissions: Vec<Submission>,
}

impl SimulatedBackend {
    /// Default clip length when a sound has no registry entry.
    pub const DEFAULT_LENGTH: u32 = 40;

    /// Backend with unlimited voices.
    pub fn new(seed: u64) -> Self {
        Self {
            voices: BTreeMap::new(),
            lengths: BTreeMap::new(),
            default_length: Self::DEFAULT_LENGTH,
            capacity: usize::MAX,
            scales: BTreeMap::new(),
            next: 1,
            rng: StdRng::seed_from_u64(seed),
            submissions: Vec::new(),
        }
    }

    /// Backend that takes clip lengths from registry metadata.
    pub fn from_registry(registry: &SoundRegistry, seed: u64) -> Self {
        let mut backend = Self::new(seed);
        backend.lengths = registry
            .iter()
            .map(|e| (e.key.clone(), e.length_ticks.max(1)))
            .collect();
        backend
    }

    /// Limit the number of simultaneous voices.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Accepted submissions, oldest first.
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Take the submission log.
    pub fn drain_submissions(&mut self) -> Vec<Submission> {
        std::mem::take(&mut self.submissions)
    }

    /// Current volume of a held sound.
    pub fn volume(&self, handle: SoundHandle) -> Option<f32> {
        self.voices.get(&handle).map(|v| v.volume)
    }

    /// Gain last set for a category (1 when never set).
    pub fn volume_scale(&self, category: SoundCategory) -> f32 {
        self.scales.get(&category).copied().unwrap_or(1.0)
    }

    fn draw_repeat_delay(&mut self, range: (u32, u32)) -> u32 {
        let (min, max) = range;
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }
}

impl AudioBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn submit(&mut self, sound: &SoundInstance, volume: f32) -> Result<SoundHandle, BackendError> {
        if self.active_count() >= self.capacity {
            return Err(BackendError::Full(sound.sound.clone()));
        }
        let handle = SoundHandle(self.next);
        self.next += 1;
        let length = self
            .lengths
            .get(&sound.sound)
            .copied()
            .unwrap_or(self.default_length);
        let state = if sound.play_delay > 0 {
            SoundState::Delayed
        } else {
            SoundState::Playing
        };
        self.voices.insert(
            handle,
            Voice {
                sound: sound.clone(),
                state,
                volume,
                delay: sound.play_delay,
                remaining: length,
                length,
                reported: false,
            },
        );
        self.submissions.push(Submission {
            handle,
            sound: sound.clone(),
            volume,
        });
        Ok(handle)
    }

    fn state(&self, handle: SoundHandle) -> SoundState {
        self.voices
            .get(&handle)
            .map(|v| v.state)
            .unwrap_or(SoundState::Done)
    }

    fn stop(&mut self, handle: SoundHandle) {
        if let Some(voice) = self.voices.get_mut(&handle) {
            voice.state = SoundState::Stopping;
        }
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: f32) {
        if let Some(voice) = self.voices.get_mut(&handle) {
            voice.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn set_volume_scale(&mut self, category: SoundCategory, scale: f32) {
        self.scales.insert(category, scale.clamp(0.0, 1.0));
    }

    fn tick(&mut self) {
        // Done voices stay observable for one tick, then are forgotten.
        self.voices.retain(|_, v| !v.reported);
        let mut repeats = Vec::new();
        for (handle, voice) in self.voices.iter_mut() {
            match voice.state {
                SoundState::Delayed => {
                    voice.delay = voice.delay.saturating_sub(1);
                    if voice.delay == 0 {
                        voice.state = SoundState::Playing;
                        voice.remaining = voice.length;
                    }
                }
                SoundState::Playing => {
                    voice.remaining = voice.remaining.saturating_sub(1);
                    if voice.remaining == 0 {
                        if voice.sound.repeat {
                            repeats.push((*handle, voice.sound.repeat_delay_range));
                        } else {
                            voice.state = SoundState::Done;
                        }
                    }
                }
                SoundState::Stopping => voice.state = SoundState::Done,
                _ => {}
            }
        }
        for (handle, range) in repeats {
            let delay = self.draw_repeat_delay(range);
            if let Some(voice) = self.voices.get_mut(&handle) {
                voice.remaining = voice.length;
                if delay > 0 {
                    voice.state = SoundState::Delayed;
                    voice.delay = delay;
                }
            }
        }
        for voice in self.voices.values_mut() {
            voice.reported = voice.state == SoundState::Done;
        }
    }

    fn active_count(&self) -> usize {
        self.voices.values().filter(|v| v.state.is_active()).count()
    }
}

#[cfg(feature = "rodio_backend")]
pub use rodio_impl::RodioBackend;

#[cfg(feature = "rodio_backend")]
mod rodio_impl {
    use super::*;
    use anyhow::{Context, Result};
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::debug;

    const TICK: Duration = Duration::from_millis(50);

    struct Playback {
        sink: Sink,
        category: SoundCategory,
        volume: f32,
        delay: u32,
        stopping: bool,
    }

    /// Plays loaded sound data through the default output device.
    pub struct RodioBackend {
        _stream: OutputStream,
        stream_handle: OutputStreamHandle,
        data: HashMap<RegistryKey, Arc<[u8]>>,
        playing: BTreeMap<SoundHandle, Playback>,
        scales: BTreeMap<SoundCategory, f32>,
        next: u64,
    }

    impl RodioBackend {
        /// Open the default output device.
        pub fn new() -> Result<Self> {
            let (stream, stream_handle) =
                OutputStream::try_default().context("Failed to create audio output stream")?;
            debug!("Rodio backend initialized");
            Ok(Self {
                _stream: stream,
                stream_handle,
                data: HashMap::new(),
                playing: BTreeMap::new(),
                scales: BTreeMap::new(),
                next: 1,
            })
        }

        /// Register encoded audio (wav/ogg) for a sound.
        pub fn load_sound(&mut self, key: RegistryKey, bytes: Vec<u8>) {
            debug!(sound = %key, bytes = bytes.len(), "Loaded sound");
            self.data.insert(key, bytes.into());
        }

        fn scale(&self, category: SoundCategory) -> f32 {
            self.scales.get(&category).copied().unwrap_or(1.0)
        }

        fn scale_of(&self, handle: SoundHandle) -> f32 {
            self.playing
                .get(&handle)
                .map_or(1.0, |p| self.scale(p.category))
        }
    }

    impl AudioBackend for RodioBackend {
        fn name(&self) -> &'static str {
            "rodio"
        }

        fn submit(&mut self, sound: &SoundInstance, volume: f32) -> Result<SoundHandle, BackendError> {
            let bytes = self
                .data
                .get(&sound.sound)
                .ok_or_else(|| BackendError::MissingData(sound.sound.clone()))?;
            let source = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
                .map_err(|e| BackendError::Unavailable(e.to_string()))?
                .speed(sound.pitch)
                .delay(TICK * sound.play_delay);
            let sink = Sink::try_new(&self.stream_handle)
                .map_err(|e| BackendError::Unavailable(e.to_string()))?;
            sink.set_volume(volume * self.scale(sound.category));
            // Repeat delays are not modelled here; repeating sounds loop back to back.
            if sound.repeat {
                sink.append(source.buffered().repeat_infinite());
            } else {
                sink.append(source);
            }

            let handle = SoundHandle(self.next);
            self.next += 1;
            self.playing.insert(
                handle,
                Playback {
                    sink,
                    category: sound.category,
                    volume,
                    delay: sound.play_delay,
                    stopping: false,
                },
            );
            Ok(handle)
        }

        fn state(&self, handle: SoundHandle) -> SoundState {
            match self.playing.get(&handle) {
                None => SoundState::Done,
                Some(p) if p.stopping => SoundState::Stopping,
                Some(p) if p.sink.empty() => SoundState::Done,
                Some(p) if p.delay > 0 => SoundState::Delayed,
                Some(_) => SoundState::Playing,
            }
        }

        fn stop(&mut self, handle: SoundHandle) {
            if let Some(p) = self.playing.get_mut(&handle) {
                p.sink.stop();
                p.stopping = true;
            }
        }

        fn set_volume(&mut self, handle: SoundHandle, volume: f32) {
            let scale = self.scale_of(handle);
            if let Some(p) = self.playing.get_mut(&handle) {
                p.volume = volume;
                p.sink.set_volume(volume * scale);
            }
        }

        fn set_volume_scale(&mut self, category: SoundCategory, scale: f32) {
            let scale = scale.clamp(0.0, 1.0);
            self.scales.insert(category, scale);
            for p in self.playing.values().filter(|p| p.category == category) {
                p.sink.set_volume(p.volume * scale);
            }
        }

        fn tick(&mut self) {
            self.playing.retain(|_, p| !p.stopping && !p.sink.empty());
            for p in self.playing.values_mut() {
                p.delay = p.delay.saturating_sub(1);
            }
        }

        fn active_count(&self) -> usize {
            self.playing.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SoundEvent;

    fn sound(path: &'static str) -> SoundInstance {
        SoundInstance::new(RegistryKey::local(path), SoundCategory::Block)
    }

    #[test]
    fn plays_for_clip_length_then_finishes() {
        let mut registry = SoundRegistry::new();
        let mut event = SoundEvent::new(RegistryKey::local("pop"));
        event.length_ticks = 3;
        registry.register(event);
        let mut backend = SimulatedBackend::from_registry(&registry, 1);

        let h = backend.submit(&sound("pop"), 1.0).unwrap();
        assert_eq!(backend.state(h), SoundState::Playing);
        backend.tick();
        backend.tick();
        assert_eq!(backend.state(h), SoundState::Playing);
        backend.tick();
        assert_eq!(backend.state(h), SoundState::Done);
        backend.tick();
        assert_eq!(backend.state(h), SoundState::Done);
        assert_eq!(backend.active_count(), 0);
    }

    #[test]
    fn delayed_sounds_wait() {
        let mut backend = SimulatedBackend::new(1);
        let mut s = sound("later");
        s.play_delay = 2;
        let h = backend.submit(&s, 1.0).unwrap();
        assert_eq!(backend.state(h), SoundState::Delayed);
        backend.tick();
        assert_eq!(backend.state(h), SoundState::Delayed);
        backend.tick();
        assert_eq!(backend.state(h), SoundState::Playing);
    }

    #[test]
    fn repeating_sounds_redelay() {
        let mut registry = SoundRegistry::new();
        let mut event = SoundEvent::new(RegistryKey::local("loop"));
        event.length_ticks = 1;
        registry.register(event);
        let mut backend = SimulatedBackend::from_registry(&registry, 9);
        let mut s = sound("loop");
        s.repeat = true;
        s.repeat_delay_range = (2, 4);
        let h = backend.submit(&s, 1.0).unwrap();
        backend.tick();
        assert_eq!(backend.state(h), SoundState::Delayed);
        for _ in 0..4 {
            backend.tick();
        }
        assert!(backend.state(h).is_active());
    }

    #[test]
    fn stop_is_observed_next_tick() {
        let mut backend = SimulatedBackend::new(1);
        let h = backend.submit(&sound("hiss"), 1.0).unwrap();
        backend.stop(h);
        assert_eq!(backend.state(h), SoundState::Stopping);
        backend.tick();
        assert_eq!(backend.state(h), SoundState::Done);
    }

    #[test]
    fn capacity_rejects_overflow() {
        let mut backend = SimulatedBackend::new(1).with_capacity(1);
        backend.submit(&sound("a"), 1.0).unwrap();
        assert_eq!(
            backend.submit(&sound("b"), 1.0),
            Err(BackendError::Full(RegistryKey::local("b")))
        );
        assert_eq!(backend.submissions().len(), 1);
    }
}
