//! Randomized construction of [`SoundInstance`]s.

use crate::instance::{Attenuation, SoundInstance, SoundTarget};
use crate::registry::{SoundRegistry, DEFAULT_ATTENUATION_DISTANCE};
use crate::SoundCategory;
use glam::DVec3;
use mdambient_core::{EntityId, RegistryKey};
use mdambient_world::BlockPos;
use rand::Rng;

/// Multipliers applied to a fixed volume or pitch when the builder is
/// variable. Biased upward.
const VARIANCE: [f32; 6] = [-0.2, 0.0, 0.0, 0.2, 0.2, 0.2];

/// Template for sound instances. Building draws fresh random parameters each
/// time and has no other side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundBuilder {
    sound: RegistryKey,
    category: SoundCategory,
    position: DVec3,
    attenuation: Attenuation,
    attenuation_distance: u32,
    volume: (f32, f32),
    pitch: (f32, f32),
    repeatable: bool,
    repeat_delay: (u32, u32),
    global: bool,
    can_mute: bool,
    variable: bool,
}

impl SoundBuilder {
    /// Builder for `sound` in the ambient category.
    pub fn new(sound: RegistryKey) -> Self {
        Self::with_category(sound, SoundCategory::Ambient)
    }

    /// Builder for `sound` in `category`.
    pub fn with_category(sound: RegistryKey, category: SoundCategory) -> Self {
        Self {
            sound,
            category,
            position: DVec3::ZERO,
            attenuation: Attenuation::Linear,
            attenuation_distance: DEFAULT_ATTENUATION_DISTANCE,
            volume: (1.0, 1.0),
            pitch: (1.0, 1.0),
            repeatable: false,
            repeat_delay: (0, 0),
            global: false,
            can_mute: category.can_mute(),
            variable: false,
        }
    }

    /// Builder whose category and attenuation distance come from the sound's
    /// registry metadata, falling back to `default_category`.
    pub fn registered(
        registry: &SoundRegistry,
        sound: RegistryKey,
        default_category: SoundCategory,
    ) -> Self {
        let category = registry.category_of(&sound, default_category);
        let distance = registry.attenuation_distance(&sound);
        let mut builder = Self::with_category(sound, category);
        builder.attenuation_distance = distance;
        builder
    }

    /// Sound resource this builder plays.
    pub fn sound(&self) -> &RegistryKey {
        &self.sound
    }

    /// Current category.
    pub fn category(&self) -> SoundCategory {
        self.category
    }

    /// Override the category.
    pub fn set_category(&mut self, category: SoundCategory) -> &mut Self {
        self.category = category;
        self
    }

    /// Emit from a world position.
    pub fn set_position(&mut self, position: DVec3) -> &mut Self {
        self.position = position;
        self
    }

    /// Emit from the center of a voxel.
    pub fn set_block_position(&mut self, pos: BlockPos) -> &mut Self {
        self.set_position(pos.center())
    }

    /// Volume drawn uniformly from the range (order of the bounds is irrelevant).
    pub fn set_volume_range(&mut self, a: f32, b: f32) -> &mut Self {
        self.volume = (a.min(b), a.max(b));
        self
    }

    /// Fixed volume.
    pub fn set_volume(&mut self, v: f32) -> &mut Self {
        self.volume = (v, v);
        self
    }

    /// Pitch drawn uniformly from the range.
    pub fn set_pitch_range(&mut self, a: f32, b: f32) -> &mut Self {
        self.pitch = (a.min(b), a.max(b));
        self
    }

    /// Fixed pitch.
    pub fn set_pitch(&mut self, p: f32) -> &mut Self {
        self.pitch = (p, p);
        self
    }

    /// Repeat with a delay drawn from the range; enables repeating.
    pub fn set_repeat_delay_range(&mut self, a: u32, b: u32) -> &mut Self {
        self.repeatable = true;
        self.repeat_delay = (a.min(b), a.max(b));
        self
    }

    /// Repeat with a fixed delay; enables repeating.
    pub fn set_repeat_delay(&mut self, delay: u32) -> &mut Self {
        self.set_repeat_delay_range(delay, delay)
    }

    /// Play relative to the listener instead of at a position.
    pub fn set_global(&mut self, global: bool) -> &mut Self {
        self.global = global;
        self
    }

    /// Distance model.
    pub fn set_attenuation(&mut self, attenuation: Attenuation) -> &mut Self {
        self.attenuation = attenuation;
        self
    }

    /// Audible distance for linear attenuation.
    pub fn set_attenuation_distance(&mut self, distance: u32) -> &mut Self {
        self.attenuation_distance = distance;
        self
    }

    /// Allow a music fader to mute the sound.
    pub fn set_can_mute(&mut self, can_mute: bool) -> &mut Self {
        self.can_mute = can_mute;
        self
    }

    /// Jitter fixed volume and pitch by a small discrete amount.
    pub fn set_variable(&mut self, variable: bool) -> &mut Self {
        self.variable = variable;
        self
    }

    /// Configured volume bounds.
    pub fn volume_range(&self) -> (f32, f32) {
        self.volume
    }

    /// Configured pitch bounds.
    pub fn pitch_range(&self) -> (f32, f32) {
        self.pitch
    }

    fn draw<R: Rng + ?Sized>(&self, (min, max): (f32, f32), rng: &mut R) -> f32 {
        if min == max {
            if self.variable {
                min * (1.0 + VARIANCE[rng.gen_range(0..VARIANCE.len())])
            } else {
                min
            }
        } else {
            (min + rng.gen::<f32>() * (max - min)).clamp(min, max)
        }
    }

    fn draw_repeat_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let (min, max) = self.repeat_delay;
        if min == max {
            min
        } else {
            rng.gen_range(min..=max)
        }
    }

    /// Build an instance at the configured position.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> SoundInstance {
        self.build_target(SoundTarget::Position(self.position), rng)
    }

    /// Build an instance that follows an entity.
    pub fn build_for_entity<R: Rng + ?Sized>(
        &self,
        entity: EntityId,
        position: DVec3,
        rng: &mut R,
    ) -> SoundInstance {
        self.build_target(
            SoundTarget::Entity {
                id: entity,
                position,
            },
            rng,
        )
    }

    /// Build an instance for an explicit target.
    pub fn build_target<R: Rng + ?Sized>(&self, target: SoundTarget, rng: &mut R) -> SoundInstance {
        let mut sound = SoundInstance::new(self.sound.clone(), self.category);
        sound.volume = self.draw(self.volume, rng);
        sound.pitch = self.draw(self.pitch, rng);
        sound.repeat = self.repeatable;
        sound.repeat_delay = self.draw_repeat_delay(rng);
        sound.repeat_delay_range = self.repeat_delay;
        sound.global = self.global;
        sound.can_mute = self.can_mute;
        sound.attenuation_distance = self.attenuation_distance;
        if self.global || target == SoundTarget::Background {
            sound.attenuation = Attenuation::None;
        } else {
            sound.attenuation = self.attenuation;
        }
        sound.target = target;
        sound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn builder() -> SoundBuilder {
        SoundBuilder::new(RegistryKey::local("waterfall/3"))
    }

    #[test]
    fn ranges_are_normalized() {
        let mut b = builder();
        b.set_volume_range(0.8, 0.2).set_pitch_range(1.2, 0.9);
        assert_eq!(b.volume_range(), (0.2, 0.8));
        assert_eq!(b.pitch_range(), (0.9, 1.2));
    }

    #[test]
    fn fixed_values_are_exact_unless_variable() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut b = builder();
        b.set_volume(0.5).set_pitch(1.0);
        for _ in 0..50 {
            let s = b.build(&mut rng);
            assert_eq!(s.volume, 0.5);
            assert_eq!(s.pitch, 1.0);
        }

        b.set_variable(true);
        let allowed = [0.4, 0.5, 0.6];
        for _ in 0..200 {
            let s = b.build(&mut rng);
            assert!(allowed.iter().any(|a| (a - s.volume).abs() < 1e-6), "{}", s.volume);
        }
    }

    #[test]
    fn global_sounds_are_not_attenuated() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut b = builder();
        b.set_global(true).set_position(DVec3::new(3.0, 4.0, 5.0));
        let s = b.build(&mut rng);
        assert_eq!(s.attenuation, Attenuation::None);
        assert!(s.global);
    }

    #[test]
    fn block_position_uses_center() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut b = builder();
        b.set_block_position(BlockPos::new(10, 64, -2));
        assert_eq!(b.build(&mut rng).position(), DVec3::new(10.5, 64.5, -1.5));
    }

    #[test]
    fn repeat_delay_is_inclusive() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut b = builder();
        b.set_repeat_delay_range(5, 2);
        let mut seen = [false; 6];
        for _ in 0..500 {
            let s = b.build(&mut rng);
            assert!(s.repeat);
            assert!((2..=5).contains(&s.repeat_delay));
            seen[s.repeat_delay as usize] = true;
        }
        assert!(seen[2] && seen[5]);
    }

    #[test]
    fn entity_sounds_track_entity() {
        let mut rng = StdRng::seed_from_u64(5);
        let s = builder().build_for_entity(EntityId(7), DVec3::new(1.0, 2.0, 3.0), &mut rng);
        assert_eq!(
            s.target,
            SoundTarget::Entity {
                id: EntityId(7),
                position: DVec3::new(1.0, 2.0, 3.0)
            }
        );
    }
}
