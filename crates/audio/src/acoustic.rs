//! Acoustics: named rules that turn a play request into sound instances.

use crate::builder::SoundBuilder;
use crate::instance::{Attenuation, SoundInstance, SoundTarget};
use crate::SoundCategory;
use glam::DVec3;
use mdambient_core::{Condition, ConditionFlags, EntityId, RegistryKey};
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Maximum per-axis offset (exclusive) used by "play near" requests.
const NEAR_RANGE: i32 = 12;

/// Logical moment an acoustic is played for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AcousticEvent {
    /// No particular event.
    None,
    /// Normal walking stride.
    Walk,
    /// Slow, aimless movement.
    Wander,
    /// Swimming stroke.
    Swim,
    /// Sprinting stride; falls back to [`AcousticEvent::Walk`].
    Run,
    /// Leaving the ground; falls back to [`AcousticEvent::Wander`].
    Jump,
    /// Hitting the ground; falls back to [`AcousticEvent::Run`].
    Land,
    /// Ladder step; falls back to [`AcousticEvent::Walk`].
    Climb,
    /// Fast ladder step; falls back to [`AcousticEvent::Run`].
    ClimbRun,
    /// Arm swing.
    Swing,
    /// Item use (drawing a bow, raising a shield).
    Use,
    /// Item equipped.
    Equip,
}

impl AcousticEvent {
    /// All events.
    pub const ALL: [AcousticEvent; 12] = [
        AcousticEvent::None,
        AcousticEvent::Walk,
        AcousticEvent::Wander,
        AcousticEvent::Swim,
        AcousticEvent::Run,
        AcousticEvent::Jump,
        AcousticEvent::Land,
        AcousticEvent::Climb,
        AcousticEvent::ClimbRun,
        AcousticEvent::Swing,
        AcousticEvent::Use,
        AcousticEvent::Equip,
    ];

    /// Configuration name.
    pub const fn as_str(self) -> &'static str {
        match self {
            AcousticEvent::None => "none",
            AcousticEvent::Walk => "walk",
            AcousticEvent::Wander => "wander",
            AcousticEvent::Swim => "swim",
            AcousticEvent::Run => "run",
            AcousticEvent::Jump => "jump",
            AcousticEvent::Land => "land",
            AcousticEvent::Climb => "climb",
            AcousticEvent::ClimbRun => "climb_run",
            AcousticEvent::Swing => "swing",
            AcousticEvent::Use => "use",
            AcousticEvent::Equip => "equip",
        }
    }

    /// Event to try when an event selector has no entry for this one. Only
    /// one level of fallback is attempted.
    pub const fn transition(self) -> Option<AcousticEvent> {
        match self {
            AcousticEvent::Run | AcousticEvent::Climb => Some(AcousticEvent::Walk),
            AcousticEvent::Jump => Some(AcousticEvent::Wander),
            AcousticEvent::Land | AcousticEvent::ClimbRun => Some(AcousticEvent::Run),
            _ => None,
        }
    }

    /// Look up an event by configuration name; namespaces are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.rsplit(':').next().unwrap_or(name);
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

/// Where a play request should put its sounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayTarget {
    /// Non-attenuated, unpositioned sound.
    Global,
    /// Fixed world position.
    At(DVec3),
    /// Random point within a few blocks of an entity's eyes.
    Near {
        /// Entity the sound is played around
        entity: EntityId,
        /// Entity eye position
        eye: DVec3,
    },
    /// Attached to an entity.
    Attached {
        /// Entity that carries the sound
        entity: EntityId,
        /// Entity position
        position: DVec3,
    },
    /// Background ambience.
    Background,
}

/// Produces concrete sound instances from a [`SoundBuilder`] template.
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticFactory {
    builder: SoundBuilder,
}

impl AcousticFactory {
    /// Wrap a builder.
    pub fn new(builder: SoundBuilder) -> Self {
        Self { builder }
    }

    /// Template used by this factory.
    pub fn builder(&self) -> &SoundBuilder {
        &self.builder
    }

    /// Mutable template.
    pub fn builder_mut(&mut self) -> &mut SoundBuilder {
        &mut self.builder
    }

    /// Non-attenuated sound at the origin.
    pub fn create_sound<R: Rng + ?Sized>(&self, rng: &mut R) -> SoundInstance {
        let mut copy = self.builder.clone();
        copy.set_attenuation(Attenuation::None)
            .set_position(DVec3::ZERO);
        copy.build(rng)
    }

    /// Sound at a world position.
    pub fn create_sound_at<R: Rng + ?Sized>(&self, pos: DVec3, rng: &mut R) -> SoundInstance {
        self.builder
            .build_target(SoundTarget::Position(pos), rng)
    }

    /// Sound at a random point around an eye position, offset by
    /// `rand(12) - rand(12)` blocks per axis.
    pub fn create_sound_near<R: Rng + ?Sized>(&self, eye: DVec3, rng: &mut R) -> SoundInstance {
        let mut offset = || f64::from(rng.gen_range(0..NEAR_RANGE) - rng.gen_range(0..NEAR_RANGE));
        let pos = eye + DVec3::new(offset(), offset(), offset());
        self.create_sound_at(pos, rng)
    }

    /// Sound that follows an entity.
    pub fn attach_sound<R: Rng + ?Sized>(
        &self,
        entity: EntityId,
        position: DVec3,
        rng: &mut R,
    ) -> SoundInstance {
        self.builder.build_for_entity(entity, position, rng)
    }

    /// Non-attenuated ambience in the ambient category.
    pub fn create_background_sound<R: Rng + ?Sized>(&self, rng: &mut R) -> SoundInstance {
        let mut copy = self.builder.clone();
        copy.set_attenuation(Attenuation::None)
            .set_position(DVec3::ZERO)
            .set_category(SoundCategory::Ambient);
        copy.build_target(SoundTarget::Background, rng)
    }

    /// Build for a play target.
    pub fn create<R: Rng + ?Sized>(&self, target: &PlayTarget, rng: &mut R) -> SoundInstance {
        match *target {
            PlayTarget::Global => self.create_sound(rng),
            PlayTarget::At(pos) => self.create_sound_at(pos, rng),
            PlayTarget::Near { eye, .. } => self.create_sound_near(eye, rng),
            PlayTarget::Attached { entity, position } => self.attach_sound(entity, position, rng),
            PlayTarget::Background => self.create_background_sound(rng),
        }
    }
}

/// Weighted child of a probability acoustic.
#[derive(Debug, Clone)]
pub struct WeightedAcoustic {
    /// Relative weight
    pub weight: u32,
    /// Entry only takes part while this holds
    pub condition: Condition,
    /// Child acoustic
    pub acoustic: Arc<Acoustic>,
}

/// Behaviour of an acoustic.
#[derive(Debug, Clone)]
pub enum AcousticKind {
    /// Plays nothing.
    Null,
    /// Plays one sound.
    Simple(AcousticFactory),
    /// Plays one sound after a random delay in `[min, max)` ticks.
    Delayed {
        /// Sound template
        factory: AcousticFactory,
        /// Minimum delay in ticks
        delay_min: u32,
        /// Maximum delay in ticks; zero disables the delay
        delay_max: u32,
    },
    /// Plays every child.
    Simultaneous(Vec<Arc<Acoustic>>),
    /// Plays one child chosen by weight among those whose condition holds.
    Probability(Vec<WeightedAcoustic>),
    /// Plays the child mapped to the requested event.
    EventSelector(BTreeMap<AcousticEvent, Arc<Acoustic>>),
}

/// A named acoustic. Immutable once built and shared by reference.
#[derive(Debug, Clone)]
pub struct Acoustic {
    name: RegistryKey,
    kind: AcousticKind,
}

impl Acoustic {
    /// Build from parts.
    pub fn new(name: RegistryKey, kind: AcousticKind) -> Self {
        let kind = match kind {
            AcousticKind::Simultaneous(children) => AcousticKind::Simultaneous(
                children.into_iter().filter(|c| !c.is_null()).collect(),
            ),
            other => other,
        };
        Self { name, kind }
    }

    /// The acoustic that plays nothing.
    pub fn null() -> Self {
        Self {
            name: RegistryKey::local("null_acoustic"),
            kind: AcousticKind::Null,
        }
    }

    /// Single-sound acoustic named after its sound.
    pub fn simple(builder: SoundBuilder) -> Self {
        Self {
            name: builder.sound().clone(),
            kind: AcousticKind::Simple(AcousticFactory::new(builder)),
        }
    }

    /// Acoustic name.
    pub fn name(&self) -> &RegistryKey {
        &self.name
    }

    /// Behaviour.
    pub fn kind(&self) -> &AcousticKind {
        &self.kind
    }

    /// True for the null acoustic.
    pub fn is_null(&self) -> bool {
        matches!(self.kind, AcousticKind::Null)
    }

    fn select<'a, R: Rng + ?Sized>(
        entries: &'a [WeightedAcoustic],
        flags: &ConditionFlags,
        rng: &mut R,
    ) -> Option<&'a Arc<Acoustic>> {
        let total: u32 = entries
            .iter()
            .filter(|e| e.condition.evaluate(flags))
            .map(|e| e.weight)
            .sum();
        if total == 0 {
            return None;
        }
        let mut target = rng.gen_range(0..total);
        for entry in entries.iter().filter(|e| e.condition.evaluate(flags)) {
            if target < entry.weight {
                return Some(&entry.acoustic);
            }
            target -= entry.weight;
        }
        None
    }

    fn resolve_event(
        map: &BTreeMap<AcousticEvent, Arc<Acoustic>>,
        event: AcousticEvent,
    ) -> Option<&Arc<Acoustic>> {
        map.get(&event)
            .or_else(|| event.transition().and_then(|t| map.get(&t)))
    }

    /// Append the sounds this acoustic produces for a request to `out`.
    pub fn sounds<R: Rng + ?Sized>(
        &self,
        event: AcousticEvent,
        target: &PlayTarget,
        flags: &ConditionFlags,
        rng: &mut R,
        out: &mut Vec<SoundInstance>,
    ) {
        match &self.kind {
            AcousticKind::Null => {}
            AcousticKind::Simple(factory) => out.push(factory.create(target, rng)),
            AcousticKind::Delayed {
                factory,
                delay_min,
                delay_max,
            } => {
                let mut sound = factory.create(target, rng);
                if *delay_max > 0 {
                    let mut delay = *delay_min;
                    if delay_max > delay_min {
                        delay += rng.gen_range(0..delay_max - delay_min);
                    }
                    sound.play_delay = delay;
                }
                out.push(sound);
            }
            AcousticKind::Simultaneous(children) => {
                for child in children {
                    child.sounds(event, target, flags, rng, out);
                }
            }
            AcousticKind::Probability(entries) => {
                if let Some(child) = Self::select(entries, flags, rng) {
                    child.sounds(event, target, flags, rng, out);
                }
            }
            AcousticKind::EventSelector(map) => {
                if let Some(child) = Self::resolve_event(map, event) {
                    child.sounds(AcousticEvent::None, target, flags, rng, out);
                }
            }
        }
    }

    /// Convenience wrapper around [`Acoustic::sounds`].
    pub fn collect<R: Rng + ?Sized>(
        &self,
        event: AcousticEvent,
        target: &PlayTarget,
        flags: &ConditionFlags,
        rng: &mut R,
    ) -> Vec<SoundInstance> {
        let mut out = Vec::new();
        self.sounds(event, target, flags, rng, &mut out);
        out
    }

    /// Factory that would serve a request, if any.
    pub fn factory<R: Rng + ?Sized>(
        &self,
        event: AcousticEvent,
        flags: &ConditionFlags,
        rng: &mut R,
    ) -> Option<&AcousticFactory> {
        match &self.kind {
            AcousticKind::Null => None,
            AcousticKind::Simple(factory) | AcousticKind::Delayed { factory, .. } => Some(factory),
            AcousticKind::Simultaneous(children) => children
                .first()
                .and_then(|c| c.factory(event, flags, rng)),
            AcousticKind::Probability(entries) => {
                Self::select(entries, flags, rng).and_then(|c| c.factory(event, flags, rng))
            }
            AcousticKind::EventSelector(map) => Self::resolve_event(map, event)
                .and_then(|c| c.factory(AcousticEvent::None, flags, rng)),
        }
    }
}

impl fmt::Display for Acoustic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            AcousticKind::Null => "null".to_string(),
            AcousticKind::Simple(_) => "simple".to_string(),
            AcousticKind::Delayed { .. } => "delayed".to_string(),
            AcousticKind::Simultaneous(c) => format!("simultaneous, entries={}", c.len()),
            AcousticKind::Probability(e) => format!("probability, entries={}", e.len()),
            AcousticKind::EventSelector(m) => format!("event, entries={}", m.len()),
        };
        write!(f, "{} ({kind})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn simple(path: &'static str) -> Arc<Acoustic> {
        Arc::new(Acoustic::simple(SoundBuilder::new(RegistryKey::local(path))))
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn event_transition_falls_back() {
        let mut map = BTreeMap::new();
        map.insert(AcousticEvent::Walk, simple("step"));
        let selector = Acoustic::new(RegistryKey::local("feet"), AcousticKind::EventSelector(map));
        let flags = ConditionFlags::new();
        let mut rng = rng();

        let run = selector.collect(AcousticEvent::Run, &PlayTarget::Global, &flags, &mut rng);
        assert_eq!(run.len(), 1);
        assert_eq!(run[0].sound, RegistryKey::local("step"));

        let jump = selector.collect(AcousticEvent::Jump, &PlayTarget::Global, &flags, &mut rng);
        assert!(jump.is_empty());
    }

    #[test]
    fn simultaneous_skips_null_children() {
        let acoustic = Acoustic::new(
            RegistryKey::local("both"),
            AcousticKind::Simultaneous(vec![simple("a"), Arc::new(Acoustic::null()), simple("b")]),
        );
        match acoustic.kind() {
            AcousticKind::Simultaneous(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        let sounds = acoustic.collect(
            AcousticEvent::None,
            &PlayTarget::At(DVec3::ONE),
            &ConditionFlags::new(),
            &mut rng(),
        );
        assert_eq!(sounds.len(), 2);
    }

    #[test]
    fn probability_respects_weights_and_conditions() {
        let entries = vec![
            WeightedAcoustic {
                weight: 0,
                condition: Condition::Always,
                acoustic: simple("never"),
            },
            WeightedAcoustic {
                weight: 5,
                condition: Condition::parse("raining").unwrap(),
                acoustic: simple("rain"),
            },
            WeightedAcoustic {
                weight: 5,
                condition: Condition::parse("!raining").unwrap(),
                acoustic: simple("dry"),
            },
        ];
        let acoustic = Acoustic::new(RegistryKey::local("pick"), AcousticKind::Probability(entries));
        let mut rng = rng();
        let raining: ConditionFlags = ["raining"].into_iter().collect();
        for _ in 0..100 {
            let s = acoustic.collect(AcousticEvent::None, &PlayTarget::Global, &raining, &mut rng);
            assert_eq!(s[0].sound, RegistryKey::local("rain"));
            let s = acoustic.collect(
                AcousticEvent::None,
                &PlayTarget::Global,
                &ConditionFlags::new(),
                &mut rng,
            );
            assert_eq!(s[0].sound, RegistryKey::local("dry"));
        }
    }

    #[test]
    fn zero_total_weight_plays_nothing() {
        let entries = vec![WeightedAcoustic {
            weight: 0,
            condition: Condition::Always,
            acoustic: simple("silent"),
        }];
        let acoustic = Acoustic::new(RegistryKey::local("none"), AcousticKind::Probability(entries));
        let flags = ConditionFlags::new();
        assert!(acoustic
            .collect(AcousticEvent::None, &PlayTarget::Global, &flags, &mut rng())
            .is_empty());
        assert!(acoustic.factory(AcousticEvent::None, &flags, &mut rng()).is_none());
    }

    #[test]
    fn delayed_draws_half_open_range() {
        let acoustic = Acoustic::new(
            RegistryKey::local("later"),
            AcousticKind::Delayed {
                factory: AcousticFactory::new(SoundBuilder::new(RegistryKey::local("x"))),
                delay_min: 10,
                delay_max: 14,
            },
        );
        let mut rng = rng();
        for _ in 0..200 {
            let s = acoustic.collect(
                AcousticEvent::None,
                &PlayTarget::Global,
                &ConditionFlags::new(),
                &mut rng,
            );
            assert!((10..14).contains(&s[0].play_delay));
        }
    }

    #[test]
    fn near_offsets_stay_within_range() {
        let factory = AcousticFactory::new(SoundBuilder::new(RegistryKey::local("near")));
        let eye = DVec3::new(100.0, 64.0, -20.0);
        let mut rng = rng();
        for _ in 0..500 {
            let s = factory.create_sound_near(eye, &mut rng);
            let d = s.position() - eye;
            assert!(d.abs().max_element() <= 11.0);
        }
    }

    #[test]
    fn background_sounds_are_ambient_and_unattenuated() {
        let mut builder = SoundBuilder::with_category(RegistryKey::local("wind"), SoundCategory::Weather);
        builder.set_position(DVec3::splat(9.0));
        let factory = AcousticFactory::new(builder);
        let s = factory.create_background_sound(&mut rng());
        assert_eq!(s.category, SoundCategory::Ambient);
        assert_eq!(s.attenuation, Attenuation::None);
        assert_eq!(s.target, SoundTarget::Background);

        let g = factory.create_sound(&mut rng());
        assert_eq!(g.attenuation, Attenuation::None);
        assert_eq!(g.position(), DVec3::ZERO);
        assert_eq!(g.category, SoundCategory::Weather);
    }

    #[test]
    fn event_names_parse() {
        assert_eq!(AcousticEvent::from_name("mdambient:run"), Some(AcousticEvent::Run));
        assert_eq!(AcousticEvent::from_name("climb_run"), Some(AcousticEvent::ClimbRun));
        assert_eq!(AcousticEvent::from_name("fly"), None);
    }
}
