//! Footstep sounds and footprint particles driven by a stride pedometer.

use super::{EntityEffect, EntitySnapshot};
use crate::context::TickContext;
use crate::defaults::FOOTSTEP_MATERIALS;
use crate::particles::{Particle, ParticleKind};
use glam::{DVec3, Vec4};
use mdambient_audio::{Acoustic, AcousticEvent, AcousticLibrary, PlayTarget};
use mdambient_core::SimTick;
use mdambient_physics::VoxelShape;
use mdambient_world::{BlockMaterial, BlockPos, VoxelAccessor};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Probe depth below the feet when looking for the block stepped on.
pub const PROBE_DEPTH: f64 = 1.0 / 16.0;

const STRIDE: f64 = 0.75;
const STRIDE_STAIR: f64 = STRIDE * 0.65;
const STRIDE_LADDER: f64 = 0.5;
/// Squared horizontal speed above which a step counts as running.
const SPEED_TO_RUN: f64 = 0.22;
const SPEED_TO_JUMP_AS_MULTIFOOT: f64 = 0.005;
const LAND_HARD_DISTANCE_MIN: f32 = 0.9;
const IMMOBILE_DURATION: u64 = 4;
const DISTANCE_TO_CENTER: f64 = 0.2;
/// Height change between strides that counts as a stair rather than a step.
const STAIR_THRESHOLD: f64 = 0.4;
/// Distance accrued per block travelled.
const DISTANCE_SCALE: f64 = 0.6;
const FOOTPRINT_LIFT: f64 = 0.01;

/// Block material to step acoustic, plus the swimming acoustic.
#[derive(Debug, Clone)]
pub struct FootstepLibrary {
    materials: HashMap<&'static str, Arc<Acoustic>>,
    swim: Arc<Acoustic>,
    null: Arc<Acoustic>,
}

impl FootstepLibrary {
    pub fn new(library: &mut AcousticLibrary) -> Self {
        let materials = FOOTSTEP_MATERIALS
            .iter()
            .map(|&material| (material, library.resolve_default(&format!("footstep.{material}"))))
            .collect();
        Self {
            materials,
            swim: library.resolve_default("footstep.swim"),
            null: library.null(),
        }
    }

    /// Step acoustic for a material; the null acoustic when it makes no sound.
    pub fn for_material(&self, material: BlockMaterial) -> &Arc<Acoustic> {
        self.materials.get(material.as_str()).unwrap_or(&self.null)
    }

    pub fn for_block(&self, world: &dyn VoxelAccessor, pos: BlockPos) -> &Arc<Acoustic> {
        self.for_material(world.properties(pos).material)
    }

    pub fn swim(&self) -> &Arc<Acoustic> {
        &self.swim
    }
}

/// Where a foot came down and what it sounds like.
struct Strike {
    acoustic: Arc<Acoustic>,
    point: DVec3,
}

/// Stride pedometer for one entity.
///
/// Accrues travelled distance and emits a step whenever a stride's worth has
/// built up, alternating feet. Jumps, landings and the moment an entity starts
/// wandering get their own events.
pub struct Generator {
    footsteps: Arc<FootstepLibrary>,
    dmw_base: f64,
    y_position: Option<f64>,
    prev: Option<DVec3>,
    distance: f64,
    last_reference: f64,
    is_immobile: bool,
    time_immobile: SimTick,
    is_flying: bool,
    fall_distance: f32,
    is_right_foot: bool,
    on_ladder: bool,
    in_water: bool,
    sneaking: bool,
    jumping: bool,
    did_jump: bool,
    x_movec: f64,
    z_movec: f64,
    scal_stat: bool,
    step_this_frame: bool,
    pedometer: u32,
}

impl Generator {
    pub fn new(footsteps: Arc<FootstepLibrary>) -> Self {
        Self {
            footsteps,
            dmw_base: 0.0,
            y_position: None,
            prev: None,
            distance: 0.0,
            last_reference: 0.0,
            is_immobile: false,
            time_immobile: SimTick::ZERO,
            is_flying: false,
            fall_distance: 0.0,
            is_right_foot: false,
            on_ladder: false,
            in_water: false,
            sneaking: false,
            jumping: false,
            did_jump: false,
            x_movec: 0.0,
            z_movec: 0.0,
            scal_stat: false,
            step_this_frame: false,
            pedometer: 0,
        }
    }

    /// Completed strides.
    pub fn pedometer(&self) -> u32 {
        self.pedometer
    }

    pub fn generate(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        if entity.riding_boat || (entity.is_player && entity.spectator) {
            return;
        }
        self.did_jump = false;
        self.step_this_frame = false;
        self.on_ladder = entity.on_ladder;
        self.in_water = ctx.world.fluid(BlockPos::containing(entity.position)).is_water();
        self.sneaking = entity.sneaking;
        self.jumping = entity.jumping;

        self.simulate_footsteps(entity, ctx);
        self.simulate_airborne(entity, ctx);

        if self.step_this_frame {
            self.pedometer += 1;
        }
    }

    fn stopped_immobile(&mut self, reference: f64, now: SimTick) -> bool {
        let diff = self.last_reference - reference;
        self.last_reference = reference;
        if !self.is_immobile && diff == 0.0 {
            self.time_immobile = now;
            self.is_immobile = true;
        } else if self.is_immobile && diff != 0.0 {
            self.is_immobile = false;
            return now.since(self.time_immobile) > IMMOBILE_DURATION;
        }
        false
    }

    fn update_walked(&mut self, entity: &EntitySnapshot) {
        let position = entity.position;
        if let Some(prev) = self.prev.replace(position) {
            let mut delta = position - prev;
            if entity.on_ground {
                delta.y = 0.0;
            }
            self.distance += delta.length() * DISTANCE_SCALE;
        }
    }

    fn simulate_footsteps(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        self.update_walked(entity);
        let reference = self.distance;
        if self.dmw_base > reference {
            self.dmw_base = 0.0;
        }

        let motion = entity.motion;
        let scal = motion.x * self.x_movec + motion.z * self.z_movec;
        if self.scal_stat != (scal < 0.001) {
            self.scal_stat = !self.scal_stat;
            if self.scal_stat && !self.in_water {
                self.play_single_foot(entity, ctx, 0.0, AcousticEvent::Wander, self.is_right_foot);
            }
        }
        self.x_movec = motion.x;
        self.z_movec = motion.z;

        if entity.on_ground || self.in_water || self.on_ladder {
            let mut dwm = reference - self.dmw_base;
            if self.stopped_immobile(reference, ctx.tick) && !self.on_ladder {
                dwm = 0.0;
                self.dmw_base = reference;
            }

            let y_position = self.y_position.unwrap_or(entity.position.y);
            let mut event = None;
            let distance = if entity.on_ladder && !entity.on_ground {
                STRIDE_LADDER
            } else if !self.in_water && (y_position - entity.position.y).abs() > STAIR_THRESHOLD {
                if y_position < entity.position.y {
                    event = Some(speed_event(entity, AcousticEvent::Climb, AcousticEvent::ClimbRun));
                    STRIDE_STAIR
                } else if !self.sneaking {
                    event = Some(speed_event(entity, AcousticEvent::Walk, AcousticEvent::Run));
                    -1.0
                } else {
                    0.0
                }
            } else {
                STRIDE
            };
            let event = event.unwrap_or_else(|| speed_event(entity, AcousticEvent::Walk, AcousticEvent::Run));

            if dwm > distance {
                self.produce_step(entity, ctx, event);
                self.dmw_base = reference;
            }
        }

        if entity.on_ground {
            self.y_position = Some(entity.position.y);
        }
    }

    fn produce_step(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>, event: AcousticEvent) {
        if !self.play_swim(entity, ctx) {
            self.play_single_foot(entity, ctx, 0.0, event, self.is_right_foot);
            self.is_right_foot = !self.is_right_foot;
        }
        self.step_this_frame = true;
    }

    fn simulate_airborne(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        if (entity.on_ground || self.on_ladder) == self.is_flying {
            self.is_flying = !self.is_flying;
            self.simulate_jumping_landing(entity, ctx);
        }
        if self.is_flying {
            self.fall_distance = entity.fall_distance;
        }
    }

    fn simulate_jumping_landing(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        if self.in_water {
            return;
        }
        if self.is_flying && self.jumping {
            // Climbing stairs leaves the ground with a falling motion.
            if entity.motion.y > 0.0 {
                self.did_jump = true;
                if horizontal_speed_sq(entity) < SPEED_TO_JUMP_AS_MULTIFOOT {
                    self.play_multi_foot(entity, ctx, 0.4, AcousticEvent::Jump);
                } else {
                    self.play_single_foot(entity, ctx, 0.4, AcousticEvent::Jump, self.is_right_foot);
                }
            }
        } else if !self.is_flying && self.fall_distance > 0.01 {
            if self.fall_distance > LAND_HARD_DISTANCE_MIN {
                self.play_multi_foot(entity, ctx, 0.0, AcousticEvent::Land);
            } else if !self.step_this_frame && !self.sneaking {
                let event = speed_event(entity, AcousticEvent::Climb, AcousticEvent::ClimbRun);
                self.play_single_foot(entity, ctx, 0.0, event, self.is_right_foot);
                self.is_right_foot = !self.is_right_foot;
            }
        }
    }

    /// Swimming replaces the step sound. Returns true when in water.
    fn play_swim(&self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) -> bool {
        if !self.in_water {
            return false;
        }
        if !self.sneaking {
            let eye = BlockPos::containing(entity.eye_position());
            let event = if ctx.world.fluid(eye).is_empty() {
                AcousticEvent::Walk
            } else {
                AcousticEvent::Swim
            };
            ctx.play(self.footsteps.swim(), event, PlayTarget::At(entity.position));
        }
        true
    }

    fn play_single_foot(
        &self,
        entity: &EntitySnapshot,
        ctx: &mut TickContext<'_>,
        offset: f64,
        event: AcousticEvent,
        right_foot: bool,
    ) {
        if self.sneaking {
            return;
        }
        if let Some(strike) = self.find_strike(entity, ctx, offset, right_foot) {
            ctx.play(&strike.acoustic, event, PlayTarget::At(strike.point));
        }
    }

    fn play_multi_foot(&self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>, offset: f64, event: AcousticEvent) {
        if self.sneaking {
            return;
        }
        let left = self.find_strike(entity, ctx, offset, false);
        let right = self.find_strike(entity, ctx, offset, true);
        for strike in [left, right].into_iter().flatten() {
            ctx.play(&strike.acoustic, event, PlayTarget::At(strike.point));
        }
    }

    /// Find the block under one foot and leave a print on it.
    ///
    /// Feet sit `DISTANCE_TO_CENTER` either side of the entity, perpendicular
    /// to its yaw. A probe that lands in a silent block tries the block below
    /// once, which covers carpets and slabs over air.
    fn find_strike(
        &self,
        entity: &EntitySnapshot,
        ctx: &mut TickContext<'_>,
        offset: f64,
        right_foot: bool,
    ) -> Option<Strike> {
        let rot = f64::from(entity.yaw).rem_euclid(360.0).to_radians();
        let side = if right_foot { -DISTANCE_TO_CENTER } else { DISTANCE_TO_CENTER };
        let probe = DVec3::new(
            entity.position.x + rot.cos() * side,
            entity.position.y - PROBE_DEPTH - offset,
            entity.position.z + rot.sin() * side,
        );

        let mut pos = BlockPos::containing(probe);
        let mut acoustic = self.footsteps.for_block(ctx.world, pos);
        if acoustic.is_null() {
            pos = pos.down();
            acoustic = self.footsteps.for_block(ctx.world, pos);
        }
        if acoustic.is_null() {
            return None;
        }
        let acoustic = Arc::clone(acoustic);

        let top = f64::from(pos.y) + VoxelShape::from_kind(ctx.world.collision_shape(pos)).max_y();
        let point = DVec3::new(probe.x, top, probe.z);
        if self.should_print(entity, ctx) {
            trace!(entity = %entity.id, ?point, right_foot, "Footprint");
            ctx.spawn(
                Particle::new(
                    ParticleKind::Footprint,
                    point + DVec3::new(0.0, FOOTPRINT_LIFT, 0.0),
                    DVec3::ZERO,
                )
                .with_scale(if entity.child { 0.5 } else { 1.0 })
                .with_color(Vec4::new(1.0, 1.0, 1.0, 0.8)),
            );
        }
        Some(Strike { acoustic, point })
    }

    fn should_print(&self, entity: &EntitySnapshot, ctx: &TickContext<'_>) -> bool {
        ctx.config.toggles.footprints
            && (entity.on_ground || !self.jumping)
            && !entity.invisible
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "didJump: {} onLadder: {} flying: {} immobile: {} steps: {}",
            self.did_jump, self.on_ladder, self.is_flying, self.is_immobile, self.pedometer
        )
    }
}

fn horizontal_speed_sq(entity: &EntitySnapshot) -> f64 {
    entity.motion.x * entity.motion.x + entity.motion.z * entity.motion.z
}

fn speed_event(entity: &EntitySnapshot, walk: AcousticEvent, run: AcousticEvent) -> AcousticEvent {
    if horizontal_speed_sq(entity) > SPEED_TO_RUN {
        run
    } else {
        walk
    }
}

/// Footstep sounds and prints for one entity.
pub struct FootprintEffect {
    generator: Generator,
}

impl FootprintEffect {
    pub const NAME: &'static str = "footprint";

    pub fn new(footsteps: Arc<FootstepLibrary>) -> Self {
        Self {
            generator: Generator::new(footsteps),
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }
}

impl EntityEffect for FootprintEffect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        self.generator.generate(entity, ctx);
    }

    fn describe(&self) -> String {
        format!("{}: {}", Self::NAME, self.generator)
    }
}
