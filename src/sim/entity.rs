//! Simulated bodies
//!
//! An entity stores its transform at the time origin plus the motions that
//! describe how it evolves. Every query takes a look-ahead time and leaves the
//! entity untouched; [`Entity::commit`] is the only method that moves it.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::{self, Aabb};
use super::motion::{AngularMotion, LinearMotion};
use super::shape::{self, Posed, Shape};
use crate::consts::GROUP_SIZE;
use crate::error::SimError;

/// Stable entity identity: `group * GROUP_SIZE + sequence`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Highest group whose every sequence still encodes into a `u64`
    pub const MAX_GROUP: u64 = u64::MAX / GROUP_SIZE - 1;

    /// # Panics
    ///
    /// When the encoded id overflows; see [`EntityId::checked`].
    pub fn new(group: u64, sequence: u64) -> Self {
        Self(group * GROUP_SIZE + sequence)
    }

    /// Encode an id, or `None` when `sequence` leaves its group or the
    /// result overflows
    pub fn checked(group: u64, sequence: u64) -> Option<Self> {
        if sequence >= GROUP_SIZE {
            return None;
        }
        group
            .checked_mul(GROUP_SIZE)
            .and_then(|base| base.checked_add(sequence))
            .map(Self)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn group(self) -> u64 {
        self.0 / GROUP_SIZE
    }

    pub fn sequence(self) -> u64 {
        self.0 % GROUP_SIZE
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an entity is painted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Fill {
    /// Uniform color, e.g. `#000000`
    Hex { value: String },
    /// Repeated image
    Pattern { repeat: String, source: String },
}

impl Fill {
    pub fn hex(value: impl Into<String>) -> Self {
        Fill::Hex {
            value: value.into(),
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        Fill::hex("#000000")
    }
}

/// Renderer-facing appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(default)]
    pub fill: Fill,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            fill: Fill::default(),
            opacity: 1.0,
        }
    }
}

/// Kind tag as it appears in construction records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    Circle,
    Polygon,
    Lava,
    Kart,
    Gate,
    FinishLine,
    FireBall,
    Flipper,
}

impl KindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            KindTag::Circle => "circle",
            KindTag::Polygon => "polygon",
            KindTag::Lava => "lava",
            KindTag::Kart => "kart",
            KindTag::Gate => "gate",
            KindTag::FinishLine => "finish_line",
            KindTag::FireBall => "fireball",
            KindTag::Flipper => "flipper",
        }
    }

    /// Spawned in a group of its own so it can be bulk-destroyed
    pub fn spawns_own_group(&self) -> bool {
        matches!(self, KindTag::FireBall)
    }
}

impl FromStr for KindTag {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "circle" => Ok(KindTag::Circle),
            "polygon" => Ok(KindTag::Polygon),
            "lava" => Ok(KindTag::Lava),
            "kart" => Ok(KindTag::Kart),
            "gate" => Ok(KindTag::Gate),
            "finish_line" | "finishline" => Ok(KindTag::FinishLine),
            "fireball" | "fire_ball" => Ok(KindTag::FireBall),
            "flipper" => Ok(KindTag::Flipper),
            _ => Err(SimError::UnknownEntityKind(s.to_string())),
        }
    }
}

/// Entity specialization with its kind-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    Circle,
    Polygon,
    Lava,
    Kart {
        #[serde(default)]
        username: String,
        #[serde(default)]
        image: String,
        /// Last gate crossed, resolved through the factory
        #[serde(default)]
        last_gate: Option<EntityId>,
    },
    Gate {
        position: u32,
    },
    /// The gate at position 0
    FinishLine {
        laps: u32,
    },
    #[serde(rename = "fireball")]
    FireBall,
    Flipper {
        max_angle: f64,
        upward_speed: f64,
    },
}

impl EntityKind {
    pub fn tag(&self) -> KindTag {
        match self {
            EntityKind::Circle => KindTag::Circle,
            EntityKind::Polygon => KindTag::Polygon,
            EntityKind::Lava => KindTag::Lava,
            EntityKind::Kart { .. } => KindTag::Kart,
            EntityKind::Gate { .. } => KindTag::Gate,
            EntityKind::FinishLine { .. } => KindTag::FinishLine,
            EntityKind::FireBall => KindTag::FireBall,
            EntityKind::Flipper { .. } => KindTag::Flipper,
        }
    }

    /// Track position for gates and the finish line
    pub fn gate_position(&self) -> Option<u32> {
        match self {
            EntityKind::Gate { position } => Some(*position),
            EntityKind::FinishLine { .. } => Some(0),
            _ => None,
        }
    }

    /// Destroyed instances go back to a placeholder pool instead of retiring
    pub fn is_recyclable(&self) -> bool {
        matches!(self, EntityKind::Kart { .. })
    }
}

/// Position and orientation at the time origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub center: DVec2,
    #[serde(default)]
    pub angle: f64,
}

impl Transform {
    pub fn new(center: DVec2, angle: f64) -> Self {
        Self { center, angle }
    }
}

/// A simulated body owned by the factory
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    name: String,
    kind: EntityKind,
    shape: Shape,
    transform: Transform,
    angular_motion: AngularMotion,
    linear_motion: LinearMotion,
    mass: f64,
    friction: f64,
    solid: bool,
    appearance: Appearance,
    last_collided: Option<EntityId>,
    cooldown_remaining: f64,
    pending_destroy: bool,
    /// (interval, bounds) of the last swept-bounds computation
    bounds_cache: Cell<Option<(f64, Aabb)>>,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, shape: Shape) -> Self {
        let entity = Self {
            id,
            name: String::new(),
            kind,
            shape,
            transform: Transform::default(),
            angular_motion: AngularMotion::default(),
            linear_motion: LinearMotion::default(),
            mass: 0.0,
            friction: 0.0,
            solid: true,
            appearance: Appearance::default(),
            last_collided: None,
            cooldown_remaining: 0.0,
            pending_destroy: false,
            bounds_cache: Cell::new(None),
        };
        entity.sync_shape();
        entity
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self.sync_shape();
        self
    }

    pub fn with_center(self, center: DVec2) -> Self {
        let angle = self.transform.angle;
        self.with_transform(Transform::new(center, angle))
    }

    pub fn with_angle(self, angle: f64) -> Self {
        let center = self.transform.center;
        self.with_transform(Transform::new(center, angle))
    }

    pub fn with_linear_motion(mut self, motion: LinearMotion) -> Self {
        self.linear_motion = motion;
        self
    }

    pub fn with_angular_motion(mut self, motion: AngularMotion) -> Self {
        self.angular_motion = motion;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass.max(0.0);
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn group(&self) -> u64 {
        self.id.group()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn angular_motion(&self) -> &AngularMotion {
        &self.angular_motion
    }

    pub fn linear_motion(&self) -> &LinearMotion {
        &self.linear_motion
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn is_solid(&self) -> bool {
        self.solid
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn last_collided(&self) -> Option<EntityId> {
        self.last_collided
    }

    pub fn cooldown_remaining(&self) -> f64 {
        self.cooldown_remaining
    }

    /// True once destruction was requested; removal happens at cleanup
    pub fn is_pending_destroy(&self) -> bool {
        self.pending_destroy
    }

    // --- Look-ahead queries ---

    /// Orientation at `t`
    pub fn angle_at(&self, t: f64) -> f64 {
        self.transform.angle + self.angular_motion.displacement(t)
    }

    /// Pivot offset in world orientation at the time origin
    fn world_pivot(&self) -> DVec2 {
        DVec2::from_angle(self.transform.angle).rotate(self.angular_motion.pivot)
    }

    /// Translation of the center between the time origin and `t`
    pub fn relative_position(&self, t: f64) -> DVec2 {
        let linear = self.linear_motion.displacement(t);
        let pivot = self.world_pivot();
        if pivot == DVec2::ZERO {
            return linear;
        }
        let turned = DVec2::from_angle(self.angular_motion.displacement(t)).rotate(pivot);
        linear + pivot - turned
    }

    /// Center at `t`
    pub fn center_at(&self, t: f64) -> DVec2 {
        if t == 0.0 {
            return self.transform.center;
        }
        self.transform.center + self.relative_position(t)
    }

    /// Rotation center at `t`
    pub fn pivot_at(&self, t: f64) -> DVec2 {
        self.center_at(t) + DVec2::from_angle(self.angle_at(t)).rotate(self.angular_motion.pivot)
    }

    /// Velocity of a world point carried by the body at `t`
    pub fn speed_at_point(&self, point: DVec2, t: f64) -> DVec2 {
        let arm = point - self.pivot_at(t);
        self.linear_motion.speed(t) + arm.perp() * self.angular_motion.speed(t)
    }

    /// Velocity of the center at `t`
    pub fn speed(&self, t: f64) -> DVec2 {
        self.speed_at_point(self.center_at(t), t)
    }

    /// Acceleration of a world point carried by the body at `t`
    pub fn acceleration_at_point(&self, point: DVec2, t: f64) -> DVec2 {
        let arm = point - self.pivot_at(t);
        let omega = self.angular_motion.speed(t);
        self.linear_motion.acceleration(t) + arm.perp() * self.angular_motion.acceleration(t)
            - arm * (omega * omega)
    }

    pub fn is_static(&self) -> bool {
        self.angular_motion.is_static() && self.linear_motion.is_static()
    }

    /// Shape placed at its pose at `t`
    pub fn posed_at(&self, t: f64) -> Posed {
        self.shape.pose(self.center_at(t), self.angle_at(t))
    }

    /// Axis-aligned rectangle covering the swept shape over `[0, interval]`
    ///
    /// Memoized until a mutator runs or a different interval is asked for.
    /// The path is sampled at the start, middle and end of the interval. A
    /// rotating body contributes the disc it can sweep around its pivot at
    /// each sample, so any amount of turning is covered; a translation that
    /// doubles back between samples (a harmonic period shorter than the
    /// interval) is not.
    pub fn bounds_for(&self, interval: f64) -> Aabb {
        if let Some((cached_interval, bounds)) = self.bounds_cache.get() {
            if cached_interval == interval {
                return bounds;
            }
        }

        let samples = [0.0, interval / 2.0, interval];
        let bounds = if self.is_static() {
            self.posed_at(0.0).bounds()
        } else if self.angular_motion.is_static() {
            samples
                .iter()
                .map(|&t| self.posed_at(t).bounds())
                .reduce(|acc, b| acc.union(&b))
                .unwrap_or_else(|| self.posed_at(0.0).bounds())
        } else {
            let reach = self.angular_motion.pivot.length() + self.shape.extent();
            samples
                .iter()
                .map(|&t| Aabb::around_circle(self.pivot_at(t), reach))
                .reduce(|acc, b| acc.union(&b))
                .unwrap_or_else(|| self.posed_at(0.0).bounds())
        };
        self.bounds_cache.set(Some((interval, bounds)));
        bounds
    }

    /// Whether the cached bounds are current for `interval`
    pub fn bounds_valid_for(&self, interval: f64) -> bool {
        matches!(self.bounds_cache.get(), Some((cached, _)) if cached == interval)
    }

    fn invalidate_bounds(&self) {
        self.bounds_cache.set(None);
    }

    /// True while a collision with `other` is still cooling down
    pub fn suppresses(&self, other: EntityId) -> bool {
        self.last_collided == Some(other) && self.cooldown_remaining > 0.0
    }

    /// Continuous collision check over `interval`
    ///
    /// `swept` enables the tunneling test for bodies that travel farther than
    /// their own extent during the interval.
    pub fn collides(&self, other: &Entity, interval: f64, swept: bool) -> bool {
        if self.id == other.id {
            return false;
        }
        if self.mass == 0.0 && other.mass == 0.0 {
            return false;
        }
        if self.suppresses(other.id) || other.suppresses(self.id) {
            return false;
        }
        if !self
            .bounds_for(interval)
            .overlaps(&other.bounds_for(interval))
        {
            return false;
        }

        let own_end = self.posed_at(interval);
        let other_end = other.posed_at(interval);
        if shape::overlaps(&own_end, &other_end) {
            return true;
        }

        swept && (self.sweep_hits(&other_end, interval) || other.sweep_hits(&own_end, interval))
    }

    /// Tests the quadrilateral swept by this body against a posed target
    fn sweep_hits(&self, target: &Posed, interval: f64) -> bool {
        let start = self.center_at(0.0);
        let end = self.center_at(interval);
        let extent = self.shape.extent();
        if start.distance(end) <= extent {
            return false;
        }
        let quad = geometry::swept_quad(start, end, extent);
        shape::overlaps(&Posed::Polygon(quad.to_vec()), target)
    }

    /// Contact point and tangent direction between both bodies posed at `t`
    pub fn collision_point_and_tangent(&self, other: &Entity, t: f64) -> (DVec2, DVec2) {
        shape::contact_point_and_tangent(&self.posed_at(t), &other.posed_at(t))
    }

    /// Record a collision with `other`, detected `at` seconds past the time origin
    ///
    /// The cooldown starts at the contact time, so it outlives the commit of
    /// the frame that produced it.
    pub fn on_collision(&mut self, other: EntityId, at: f64, cooldown: f64) {
        self.last_collided = Some(other);
        self.cooldown_remaining = cooldown + at;
    }

    /// Advance the time origin by `interval`
    pub fn commit(&mut self, interval: f64) {
        let turn = self.angular_motion.displacement(interval);
        let shift = self.relative_position(interval);

        self.transform.angle += turn;
        self.transform.center += shift;
        self.angular_motion.commit(interval);
        self.linear_motion.commit(interval);

        if self.last_collided.is_some() {
            self.cooldown_remaining -= interval;
            if self.cooldown_remaining <= 0.0 {
                self.cooldown_remaining = 0.0;
                self.last_collided = None;
            }
        }

        self.sync_shape();
        self.invalidate_bounds();
    }

    // --- Mutators ---

    /// Keep the polygon trig cache on the committed angle
    fn sync_shape(&self) {
        if let Shape::Polygon(poly) = &self.shape {
            poly.sync_angle(self.transform.angle);
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_center(&mut self, center: DVec2) {
        self.transform.center = center;
        self.invalidate_bounds();
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.transform.angle = angle;
        self.sync_shape();
        self.invalidate_bounds();
    }

    pub fn translate(&mut self, offset: DVec2) {
        self.transform.center += offset;
        self.invalidate_bounds();
    }

    pub fn rotate(&mut self, angle: f64) {
        self.transform.angle += angle;
        self.sync_shape();
        self.invalidate_bounds();
    }

    pub fn set_linear_motion(&mut self, motion: LinearMotion) {
        self.linear_motion = motion;
        self.invalidate_bounds();
    }

    pub fn set_angular_motion(&mut self, motion: AngularMotion) {
        self.angular_motion = motion;
        self.invalidate_bounds();
    }

    pub fn set_linear_speed(&mut self, speed: DVec2) {
        self.linear_motion.set_speed(speed);
        self.invalidate_bounds();
    }

    pub fn set_linear_acceleration(&mut self, acceleration: DVec2) {
        self.linear_motion.set_acceleration(acceleration);
        self.invalidate_bounds();
    }

    pub fn set_angular_speed(&mut self, speed: f64) {
        self.angular_motion.set_speed(speed);
        self.invalidate_bounds();
    }

    pub fn set_angular_acceleration(&mut self, acceleration: f64) {
        self.angular_motion.set_acceleration(acceleration);
        self.invalidate_bounds();
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass.max(0.0);
    }

    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction;
    }

    pub fn set_solid(&mut self, solid: bool) {
        self.solid = solid;
    }

    pub fn set_appearance(&mut self, appearance: Appearance) {
        self.appearance = appearance;
    }

    pub fn set_fill(&mut self, fill: Fill) {
        self.appearance.fill = fill;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.pending_destroy = true;
    }

    pub(crate) fn restore(&mut self) {
        self.pending_destroy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::COLLISION_COOLDOWN;
    use crate::sim::motion::Motion;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    const DT: f64 = 1.0 / 60.0;

    fn circle(seq: u64, center: DVec2, radius: f64) -> Entity {
        Entity::new(
            EntityId::new(1, seq),
            EntityKind::Circle,
            Shape::circle(radius).unwrap(),
        )
        .with_center(center)
    }

    fn block(seq: u64, center: DVec2, half: f64) -> Entity {
        Entity::new(
            EntityId::new(1, seq),
            EntityKind::Polygon,
            Shape::polygon(vec![
                DVec2::new(-half, -half),
                DVec2::new(half, -half),
                DVec2::new(half, half),
                DVec2::new(-half, half),
            ])
            .unwrap(),
        )
        .with_center(center)
    }

    #[test]
    fn test_entity_id_encoding() {
        let id = EntityId::new(3, 42);
        assert_eq!(id.raw(), 3_000_042);
        assert_eq!(id.group(), 3);
        assert_eq!(id.sequence(), 42);
        assert_eq!(id.to_string(), "3000042");
        assert!(EntityId::new(2, 999_999) < EntityId::new(3, 1));
    }

    #[test]
    fn test_entity_id_checked() {
        assert_eq!(EntityId::checked(3, 42), Some(EntityId::new(3, 42)));
        assert_eq!(EntityId::checked(3, GROUP_SIZE), None);
        assert!(EntityId::checked(EntityId::MAX_GROUP, GROUP_SIZE - 1).is_some());
        assert_eq!(EntityId::checked(EntityId::MAX_GROUP + 2, 1), None);
        assert_eq!(EntityId::checked(u64::MAX, 0), None);
    }

    #[test]
    fn test_kind_tag_parsing() {
        assert_eq!("finish_line".parse::<KindTag>().unwrap(), KindTag::FinishLine);
        assert_eq!("Kart".parse::<KindTag>().unwrap(), KindTag::Kart);
        assert!(matches!(
            "spaceship".parse::<KindTag>(),
            Err(SimError::UnknownEntityKind(name)) if name == "spaceship"
        ));
    }

    #[test]
    fn test_both_immovable_never_collide() {
        // Fully overlapping, but both massless
        let a = circle(1, DVec2::ZERO, 10.0);
        let b = block(2, DVec2::ZERO, 10.0);
        assert!(!a.collides(&b, DT, true));
        assert!(!b.collides(&a, DT, true));

        let a = a.with_mass(1.0);
        assert!(a.collides(&b, DT, true));
        assert!(b.collides(&a, DT, true));
    }

    #[test]
    fn test_closing_circles_collide() {
        // 25 apart, closing at 1000 u/s combined
        let a = circle(1, DVec2::ZERO, 10.0)
            .with_mass(1.0)
            .with_linear_motion(Motion::uniform(DVec2::new(500.0, 0.0)));
        let b = circle(2, DVec2::new(25.0, 0.0), 10.0)
            .with_mass(1.0)
            .with_linear_motion(Motion::uniform(DVec2::new(-500.0, 0.0)));

        let gap = a.center_at(DT).distance(b.center_at(DT));
        assert!((gap - (25.0 - 1000.0 * DT)).abs() < 1e-9);
        assert!(a.collides(&b, DT, false));
    }

    #[test]
    fn test_slow_approach_misses() {
        let mover = circle(1, DVec2::ZERO, 5.0)
            .with_mass(1.0)
            .with_linear_motion(Motion::uniform(DVec2::new(200.0, 0.0)));
        let target = circle(2, DVec2::new(210.0, 0.0), 5.0);

        let gap = mover.center_at(DT).distance(target.center_at(DT));
        assert!(gap > 10.0);
        assert!(!mover.collides(&target, DT, true));
        assert!(!mover.sweep_hits(&target.posed_at(DT), DT));
    }

    #[test]
    fn test_tunneling_is_caught_by_sweep() {
        // Crosses a thin wall entirely within one step
        let bullet = circle(1, DVec2::new(-30.0, 0.0), 2.0)
            .with_mass(1.0)
            .with_linear_motion(Motion::uniform(DVec2::new(3600.0, 0.0)));
        let wall = Entity::new(
            EntityId::new(1, 2),
            EntityKind::Polygon,
            Shape::polygon(vec![
                DVec2::new(-1.0, -20.0),
                DVec2::new(1.0, -20.0),
                DVec2::new(1.0, 20.0),
                DVec2::new(-1.0, 20.0),
            ])
            .unwrap(),
        );

        assert!(!shape::overlaps(&bullet.posed_at(DT), &wall.posed_at(DT)));
        assert!(!bullet.collides(&wall, DT, false));
        assert!(bullet.collides(&wall, DT, true));
    }

    #[test]
    fn test_cooldown_suppresses_pair() {
        let mut a = circle(1, DVec2::ZERO, 10.0).with_mass(1.0);
        let b = circle(2, DVec2::new(5.0, 0.0), 10.0);
        assert!(a.collides(&b, DT, true));

        a.on_collision(b.id(), DT, COLLISION_COOLDOWN);
        assert!(!a.collides(&b, DT, true));
        // Also suppressed from the other side
        assert!(!b.collides(&a, DT, true));

        // Survives the commit of the contact frame, expires after the next
        a.commit(DT);
        assert!(a.suppresses(b.id()));
        a.commit(DT);
        assert!(!a.suppresses(b.id()));
        assert_eq!(a.last_collided(), None);
        assert!(a.collides(&b, DT, true));
    }

    #[test]
    fn test_bounds_cover_sweep_and_invalidate() {
        let mut a = circle(1, DVec2::ZERO, 1.0)
            .with_linear_motion(Motion::uniform(DVec2::new(60.0, 0.0)));
        let bounds = a.bounds_for(DT);
        assert_eq!(bounds.min, DVec2::new(-1.0, -1.0));
        assert!((bounds.max - DVec2::new(2.0, 1.0)).length() < 1e-9);
        assert!(a.bounds_valid_for(DT));
        assert!(!a.bounds_valid_for(DT / 2.0));

        a.set_center(DVec2::new(10.0, 0.0));
        assert!(!a.bounds_valid_for(DT));
        assert!((a.bounds_for(DT).min - DVec2::new(9.0, -1.0)).length() < 1e-9);
    }

    #[test]
    fn test_bounds_cover_full_turn_within_interval() {
        let spinner = block(1, DVec2::ZERO, 1.0)
            .with_angular_motion(AngularMotion::centered(Motion::uniform(TAU / DT)));
        let bounds = spinner.bounds_for(DT);
        let diagonal = 2f64.sqrt();
        assert!(bounds.min.x <= -diagonal + 1e-9 && bounds.min.y <= -diagonal + 1e-9);
        assert!(bounds.max.x >= diagonal - 1e-9 && bounds.max.y >= diagonal - 1e-9);

        // Swinging around an offset pivot reaches past the starting pose
        let arm = block(2, DVec2::new(10.0, 0.0), 1.0).with_angular_motion(AngularMotion::new(
            DVec2::new(-10.0, 0.0),
            Motion::uniform(PI / DT),
        ));
        let bounds = arm.bounds_for(DT);
        assert!(bounds.min.x <= -11.0 && bounds.max.y >= 11.0);
    }

    #[test]
    fn test_pivot_rotation() {
        // Rod spinning a quarter turn per second around its left end
        let rod = block(1, DVec2::new(10.0, 0.0), 1.0).with_angular_motion(AngularMotion::new(
            DVec2::new(-10.0, 0.0),
            Motion::uniform(FRAC_PI_2),
        ));
        assert_eq!(rod.pivot_at(0.0), DVec2::ZERO);
        let center = rod.center_at(1.0);
        assert!((center - DVec2::new(0.0, 10.0)).length() < 1e-9);
        assert!(rod.pivot_at(1.0).length() < 1e-9);

        // Center speed is tangential around the pivot
        let v = rod.speed(0.0);
        assert!((v - DVec2::new(0.0, 10.0 * FRAC_PI_2)).length() < 1e-9);
        // Centripetal acceleration points at the pivot
        let acc = rod.acceleration_at_point(rod.center_at(0.0), 0.0);
        assert!(acc.x < 0.0 && acc.y.abs() < 1e-9);
    }

    #[test]
    fn test_commit_moves_transform() {
        let mut a = block(1, DVec2::ZERO, 1.0)
            .with_linear_motion(Motion::accelerated(DVec2::new(10.0, 0.0), DVec2::new(0.0, 2.0)))
            .with_angular_motion(AngularMotion::centered(Motion::uniform(PI)));
        let expected_center = a.center_at(0.5);
        let expected_angle = a.angle_at(0.5);
        a.commit(0.5);
        assert!((a.transform().center - expected_center).length() < 1e-12);
        assert!((a.transform().angle - expected_angle).abs() < 1e-12);
        assert!((a.linear_motion().speed(0.0) - DVec2::new(10.0, 1.0)).length() < 1e-12);
    }

    #[test]
    fn test_contact_point() {
        let a = circle(1, DVec2::ZERO, 10.0);
        let b = circle(2, DVec2::new(15.0, 0.0), 10.0);
        let (point, tangent) = a.collision_point_and_tangent(&b, 0.0);
        assert_eq!(point, DVec2::new(10.0, 0.0));
        assert_eq!(tangent, DVec2::Y);
    }

    proptest! {
        #[test]
        fn prop_commit_is_path_independent(
            vx in -300.0f64..300.0, vy in -300.0f64..300.0,
            spin in -6.0f64..6.0, amp in 0.0f64..1.5, period in 0.2f64..5.0,
            px in -30.0f64..30.0, a in 0.0f64..0.05, b in 0.0f64..0.05,
        ) {
            let start = block(1, DVec2::new(5.0, -3.0), 4.0)
                .with_linear_motion(Motion::uniform(DVec2::new(vx, vy)))
                .with_angular_motion(AngularMotion::new(
                    DVec2::new(px, 0.0),
                    if amp > 0.75 { Motion::harmonic(amp, period, 0.3).unwrap() } else { Motion::uniform(spin) },
                ));

            let mut split = start.clone();
            split.commit(a);
            split.commit(b);
            let mut whole = start;
            whole.commit(a + b);

            prop_assert!((split.transform().center - whole.transform().center).length() < 1e-6);
            prop_assert!((split.transform().angle - whole.transform().angle).abs() < 1e-9);
        }

        #[test]
        fn prop_static_bounds_are_stable(
            x in -1000.0f64..1000.0, y in -1000.0f64..1000.0,
            r in 0.0f64..100.0, interval in 0.0f64..0.05,
        ) {
            let body = circle(1, DVec2::new(x, y), r);
            prop_assert!(body.is_static());
            let first = body.bounds_for(interval);
            prop_assert_eq!(first, body.bounds_for(interval));
            prop_assert_eq!(first, body.bounds_for(interval * 2.0));
        }
    }
}
