//! Entity factory: storage, id allocation and lifecycle
//!
//! The factory is the only owner of entities. Ids are allocated as
//! `group * GROUP_SIZE + sequence`; destruction is deferred until
//! [`EntityFactory::cleanup`] so a destroyed entity still takes part in the
//! frame it was destroyed in.

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::entity::{Appearance, Entity, EntityId, EntityKind, Fill, KindTag, Transform};
use super::motion::{AngularMotion, LinearMotion, Motion};
use super::shape::Shape;
use super::snapshot::{EntityRecord, RenderRecord, WorldSnapshot};
use crate::consts::{
    FIREBALL_MASS, FIREBALL_RADIUS, GROUP_SIZE, KART_FRICTION, KART_HALF_LENGTH,
    KART_HALF_WIDTH, KART_MASS, LAVA_COLOR,
};
use crate::error::{Result, SimError};

/// Normalized construction record for one entity
///
/// Unset optional fields take the defaults of the named kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blueprint {
    /// Kind tag, e.g. `circle`, `kart`, `finish_line`
    pub kind: String,
    pub name: String,
    pub center: DVec2,
    pub angle: f64,
    pub radius: Option<f64>,
    /// Local polygon vertices
    pub vertices: Vec<DVec2>,
    pub angular_motion: AngularMotion,
    pub linear_motion: LinearMotion,
    pub mass: Option<f64>,
    pub friction: Option<f64>,
    pub solid: Option<bool>,
    pub appearance: Option<Appearance>,
    /// Gate position on the track
    pub position: Option<u32>,
    pub laps: Option<u32>,
    pub max_angle: Option<f64>,
    pub upward_speed: Option<f64>,
}

impl Blueprint {
    pub fn new(kind: KindTag) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn circle(center: DVec2, radius: f64) -> Self {
        Self {
            center,
            radius: Some(radius),
            ..Self::new(KindTag::Circle)
        }
    }

    pub fn polygon(center: DVec2, vertices: Vec<DVec2>) -> Self {
        Self {
            center,
            vertices,
            ..Self::new(KindTag::Polygon)
        }
    }

    pub fn lava(center: DVec2, vertices: Vec<DVec2>) -> Self {
        Self {
            center,
            vertices,
            ..Self::new(KindTag::Lava)
        }
    }

    /// Kart placeholder facing `angle`
    pub fn kart(center: DVec2, angle: f64) -> Self {
        Self {
            center,
            angle,
            ..Self::new(KindTag::Kart)
        }
    }

    pub fn gate(position: u32, center: DVec2, vertices: Vec<DVec2>) -> Self {
        Self {
            center,
            vertices,
            position: Some(position),
            ..Self::new(KindTag::Gate)
        }
    }

    pub fn finish_line(laps: u32, center: DVec2, vertices: Vec<DVec2>) -> Self {
        Self {
            center,
            vertices,
            laps: Some(laps),
            ..Self::new(KindTag::FinishLine)
        }
    }

    pub fn fireball(center: DVec2, velocity: DVec2) -> Self {
        Self {
            center,
            linear_motion: Motion::uniform(velocity),
            ..Self::new(KindTag::FireBall)
        }
    }

    pub fn flipper(
        center: DVec2,
        vertices: Vec<DVec2>,
        max_angle: f64,
        upward_speed: f64,
    ) -> Self {
        Self {
            center,
            vertices,
            max_angle: Some(max_angle),
            upward_speed: Some(upward_speed),
            ..Self::new(KindTag::Flipper)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
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
        self.mass = Some(mass);
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = Some(friction);
        self
    }

    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = Some(solid);
        self
    }

    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = Some(appearance);
        self
    }

    pub fn kind_tag(&self) -> Result<KindTag> {
        self.kind.parse()
    }

    /// Construct the entity this record describes under `id`
    pub fn build(&self, id: EntityId) -> Result<Entity> {
        let tag = self.kind_tag()?;

        let kind = match tag {
            KindTag::Circle => EntityKind::Circle,
            KindTag::Polygon => EntityKind::Polygon,
            KindTag::Lava => EntityKind::Lava,
            KindTag::Kart => EntityKind::Kart {
                username: String::new(),
                image: String::new(),
                last_gate: None,
            },
            KindTag::Gate => EntityKind::Gate {
                position: self.position.ok_or_else(|| {
                    SimError::WorldStructure(format!("gate `{}` has no position", self.name))
                })?,
            },
            KindTag::FinishLine => EntityKind::FinishLine {
                laps: self.laps.unwrap_or(1),
            },
            KindTag::FireBall => EntityKind::FireBall,
            KindTag::Flipper => EntityKind::Flipper {
                max_angle: self.max_angle.ok_or_else(|| {
                    SimError::InvalidMotionParameters("flipper needs max_angle".into())
                })?,
                upward_speed: self.upward_speed.ok_or_else(|| {
                    SimError::InvalidMotionParameters("flipper needs upward_speed".into())
                })?,
            },
        };

        let shape = match tag {
            KindTag::Circle => Shape::circle(self.radius.ok_or_else(|| {
                SimError::InvalidMotionParameters("circle needs a radius".into())
            })?)?,
            KindTag::FireBall => Shape::circle(self.radius.unwrap_or(FIREBALL_RADIUS))?,
            KindTag::Kart if self.vertices.is_empty() => Shape::polygon(kart_outline())?,
            _ => Shape::polygon(self.vertices.clone())?,
        };

        let (mass, friction) = match tag {
            KindTag::Kart => (KART_MASS, KART_FRICTION),
            KindTag::FireBall => (FIREBALL_MASS, 0.0),
            _ => (0.0, 0.0),
        };
        // Gates never block, whatever the record says
        let solid = match tag {
            KindTag::Gate | KindTag::FinishLine => false,
            _ => self.solid.unwrap_or(true),
        };

        let mut angular_motion = self.angular_motion;
        if tag == KindTag::Kart && angular_motion.pivot == DVec2::ZERO {
            angular_motion.pivot = DVec2::new(-KART_HALF_LENGTH, 0.0);
        }

        let appearance = self.appearance.clone().unwrap_or_else(|| match tag {
            KindTag::Lava => Appearance {
                fill: Fill::hex(LAVA_COLOR),
                opacity: 1.0,
            },
            _ => Appearance::default(),
        });

        Ok(Entity::new(id, kind, shape)
            .with_name(self.name.clone())
            .with_transform(Transform::new(self.center, self.angle))
            .with_angular_motion(angular_motion)
            .with_linear_motion(self.linear_motion)
            .with_mass(self.mass.unwrap_or(mass))
            .with_friction(self.friction.unwrap_or(friction))
            .with_solid(solid)
            .with_appearance(appearance))
    }
}

fn kart_outline() -> Vec<DVec2> {
    let (l, w) = (KART_HALF_LENGTH, KART_HALF_WIDTH);
    vec![
        DVec2::new(-l, -w),
        DVec2::new(l, -w),
        DVec2::new(l, w),
        DVec2::new(-l, w),
    ]
}

/// Owner of every entity of a world
#[derive(Debug, Clone)]
pub struct EntityFactory {
    /// Entities taking part in the simulation
    entities: BTreeMap<EntityId, Entity>,
    /// Karts waiting for a player
    placeholders: BTreeMap<EntityId, Entity>,
    /// Entities removed by the latest cleanup
    retired: BTreeMap<EntityId, Entity>,
    current_group: u64,
    current_sequence: u64,
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            placeholders: BTreeMap::new(),
            retired: BTreeMap::new(),
            current_group: 1,
            current_sequence: 1,
        }
    }
}

impl EntityFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_group(&self) -> u64 {
        self.current_group
    }

    /// Sequence the next entity of the current group will get
    pub fn current_sequence(&self) -> u64 {
        self.current_sequence
    }

    /// Close the current group
    pub fn next_group(&mut self) {
        self.current_group = self.current_group.saturating_add(1);
        self.current_sequence = 1;
        log::debug!("Opened entity group {}", self.current_group);
    }

    /// Build and store an entity, returning its id
    ///
    /// Karts go to the placeholder pool until loaded. Fireballs get a group
    /// of their own.
    pub fn create(&mut self, blueprint: &Blueprint) -> Result<EntityId> {
        let tag = blueprint.kind_tag()?;
        let own_group = tag.spawns_own_group();
        if self.current_sequence >= GROUP_SIZE || (own_group && self.current_sequence > 1) {
            self.next_group();
        }

        let id = EntityId::checked(self.current_group, self.current_sequence).ok_or_else(|| {
            SimError::WorldStructure(format!(
                "entity ids exhausted at group {}",
                self.current_group
            ))
        })?;
        let entity = blueprint.build(id)?;
        self.current_sequence += 1;

        if entity.kind().is_recyclable() {
            self.placeholders.insert(id, entity);
        } else {
            self.entities.insert(id, entity);
        }
        if own_group {
            self.next_group();
        }
        Ok(id)
    }

    /// Mark an entity for removal at the next cleanup
    pub fn destroy(&mut self, id: EntityId) -> Result<()> {
        self.entities
            .get_mut(&id)
            .ok_or(SimError::EntityNotFound(id))?
            .mark_destroyed();
        Ok(())
    }

    /// Mark every entity of `group` for removal, returning how many
    pub fn destroy_group(&mut self, group: u64) -> usize {
        let mut count = 0;
        for entity in self.entities.values_mut().filter(|e| e.group() == group) {
            entity.mark_destroyed();
            count += 1;
        }
        count
    }

    pub fn destroy_all(&mut self) {
        for entity in self.entities.values_mut() {
            entity.mark_destroyed();
        }
    }

    /// End-of-frame sweep of destroyed entities
    ///
    /// Karts are restored into the placeholder pool. Returns the number of
    /// entities removed.
    pub fn cleanup(&mut self, interval: f64) -> usize {
        self.retired.clear();

        let doomed: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.is_pending_destroy())
            .map(Entity::id)
            .collect();

        for id in &doomed {
            let Some(mut entity) = self.entities.remove(id) else {
                continue;
            };
            if entity.kind().is_recyclable() {
                entity.restore();
                self.placeholders.insert(*id, entity.clone());
            }
            self.retired.insert(*id, entity);
        }

        if !doomed.is_empty() {
            log::debug!(
                "Cleanup after {interval:.4}s frame removed {} entities",
                doomed.len()
            );
        }
        doomed.len()
    }

    /// Bring a kart placeholder into play for a player
    ///
    /// Without an explicit placeholder the lowest free id is used.
    pub fn load_kart(
        &mut self,
        username: &str,
        image: &str,
        placeholder: Option<EntityId>,
    ) -> Result<EntityId> {
        let id = match placeholder {
            Some(id) => id,
            None => *self.placeholders.keys().next().ok_or_else(|| {
                SimError::WorldStructure("no kart placeholder left".into())
            })?,
        };

        let Some(mut kart) = self.placeholders.remove(&id) else {
            return Err(match self.entities.get(&id) {
                Some(entity) if !entity.kind().is_recyclable() => SimError::WrongKind {
                    id,
                    expected: "kart",
                },
                _ => SimError::EntityNotFound(id),
            });
        };

        if let EntityKind::Kart {
            username: name,
            image: picture,
            ..
        } = kart.kind_mut()
        {
            *name = username.to_string();
            *picture = image.to_string();
        }
        self.entities.insert(id, kart);
        log::info!("Kart {id} loaded for {username}");
        Ok(id)
    }

    /// Take a kart out of play; it returns to the pool at cleanup
    pub fn unload_kart(&mut self, id: EntityId) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::EntityNotFound(id))?;
        if !entity.kind().is_recyclable() {
            return Err(SimError::WrongKind {
                id,
                expected: "kart",
            });
        }
        entity.mark_destroyed();
        Ok(())
    }

    // --- Lookups ---

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entities in id order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub(crate) fn table_mut(&mut self) -> &mut BTreeMap<EntityId, Entity> {
        &mut self.entities
    }

    pub fn by_kind(&self, tag: KindTag) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.kind().tag() == tag)
    }

    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities.values().filter(move |e| e.name() == name)
    }

    /// Every kart, placeholders and in-game, in id order
    pub fn karts(&self) -> Vec<&Entity> {
        let mut karts: Vec<&Entity> = self
            .placeholders
            .values()
            .chain(self.karts_in_game())
            .collect();
        karts.sort_by_key(|e| e.id());
        karts
    }

    pub fn kart_placeholders(&self) -> impl Iterator<Item = &Entity> {
        self.placeholders.values()
    }

    pub fn karts_in_game(&self) -> impl Iterator<Item = &Entity> {
        self.by_kind(KindTag::Kart)
    }

    /// Gates and the finish line, ordered by track position
    pub fn gates(&self) -> Vec<&Entity> {
        let mut gates: Vec<&Entity> = self
            .entities
            .values()
            .filter(|e| e.kind().gate_position().is_some())
            .collect();
        gates.sort_by_key(|e| (e.kind().gate_position(), e.id()));
        gates
    }

    pub fn finish_line(&self) -> Option<&Entity> {
        self.by_kind(KindTag::FinishLine).next()
    }

    /// Entities removed by the latest cleanup
    pub fn retired(&self) -> impl Iterator<Item = &Entity> {
        self.retired.values()
    }

    /// Renderer view, destroyed entities included until cleanup
    pub fn render_records(&self) -> Vec<RenderRecord> {
        self.entities.values().map(RenderRecord::from).collect()
    }

    // --- Snapshot ---

    /// Counters plus every live entity not pending destruction
    pub fn export_state(&self) -> WorldSnapshot {
        let entities: Vec<EntityRecord> = self
            .entities
            .values()
            .filter(|e| !e.is_pending_destroy())
            .map(EntityRecord::from)
            .collect();
        log::info!("Exported {} entities", entities.len());
        WorldSnapshot {
            current_group: self.current_group,
            current_sequence: self.current_sequence,
            entities,
        }
    }

    /// Replace all storage with the snapshot content
    ///
    /// Counters are moved past every restored id so new entities never
    /// reuse one. Nothing changes if the snapshot holds duplicate ids.
    pub fn import_state(&mut self, snapshot: WorldSnapshot) -> Result<()> {
        if snapshot.current_group > EntityId::MAX_GROUP || snapshot.current_sequence > GROUP_SIZE {
            return Err(SimError::WorldStructure(format!(
                "snapshot counters out of range: group {}, sequence {}",
                snapshot.current_group, snapshot.current_sequence
            )));
        }

        let mut entities = BTreeMap::new();
        for record in snapshot.entities {
            let id = record.id;
            if entities.contains_key(&id) {
                return Err(SimError::WorldStructure(format!(
                    "duplicate entity id {id} in snapshot"
                )));
            }
            entities.insert(id, Entity::try_from(record)?);
        }

        let mut group = snapshot.current_group.max(1);
        let mut sequence = snapshot.current_sequence.max(1);
        if let Some(last) = entities.keys().next_back() {
            if (last.group(), last.sequence()) >= (group, sequence) {
                group = last.group();
                sequence = last.sequence() + 1;
            }
        }
        if group > EntityId::MAX_GROUP {
            return Err(SimError::WorldStructure(format!(
                "snapshot entity ids leave no room for new ones (group {group})"
            )));
        }

        let count = entities.len();
        self.entities = entities;
        self.placeholders.clear();
        self.retired.clear();
        self.current_group = group;
        self.current_sequence = sequence;
        log::info!("Imported {count} entities");
        Ok(())
    }
}
