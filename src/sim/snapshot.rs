//! Serializable world state
//!
//! A snapshot carries the id counters plus one record per live entity. It is
//! enough to rebuild an equivalent world, motions included.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::entity::{Appearance, Entity, EntityId, EntityKind, Transform};
use super::motion::{AngularMotion, LinearMotion};
use super::shape::Shape;
use crate::error::{Result, SimError};

/// Everything needed to restore one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    #[serde(flatten)]
    pub kind: EntityKind,
    #[serde(default)]
    pub name: String,
    pub transform: Transform,
    pub shape: Shape,
    #[serde(default)]
    pub angular_motion: AngularMotion,
    #[serde(default)]
    pub linear_motion: LinearMotion,
    #[serde(default)]
    pub mass: f64,
    #[serde(default)]
    pub friction: f64,
    #[serde(default = "default_solid")]
    pub solid: bool,
    #[serde(default)]
    pub appearance: Appearance,
}

fn default_solid() -> bool {
    true
}

impl From<&Entity> for EntityRecord {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            kind: entity.kind().clone(),
            name: entity.name().to_string(),
            transform: entity.transform(),
            shape: entity.shape().clone(),
            angular_motion: *entity.angular_motion(),
            linear_motion: *entity.linear_motion(),
            mass: entity.mass(),
            friction: entity.friction(),
            solid: entity.is_solid(),
            appearance: entity.appearance().clone(),
        }
    }
}

impl TryFrom<EntityRecord> for Entity {
    type Error = SimError;

    /// Rebuild an entity, rejecting shapes and motions the constructors would refuse
    fn try_from(record: EntityRecord) -> Result<Self> {
        record.shape.validate()?;
        record.angular_motion.motion.validate()?;
        record.linear_motion.validate()?;
        if !record.transform.center.is_finite() || !record.transform.angle.is_finite() {
            return Err(SimError::InvalidMotionParameters(format!(
                "entity {} has a non-finite transform",
                record.id
            )));
        }
        Ok(Entity::new(record.id, record.kind, record.shape)
            .with_name(record.name)
            .with_transform(record.transform)
            .with_angular_motion(record.angular_motion)
            .with_linear_motion(record.linear_motion)
            .with_mass(record.mass)
            .with_friction(record.friction)
            .with_solid(record.solid)
            .with_appearance(record.appearance))
    }
}

/// Id counters plus live entities, in id order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub current_group: u64,
    pub current_sequence: u64,
    pub entities: Vec<EntityRecord>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Minimal read-only view handed to the renderer each frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRecord {
    pub id: EntityId,
    pub kind: &'static str,
    pub center: DVec2,
    pub angle: f64,
    pub shape: Shape,
    pub appearance: Appearance,
    /// Still drawn this frame, gone after cleanup
    pub pending_destroy: bool,
}

impl From<&Entity> for RenderRecord {
    fn from(entity: &Entity) -> Self {
        let transform = entity.transform();
        Self {
            id: entity.id(),
            kind: entity.kind().tag().as_str(),
            center: transform.center,
            angle: transform.angle,
            shape: entity.shape().clone(),
            appearance: entity.appearance().clone(),
            pending_destroy: entity.is_pending_destroy(),
        }
    }
}
