//! Deterministic simulation module
//!
//! All motion and collision logic lives here:
//! - Queries take a look-ahead time and never mutate
//! - Commits happen only after every query of a frame
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod entity;
pub mod factory;
pub mod geometry;
pub mod motion;
pub mod shape;
pub mod snapshot;
pub mod world;

pub use collision::{BounceResolver, Contact, ContactResolver, NoResponse, StepReport, run_pass};
pub use entity::{Appearance, Entity, EntityId, EntityKind, Fill, KindTag, Transform};
pub use factory::{Blueprint, EntityFactory};
pub use geometry::{Aabb, Segment};
pub use motion::{AngularMotion, LinearMotion, Motion, Quantity};
pub use shape::{PolygonShape, Posed, Shape};
pub use snapshot::{EntityRecord, RenderRecord, WorldSnapshot};
pub use world::World;
