//! Collision pass and contact response
//!
//! One pass per frame: every unordered pair is tested against the pre-frame
//! state, participants are notified, contacts are handed to a resolver, and
//! only then is every entity committed.

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId};
use crate::settings::SimSettings;

/// A detected collision between two entities (`first < second`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub first: EntityId,
    pub second: EntityId,
    /// Contact point at the end of the interval
    pub point: DVec2,
    /// Direction along the touching surfaces (not normalized)
    pub tangent: DVec2,
}

impl Contact {
    /// Unit normal to the contact surface
    pub fn normal(&self) -> DVec2 {
        self.tangent.perp().normalize_or_zero()
    }

    pub fn involves(&self, id: EntityId) -> bool {
        self.first == id || self.second == id
    }

    /// The other participant, if `id` is one of them
    pub fn partner_of(&self, id: EntityId) -> Option<EntityId> {
        if self.first == id {
            Some(self.second)
        } else if self.second == id {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Outcome of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Interval actually simulated
    pub interval: f64,
    /// Contacts in id order of their pair
    pub contacts: Vec<Contact>,
    /// Entities that took part in no contact
    pub untouched: Vec<EntityId>,
}

/// Reacts to a contact after detection, before the frame commits
pub trait ContactResolver {
    fn resolve(&mut self, first: &mut Entity, second: &mut Entity, contact: &Contact);
}

impl<F> ContactResolver for F
where
    F: FnMut(&mut Entity, &mut Entity, &Contact),
{
    fn resolve(&mut self, first: &mut Entity, second: &mut Entity, contact: &Contact) {
        self(first, second, contact)
    }
}

/// Detection only
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResponse;

impl ContactResolver for NoResponse {
    fn resolve(&mut self, _: &mut Entity, _: &mut Entity, _: &Contact) {}
}

/// Elastic bounce along the contact normal, damped by each body's friction
///
/// Only solid pairs bounce. A massless partner acts as a wall.
#[derive(Debug, Clone, Copy, Default)]
pub struct BounceResolver;

impl ContactResolver for BounceResolver {
    fn resolve(&mut self, first: &mut Entity, second: &mut Entity, contact: &Contact) {
        if !first.is_solid() || !second.is_solid() {
            return;
        }
        let mut normal = contact.normal();
        if normal == DVec2::ZERO {
            return;
        }
        // Orient from first toward second
        if (second.center_at(0.0) - first.center_at(0.0)).dot(normal) < 0.0 {
            normal = -normal;
        }

        let (va, vb) = (first.speed(0.0), second.speed(0.0));
        let (ua, ub) = (va.dot(normal), vb.dot(normal));
        if ua - ub <= 0.0 {
            // Already separating
            return;
        }

        let (ma, mb) = (first.mass(), second.mass());
        let (ua_after, ub_after) = if mb == 0.0 {
            (2.0 * ub - ua, ub)
        } else if ma == 0.0 {
            (ua, 2.0 * ua - ub)
        } else {
            let total = ma + mb;
            (
                (ua * (ma - mb) + 2.0 * mb * ub) / total,
                (ub * (mb - ma) + 2.0 * ma * ua) / total,
            )
        };

        if ma > 0.0 {
            let v = first.linear_motion().speed(0.0) + normal * (ua_after - ua);
            first.set_linear_speed(v * damping(first.friction()));
        }
        if mb > 0.0 {
            let v = second.linear_motion().speed(0.0) + normal * (ub_after - ub);
            second.set_linear_speed(v * damping(second.friction()));
        }
    }
}

#[inline]
fn damping(friction: f64) -> f64 {
    (1.0 - friction).clamp(0.0, 1.0)
}

/// Two distinct entries of the table, borrowed mutably at once
fn pair_mut(
    entities: &mut BTreeMap<EntityId, Entity>,
    first: EntityId,
    second: EntityId,
) -> Option<(&mut Entity, &mut Entity)> {
    if first >= second {
        return None;
    }
    let mut range = entities.range_mut(first..=second);
    let (lo_id, lo) = range.next()?;
    let (hi_id, hi) = range.next_back()?;
    (*lo_id == first && *hi_id == second).then_some((lo, hi))
}

/// Run one collision pass over `entities` and commit them by `interval`
pub fn run_pass<R: ContactResolver + ?Sized>(
    entities: &mut BTreeMap<EntityId, Entity>,
    interval: f64,
    settings: &SimSettings,
    resolver: &mut R,
) -> StepReport {
    let bodies: Vec<&Entity> = entities.values().collect();
    for body in &bodies {
        body.bounds_for(interval);
    }

    let mut contacts = Vec::new();
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            if a.collides(b, interval, settings.swept_checks) {
                let (point, tangent) = a.collision_point_and_tangent(b, interval);
                contacts.push(Contact {
                    first: a.id(),
                    second: b.id(),
                    point,
                    tangent,
                });
            }
        }
    }

    let touched: BTreeSet<EntityId> = contacts
        .iter()
        .flat_map(|c| [c.first, c.second])
        .collect();
    let untouched = bodies
        .iter()
        .map(|b| b.id())
        .filter(|id| !touched.contains(id))
        .collect();

    for contact in &contacts {
        if let Some((first, second)) = pair_mut(entities, contact.first, contact.second) {
            first.on_collision(contact.second, interval, settings.collision_cooldown);
            second.on_collision(contact.first, interval, settings.collision_cooldown);
        }
    }
    for contact in &contacts {
        if let Some((first, second)) = pair_mut(entities, contact.first, contact.second) {
            resolver.resolve(first, second, contact);
        }
    }

    for entity in entities.values_mut() {
        entity.commit(interval);
    }

    if !contacts.is_empty() {
        log::debug!("Collision pass: {} contacts", contacts.len());
    }

    StepReport {
        interval,
        contacts,
        untouched,
    }
}
