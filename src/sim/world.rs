//! Frame orchestration
//!
//! A world pairs the entity factory with its settings and drives one frame
//! at a time: clamp the interval, run the collision pass, commit, clean up.

use std::collections::BTreeSet;

use super::collision::{self, ContactResolver, StepReport};
use super::entity::{EntityKind, KindTag};
use super::factory::{Blueprint, EntityFactory};
use super::snapshot::{RenderRecord, WorldSnapshot};
use crate::error::{Result, SimError};
use crate::settings::SimSettings;

#[derive(Debug, Clone, Default)]
pub struct World {
    settings: SimSettings,
    factory: EntityFactory,
    /// Frames stepped so far
    frame: u64,
    /// Simulated time so far (seconds)
    elapsed: f64,
}

impl World {
    pub fn new(settings: SimSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Build a world from construction records and check the track layout
    ///
    /// All records land in the first group, which is closed afterwards.
    /// Layout checks are skipped for flipper arenas.
    pub fn from_blueprints(
        settings: SimSettings,
        blueprints: impl IntoIterator<Item = Blueprint>,
    ) -> Result<Self> {
        let mut world = Self::new(settings);
        let mut has_flipper = false;
        for blueprint in blueprints {
            has_flipper |= blueprint.kind_tag()? == KindTag::Flipper;
            world.factory.create(&blueprint)?;
        }
        world.factory.next_group();

        if !has_flipper {
            world.validate_track()?;
        }
        log::info!(
            "World built: {} entities, {} kart placeholders",
            world.factory.len(),
            world.factory.kart_placeholders().count()
        );
        Ok(world)
    }

    /// Race track preconditions: one finish line, contiguous gates from 1,
    /// at least one kart placeholder
    pub fn validate_track(&self) -> Result<()> {
        let finish_lines = self.factory.by_kind(KindTag::FinishLine).count();
        if finish_lines != 1 {
            return Err(SimError::WorldStructure(format!(
                "expected one finish line, found {finish_lines}"
            )));
        }

        let positions: BTreeSet<u32> = self
            .factory
            .by_kind(KindTag::Gate)
            .filter_map(|gate| match gate.kind() {
                EntityKind::Gate { position } => Some(*position),
                _ => None,
            })
            .collect();
        let Some(&last) = positions.last() else {
            return Err(SimError::WorldStructure("track has no gate".into()));
        };
        if positions.first() != Some(&1) || positions.len() != last as usize {
            return Err(SimError::WorldStructure(format!(
                "gate positions must run from 1 to {last} without gaps"
            )));
        }

        if self.factory.kart_placeholders().next().is_none() {
            return Err(SimError::WorldStructure("track has no kart placeholder".into()));
        }
        Ok(())
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn factory(&self) -> &EntityFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut EntityFactory {
        &mut self.factory
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Run the collision pass and commit every entity by the clamped `interval`
    ///
    /// The report carries the interval actually simulated.
    pub fn advance<R: ContactResolver + ?Sized>(
        &mut self,
        interval: f64,
        resolver: &mut R,
    ) -> StepReport {
        let interval = self.settings.clamp_interval(interval);
        let report =
            collision::run_pass(self.factory.table_mut(), interval, &self.settings, resolver);
        self.frame += 1;
        self.elapsed += interval;
        report
    }

    /// Remove entities destroyed during the frame
    pub fn cleanup(&mut self, interval: f64) -> usize {
        self.factory.cleanup(interval)
    }

    /// One full frame for a measured elapsed time
    pub fn next_frame<R: ContactResolver + ?Sized>(
        &mut self,
        elapsed: f64,
        resolver: &mut R,
    ) -> StepReport {
        let report = self.advance(elapsed, resolver);
        self.cleanup(report.interval);
        report
    }

    pub fn render_records(&self) -> Vec<RenderRecord> {
        self.factory.render_records()
    }

    pub fn export_state(&self) -> WorldSnapshot {
        self.factory.export_state()
    }

    pub fn import_state(&mut self, snapshot: WorldSnapshot) -> Result<()> {
        self.factory.import_state(snapshot)
    }
}
