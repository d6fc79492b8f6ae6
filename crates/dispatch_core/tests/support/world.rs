#![allow(dead_code)]

use bevy_ecs::prelude::{Entity, World};
use dispatch_core::clock::DispatchClock;
use dispatch_core::config::{DispatchConfig, PenaltyConfig, RankingWeights};
use dispatch_core::ecs::{Driver, DriverState, Position, Rider, VehicleClass};
use dispatch_core::scenario::install_dispatch_resources;
use dispatch_core::surge::SurgeTable;

/// Builder configuration for reproducible test worlds.
#[derive(Clone, Debug)]
pub struct TestWorldConfig {
    pub dispatch: DispatchConfig,
    pub weights: RankingWeights,
    pub penalties: PenaltyConfig,
    pub surge: Vec<(f64, u64)>,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            weights: RankingWeights::default(),
            penalties: PenaltyConfig::default(),
            surge: Vec::new(),
        }
    }
}

/// Helper that populates the ECS world with all shared resources used in
/// integration tests.
#[derive(Debug, Default)]
pub struct TestWorldBuilder {
    config: TestWorldConfig,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispatch_config(mut self, dispatch: DispatchConfig) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    pub fn with_weights(mut self, weights: RankingWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn with_penalties(mut self, penalties: PenaltyConfig) -> Self {
        self.config.penalties = penalties;
        self
    }

    /// Install a surge record on the test cell's zone.
    pub fn with_surge(mut self, multiplier: f64, expires_at: u64) -> Self {
        self.config.surge.push((multiplier, expires_at));
        self
    }

    pub fn build(self) -> World {
        let mut world = World::new();
        install_dispatch_resources(&mut world);
        world.insert_resource(self.config.dispatch);
        world.insert_resource(self.config.weights);
        world.insert_resource(self.config.penalties);
        for (multiplier, expires_at) in self.config.surge {
            let zone = world.resource::<SurgeTable>().zone_for(seed_cell());
            world
                .resource_mut::<SurgeTable>()
                .set(zone, multiplier, expires_at);
        }
        world
    }
}

pub fn seed_cell() -> h3o::CellIndex {
    h3o::CellIndex::try_from(0x8a1fb46622dffff).expect("cell")
}

pub fn neighbor_cell(cell: h3o::CellIndex) -> h3o::CellIndex {
    cell.grid_disk::<Vec<_>>(1)
        .into_iter()
        .find(|candidate| *candidate != cell)
        .expect("neighbor cell")
}

/// Spawn an online driver; descending ratings pin the ranking order.
pub fn spawn_driver(world: &mut World, cell: h3o::CellIndex, rating: f64) -> Entity {
    world
        .spawn((
            Driver {
                state: DriverState::Online,
                class: VehicleClass::Economy,
                rating,
                active_trip: None,
            },
            Position(cell),
        ))
        .id()
}

pub fn spawn_rider(world: &mut World) -> Entity {
    world.spawn(Rider::default()).id()
}

/// Pop and apply events until the queue is empty or `max_steps` is hit.
pub fn drain_events(
    world: &mut World,
    schedule: &mut bevy_ecs::prelude::Schedule,
    max_steps: usize,
) -> usize {
    dispatch_core::runner::run_until_empty(world, schedule, max_steps)
}

/// The clock's pending event count is not exposed; this peeks emptiness.
pub fn clock_is_empty(world: &World) -> bool {
    world.resource::<DispatchClock>().is_empty()
}
