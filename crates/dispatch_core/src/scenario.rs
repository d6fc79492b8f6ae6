//! Scenario building: resource installation and seeded synthetic fleets.
//!
//! Used by integration tests and benches to stand up reproducible worlds;
//! all randomness goes through a seeded [StdRng].

use bevy_ecs::prelude::{Entity, World};
use h3o::CellIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::DispatchClock;
use crate::config::{DispatchConfig, PenaltyConfig, RankingWeights, ReservationConfig};
use crate::ecs::{Driver, DriverAvailability, DriverState, Position, VehicleClass};
use crate::events::OutboundEvents;
use crate::ledger::ReliabilityLedger;
use crate::pricing::PricingConfig;
use crate::surge::SurgeTable;

/// Insert every resource the dispatch schedule expects, at defaults.
pub fn install_dispatch_resources(world: &mut World) {
    world.insert_resource(DispatchClock::default());
    world.insert_resource(ReliabilityLedger::default());
    world.insert_resource(SurgeTable::default());
    world.insert_resource(OutboundEvents::default());
    world.insert_resource(DispatchConfig::default());
    world.insert_resource(RankingWeights::default());
    world.insert_resource(PenaltyConfig::default());
    world.insert_resource(ReservationConfig::default());
    world.insert_resource(PricingConfig::default());
}

/// Parameters for a synthetic driver fleet around one center cell.
#[derive(Debug, Clone, Copy)]
pub struct FleetParams {
    pub drivers: usize,
    pub center: CellIndex,
    /// Max H3 grid distance from the center for driver positions.
    pub spread_k: u32,
    pub class: VehicleClass,
    pub seed: u64,
}

impl FleetParams {
    pub fn new(center: CellIndex) -> Self {
        Self {
            drivers: 10,
            center,
            spread_k: 2,
            class: VehicleClass::Economy,
            seed: 42,
        }
    }
}

/// Spawn `params.drivers` online drivers at seeded-random cells within
/// `spread_k` of the center, with ratings uniform in 3.5–5.0.
pub fn spawn_fleet(world: &mut World, params: &FleetParams) -> Vec<Entity> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let cells = params.center.grid_disk::<Vec<_>>(params.spread_k);

    (0..params.drivers)
        .map(|_| {
            let cell = cells[rng.gen_range(0..cells.len())];
            let rating = rng.gen_range(3.5..=5.0);
            world
                .spawn((
                    Driver {
                        state: DriverState::Online,
                        class: params.class,
                        rating,
                        active_trip: None,
                    },
                    Position(cell),
                ))
                .id()
        })
        .collect()
}

/// Spawn a fleet whose members also declare an availability window, making
/// them eligible for the reservation pool.
pub fn spawn_scheduled_fleet(
    world: &mut World,
    params: &FleetParams,
    from_ms: u64,
    to_ms: u64,
) -> Vec<Entity> {
    let fleet = spawn_fleet(world, params);
    for driver in &fleet {
        world
            .entity_mut(*driver)
            .insert(DriverAvailability { from_ms, to_ms });
    }
    fleet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cell() -> CellIndex {
        CellIndex::try_from(0x8a1fb46622dffff).expect("cell")
    }

    #[test]
    fn same_seed_produces_the_same_fleet() {
        let params = FleetParams {
            drivers: 5,
            ..FleetParams::new(test_cell())
        };

        let mut world_a = World::new();
        let fleet_a = spawn_fleet(&mut world_a, &params);
        let mut world_b = World::new();
        let fleet_b = spawn_fleet(&mut world_b, &params);

        let describe = |world: &World, fleet: &[Entity]| -> Vec<(CellIndex, u64)> {
            fleet
                .iter()
                .map(|entity| {
                    let position = world.get::<Position>(*entity).expect("position").0;
                    let rating = world.get::<Driver>(*entity).expect("driver").rating;
                    (position, rating.to_bits())
                })
                .collect()
        };
        assert_eq!(describe(&world_a, &fleet_a), describe(&world_b, &fleet_b));
    }

    #[test]
    fn fleet_positions_stay_within_the_spread() {
        let params = FleetParams {
            drivers: 20,
            spread_k: 1,
            ..FleetParams::new(test_cell())
        };
        let mut world = World::new();
        let fleet = spawn_fleet(&mut world, &params);

        for driver in fleet {
            let cell = world.get::<Position>(driver).expect("position").0;
            let distance = params.center.grid_distance(cell).expect("grid distance");
            assert!(distance <= 1);
        }
    }
}
