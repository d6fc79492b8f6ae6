//! Test helpers for common test setup and utilities.
//!
//! Shared across the colocated unit tests and the integration suites to
//! reduce duplication.

use bevy_ecs::prelude::{Entity, World};
use h3o::CellIndex;

use crate::ecs::{Driver, DriverAvailability, DriverState, Position, VehicleClass};
use crate::scenario::install_dispatch_resources;

/// A standard test cell used across test files for consistency.
/// A valid H3 cell at resolution 9.
pub const TEST_CELL: u64 = 0x8a1fb46622dffff;

/// Get the test cell as a `CellIndex`.
///
/// # Panics
///
/// Panics if the test cell constant is invalid (should never happen).
pub fn test_cell() -> CellIndex {
    CellIndex::try_from(TEST_CELL).expect("TEST_CELL should be a valid H3 cell")
}

/// Get a neighbor cell of the test cell.
///
/// # Panics
///
/// Panics if no neighbor can be found (should never happen with a valid test cell).
pub fn test_neighbor_cell() -> CellIndex {
    test_cell()
        .grid_disk::<Vec<_>>(1)
        .into_iter()
        .find(|c| *c != test_cell())
        .expect("test cell should have neighbors")
}

/// Create a world with every dispatch resource installed at defaults.
pub fn create_test_world() -> World {
    let mut world = World::new();
    install_dispatch_resources(&mut world);
    world
}

/// Spawn one online driver at a cell.
pub fn spawn_online_driver(
    world: &mut World,
    cell: CellIndex,
    class: VehicleClass,
    rating: f64,
) -> Entity {
    world
        .spawn((
            Driver {
                state: DriverState::Online,
                class,
                rating,
                active_trip: None,
            },
            Position(cell),
        ))
        .id()
}

/// Spawn an online driver with a declared availability window, eligible
/// for the reservation pool.
pub fn spawn_available_driver(
    world: &mut World,
    cell: CellIndex,
    class: VehicleClass,
    from_ms: u64,
    to_ms: u64,
) -> Entity {
    let driver = spawn_online_driver(world, cell, class, 4.5);
    world
        .entity_mut(driver)
        .insert(DriverAvailability { from_ms, to_ms });
    driver
}
