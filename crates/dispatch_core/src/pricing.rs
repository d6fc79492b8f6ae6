//! Base fare estimation.
//!
//! The dispatch core consumes the base estimated fare as an input; this
//! helper produces one for callers (and the scenario builder) from the
//! pickup/dropoff distance. Surge is applied separately, once, at request
//! submission (see [crate::surge]).

use bevy_ecs::prelude::Resource;
use h3o::CellIndex;
use serde::Serialize;

use crate::spatial::distance_km_between_cells;

#[derive(Debug, Clone, Copy, Resource, Serialize)]
pub struct PricingConfig {
    /// Flag-fall in currency units.
    pub base_fare: f64,
    /// Per-kilometer rate in currency units.
    pub per_km_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_fare: 2.50,
            per_km_rate: 1.50,
        }
    }
}

/// Estimate the base (pre-surge) fare for a trip.
///
/// Formula: `fare = base_fare + distance_km * per_km_rate`
pub fn estimate_base_fare(config: &PricingConfig, pickup: CellIndex, dropoff: CellIndex) -> f64 {
    let distance_km = distance_km_between_cells(pickup, dropoff);
    config.base_fare + distance_km * config.per_km_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fare_includes_base_and_distance() {
        let config = PricingConfig::default();
        let cell = CellIndex::try_from(0x8a1fb46622dffff).expect("cell");
        let nearby = cell
            .grid_disk::<Vec<_>>(1)
            .into_iter()
            .find(|c| *c != cell)
            .expect("neighbor cell");

        let fare = estimate_base_fare(&config, cell, nearby);
        assert!(fare >= config.base_fare);

        let distance = distance_km_between_cells(cell, nearby);
        let expected = config.base_fare + distance * config.per_km_rate;
        assert!((fare - expected).abs() < 1e-9);
    }
}
