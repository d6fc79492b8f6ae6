//! Surge estimator: time-scoped zone multipliers.
//!
//! Zones are coarse H3 parent cells of the request origin. A record expires
//! at `expires_at`; an absent or expired record is the neutral case, not an
//! error. The multiplier is read exactly once at request submission; a
//! surge spike mid-cascade never changes an in-flight fare.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use h3o::{CellIndex, Resolution};

#[derive(Debug, Clone, Copy)]
pub struct SurgeRecord {
    pub multiplier: f64,
    pub expires_at: u64,
}

#[derive(Debug, Resource)]
pub struct SurgeTable {
    zone_resolution: Resolution,
    entries: HashMap<CellIndex, SurgeRecord>,
}

impl Default for SurgeTable {
    fn default() -> Self {
        Self {
            zone_resolution: Resolution::Seven,
            entries: HashMap::new(),
        }
    }
}

impl SurgeTable {
    pub fn with_zone_resolution(zone_resolution: Resolution) -> Self {
        Self {
            zone_resolution,
            entries: HashMap::new(),
        }
    }

    /// The surge zone for a position cell: its parent at the zone
    /// resolution, or the cell itself when it is already coarser.
    pub fn zone_for(&self, cell: CellIndex) -> CellIndex {
        cell.parent(self.zone_resolution).unwrap_or(cell)
    }

    /// Install or replace the record for a zone. Multipliers below 1.0 are
    /// clamped; surge never discounts.
    pub fn set(&mut self, zone: CellIndex, multiplier: f64, expires_at: u64) {
        self.entries.insert(
            zone,
            SurgeRecord {
                multiplier: multiplier.max(1.0),
                expires_at,
            },
        );
    }

    /// Current multiplier for a position cell: >= 1.0, and exactly 1.0 when
    /// no non-expired record covers its zone.
    pub fn current_multiplier(&self, cell: CellIndex, now: u64) -> f64 {
        let zone = self.zone_for(cell);
        match self.entries.get(&zone) {
            Some(record) if record.expires_at > now => record.multiplier,
            _ => 1.0,
        }
    }

    /// Drop expired records.
    pub fn purge_expired(&mut self, now: u64) {
        self.entries.retain(|_, record| record.expires_at > now);
    }
}
