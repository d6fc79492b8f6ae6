//! Reliability ledger: per-driver rolling reliability records.
//!
//! The ledger owns every record; the dispatch engine and reservation
//! scheduler read it for eligibility and call its mutation operations on
//! terminal outcomes; nothing else writes these fields. All mutation
//! funnels through `&mut self` methods and the single-writer event loop,
//! which is what serializes concurrent defaults for the same driver.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource};
use serde::Serialize;
use tracing::debug;

use crate::config::PenaltyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DefaultKind {
    /// Let an offer expire without responding.
    Timeout,
    /// Backed out after accepting.
    Cancellation,
    /// Accepted and never performed pickup.
    Ghosting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SuspensionStatus {
    Clear,
    Suspended { until: u64 },
}

impl SuspensionStatus {
    pub fn is_suspended(self) -> bool {
        matches!(self, SuspensionStatus::Suspended { .. })
    }
}

/// One driver's rolling record. Score starts at 100 and is only moved by
/// the penalty table or completion recovery.
#[derive(Debug, Clone, Serialize)]
pub struct ReliabilityRecord {
    pub score: f64,
    pub punctuality: f64,
    pub offers_seen: u32,
    pub offers_accepted: u32,
    pub completed_trips: u32,
    pub scheduled_trips: u32,
    pub cancellations: u32,
    pub ghostings: u32,
    pub timeouts: u32,
    pub scheduling_blocked: bool,
    pub blocked_until: Option<u64>,
    pub suspension_reason: Option<DefaultKind>,
    pub last_timeout_at: Option<u64>,
}

impl Default for ReliabilityRecord {
    fn default() -> Self {
        Self {
            score: 100.0,
            punctuality: 100.0,
            offers_seen: 0,
            offers_accepted: 0,
            completed_trips: 0,
            scheduled_trips: 0,
            cancellations: 0,
            ghostings: 0,
            timeouts: 0,
            scheduling_blocked: false,
            blocked_until: None,
            suspension_reason: None,
            last_timeout_at: None,
        }
    }
}

impl ReliabilityRecord {
    /// Share of seen offers that were accepted; a fresh driver counts as 1.0.
    pub fn acceptance_rate(&self) -> f64 {
        if self.offers_seen == 0 {
            1.0
        } else {
            f64::from(self.offers_accepted) / f64::from(self.offers_seen)
        }
    }
}

/// Outcome of one penalty application, for event emission and audit.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyResult {
    pub driver: Entity,
    pub kind: DefaultKind,
    pub points: f64,
    pub score_after: f64,
    pub suspended: bool,
    pub scheduling_blocked: bool,
}

#[derive(Debug, Default, Resource)]
pub struct ReliabilityLedger {
    records: HashMap<Entity, ReliabilityRecord>,
}

impl ReliabilityLedger {
    /// Snapshot of a driver's record; a driver never seen before reads as
    /// the default (score 100, nothing counted).
    pub fn get(&self, driver: Entity) -> ReliabilityRecord {
        self.records.get(&driver).cloned().unwrap_or_default()
    }

    pub fn acceptance_rate(&self, driver: Entity) -> f64 {
        self.records
            .get(&driver)
            .map(ReliabilityRecord::acceptance_rate)
            .unwrap_or(1.0)
    }

    pub fn last_timeout_at(&self, driver: Entity) -> Option<u64> {
        self.records.get(&driver).and_then(|r| r.last_timeout_at)
    }

    pub fn is_suspended(&self, driver: Entity, now: u64) -> SuspensionStatus {
        match self.records.get(&driver).and_then(|r| r.blocked_until) {
            Some(until) if until > now => SuspensionStatus::Suspended { until },
            _ => SuspensionStatus::Clear,
        }
    }

    /// Eligibility gate for the reservation pool: not suspended and not
    /// scheduling-blocked. Ride-now dispatch only checks suspension.
    pub fn can_accept_scheduled_work(&self, driver: Entity, now: u64) -> bool {
        if self.is_suspended(driver, now).is_suspended() {
            return false;
        }
        !self
            .records
            .get(&driver)
            .map(|r| r.scheduling_blocked)
            .unwrap_or(false)
    }

    /// An offer went out to this driver; feeds the acceptance rate.
    pub fn record_offer_seen(&mut self, driver: Entity) {
        self.entry(driver).offers_seen += 1;
    }

    pub fn record_offer_accepted(&mut self, driver: Entity) {
        self.entry(driver).offers_accepted += 1;
    }

    /// The reservation scheduler matched this driver to a booked trip.
    pub fn record_scheduled_commitment(&mut self, driver: Entity) {
        self.entry(driver).scheduled_trips += 1;
    }

    /// Apply one reliability default. The penalty table lives in
    /// [PenaltyConfig]; suspension and the scheduling block are
    /// re-evaluated after every application.
    pub fn record_default(
        &mut self,
        driver: Entity,
        kind: DefaultKind,
        now: u64,
        config: &PenaltyConfig,
    ) -> PenaltyResult {
        let points = match kind {
            DefaultKind::Timeout => config.timeout_penalty,
            DefaultKind::Cancellation => config.cancellation_penalty,
            DefaultKind::Ghosting => config.ghosting_penalty,
        };

        let record = self.entry(driver);
        record.score = (record.score - points).max(0.0);
        match kind {
            DefaultKind::Timeout => {
                record.timeouts += 1;
                record.last_timeout_at = Some(now);
            }
            DefaultKind::Cancellation => record.cancellations += 1,
            DefaultKind::Ghosting => {
                record.ghostings += 1;
                record.punctuality = (record.punctuality - 20.0).max(0.0);
            }
        }

        if record.score < config.suspension_threshold {
            let until = now + config.suspension_cooldown_ms;
            record.blocked_until = Some(record.blocked_until.map_or(until, |b| b.max(until)));
            record.suspension_reason = Some(kind);
        }
        Self::reevaluate_scheduling_block(record, config);

        let result = PenaltyResult {
            driver,
            kind,
            points,
            score_after: record.score,
            suspended: record.blocked_until.is_some_and(|until| until > now),
            scheduling_blocked: record.scheduling_blocked,
        };
        debug!(
            ?driver,
            ?kind,
            points,
            score_after = record.score,
            "reliability default recorded"
        );
        result
    }

    /// A completed trip nudges the score back up (capped at 100); the only
    /// recovery path besides the suspension window elapsing.
    pub fn record_completion(&mut self, driver: Entity, config: &PenaltyConfig) {
        let record = self.entry(driver);
        record.score = (record.score + config.completion_recovery).min(100.0);
        record.completed_trips += 1;
        Self::reevaluate_scheduling_block(record, config);
    }

    /// Pickup performed; on-time pickups nudge punctuality back up.
    pub fn record_pickup(&mut self, driver: Entity, on_time: bool) {
        let record = self.entry(driver);
        if on_time {
            record.punctuality = (record.punctuality + 1.0).min(100.0);
        } else {
            record.punctuality = (record.punctuality - 5.0).max(0.0);
        }
    }

    fn reevaluate_scheduling_block(record: &mut ReliabilityRecord, config: &PenaltyConfig) {
        record.scheduling_blocked = record.score < config.scheduling_block_threshold
            || record.cancellations >= config.cancellation_ceiling;
    }

    fn entry(&mut self, driver: Entity) -> &mut ReliabilityRecord {
        self.records.entry(driver).or_default()
    }
}
