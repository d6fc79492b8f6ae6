//! Candidate ranker: eligibility filter plus composite scoring.
//!
//! Ranking is a pure function over a snapshot of nearby drivers and the
//! reliability ledger. The output is frozen at request submission: the
//! cascade walks it in rank order and never re-ranks, even when a
//! candidate's live state changes mid-flight (the cascade's own liveness
//! check at offer time absorbs that staleness).

use bevy_ecs::prelude::Entity;
use h3o::CellIndex;

use crate::config::RankingWeights;
use crate::ecs::{DriverState, VehicleClass};
use crate::ledger::ReliabilityLedger;
use crate::spatial::distance_km_between_cells;

/// What the driver locator reports for one online driver.
#[derive(Debug, Clone)]
pub struct DriverSnapshot {
    pub driver: Entity,
    pub cell: CellIndex,
    pub state: DriverState,
    pub class: VehicleClass,
    pub rating: f64,
    pub acceptance_rate: f64,
    /// Prior completed trips with the requesting rider.
    pub served_before: bool,
}

/// One ranked entry for one request/driver pair. Created once per ranking
/// pass and immutable afterwards.
#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub driver: Entity,
    /// Composite score on a 0–100 scale.
    pub score: f64,
    pub distance_km: f64,
    pub rating: f64,
    pub acceptance_rate: f64,
    pub served_before: bool,
    /// 1 = best.
    pub rank: u32,
}

/// Composite score for one candidate, 0–100 with default weights.
pub fn composite_score(
    weights: &RankingWeights,
    distance_km: f64,
    rating: f64,
    acceptance_rate: f64,
    served_before: bool,
    recently_timed_out: bool,
) -> f64 {
    let distance_component = weights.distance_weight / (1.0 + distance_km);
    let rating_component = weights.rating_weight * (rating / 5.0).clamp(0.0, 1.0);
    let acceptance_component = weights.acceptance_weight * acceptance_rate.clamp(0.0, 1.0);
    let history_bonus = if served_before {
        weights.prior_rider_bonus
    } else {
        0.0
    };
    let timeout_malus = if recently_timed_out {
        weights.recent_timeout_malus
    } else {
        0.0
    };
    (distance_component + rating_component + acceptance_component + history_bonus - timeout_malus)
        .max(0.0)
}

/// Rank the eligible drivers for a ride-now request.
///
/// Eligibility: online, requested vehicle class, not suspended, within
/// `max_pickup_km` of the pickup. Scheduling-blocked drivers stay eligible
/// here; that flag only restricts the reservation pool.
pub fn rank_candidates(
    origin: CellIndex,
    class: VehicleClass,
    drivers: &[DriverSnapshot],
    ledger: &ReliabilityLedger,
    weights: &RankingWeights,
    now: u64,
) -> Vec<CandidateScore> {
    let mut candidates: Vec<CandidateScore> = drivers
        .iter()
        .filter(|snapshot| snapshot.state == DriverState::Online)
        .filter(|snapshot| snapshot.class == class)
        .filter(|snapshot| !ledger.is_suspended(snapshot.driver, now).is_suspended())
        .filter_map(|snapshot| {
            let distance_km = distance_km_between_cells(snapshot.cell, origin);
            if distance_km > weights.max_pickup_km {
                return None;
            }
            let recently_timed_out = weights.deprioritize_recent_timeouts
                && ledger
                    .last_timeout_at(snapshot.driver)
                    .is_some_and(|at| now.saturating_sub(at) < weights.recent_timeout_window_ms);
            let score = composite_score(
                weights,
                distance_km,
                snapshot.rating,
                snapshot.acceptance_rate,
                snapshot.served_before,
                recently_timed_out,
            );
            Some(CandidateScore {
                driver: snapshot.driver,
                score,
                distance_km,
                rating: snapshot.rating,
                acceptance_rate: snapshot.acceptance_rate,
                served_before: snapshot.served_before,
                rank: 0,
            })
        })
        .collect();

    // Deterministic order: score desc, then closest, then entity.
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.driver.cmp(&b.driver))
    });
    for (index, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = index as u32 + 1;
    }
    candidates
}
