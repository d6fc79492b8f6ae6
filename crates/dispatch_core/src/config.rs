//! Policy configuration resources.
//!
//! Every constant here is policy, not physics: the defaults are the
//! documented production values, and tests pin the relationships between
//! them (e.g. the penalty ordering) rather than the raw numbers.

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::clock::{ONE_HOUR_MS, ONE_MIN_MS, ONE_SEC_MS};

/// Dispatch engine timing knobs.
#[derive(Debug, Clone, Copy, Resource, Serialize)]
pub struct DispatchConfig {
    /// How long one driver holds an offer before it times out.
    pub offer_timeout_ms: u64,
    /// How long a matched driver has to perform pickup before the trip is
    /// treated as ghosted.
    pub pickup_grace_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offer_timeout_ms: 30 * ONE_SEC_MS,
            pickup_grace_ms: 10 * ONE_MIN_MS,
        }
    }
}

/// Composite-score weights for the candidate ranker. The four weights sum
/// to 100 so the composite lands on a 0–100 scale.
#[derive(Debug, Clone, Copy, Resource, Serialize)]
pub struct RankingWeights {
    /// Weight of inverse distance to pickup.
    pub distance_weight: f64,
    /// Weight of the driver's star rating.
    pub rating_weight: f64,
    /// Weight of the driver's offer acceptance rate.
    pub acceptance_weight: f64,
    /// Bonus for prior completed trips with this rider.
    pub prior_rider_bonus: f64,
    /// Candidates further than this from pickup are not ranked.
    pub max_pickup_km: f64,
    /// When set, a driver who recently timed out on another request takes
    /// `recent_timeout_malus` off the composite. Deprioritization, never
    /// exclusion.
    pub deprioritize_recent_timeouts: bool,
    pub recent_timeout_window_ms: u64,
    pub recent_timeout_malus: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            distance_weight: 40.0,
            rating_weight: 25.0,
            acceptance_weight: 25.0,
            prior_rider_bonus: 10.0,
            max_pickup_km: 10.0,
            deprioritize_recent_timeouts: true,
            recent_timeout_window_ms: 10 * ONE_MIN_MS,
            recent_timeout_malus: 15.0,
        }
    }
}

/// The reliability penalty table. Ordering is the contract: ghosting costs
/// more than an active cancellation, which costs more than a timeout; a
/// pre-acceptance decline costs nothing at all.
#[derive(Debug, Clone, Copy, Resource, Serialize)]
pub struct PenaltyConfig {
    /// Silent non-response to an offer. Lower weight than an active
    /// cancellation: it discourages ghost-holding an offer without
    /// equating it to backing out of a commitment.
    pub timeout_penalty: f64,
    /// Cancellation after acceptance.
    pub cancellation_penalty: f64,
    /// Accepting and never performing pickup.
    pub ghosting_penalty: f64,
    /// Score regained per completed trip, capped at 100.
    pub completion_recovery: f64,
    /// Below this score the driver is suspended from all dispatch.
    pub suspension_threshold: f64,
    /// Length of the suspension cool-down window.
    pub suspension_cooldown_ms: u64,
    /// Below this score the driver keeps ride-now offers but is excluded
    /// from the reservation pool.
    pub scheduling_block_threshold: f64,
    /// Cancellation count at or above which the scheduling block applies
    /// regardless of score.
    pub cancellation_ceiling: u32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            timeout_penalty: 3.0,
            cancellation_penalty: 8.0,
            ghosting_penalty: 15.0,
            completion_recovery: 1.0,
            suspension_threshold: 40.0,
            suspension_cooldown_ms: 24 * ONE_HOUR_MS,
            scheduling_block_threshold: 70.0,
            cancellation_ceiling: 4,
        }
    }
}

/// Reservation scheduler knobs.
#[derive(Debug, Clone, Copy, Resource, Serialize)]
pub struct ReservationConfig {
    /// Cancelling a confirmed trip closer than this to the scheduled time
    /// forfeits the full security deposit.
    pub penalty_window_ms: u64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            penalty_window_ms: ONE_HOUR_MS,
        }
    }
}
