use bevy_ecs::prelude::{Component, Entity};
use h3o::CellIndex;
use serde::Serialize;

use crate::ranking::CandidateScore;

/// Vehicle classes a rider can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleClass {
    Economy,
    Comfort,
    Van,
    Bus,
}

/// A named location: human-readable label plus H3 cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub label: String,
    pub cell: CellIndex,
}

impl Place {
    pub fn new(label: impl Into<String>, cell: CellIndex) -> Self {
        Self {
            label: label.into(),
            cell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestPhase {
    Searching,
    Offering,
    Matched,
    Exhausted,
    Cancelled,
}

impl RequestPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestPhase::Matched | RequestPhase::Exhausted | RequestPhase::Cancelled
        )
    }
}

/// A rider's ask for transport. Owned and mutated exclusively by the
/// dispatch systems; the fare is fixed once the request has been priced.
#[derive(Debug, Clone, Component)]
pub struct RideRequest {
    pub rider: Entity,
    pub origin: Place,
    pub destination: Place,
    pub class: VehicleClass,
    pub passenger_count: u8,
    pub base_fare: f64,
    /// Captured once at submission from the surge table; never re-queried.
    pub surge_multiplier: f64,
    pub final_fare: f64,
    pub phase: RequestPhase,
    /// At most one non-null offered driver at any time.
    pub offered_driver: Option<Entity>,
    pub matched_driver: Option<Entity>,
    pub trip: Option<Entity>,
    pub created_at: u64,
}

/// Ranking computed once at submission. The order is frozen: the cascade
/// walks `ranked` by `cursor` and never re-ranks mid-flight.
#[derive(Debug, Clone, Default, Component)]
pub struct CandidateList {
    pub ranked: Vec<CandidateScore>,
    /// Index of the next candidate to offer to.
    pub cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OfferOutcome {
    Pending,
    Accepted,
    Declined,
    TimedOut,
}

/// One notification to one driver for one request.
#[derive(Debug, Clone)]
pub struct OfferAttempt {
    pub driver: Entity,
    pub rank: u32,
    pub offered_at: u64,
    pub deadline: u64,
    pub outcome: OfferOutcome,
}

/// Append-only attempt history for a request. While the request is in
/// `Offering`, exactly one attempt is `Pending`.
#[derive(Debug, Clone, Default, Component)]
pub struct OfferHistory(pub Vec<OfferAttempt>);

impl OfferHistory {
    pub fn pending_for(&mut self, driver: Entity) -> Option<&mut OfferAttempt> {
        self.0
            .iter_mut()
            .rev()
            .find(|attempt| attempt.driver == driver && attempt.outcome == OfferOutcome::Pending)
    }

    pub fn pending_count(&self) -> usize {
        self.0
            .iter()
            .filter(|attempt| attempt.outcome == OfferOutcome::Pending)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Offline,
    Online,
    EnRoute,
    OnTrip,
}

#[derive(Debug, Clone, Component)]
pub struct Driver {
    pub state: DriverState,
    pub class: VehicleClass,
    /// Star rating, 1.0–5.0.
    pub rating: f64,
    pub active_trip: Option<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Position(pub CellIndex);

/// Declared availability window for booked-ahead work (simulation ms).
#[derive(Debug, Clone, Copy, Component)]
pub struct DriverAvailability {
    pub from_ms: u64,
    pub to_ms: u64,
}

impl DriverAvailability {
    pub fn covers(&self, at_ms: u64) -> bool {
        self.from_ms <= at_ms && at_ms <= self.to_ms
    }
}

/// A rider account. `past_drivers` feeds the prior-history ranking bonus.
#[derive(Debug, Clone, Default, Component)]
pub struct Rider {
    pub past_drivers: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TripState {
    EnRoute,
    OnTrip,
    Completed,
    /// Driver accepted and never performed pickup; set when the pickup
    /// grace deadline fires first.
    Ghosted,
}

/// A materialized ride-now trip, created when a driver accepts an offer.
#[derive(Debug, Clone, Component)]
pub struct Trip {
    pub request: Entity,
    pub rider: Entity,
    pub driver: Entity,
    pub pickup: CellIndex,
    pub dropoff: CellIndex,
    pub fare: f64,
    pub state: TripState,
    pub matched_at: u64,
    pub pickup_at: Option<u64>,
    pub completed_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReservationStatus {
    Pending,
    Matched,
    Confirmed,
    Cancelled,
    Completed,
    NoShowClient,
    NoShowDriver,
}

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled
                | ReservationStatus::Completed
                | ReservationStatus::NoShowClient
                | ReservationStatus::NoShowDriver
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CancellingParty {
    Client,
    Driver,
}

#[derive(Debug, Clone)]
pub struct CancellationRecord {
    pub party: CancellingParty,
    pub cancelled_at: u64,
    pub penalty: f64,
}

/// A trip booked for a future time, matched by open broadcast instead of
/// the one-at-a-time cascade.
#[derive(Debug, Clone, Component)]
pub struct ScheduledTrip {
    pub client: Entity,
    pub driver: Option<Entity>,
    pub origin: Place,
    pub destination: Place,
    pub scheduled_at: u64,
    pub class: VehicleClass,
    pub estimated_fare: f64,
    pub security_deposit: f64,
    pub status: ReservationStatus,
    pub cancellation: Option<CancellationRecord>,
}

/// Drivers the reservation broadcast went out to; only these may accept.
#[derive(Debug, Clone, Default, Component)]
pub struct ReservationPool(pub Vec<Entity>);
