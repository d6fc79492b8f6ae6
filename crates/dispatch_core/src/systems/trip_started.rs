//! Driver performed pickup; the passenger is on board.
//!
//! Arriving before the grace deadline is what disarms ghost detection:
//! once the trip leaves `EnRoute`, the armed deadline event is stale.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::ecs::{Driver, DriverState, Trip, TripState};
use crate::ledger::ReliabilityLedger;

pub fn trip_started_system(
    clock: Res<DispatchClock>,
    event: Res<CurrentEvent>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut trips: Query<&mut Trip>,
    mut drivers: Query<&mut Driver>,
) {
    if event.0.kind != EventKind::TripStarted {
        return;
    }
    let Some(EventSubject::Trip(trip_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut trip) = trips.get_mut(trip_entity) else {
        return;
    };
    if trip.state != TripState::EnRoute {
        debug!(trip = ?trip_entity, "trip start on non-en-route trip ignored");
        return;
    }

    trip.state = TripState::OnTrip;
    trip.pickup_at = Some(clock.now());
    if let Ok(mut driver) = drivers.get_mut(trip.driver) {
        driver.state = DriverState::OnTrip;
    }
    ledger.record_pickup(trip.driver, true);
}
