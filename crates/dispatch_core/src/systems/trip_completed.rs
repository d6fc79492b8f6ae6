//! Trip reached dropoff.
//!
//! Completion is the only score-recovery path in the ledger and the
//! source of the prior-rider ranking bonus for future requests.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::PenaltyConfig;
use crate::ecs::{Driver, DriverState, Rider, Trip, TripState};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::ReliabilityLedger;

pub fn trip_completed_system(
    clock: Res<DispatchClock>,
    event: Res<CurrentEvent>,
    penalties: Res<PenaltyConfig>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut trips: Query<&mut Trip>,
    mut drivers: Query<&mut Driver>,
    mut riders: Query<&mut Rider>,
) {
    if event.0.kind != EventKind::TripCompleted {
        return;
    }
    let Some(EventSubject::Trip(trip_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut trip) = trips.get_mut(trip_entity) else {
        return;
    };
    if trip.state != TripState::OnTrip {
        debug!(trip = ?trip_entity, "completion on non-active trip ignored");
        return;
    }

    trip.state = TripState::Completed;
    trip.completed_at = Some(clock.now());

    if let Ok(mut driver) = drivers.get_mut(trip.driver) {
        driver.state = DriverState::Online;
        driver.active_trip = None;
    }
    if let Ok(mut rider) = riders.get_mut(trip.rider) {
        if !rider.past_drivers.contains(&trip.driver) {
            rider.past_drivers.push(trip.driver);
        }
    }

    ledger.record_completion(trip.driver, &penalties);
    events.emit(DispatchEvent::TripCompleted {
        trip: trip_entity,
        driver: trip.driver,
    });
}
