//! First driver to accept a broadcast reservation wins it.
//!
//! The win is decided by the phase compare on the trip: only a `Pending`
//! trip can be taken, so every later accept is stale and ignored.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::ecs::{ReservationPool, ReservationStatus, ScheduledTrip};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::ReliabilityLedger;

pub fn reservation_accepted_system(
    clock: Res<DispatchClock>,
    event: Res<CurrentEvent>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut reservations: Query<(&mut ScheduledTrip, &ReservationPool)>,
) {
    if event.0.kind != EventKind::ReservationAccepted {
        return;
    }
    let Some(EventSubject::ReservationBid { trip: trip_entity, driver }) = event.0.subject else {
        return;
    };
    let Ok((mut trip, pool)) = reservations.get_mut(trip_entity) else {
        return;
    };
    if trip.status != ReservationStatus::Pending {
        // Someone else already took it.
        debug!(trip = ?trip_entity, ?driver, "late reservation accept ignored");
        return;
    }
    if !pool.0.contains(&driver) {
        debug!(trip = ?trip_entity, ?driver, "accept from outside the broadcast pool ignored");
        return;
    }
    if !ledger.can_accept_scheduled_work(driver, clock.now()) {
        debug!(trip = ?trip_entity, ?driver, "accept from a now-ineligible driver ignored");
        return;
    }

    trip.status = ReservationStatus::Matched;
    trip.driver = Some(driver);
    ledger.record_scheduled_commitment(driver);
    events.emit(DispatchEvent::TripReserved {
        trip: trip_entity,
        driver,
    });
}
