//! Pickup grace deadline: ghost detection for matched trips.
//!
//! Armed at acceptance. If the driver performed pickup first, the trip has
//! left `EnRoute` and this event is stale. Otherwise the driver accepted
//! and never showed: the heaviest reliability default applies and the
//! driver is released.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::PenaltyConfig;
use crate::ecs::{Driver, DriverState, Trip, TripState};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::{DefaultKind, ReliabilityLedger};

pub fn pickup_timeout_system(
    clock: Res<DispatchClock>,
    event: Res<CurrentEvent>,
    penalties: Res<PenaltyConfig>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut trips: Query<&mut Trip>,
    mut drivers: Query<&mut Driver>,
) {
    if event.0.kind != EventKind::PickupDeadline {
        return;
    }
    let Some(EventSubject::Trip(trip_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut trip) = trips.get_mut(trip_entity) else {
        return;
    };
    if trip.state != TripState::EnRoute {
        debug!(trip = ?trip_entity, "stale pickup deadline ignored");
        return;
    }

    trip.state = TripState::Ghosted;
    let driver_entity = trip.driver;
    if let Ok(mut driver) = drivers.get_mut(driver_entity) {
        driver.state = DriverState::Online;
        driver.active_trip = None;
    }

    let penalty = ledger.record_default(driver_entity, DefaultKind::Ghosting, clock.now(), &penalties);
    events.emit(DispatchEvent::ReliabilityPenaltyApplied {
        driver: driver_entity,
        kind: penalty.kind,
        points: penalty.points,
        score_after: penalty.score_after,
    });
    events.emit(DispatchEvent::TripGhosted {
        trip: trip_entity,
        driver: driver_entity,
    });
}
