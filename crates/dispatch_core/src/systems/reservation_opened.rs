//! Reservation broadcast: open a pending scheduled trip to the pool.
//!
//! Unlike the ride-now cascade there is no ordering and no deadline here:
//! every eligible driver sees the trip at once and the first to accept
//! wins. Eligibility adds the scheduling gates the cascade does not use:
//! the declared availability window must cover the scheduled time and the
//! driver must not be scheduling-blocked.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};
use tracing::warn;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::ecs::{Driver, DriverAvailability, ReservationPool, ReservationStatus, ScheduledTrip};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::ReliabilityLedger;

pub fn reservation_opened_system(
    clock: Res<DispatchClock>,
    event: Res<CurrentEvent>,
    ledger: Res<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut reservations: Query<(&mut ScheduledTrip, &mut ReservationPool)>,
    drivers: Query<(Entity, &Driver, &DriverAvailability)>,
) {
    if event.0.kind != EventKind::ReservationOpened {
        return;
    }
    let Some(EventSubject::Reservation(trip_entity)) = event.0.subject else {
        return;
    };
    let Ok((trip, mut pool)) = reservations.get_mut(trip_entity) else {
        return;
    };
    if trip.status != ReservationStatus::Pending {
        return;
    }

    let now = clock.now();
    pool.0 = drivers
        .iter()
        .filter(|(_, driver, availability)| {
            driver.class == trip.class && availability.covers(trip.scheduled_at)
        })
        .filter(|(entity, _, _)| ledger.can_accept_scheduled_work(*entity, now))
        .map(|(entity, _, _)| entity)
        .collect();

    if pool.0.is_empty() {
        warn!(trip = ?trip_entity, "reservation broadcast found no eligible drivers");
    }
    events.emit(DispatchEvent::ReservationBroadcast {
        trip: trip_entity,
        pool: pool.0.clone(),
    });
}
