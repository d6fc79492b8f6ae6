//! No-show handling for confirmed reservations.
//!
//! A driver failing to appear for a confirmed commitment routes through
//! the same ghosting default as the ride-now cascade; the ledger is the
//! single source of reliability consequences across both topologies.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::PenaltyConfig;
use crate::ecs::{ReservationStatus, ScheduledTrip};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::{DefaultKind, ReliabilityLedger};

pub fn reservation_no_show_system(
    clock: Res<DispatchClock>,
    event: Res<CurrentEvent>,
    penalties: Res<PenaltyConfig>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut reservations: Query<&mut ScheduledTrip>,
) {
    let status = match event.0.kind {
        EventKind::ReservationNoShowClient => ReservationStatus::NoShowClient,
        EventKind::ReservationNoShowDriver => ReservationStatus::NoShowDriver,
        _ => return,
    };
    let Some(EventSubject::Reservation(trip_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut trip) = reservations.get_mut(trip_entity) else {
        return;
    };
    if trip.status != ReservationStatus::Confirmed {
        debug!(trip = ?trip_entity, "no-show on unconfirmed reservation ignored");
        return;
    }

    trip.status = status;
    if status == ReservationStatus::NoShowDriver {
        if let Some(driver) = trip.driver {
            let result = ledger.record_default(driver, DefaultKind::Ghosting, clock.now(), &penalties);
            events.emit(DispatchEvent::ReliabilityPenaltyApplied {
                driver,
                kind: result.kind,
                points: result.points,
                score_after: result.score_after,
            });
        }
    }
}
