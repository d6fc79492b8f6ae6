//! Reservation cancellation by either party.
//!
//! Cancelling a confirmed trip inside the penalty window forfeits the full
//! security deposit; the amount and the cancelling party are recorded on
//! the trip, never silently dropped. A driver who backs out of a confirmed
//! commitment inside the window additionally takes a cancellation default
//! in the ledger.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::{PenaltyConfig, ReservationConfig};
use crate::ecs::{CancellationRecord, CancellingParty, ReservationStatus, ScheduledTrip};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::{DefaultKind, ReliabilityLedger};
use crate::reservation::cancellation_penalty;

pub fn reservation_cancelled_system(
    clock: Res<DispatchClock>,
    event: Res<CurrentEvent>,
    config: Res<ReservationConfig>,
    penalties: Res<PenaltyConfig>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut reservations: Query<&mut ScheduledTrip>,
) {
    let party = match event.0.kind {
        EventKind::ReservationCancelledByClient => CancellingParty::Client,
        EventKind::ReservationCancelledByDriver => CancellingParty::Driver,
        _ => return,
    };
    let Some(EventSubject::Reservation(trip_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut trip) = reservations.get_mut(trip_entity) else {
        return;
    };
    if trip.status.is_terminal() {
        debug!(trip = ?trip_entity, "cancel on settled reservation ignored");
        return;
    }

    let now = clock.now();
    let penalty = cancellation_penalty(&trip, now, &config);
    trip.status = ReservationStatus::Cancelled;
    trip.cancellation = Some(CancellationRecord {
        party,
        cancelled_at: now,
        penalty,
    });

    if party == CancellingParty::Driver && penalty > 0.0 {
        if let Some(driver) = trip.driver {
            let result = ledger.record_default(driver, DefaultKind::Cancellation, now, &penalties);
            events.emit(DispatchEvent::ReliabilityPenaltyApplied {
                driver,
                kind: result.kind,
                points: result.points,
                score_after: result.score_after,
            });
        }
    }

    events.emit(DispatchEvent::ReservationCancelled {
        trip: trip_entity,
        party,
        penalty,
    });
}

#[cfg(test)]
mod tests {
    use bevy_ecs::prelude::{Entity, Schedule, World};

    use super::*;
    use crate::clock::ONE_MIN_MS;
    use crate::ecs::{Place, VehicleClass};
    use crate::test_helpers::{create_test_world, test_cell, test_neighbor_cell};

    fn confirmed_trip(world: &mut World, scheduled_at: u64) -> (Entity, Entity) {
        let client = world.spawn_empty().id();
        let driver = world.spawn_empty().id();
        let trip = world
            .spawn(ScheduledTrip {
                client,
                driver: Some(driver),
                origin: Place::new("A", test_cell()),
                destination: Place::new("B", test_neighbor_cell()),
                scheduled_at,
                class: VehicleClass::Economy,
                estimated_fare: 30.0,
                security_deposit: 10.0,
                status: ReservationStatus::Confirmed,
                cancellation: None,
            })
            .id();
        (trip, driver)
    }

    fn advance_to(world: &mut World, at_ms: u64, kind: EventKind, trip: Entity) {
        world
            .resource_mut::<DispatchClock>()
            .schedule_at(at_ms, kind, Some(EventSubject::Reservation(trip)));
        let event = world
            .resource_mut::<DispatchClock>()
            .pop_next()
            .expect("event");
        world.insert_resource(CurrentEvent(event));
    }

    #[test]
    fn client_cancel_90_minutes_ahead_is_penalty_free() {
        let mut world = create_test_world();
        let (trip, _driver) = confirmed_trip(&mut world, 120 * ONE_MIN_MS);

        advance_to(
            &mut world,
            30 * ONE_MIN_MS,
            EventKind::ReservationCancelledByClient,
            trip,
        );
        let mut schedule = Schedule::default();
        schedule.add_systems(reservation_cancelled_system);
        schedule.run(&mut world);

        let scheduled = world.get::<ScheduledTrip>(trip).expect("trip");
        assert_eq!(scheduled.status, ReservationStatus::Cancelled);
        let record = scheduled.cancellation.as_ref().expect("record");
        assert_eq!(record.party, CancellingParty::Client);
        assert_eq!(record.penalty, 0.0);
    }

    #[test]
    fn client_cancel_40_minutes_ahead_forfeits_the_deposit() {
        let mut world = create_test_world();
        let (trip, driver) = confirmed_trip(&mut world, 120 * ONE_MIN_MS);

        advance_to(
            &mut world,
            80 * ONE_MIN_MS,
            EventKind::ReservationCancelledByClient,
            trip,
        );
        let mut schedule = Schedule::default();
        schedule.add_systems(reservation_cancelled_system);
        schedule.run(&mut world);

        let scheduled = world.get::<ScheduledTrip>(trip).expect("trip");
        let record = scheduled.cancellation.as_ref().expect("record");
        assert_eq!(record.penalty, 10.0);
        // The client cancelling does not dent the driver's reliability.
        assert_eq!(world.resource::<ReliabilityLedger>().get(driver).cancellations, 0);
    }

    #[test]
    fn driver_cancel_inside_the_window_also_takes_a_ledger_default() {
        let mut world = create_test_world();
        let (trip, driver) = confirmed_trip(&mut world, 120 * ONE_MIN_MS);

        advance_to(
            &mut world,
            100 * ONE_MIN_MS,
            EventKind::ReservationCancelledByDriver,
            trip,
        );
        let mut schedule = Schedule::default();
        schedule.add_systems(reservation_cancelled_system);
        schedule.run(&mut world);

        let scheduled = world.get::<ScheduledTrip>(trip).expect("trip");
        let record = scheduled.cancellation.as_ref().expect("record");
        assert_eq!(record.party, CancellingParty::Driver);
        assert_eq!(record.penalty, 10.0);

        let reliability = world.resource::<ReliabilityLedger>().get(driver);
        assert_eq!(reliability.cancellations, 1);
        assert!(reliability.score < 100.0);
    }
}
