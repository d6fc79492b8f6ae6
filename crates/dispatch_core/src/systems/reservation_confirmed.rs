//! Driver re-affirmation of a matched reservation.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, EventSubject};
use crate::ecs::{ReservationStatus, ScheduledTrip};
use crate::events::{DispatchEvent, OutboundEvents};

pub fn reservation_confirmed_system(
    event: Res<CurrentEvent>,
    mut events: ResMut<OutboundEvents>,
    mut reservations: Query<&mut ScheduledTrip>,
) {
    if event.0.kind != EventKind::ReservationConfirmed {
        return;
    }
    let Some(EventSubject::ReservationBid { trip: trip_entity, driver }) = event.0.subject else {
        return;
    };
    let Ok(mut trip) = reservations.get_mut(trip_entity) else {
        return;
    };
    if trip.status != ReservationStatus::Matched || trip.driver != Some(driver) {
        debug!(trip = ?trip_entity, ?driver, "confirmation for a non-matched pair ignored");
        return;
    }

    trip.status = ReservationStatus::Confirmed;
    events.emit(DispatchEvent::ReservationConfirmed {
        trip: trip_entity,
        driver,
    });
}

#[cfg(test)]
mod tests {
    use bevy_ecs::prelude::{Schedule, World};

    use super::*;
    use crate::clock::DispatchClock;
    use crate::ecs::{Place, ReservationPool, VehicleClass};
    use crate::test_helpers::{create_test_world, test_cell, test_neighbor_cell};

    #[test]
    fn only_the_matched_driver_can_confirm() {
        let mut world = create_test_world();
        let matched = world.spawn_empty().id();
        let other = world.spawn_empty().id();
        let client = world.spawn_empty().id();
        let trip = world
            .spawn((
                ScheduledTrip {
                    client,
                    driver: Some(matched),
                    origin: Place::new("A", test_cell()),
                    destination: Place::new("B", test_neighbor_cell()),
                    scheduled_at: 7_200_000,
                    class: VehicleClass::Economy,
                    estimated_fare: 30.0,
                    security_deposit: 10.0,
                    status: ReservationStatus::Matched,
                    cancellation: None,
                },
                ReservationPool(vec![matched, other]),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(reservation_confirmed_system);

        // A confirmation from the wrong driver changes nothing.
        world.resource_mut::<DispatchClock>().schedule_in_secs(
            1,
            EventKind::ReservationConfirmed,
            Some(EventSubject::ReservationBid { trip, driver: other }),
        );
        let event = world
            .resource_mut::<DispatchClock>()
            .pop_next()
            .expect("event");
        world.insert_resource(CurrentEvent(event));
        schedule.run(&mut world);
        assert_eq!(
            world.get::<ScheduledTrip>(trip).expect("trip").status,
            ReservationStatus::Matched
        );

        world.resource_mut::<DispatchClock>().schedule_in_secs(
            2,
            EventKind::ReservationConfirmed,
            Some(EventSubject::ReservationBid { trip, driver: matched }),
        );
        let event = world
            .resource_mut::<DispatchClock>()
            .pop_next()
            .expect("event");
        world.insert_resource(CurrentEvent(event));
        schedule.run(&mut world);
        assert_eq!(
            world.get::<ScheduledTrip>(trip).expect("trip").status,
            ReservationStatus::Confirmed
        );
    }
}
