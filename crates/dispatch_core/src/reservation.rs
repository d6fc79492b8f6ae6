//! Reservation scheduler entry points and penalty math.
//!
//! Booked-ahead trips differ from the ride-now cascade in matching
//! topology only: a pending trip is broadcast to the whole eligible pool
//! and the first driver to accept wins. Reliability consequences flow
//! through the same ledger.

use bevy_ecs::prelude::{Entity, World};

use crate::clock::{DispatchClock, EventKind, EventSubject};
use crate::config::ReservationConfig;
use crate::ecs::{Place, ReservationPool, ReservationStatus, ScheduledTrip, VehicleClass};

#[derive(Debug, Clone)]
pub struct ReservationIntake {
    pub client: Entity,
    pub origin: Place,
    pub destination: Place,
    pub scheduled_at: u64,
    pub class: VehicleClass,
    pub estimated_fare: f64,
    pub security_deposit: f64,
}

/// Spawn a pending scheduled trip and schedule its pool broadcast at the
/// current clock time.
pub fn reserve_trip(world: &mut World, intake: ReservationIntake) -> Entity {
    let now = world.resource::<DispatchClock>().now();
    let trip = world
        .spawn((
            ScheduledTrip {
                client: intake.client,
                driver: None,
                origin: intake.origin,
                destination: intake.destination,
                scheduled_at: intake.scheduled_at,
                class: intake.class,
                estimated_fare: intake.estimated_fare,
                security_deposit: intake.security_deposit,
                status: ReservationStatus::Pending,
                cancellation: None,
            },
            ReservationPool::default(),
        ))
        .id();
    world.resource_mut::<DispatchClock>().schedule_at(
        now,
        EventKind::ReservationOpened,
        Some(EventSubject::Reservation(trip)),
    );
    trip
}

/// Penalty owed for cancelling now: the full security deposit when a
/// confirmed trip is cancelled inside the penalty window, zero otherwise.
pub fn cancellation_penalty(trip: &ScheduledTrip, now: u64, config: &ReservationConfig) -> f64 {
    if trip.status != ReservationStatus::Confirmed {
        return 0.0;
    }
    if trip.scheduled_at.saturating_sub(now) < config.penalty_window_ms {
        trip.security_deposit
    } else {
        0.0
    }
}
