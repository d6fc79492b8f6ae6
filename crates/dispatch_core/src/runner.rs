//! Event runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each
//! step pops the next event from [DispatchClock], inserts it as
//! [CurrentEvent], then runs the schedule. One event is fully applied
//! before the next pops, which is what serializes all per-entity state
//! transitions and per-driver ledger writes.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::systems::{
    offer_accepted::offer_accepted_system, offer_deadline::offer_deadline_system,
    offer_declined::offer_declined_system, pickup_timeout::pickup_timeout_system,
    request_submitted::request_submitted_system,
    reservation_accepted::reservation_accepted_system,
    reservation_cancelled::reservation_cancelled_system,
    reservation_confirmed::reservation_confirmed_system,
    reservation_no_show::reservation_no_show_system,
    reservation_opened::reservation_opened_system, rider_cancel::rider_cancel_system,
    trip_completed::trip_completed_system, trip_started::trip_started_system,
};

// Condition functions for each event kind
fn is_request_submitted(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RequestSubmitted)
        .unwrap_or(false)
}

fn is_offer_deadline(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::OfferDeadline)
        .unwrap_or(false)
}

fn is_offer_accepted(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::OfferAccepted)
        .unwrap_or(false)
}

fn is_offer_declined(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::OfferDeclined)
        .unwrap_or(false)
}

fn is_rider_cancel(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RiderCancel)
        .unwrap_or(false)
}

fn is_pickup_deadline(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::PickupDeadline)
        .unwrap_or(false)
}

fn is_trip_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TripStarted)
        .unwrap_or(false)
}

fn is_trip_completed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TripCompleted)
        .unwrap_or(false)
}

fn is_reservation_opened(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ReservationOpened)
        .unwrap_or(false)
}

fn is_reservation_accepted(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ReservationAccepted)
        .unwrap_or(false)
}

fn is_reservation_confirmed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ReservationConfirmed)
        .unwrap_or(false)
}

fn is_reservation_cancelled(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| {
            matches!(
                e.0.kind,
                EventKind::ReservationCancelledByClient | EventKind::ReservationCancelledByDriver
            )
        })
        .unwrap_or(false)
}

fn is_reservation_no_show(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| {
            matches!(
                e.0.kind,
                EventKind::ReservationNoShowClient | EventKind::ReservationNoShowDriver
            )
        })
        .unwrap_or(false)
}

/// Runs one step: pops the next event, inserts it as [CurrentEvent], then
/// runs the schedule. Returns `false` when the clock is empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let event = match world.resource_mut::<DispatchClock>().pop_next() {
        Some(event) => event,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Builds the full dispatch schedule: all event-reacting systems plus
/// [apply_deferred] so spawned entities (e.g. [crate::ecs::Trip]) are
/// applied before the next step.
///
/// Systems are conditionally executed based on event type to reduce overhead.
pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems((
        // RequestSubmitted
        request_submitted_system.run_if(is_request_submitted),
        // OfferDeadline
        offer_deadline_system.run_if(is_offer_deadline),
        // OfferAccepted
        offer_accepted_system.run_if(is_offer_accepted),
        // OfferDeclined
        offer_declined_system.run_if(is_offer_declined),
        // RiderCancel
        rider_cancel_system.run_if(is_rider_cancel),
        // PickupDeadline
        pickup_timeout_system.run_if(is_pickup_deadline),
        // TripStarted
        trip_started_system.run_if(is_trip_started),
        // TripCompleted
        trip_completed_system.run_if(is_trip_completed),
        // ReservationOpened
        reservation_opened_system.run_if(is_reservation_opened),
        // ReservationAccepted
        reservation_accepted_system.run_if(is_reservation_accepted),
        // ReservationConfirmed
        reservation_confirmed_system.run_if(is_reservation_confirmed),
        // ReservationCancelledBy*
        reservation_cancelled_system.run_if(is_reservation_cancelled),
        // ReservationNoShow*
        reservation_no_show_system.run_if(is_reservation_no_show),
        // Always run apply_deferred to ensure spawned entities are available
        apply_deferred,
    ));

    schedule
}
