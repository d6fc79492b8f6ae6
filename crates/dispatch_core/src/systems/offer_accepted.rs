//! Driver accepted the outstanding offer.
//!
//! Acceptance re-checks driver liveness: a driver who went offline or won
//! a concurrent request between offer and response is a decline-equivalent
//! outcome, not an error, and the cascade moves on. A successful accept
//! materializes the trip and arms the pickup grace deadline; the ledger
//! completion credit is deferred to actual trip completion.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::{debug, warn};

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::DispatchConfig;
use crate::dispatch::advance_cascade;
use crate::ecs::{
    CandidateList, Driver, DriverState, OfferHistory, OfferOutcome, RequestPhase, RideRequest,
    Trip, TripState,
};
use crate::events::{DispatchEvent, OutboundEvents, RejectReason};
use crate::ledger::ReliabilityLedger;

pub fn offer_accepted_system(
    mut commands: Commands,
    mut clock: ResMut<DispatchClock>,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut requests: Query<(&mut RideRequest, &mut CandidateList, &mut OfferHistory)>,
    mut drivers: Query<&mut Driver>,
) {
    if event.0.kind != EventKind::OfferAccepted {
        return;
    }
    let Some(EventSubject::Offer { request: request_entity, driver: driver_entity }) =
        event.0.subject
    else {
        return;
    };
    let Ok((mut request, mut candidates, mut history)) = requests.get_mut(request_entity) else {
        return;
    };
    if request.phase.is_terminal() {
        warn!(request = ?request_entity, driver = ?driver_entity, "accept on resolved request rejected");
        events.emit(DispatchEvent::ResponseRejected {
            request: request_entity,
            driver: Some(driver_entity),
            reason: RejectReason::AlreadyResolved,
        });
        return;
    }
    if request.phase != RequestPhase::Offering || request.offered_driver != Some(driver_entity) {
        // Expected under races (e.g. timeout already cascaded); not a bug signal.
        debug!(request = ?request_entity, driver = ?driver_entity, "stale accept ignored");
        return;
    }

    let live = drivers
        .get(driver_entity)
        .is_ok_and(|driver| driver.state == DriverState::Online);
    if !live {
        debug!(
            request = ?request_entity,
            driver = ?driver_entity,
            "driver unavailable at acceptance; treating as decline"
        );
        if let Some(attempt) = history.pending_for(driver_entity) {
            attempt.outcome = OfferOutcome::Declined;
        }
        advance_cascade(
            request_entity,
            &mut request,
            &mut candidates,
            &mut history,
            &mut ledger,
            &mut clock,
            &mut events,
            &config,
            |candidate| {
                drivers
                    .get(candidate)
                    .is_ok_and(|driver| driver.state == DriverState::Online)
            },
        );
        return;
    }

    if let Some(attempt) = history.pending_for(driver_entity) {
        attempt.outcome = OfferOutcome::Accepted;
    }
    ledger.record_offer_accepted(driver_entity);

    let matched_at = clock.now();
    let trip_entity = commands
        .spawn(Trip {
            request: request_entity,
            rider: request.rider,
            driver: driver_entity,
            pickup: request.origin.cell,
            dropoff: request.destination.cell,
            fare: request.final_fare,
            state: TripState::EnRoute,
            matched_at,
            pickup_at: None,
            completed_at: None,
        })
        .id();

    request.phase = RequestPhase::Matched;
    request.offered_driver = None;
    request.matched_driver = Some(driver_entity);
    request.trip = Some(trip_entity);

    if let Ok(mut driver) = drivers.get_mut(driver_entity) {
        driver.state = DriverState::EnRoute;
        driver.active_trip = Some(trip_entity);
    }

    events.emit(DispatchEvent::RequestMatched {
        request: request_entity,
        driver: driver_entity,
        trip: trip_entity,
    });
    clock.schedule_in(
        config.pickup_grace_ms,
        EventKind::PickupDeadline,
        Some(EventSubject::Trip(trip_entity)),
    );
}
