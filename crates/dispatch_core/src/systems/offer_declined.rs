//! Driver declined the outstanding offer.
//!
//! A pre-acceptance decline carries no reliability penalty: "didn't want
//! it" is not "backed out after committing". The cascade simply advances.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::{debug, warn};

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::DispatchConfig;
use crate::dispatch::advance_cascade;
use crate::ecs::{
    CandidateList, Driver, DriverState, OfferHistory, OfferOutcome, RequestPhase, RideRequest,
};
use crate::events::{DispatchEvent, OutboundEvents, RejectReason};
use crate::ledger::ReliabilityLedger;

pub fn offer_declined_system(
    mut clock: ResMut<DispatchClock>,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut requests: Query<(&mut RideRequest, &mut CandidateList, &mut OfferHistory)>,
    drivers: Query<&Driver>,
) {
    if event.0.kind != EventKind::OfferDeclined {
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
        warn!(request = ?request_entity, driver = ?driver_entity, "decline on resolved request rejected");
        events.emit(DispatchEvent::ResponseRejected {
            request: request_entity,
            driver: Some(driver_entity),
            reason: RejectReason::AlreadyResolved,
        });
        return;
    }
    if request.phase != RequestPhase::Offering || request.offered_driver != Some(driver_entity) {
        debug!(request = ?request_entity, driver = ?driver_entity, "stale decline ignored");
        return;
    }

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
}
