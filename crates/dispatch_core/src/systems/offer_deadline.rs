//! Offer deadline: the 30-second timer fired for an outstanding offer.
//!
//! A timeout is an implicit decline for cascade purposes but is tracked
//! distinctly and feeds the ledger as a low-weight default. The event
//! carries the `(request, driver)` pair it was armed for; if the cascade
//! has already moved past that pair the timer is stale and does nothing.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::{DispatchConfig, PenaltyConfig};
use crate::dispatch::advance_cascade;
use crate::ecs::{
    CandidateList, Driver, DriverState, OfferHistory, OfferOutcome, RequestPhase, RideRequest,
};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::{DefaultKind, ReliabilityLedger};

pub fn offer_deadline_system(
    mut clock: ResMut<DispatchClock>,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    penalties: Res<PenaltyConfig>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut requests: Query<(&mut RideRequest, &mut CandidateList, &mut OfferHistory)>,
    drivers: Query<&Driver>,
) {
    if event.0.kind != EventKind::OfferDeadline {
        return;
    }
    let Some(EventSubject::Offer { request: request_entity, driver }) = event.0.subject else {
        return;
    };
    let Ok((mut request, mut candidates, mut history)) = requests.get_mut(request_entity) else {
        return;
    };
    if request.phase != RequestPhase::Offering || request.offered_driver != Some(driver) {
        // A response or cancellation won the race; the timer is stale.
        debug!(request = ?request_entity, ?driver, "stale offer deadline ignored");
        return;
    }

    if let Some(attempt) = history.pending_for(driver) {
        attempt.outcome = OfferOutcome::TimedOut;
    }
    let penalty = ledger.record_default(driver, DefaultKind::Timeout, clock.now(), &penalties);
    events.emit(DispatchEvent::ReliabilityPenaltyApplied {
        driver,
        kind: penalty.kind,
        points: penalty.points,
        score_after: penalty.score_after,
    });

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
