//! Dispatch engine entry points and the shared cascade step.
//!
//! A request moves from `Searching` to `Offering(driver)` and ends in
//! `Matched`, `Exhausted` or `Cancelled`, with `Offering` cycling through the frozen
//! ranking one driver at a time. The systems own the transitions; the
//! helpers here hold the pieces more than one system needs.

use bevy_ecs::prelude::{Entity, World};
use serde::Serialize;
use tracing::debug;

use crate::clock::{DispatchClock, EventKind, EventSubject};
use crate::config::DispatchConfig;
use crate::ecs::{
    CandidateList, OfferAttempt, OfferHistory, OfferOutcome, Place, RequestPhase, RideRequest,
    VehicleClass,
};
use crate::error::DispatchError;
use crate::events::{DispatchEvent, ExhaustReason, OutboundEvents};
use crate::ledger::ReliabilityLedger;

/// What a rider submits. The base fare is an input from the pricing
/// catalog; the core applies surge to it exactly once.
#[derive(Debug, Clone)]
pub struct RequestIntake {
    pub rider: Entity,
    pub origin: Place,
    pub destination: Place,
    pub class: VehicleClass,
    pub passenger_count: u8,
    pub base_fare: f64,
}

/// Spawn a request entity in `Searching` and schedule its submission event
/// at the current clock time. Pricing and ranking happen when the event is
/// applied, so both are captured at creation time.
pub fn submit_request(world: &mut World, intake: RequestIntake) -> Entity {
    let now = world.resource::<DispatchClock>().now();
    let request = world
        .spawn((
            RideRequest {
                rider: intake.rider,
                origin: intake.origin,
                destination: intake.destination,
                class: intake.class,
                passenger_count: intake.passenger_count,
                base_fare: intake.base_fare,
                surge_multiplier: 1.0,
                final_fare: intake.base_fare,
                phase: RequestPhase::Searching,
                offered_driver: None,
                matched_driver: None,
                trip: None,
                created_at: now,
            },
            CandidateList::default(),
            OfferHistory::default(),
        ))
        .id();
    world.resource_mut::<DispatchClock>().schedule_at(
        now,
        EventKind::RequestSubmitted,
        Some(EventSubject::Request(request)),
    );
    request
}

/// Rider-initiated cancellation; effective at the current clock time.
pub fn cancel_request(world: &mut World, request: Entity) {
    let now = world.resource::<DispatchClock>().now();
    world.resource_mut::<DispatchClock>().schedule_at(
        now,
        EventKind::RiderCancel,
        Some(EventSubject::Request(request)),
    );
}

pub enum CascadeOutcome {
    Offered { driver: Entity },
    Exhausted,
}

/// Advance to the next live candidate in the frozen ranking, or exhaust.
///
/// Skips candidates that fail the offer-time liveness check (went offline
/// or busy since ranking froze); staleness in the snapshot is handled
/// here, not by re-ranking. On offer: records the attempt, arms the
/// deadline timer, and emits `OfferCreated`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn advance_cascade<F>(
    request_entity: Entity,
    request: &mut RideRequest,
    candidates: &mut CandidateList,
    history: &mut OfferHistory,
    ledger: &mut ReliabilityLedger,
    clock: &mut DispatchClock,
    events: &mut OutboundEvents,
    config: &DispatchConfig,
    is_live: F,
) -> CascadeOutcome
where
    F: Fn(Entity) -> bool,
{
    while candidates.cursor < candidates.ranked.len() {
        let candidate = candidates.ranked[candidates.cursor].clone();
        candidates.cursor += 1;

        if !is_live(candidate.driver) {
            debug!(
                request = ?request_entity,
                driver = ?candidate.driver,
                rank = candidate.rank,
                "skipping candidate that failed the liveness check"
            );
            continue;
        }

        let offered_at = clock.now();
        let deadline = offered_at + config.offer_timeout_ms;
        history.0.push(OfferAttempt {
            driver: candidate.driver,
            rank: candidate.rank,
            offered_at,
            deadline,
            outcome: OfferOutcome::Pending,
        });
        request.phase = RequestPhase::Offering;
        request.offered_driver = Some(candidate.driver);
        ledger.record_offer_seen(candidate.driver);
        events.emit(DispatchEvent::OfferCreated {
            request: request_entity,
            driver: candidate.driver,
            rank: candidate.rank,
            deadline,
        });
        clock.schedule_in(
            config.offer_timeout_ms,
            EventKind::OfferDeadline,
            Some(EventSubject::Offer {
                request: request_entity,
                driver: candidate.driver,
            }),
        );
        return CascadeOutcome::Offered {
            driver: candidate.driver,
        };
    }

    request.phase = RequestPhase::Exhausted;
    request.offered_driver = None;
    events.emit(DispatchEvent::RequestExhausted {
        request: request_entity,
        reason: ExhaustReason::CascadeExhausted,
    });
    CascadeOutcome::Exhausted
}

/// One ranked candidate as support tooling sees it.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReportRow {
    pub driver: u64,
    pub rank: u32,
    pub score: f64,
    pub distance_km: f64,
}

/// One offer attempt as support tooling sees it.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptReportRow {
    pub driver: u64,
    pub rank: u32,
    pub offered_at: u64,
    pub deadline: u64,
    pub outcome: OfferOutcome,
}

/// Answers "who was this offered to and why" for one request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestReport {
    pub request: u64,
    pub phase: RequestPhase,
    pub base_fare: f64,
    pub surge_multiplier: f64,
    pub final_fare: f64,
    pub offered_driver: Option<u64>,
    pub matched_driver: Option<u64>,
    pub candidates: Vec<CandidateReportRow>,
    pub attempts: Vec<AttemptReportRow>,
}

pub fn request_report(world: &World, request: Entity) -> Result<RequestReport, DispatchError> {
    let ride = world
        .get::<RideRequest>(request)
        .ok_or(DispatchError::UnknownEntity)?;
    let candidates = world
        .get::<CandidateList>(request)
        .ok_or(DispatchError::UnknownEntity)?;
    let history = world
        .get::<OfferHistory>(request)
        .ok_or(DispatchError::UnknownEntity)?;

    Ok(RequestReport {
        request: request.to_bits(),
        phase: ride.phase,
        base_fare: ride.base_fare,
        surge_multiplier: ride.surge_multiplier,
        final_fare: ride.final_fare,
        offered_driver: ride.offered_driver.map(Entity::to_bits),
        matched_driver: ride.matched_driver.map(Entity::to_bits),
        candidates: candidates
            .ranked
            .iter()
            .map(|candidate| CandidateReportRow {
                driver: candidate.driver.to_bits(),
                rank: candidate.rank,
                score: candidate.score,
                distance_km: candidate.distance_km,
            })
            .collect(),
        attempts: history
            .0
            .iter()
            .map(|attempt| AttemptReportRow {
                driver: attempt.driver.to_bits(),
                rank: attempt.rank,
                offered_at: attempt.offered_at,
                deadline: attempt.deadline,
                outcome: attempt.outcome,
            })
            .collect(),
    })
}
