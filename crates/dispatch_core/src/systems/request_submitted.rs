//! Request intake: capture surge, freeze the ranking, start the cascade.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind, EventSubject};
use crate::config::{DispatchConfig, RankingWeights};
use crate::dispatch::advance_cascade;
use crate::ecs::{
    CandidateList, Driver, DriverState, OfferHistory, Position, RequestPhase, Rider, RideRequest,
};
use crate::events::{DispatchEvent, ExhaustReason, OutboundEvents};
use crate::ledger::ReliabilityLedger;
use crate::ranking::{rank_candidates, DriverSnapshot};
use crate::surge::SurgeTable;

pub fn request_submitted_system(
    mut clock: ResMut<DispatchClock>,
    event: Res<CurrentEvent>,
    config: Res<DispatchConfig>,
    weights: Res<RankingWeights>,
    surge: Res<SurgeTable>,
    mut ledger: ResMut<ReliabilityLedger>,
    mut events: ResMut<OutboundEvents>,
    mut requests: Query<(&mut RideRequest, &mut CandidateList, &mut OfferHistory)>,
    drivers: Query<(Entity, &Driver, &Position)>,
    riders: Query<&Rider>,
) {
    if event.0.kind != EventKind::RequestSubmitted {
        return;
    }
    let Some(EventSubject::Request(request_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut request, mut candidates, mut history)) = requests.get_mut(request_entity) else {
        return;
    };
    if request.phase != RequestPhase::Searching {
        return;
    }

    // Surge is captured exactly once here; the cascade never re-queries it.
    let multiplier = surge.current_multiplier(request.origin.cell, clock.now());
    request.surge_multiplier = multiplier;
    request.final_fare = request.base_fare * multiplier;

    let past_drivers = riders
        .get(request.rider)
        .map(|rider| rider.past_drivers.clone())
        .unwrap_or_default();
    let snapshots: Vec<DriverSnapshot> = drivers
        .iter()
        .map(|(entity, driver, position)| DriverSnapshot {
            driver: entity,
            cell: position.0,
            state: driver.state,
            class: driver.class,
            rating: driver.rating,
            acceptance_rate: ledger.acceptance_rate(entity),
            served_before: past_drivers.contains(&entity),
        })
        .collect();

    candidates.ranked = rank_candidates(
        request.origin.cell,
        request.class,
        &snapshots,
        &ledger,
        &weights,
        clock.now(),
    );
    candidates.cursor = 0;

    if candidates.ranked.is_empty() {
        request.phase = RequestPhase::Exhausted;
        events.emit(DispatchEvent::RequestExhausted {
            request: request_entity,
            reason: ExhaustReason::NoDriversAvailable,
        });
        return;
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
        |driver| {
            drivers
                .get(driver)
                .is_ok_and(|(_, driver, _)| driver.state == DriverState::Online)
        },
    );
}
