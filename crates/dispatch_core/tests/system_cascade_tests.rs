mod support;

use bevy_ecs::prelude::World;
use dispatch_core::clock::{DispatchClock, EventKind, EventSubject};
use dispatch_core::dispatch::{submit_request, RequestIntake};
use dispatch_core::ecs::{
    CandidateList, Driver, OfferHistory, OfferOutcome, Place, RequestPhase, RideRequest, Trip,
    TripState, VehicleClass,
};
use dispatch_core::ledger::ReliabilityLedger;
use dispatch_core::runner::{dispatch_schedule, run_next_event, run_until_empty};

use support::world::{neighbor_cell, seed_cell, spawn_driver, spawn_rider, TestWorldBuilder};

fn submit(world: &mut World) -> bevy_ecs::prelude::Entity {
    let rider = spawn_rider(world);
    submit_request(
        world,
        RequestIntake {
            rider,
            origin: Place::new("Central Station", seed_cell()),
            destination: Place::new("Harbor", neighbor_cell(seed_cell())),
            class: VehicleClass::Economy,
            passenger_count: 1,
            base_fare: 10.0,
        },
    )
}

/// Ranking [D1, D2, D3]: D1 times out at 30s, D2 declines, D3
/// accepts. The request matches D3 and only D1 is penalized, once.
#[test]
fn timeout_then_decline_then_accept_matches_the_third_candidate() {
    let mut world = TestWorldBuilder::new().build();
    let cell = seed_cell();
    // Descending ratings pin the frozen ranking order.
    let d1 = spawn_driver(&mut world, cell, 5.0);
    let d2 = spawn_driver(&mut world, cell, 4.5);
    let d3 = spawn_driver(&mut world, cell, 4.0);

    let request = submit(&mut world);
    let mut schedule = dispatch_schedule();

    // Submission: offer goes to D1 with a 30s deadline.
    run_next_event(&mut world, &mut schedule);
    {
        let ride = world.get::<RideRequest>(request).expect("request");
        assert_eq!(ride.phase, RequestPhase::Offering);
        assert_eq!(ride.offered_driver, Some(d1));
        let history = world.get::<OfferHistory>(request).expect("history");
        assert_eq!(history.pending_count(), 1, "exactly one pending offer");
    }

    // D2 declines right after receiving the cascaded offer; D3 accepts.
    world.resource_mut::<DispatchClock>().schedule_at(
        31_000,
        EventKind::OfferDeclined,
        Some(EventSubject::Offer {
            request,
            driver: d2,
        }),
    );
    world.resource_mut::<DispatchClock>().schedule_at(
        33_000,
        EventKind::OfferAccepted,
        Some(EventSubject::Offer {
            request,
            driver: d3,
        }),
    );

    // Deadline (30s), decline (31s), accept (33s).
    run_next_event(&mut world, &mut schedule);
    {
        let ride = world.get::<RideRequest>(request).expect("request");
        assert_eq!(ride.offered_driver, Some(d2));
        let history = world.get::<OfferHistory>(request).expect("history");
        assert_eq!(history.pending_count(), 1);
    }
    run_next_event(&mut world, &mut schedule);
    run_next_event(&mut world, &mut schedule);

    let ride = world.get::<RideRequest>(request).expect("request");
    assert_eq!(ride.phase, RequestPhase::Matched);
    assert_eq!(ride.matched_driver, Some(d3));
    let trip = world
        .get::<Trip>(ride.trip.expect("trip entity"))
        .expect("trip");
    assert_eq!(trip.driver, d3);
    assert_eq!(trip.state, TripState::EnRoute);

    let history = world.get::<OfferHistory>(request).expect("history");
    let outcomes: Vec<_> = history.0.iter().map(|a| (a.driver, a.outcome)).collect();
    assert_eq!(
        outcomes,
        vec![
            (d1, OfferOutcome::TimedOut),
            (d2, OfferOutcome::Declined),
            (d3, OfferOutcome::Accepted),
        ]
    );
    assert_eq!(history.pending_count(), 0);

    let ledger = world.resource::<ReliabilityLedger>();
    assert_eq!(ledger.get(d1).timeouts, 1, "one timeout-kind penalty for D1");
    assert!(ledger.get(d1).score < 100.0);
    assert_eq!(ledger.get(d2).score, 100.0, "no penalty for a decline");
    assert_eq!(ledger.get(d3).score, 100.0);
}

/// The offer sequence is exactly the ranking computed at creation, in rank
/// order, regardless of live-state changes mid-cascade.
#[test]
fn cascade_follows_the_frozen_ranking_order() {
    let mut world = TestWorldBuilder::new().build();
    let cell = seed_cell();
    let d1 = spawn_driver(&mut world, cell, 5.0);
    let d2 = spawn_driver(&mut world, cell, 4.5);
    let d3 = spawn_driver(&mut world, cell, 4.0);

    let request = submit(&mut world);
    let mut schedule = dispatch_schedule();
    run_next_event(&mut world, &mut schedule);

    let frozen: Vec<_> = world
        .get::<CandidateList>(request)
        .expect("candidates")
        .ranked
        .iter()
        .map(|candidate| candidate.driver)
        .collect();
    assert_eq!(frozen, vec![d1, d2, d3]);

    // Mid-cascade, the last-ranked driver's live rating changes. Ranking
    // is frozen: the order of offers must not change.
    world.get_mut::<Driver>(d3).expect("driver").rating = 5.0;

    // Let every offer time out; 3 deadlines end in exhaustion.
    run_until_empty(&mut world, &mut schedule, 16);

    let ride = world.get::<RideRequest>(request).expect("request");
    assert_eq!(ride.phase, RequestPhase::Exhausted);
    let offered: Vec<_> = world
        .get::<OfferHistory>(request)
        .expect("history")
        .0
        .iter()
        .map(|attempt| attempt.driver)
        .collect();
    assert_eq!(offered, frozen);
    let ranks: Vec<_> = world
        .get::<OfferHistory>(request)
        .expect("history")
        .0
        .iter()
        .map(|attempt| attempt.rank)
        .collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

/// Zero eligible candidates: immediate exhaustion, no attempt ever created.
#[test]
fn no_candidates_exhausts_immediately() {
    let mut world = TestWorldBuilder::new().build();
    let request = submit(&mut world);
    let mut schedule = dispatch_schedule();

    run_next_event(&mut world, &mut schedule);

    let ride = world.get::<RideRequest>(request).expect("request");
    assert_eq!(ride.phase, RequestPhase::Exhausted);
    assert!(world
        .get::<OfferHistory>(request)
        .expect("history")
        .0
        .is_empty());
    assert!(world.resource::<DispatchClock>().is_empty());
}

/// Two concurrent requests may offer to the same driver; accepting one
/// makes the other's accept a decline-equivalent, and both requests end in
/// a consistent terminal or offering state.
#[test]
fn overlapping_candidate_pools_reconcile_at_acceptance() {
    let mut world = TestWorldBuilder::new().build();
    let cell = seed_cell();
    let shared = spawn_driver(&mut world, cell, 5.0);
    let fallback = spawn_driver(&mut world, cell, 4.0);

    let request_a = submit(&mut world);
    let request_b = submit(&mut world);
    let mut schedule = dispatch_schedule();
    // Both submissions offer to the shared top-ranked driver.
    run_next_event(&mut world, &mut schedule);
    run_next_event(&mut world, &mut schedule);
    assert_eq!(
        world.get::<RideRequest>(request_a).expect("a").offered_driver,
        Some(shared)
    );
    assert_eq!(
        world.get::<RideRequest>(request_b).expect("b").offered_driver,
        Some(shared)
    );

    // The driver accepts request A, then tries to accept B as well.
    world.resource_mut::<DispatchClock>().schedule_at(
        5_000,
        EventKind::OfferAccepted,
        Some(EventSubject::Offer {
            request: request_a,
            driver: shared,
        }),
    );
    world.resource_mut::<DispatchClock>().schedule_at(
        6_000,
        EventKind::OfferAccepted,
        Some(EventSubject::Offer {
            request: request_b,
            driver: shared,
        }),
    );
    run_next_event(&mut world, &mut schedule);
    run_next_event(&mut world, &mut schedule);

    let ride_a = world.get::<RideRequest>(request_a).expect("a");
    assert_eq!(ride_a.phase, RequestPhase::Matched);
    assert_eq!(ride_a.matched_driver, Some(shared));

    // Request B treated the busy driver as a decline and moved on.
    let ride_b = world.get::<RideRequest>(request_b).expect("b");
    assert_eq!(ride_b.phase, RequestPhase::Offering);
    assert_eq!(ride_b.offered_driver, Some(fallback));
}
