mod support;

use bevy_ecs::prelude::World;
use dispatch_core::clock::{DispatchClock, EventKind, EventSubject};
use dispatch_core::dispatch::{request_report, submit_request, RequestIntake};
use dispatch_core::ecs::{OfferOutcome, Place, RequestPhase, RideRequest, VehicleClass};
use dispatch_core::runner::{dispatch_schedule, run_next_event};
use dispatch_core::surge::SurgeTable;

use support::world::{neighbor_cell, seed_cell, spawn_driver, spawn_rider, TestWorldBuilder};

fn submit(world: &mut World, base_fare: f64) -> bevy_ecs::prelude::Entity {
    let rider = spawn_rider(world);
    submit_request(
        world,
        RequestIntake {
            rider,
            origin: Place::new("Riverside", seed_cell()),
            destination: Place::new("Opera House", neighbor_cell(seed_cell())),
            class: VehicleClass::Economy,
            passenger_count: 1,
            base_fare,
        },
    )
}

/// The surge multiplier is captured once at submission; later changes to
/// the zone record never touch an in-flight request's fare.
#[test]
fn final_fare_is_immutable_after_submission() {
    let mut world = TestWorldBuilder::new().with_surge(1.5, 3_600_000).build();
    let d1 = spawn_driver(&mut world, seed_cell(), 5.0);
    let _d2 = spawn_driver(&mut world, seed_cell(), 4.0);

    let request = submit(&mut world, 10.0);
    let mut schedule = dispatch_schedule();
    run_next_event(&mut world, &mut schedule);

    {
        let ride = world.get::<RideRequest>(request).expect("request");
        assert_eq!(ride.surge_multiplier, 1.5);
        assert_eq!(ride.final_fare, 15.0);
    }

    // The zone spikes mid-cascade.
    {
        let zone = world.resource::<SurgeTable>().zone_for(seed_cell());
        world
            .resource_mut::<SurgeTable>()
            .set(zone, 3.0, 3_600_000);
    }

    // D1 times out; the offer cascades; D2 accepts.
    run_next_event(&mut world, &mut schedule);
    let d2 = world
        .get::<RideRequest>(request)
        .expect("request")
        .offered_driver
        .expect("cascaded offer");
    assert_ne!(d2, d1);
    world.resource_mut::<DispatchClock>().schedule_in(
        1_000,
        EventKind::OfferAccepted,
        Some(EventSubject::Offer {
            request,
            driver: d2,
        }),
    );
    run_next_event(&mut world, &mut schedule);

    let ride = world.get::<RideRequest>(request).expect("request");
    assert_eq!(ride.phase, RequestPhase::Matched);
    assert_eq!(ride.surge_multiplier, 1.5, "multiplier never re-queried");
    assert_eq!(ride.final_fare, 15.0, "fare fixed at submission");
}

/// An expired surge record is the neutral case.
#[test]
fn expired_surge_record_prices_at_one() {
    let mut world = TestWorldBuilder::new().with_surge(2.0, 1).build();
    spawn_driver(&mut world, seed_cell(), 4.5);

    // Move the clock past the record's expiry before submitting.
    world
        .resource_mut::<DispatchClock>()
        .schedule_at(60_000, EventKind::TripStarted, None);
    world.resource_mut::<DispatchClock>().pop_next();

    let request = submit(&mut world, 12.0);
    let mut schedule = dispatch_schedule();
    run_next_event(&mut world, &mut schedule);

    let ride = world.get::<RideRequest>(request).expect("request");
    assert_eq!(ride.surge_multiplier, 1.0);
    assert_eq!(ride.final_fare, 12.0);
}

/// The operator surface answers "who was this offered to and why".
#[test]
fn request_report_exposes_candidates_and_attempt_history() {
    let mut world = TestWorldBuilder::new().build();
    let d1 = spawn_driver(&mut world, seed_cell(), 5.0);
    let d2 = spawn_driver(&mut world, seed_cell(), 4.0);

    let request = submit(&mut world, 10.0);
    let mut schedule = dispatch_schedule();
    run_next_event(&mut world, &mut schedule);
    // D1 times out.
    run_next_event(&mut world, &mut schedule);

    let report = request_report(&world, request).expect("report");
    assert_eq!(report.phase, RequestPhase::Offering);
    assert_eq!(report.candidates.len(), 2);
    assert_eq!(report.candidates[0].driver, d1.to_bits());
    assert_eq!(report.candidates[0].rank, 1);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0].outcome, OfferOutcome::TimedOut);
    assert_eq!(report.attempts[1].driver, d2.to_bits());
    assert_eq!(report.attempts[1].outcome, OfferOutcome::Pending);
    assert_eq!(report.offered_driver, Some(d2.to_bits()));

    // The report is serializable for support tooling.
    let json = serde_json::to_string(&report);
    assert!(json.is_ok());
}
