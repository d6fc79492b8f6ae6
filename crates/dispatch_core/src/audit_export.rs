//! Audit export: offer-attempt history and penalty records as parquet.
//!
//! Support tooling and offline analysis consume these columnar files;
//! entity ids are exported as their stable bit representation.

use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, UInt32Array, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bevy_ecs::prelude::{Entity, World};
use parquet::arrow::ArrowWriter;

use crate::ecs::{OfferHistory, OfferOutcome, RideRequest};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::ledger::DefaultKind;

const OUTCOME_PENDING: u8 = 0;
const OUTCOME_ACCEPTED: u8 = 1;
const OUTCOME_DECLINED: u8 = 2;
const OUTCOME_TIMED_OUT: u8 = 3;

const KIND_TIMEOUT: u8 = 0;
const KIND_CANCELLATION: u8 = 1;
const KIND_GHOSTING: u8 = 2;

fn outcome_code(outcome: OfferOutcome) -> u8 {
    match outcome {
        OfferOutcome::Pending => OUTCOME_PENDING,
        OfferOutcome::Accepted => OUTCOME_ACCEPTED,
        OfferOutcome::Declined => OUTCOME_DECLINED,
        OfferOutcome::TimedOut => OUTCOME_TIMED_OUT,
    }
}

fn kind_code(kind: DefaultKind) -> u8 {
    match kind {
        DefaultKind::Timeout => KIND_TIMEOUT,
        DefaultKind::Cancellation => KIND_CANCELLATION,
        DefaultKind::Ghosting => KIND_GHOSTING,
    }
}

/// One offer attempt flattened for export.
#[derive(Debug, Clone)]
pub struct AttemptRow {
    pub request: Entity,
    pub driver: Entity,
    pub rank: u32,
    pub offered_at: u64,
    pub deadline: u64,
    pub outcome: OfferOutcome,
}

/// Flatten every request's attempt history, in attempt order per request.
pub fn collect_attempt_rows(world: &mut World) -> Vec<AttemptRow> {
    let mut rows = Vec::new();
    let mut query = world.query::<(Entity, &RideRequest, &OfferHistory)>();
    for (request, _ride, history) in query.iter(world) {
        for attempt in &history.0 {
            rows.push(AttemptRow {
                request,
                driver: attempt.driver,
                rank: attempt.rank,
                offered_at: attempt.offered_at,
                deadline: attempt.deadline,
                outcome: attempt.outcome,
            });
        }
    }
    rows
}

pub fn write_attempt_history_parquet<P: AsRef<Path>>(
    path: P,
    rows: &[AttemptRow],
) -> Result<(), Box<dyn Error>> {
    let mut requests = Vec::with_capacity(rows.len());
    let mut drivers = Vec::with_capacity(rows.len());
    let mut ranks = Vec::with_capacity(rows.len());
    let mut offered_at = Vec::with_capacity(rows.len());
    let mut deadlines = Vec::with_capacity(rows.len());
    let mut outcomes = Vec::with_capacity(rows.len());

    for row in rows {
        requests.push(row.request.to_bits());
        drivers.push(row.driver.to_bits());
        ranks.push(row.rank);
        offered_at.push(row.offered_at);
        deadlines.push(row.deadline);
        outcomes.push(outcome_code(row.outcome));
    }

    let schema = Schema::new(vec![
        Field::new("request", DataType::UInt64, false),
        Field::new("driver", DataType::UInt64, false),
        Field::new("rank", DataType::UInt32, false),
        Field::new("offered_at", DataType::UInt64, false),
        Field::new("deadline", DataType::UInt64, false),
        Field::new("outcome", DataType::UInt8, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(requests)),
        Arc::new(UInt64Array::from(drivers)),
        Arc::new(UInt32Array::from(ranks)),
        Arc::new(UInt64Array::from(offered_at)),
        Arc::new(UInt64Array::from(deadlines)),
        Arc::new(UInt8Array::from(outcomes)),
    ];

    write_record_batch(path, schema, arrays)
}

/// Export every `ReliabilityPenaltyApplied` event in the buffer.
pub fn write_penalty_records_parquet<P: AsRef<Path>>(
    path: P,
    events: &OutboundEvents,
) -> Result<(), Box<dyn Error>> {
    let mut drivers = Vec::new();
    let mut kinds = Vec::new();
    let mut points = Vec::new();
    let mut scores_after = Vec::new();

    for event in events.events() {
        if let DispatchEvent::ReliabilityPenaltyApplied {
            driver,
            kind,
            points: event_points,
            score_after,
        } = event
        {
            drivers.push(driver.to_bits());
            kinds.push(kind_code(*kind));
            points.push(*event_points);
            scores_after.push(*score_after);
        }
    }

    let schema = Schema::new(vec![
        Field::new("driver", DataType::UInt64, false),
        Field::new("kind", DataType::UInt8, false),
        Field::new("points", DataType::Float64, false),
        Field::new("score_after", DataType::Float64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(drivers)),
        Arc::new(UInt8Array::from(kinds)),
        Arc::new(Float64Array::from(points)),
        Arc::new(Float64Array::from(scores_after)),
    ];

    write_record_batch(path, schema, arrays)
}

fn write_record_batch<P: AsRef<Path>>(
    path: P,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> Result<(), Box<dyn Error>> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
