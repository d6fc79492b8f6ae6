//! Outbound events: one typed record per state transition.
//!
//! The engine appends to [OutboundEvents] and never blocks on delivery;
//! push notification, UI refresh and device fan-out belong to whichever
//! collaborator drains the buffer.

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::CancellingParty;
use crate::ledger::DefaultKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The eligible set was empty at submission; no offer was ever made.
    NoDriversAvailable,
    /// Every ranked candidate declined, timed out, or failed the liveness
    /// check.
    CascadeExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The referenced offer is no longer the active one.
    Stale,
    /// The request already reached a terminal state.
    AlreadyResolved,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    OfferCreated {
        request: Entity,
        driver: Entity,
        rank: u32,
        deadline: u64,
    },
    RequestMatched {
        request: Entity,
        driver: Entity,
        trip: Entity,
    },
    RequestExhausted {
        request: Entity,
        reason: ExhaustReason,
    },
    RequestCancelled {
        request: Entity,
    },
    ResponseRejected {
        request: Entity,
        driver: Option<Entity>,
        reason: RejectReason,
    },
    ReliabilityPenaltyApplied {
        driver: Entity,
        kind: DefaultKind,
        points: f64,
        score_after: f64,
    },
    TripCompleted {
        trip: Entity,
        driver: Entity,
    },
    TripGhosted {
        trip: Entity,
        driver: Entity,
    },
    ReservationBroadcast {
        trip: Entity,
        pool: Vec<Entity>,
    },
    TripReserved {
        trip: Entity,
        driver: Entity,
    },
    ReservationConfirmed {
        trip: Entity,
        driver: Entity,
    },
    ReservationCancelled {
        trip: Entity,
        party: CancellingParty,
        penalty: f64,
    },
}

#[derive(Debug, Default, Resource)]
pub struct OutboundEvents {
    buffer: Vec<DispatchEvent>,
}

impl OutboundEvents {
    pub fn emit(&mut self, event: DispatchEvent) {
        self.buffer.push(event);
    }

    /// All events emitted so far, in order.
    pub fn events(&self) -> &[DispatchEvent] {
        &self.buffer
    }

    /// Hand the buffered events to a consumer and reset the buffer.
    pub fn drain(&mut self) -> Vec<DispatchEvent> {
        std::mem::take(&mut self.buffer)
    }
}
