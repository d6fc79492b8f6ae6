//! Rider-initiated cancellation.
//!
//! Valid from `Searching` or `Offering`. Any pending offer attempt is
//! invalidated by the terminal phase itself: the armed deadline event and
//! any late driver response both die on the stale guard, so a cancelled
//! request can never resolve into a match.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::warn;

use crate::clock::{CurrentEvent, EventKind, EventSubject};
use crate::ecs::{RequestPhase, RideRequest};
use crate::events::{DispatchEvent, OutboundEvents, RejectReason};

pub fn rider_cancel_system(
    event: Res<CurrentEvent>,
    mut events: ResMut<OutboundEvents>,
    mut requests: Query<&mut RideRequest>,
) {
    if event.0.kind != EventKind::RiderCancel {
        return;
    }
    let Some(EventSubject::Request(request_entity)) = event.0.subject else {
        return;
    };
    let Ok(mut request) = requests.get_mut(request_entity) else {
        return;
    };
    if request.phase.is_terminal() {
        warn!(request = ?request_entity, "cancel on resolved request rejected");
        events.emit(DispatchEvent::ResponseRejected {
            request: request_entity,
            driver: None,
            reason: RejectReason::AlreadyResolved,
        });
        return;
    }

    request.phase = RequestPhase::Cancelled;
    request.offered_driver = None;
    events.emit(DispatchEvent::RequestCancelled {
        request: request_entity,
    });
}
