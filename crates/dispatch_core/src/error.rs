use thiserror::Error;

/// Errors surfaced by the command-level API.
///
/// Expected in-flight races (a response for an offer the cascade already
/// moved past, a driver gone busy between offer and accept) are absorbed
/// by the state machine and logged; only operations that could not be
/// interpreted at all come back through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no drivers available")]
    NoDriversAvailable,
    #[error("response does not reference the active offer")]
    StaleResponse,
    #[error("request already resolved")]
    InvalidTransition,
    #[error("driver is no longer available")]
    DriverUnavailable,
    #[error("unknown entity")]
    UnknownEntity,
}
