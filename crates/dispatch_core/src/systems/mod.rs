pub mod offer_accepted;
pub mod offer_deadline;
pub mod offer_declined;
pub mod pickup_timeout;
pub mod request_submitted;
pub mod reservation_accepted;
pub mod reservation_cancelled;
pub mod reservation_confirmed;
pub mod reservation_no_show;
pub mod reservation_opened;
pub mod rider_cancel;
pub mod trip_completed;
pub mod trip_started;
