//! Commands exposed to the host shell. Each one logs its outcome and
//! duration and returns the domain `Result`.

pub mod eta;
pub mod sync;
pub mod tracking;

pub use eta::{route_eta, stop_etas};
pub use sync::{get_record, pending_records, save_record, sync_metrics, sync_now, sync_status};
pub use tracking::{
    current_location, set_session, start_tracking, stop_tracking, submit_sample, tracking_state,
    tracking_stats,
};
