//! Deployment stages.
//!
//! Stages are the fixed waypoints every deployment unit passes through.
//! The table is built once and shared; it defines the total order.

mod stage;
mod table;

pub use stage::Stage;
pub use table::{StageTable, StageTableBuilder};
