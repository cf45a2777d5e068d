//! Deployment module

pub mod executor;
pub mod fsm;
pub mod mode;
pub mod pipeline;
pub mod release;
pub mod steps;
pub mod unit_file;

pub use executor::{HostReport, Orchestrator, RunSummary};
pub use fsm::HostState;
pub use mode::Mode;
pub use pipeline::{build_pipeline, Pipeline};
pub use steps::Step;
