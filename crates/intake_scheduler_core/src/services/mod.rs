//! crates/intake_scheduler_core/src/services/mod.rs
//!
//! Application services orchestrating the domain through the ports.

pub mod dto;
pub mod error;
pub mod generation;
pub mod plans;
pub mod projection;

pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use generation::{generation_window, GenerationReport, GenerationService};
pub use plans::PlanService;
pub use projection::ScheduleProjection;
