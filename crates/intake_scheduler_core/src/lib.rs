pub mod domain;
pub mod ports;
pub mod services;

pub use domain::{
    Dosage, DosageUnit, DomainError, DomainEvent, IntakeRecord, Plan, PlanStatus, RecordStatus,
    RecurrenceRule, Schedule,
};
pub use ports::{Clock, EventPublisher, PlanRepository, PlanStream, PortError, PortResult,
    RecordRepository, SystemClock};
pub use services::{ErrorKind, GenerationReport, GenerationService, PlanService, ServiceError};
