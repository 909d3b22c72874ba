pub mod core;
pub mod mock;
pub mod observability;
pub mod persistence;
pub mod repositories;
pub mod simulation;

pub use core::{CircuitBreaker, CircuitBreakingExchange};
pub use repositories::InMemoryAuditLog;
