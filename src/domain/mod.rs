// Compliance audit records
pub mod audit;

// Domain-specific error types
pub mod errors;

// Market analysis domain
pub mod market;

// Port interfaces
pub mod ports;

// Risk management domain
pub mod risk;

// Core trading domain
pub mod trading;
