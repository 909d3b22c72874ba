// Core trading domain entities and value objects
pub mod signal;
pub mod trading_pair;
pub mod types;
