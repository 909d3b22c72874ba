pub mod fill_model;
pub mod simulated_exchange;

pub use fill_model::FillModel;
pub use simulated_exchange::{SimulatedExchange, SimulationConfig};
