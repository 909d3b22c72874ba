// Rolling risk metrics
pub mod metrics_tracker;
