mod mean_reversion;
mod strategy_executor;
mod traits;
mod trend_following;

pub use mean_reversion::MeanReversionStrategy;
pub use strategy_executor::StrategyExecutor;
pub use traits::{AnalysisContext, Signal, TradingStrategy};
pub use trend_following::TrendFollowingStrategy;
