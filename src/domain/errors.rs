use thiserror::Error;

/// Errors surfaced by the exchange client collaborator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExchangeError {
    #[error("Transport failure during {operation}: {reason}")]
    Transport { operation: String, reason: String },

    #[error("Exchange rejected request (code {code}): {reason}")]
    Rejected { code: String, reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl ExchangeError {
    pub fn transport(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        ExchangeError::Transport {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(code: impl Into<String>, reason: impl Into<String>) -> Self {
        ExchangeError::Rejected {
            code: code.into(),
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExchangeError::Timeout { .. })
    }
}

/// Errors from the technical indicator module
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient candle history: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Malformed candle at index {index}: {reason}")]
    MalformedCandle { index: usize, reason: String },
}

/// Input errors rejected at the configuration boundary
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported trading pair: {symbol}")]
    UnsupportedSymbol { symbol: String },

    #[error("At least one trading pair must be configured")]
    EmptySymbols,

    #[error("Base position size must be positive, got {value}")]
    InvalidPositionSize { value: String },

    #[error("Invalid {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Per-symbol failure recorded in a cycle report. Never aborts other symbols.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CycleError {
    #[error(transparent)]
    Data(#[from] IndicatorError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("Order rejected by exchange: {reason}")]
    OrderRejected { reason: String },

    #[error("Invalid market data: {reason}")]
    InvalidMarketData { reason: String },
}

/// Orchestrator control operations that were refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoopControlError {
    #[error("Trading loop is already running")]
    AlreadyRunning,

    #[error("Trading loop is disabled by configuration")]
    Disabled,
}
