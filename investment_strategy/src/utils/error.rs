use std::fmt;

use candid::CandidType;
use serde::Deserialize;

/// Investment Strategy Result
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Investment Strategy Errors
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum StrategyError {
    /// Deposits and allocations of zero are rejected
    ZeroAmount,
    /// Pulling or moving an asset failed (allowance, balance or token revert)
    TransferFailed(String),
    /// The lending market or its controller rejected the call
    MarketCallFailed(String),
    /// The swap router reverted for a reason other than slippage
    SwapFailed(String),
    /// The realized swap output is below the minimum
    SlippageExceeded(String),
    /// A swap was about to be sent without a usable minimum output
    UnsafeSlippageFloor,
    /// Arithmetic error
    Arithmetic(String),
    /// An operation is already in progress
    Locked,
    /// Raw revert reported by the execution backend
    Reverted(String),
    /// Decoding issue
    DecodingError(String),
    /// Settings failed validation
    InvalidConfiguration(String),
    /// A requested value does not exist
    NonExistentValue,
    /// Unknown/Custom error
    Custom(String),
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyError::ZeroAmount => write!(f, "amount must be greater than zero"),
            StrategyError::TransferFailed(reason) => write!(f, "transfer failed: {}", reason),
            StrategyError::MarketCallFailed(reason) => write!(f, "market call failed: {}", reason),
            StrategyError::SwapFailed(reason) => write!(f, "swap failed: {}", reason),
            StrategyError::SlippageExceeded(reason) => write!(f, "slippage exceeded: {}", reason),
            StrategyError::UnsafeSlippageFloor => {
                write!(f, "refusing to swap with a zero minimum output")
            }
            StrategyError::Arithmetic(reason) => write!(f, "arithmetic error: {}", reason),
            StrategyError::Locked => write!(f, "strategy is locked"),
            StrategyError::Reverted(reason) => write!(f, "execution reverted: {}", reason),
            StrategyError::DecodingError(reason) => write!(f, "decoding error: {}", reason),
            StrategyError::InvalidConfiguration(reason) => {
                write!(f, "invalid configuration: {}", reason)
            }
            StrategyError::NonExistentValue => write!(f, "value does not exist"),
            StrategyError::Custom(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for StrategyError {}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> StrategyError {
    StrategyError::Arithmetic(format!("{:#?}", s.as_ref()))
}

/// Reads the revert reason out of a backend error, if it carries one
pub fn revert_reason(err: &StrategyError) -> String {
    match err {
        StrategyError::Reverted(reason) => reason.clone(),
        other => other.to_string(),
    }
}
