//! Utility and helper functions needed for:
//! - Error handling
//! - ABI decoding and type casting
//! - Basis-point and decimals arithmetic

pub(crate) mod common;
pub mod error;
