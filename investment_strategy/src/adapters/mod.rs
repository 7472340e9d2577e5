//! Adapters over the external protocols the strategy talks to.
//! Each adapter only encodes, sends and checks calls; none of them owns vault state.

pub mod market;
pub mod swap;
pub mod token;

pub use market::{Market, MarketAdapter, MarketId};
pub use swap::{SwapAdapter, SwapRequest};
pub use token::TokenAdapter;
