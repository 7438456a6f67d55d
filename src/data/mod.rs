//! # Input data
//!
//! Price bars and text documents handed to the engine by the caller.
//! Both are validated here, at the boundary, before entering the core.

mod types;

pub use types::{PriceBar, TextDocument, TimeSeries};
