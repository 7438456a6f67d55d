//! # Series preprocessing
//!
//! Preparing a closing-price series for the neural forecasters:
//! - Min-max normalization with a per-run [`Scaler`]
//! - Fixed-length supervised windows
//! - Train/validation split
//!
//! ## Example
//!
//! ```rust
//! use market_forecast::preprocessing::{make_windows, normalize, denormalize};
//!
//! let closes = vec![10.0, 12.0, 11.0, 15.0, 14.0];
//! let (normalized, scaler) = normalize(&closes).unwrap();
//! let windows = make_windows(&normalized, 3).unwrap();
//! assert_eq!(windows.len(), 2);
//!
//! let restored = denormalize(&normalized, &scaler);
//! assert!((restored[3] - 15.0).abs() < 1e-9);
//! ```

mod scaler;
mod windows;

pub use scaler::{denormalize, normalize, Scaler};
pub use windows::{make_windows, train_validation_split, windows_to_arrays, Window};
