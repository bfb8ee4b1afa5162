//! Text normalization for street-count submissions.

pub mod address;
pub mod period;

pub use address::{ParsedAddress, parse_address};
pub use period::{Period, normalize_period};
