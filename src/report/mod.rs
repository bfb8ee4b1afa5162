//! Daily crowd report: the street × period × day matrix, its zone-grouped
//! variant, the headline summary and the analysis text.
//!
//! Counts are summed per street, period and day, laid out over the report
//! window, compared against a shifted window and published locally or to S3.

pub mod aggregate;
pub mod analyzer;
pub mod summary;
pub mod text;
pub mod types;
pub mod utility;
pub mod window;
pub mod writetos3;
pub mod zoned;
