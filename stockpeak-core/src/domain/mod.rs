//! Domain types for stockpeak

pub mod peak;
pub mod record;

pub use peak::{PeakResult, KEY_DATE_FORMAT};
pub use record::PriceRecord;
