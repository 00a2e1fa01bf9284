//! Domain types: indicators, countries, observations and company fundamentals.

pub mod country;
pub mod fundamentals;
pub mod indicator;
pub mod observation;

pub use country::{Country, CountrySet};
pub use fundamentals::Fundamentals;
pub use indicator::{Category, Indicator};
pub use observation::Observation;
