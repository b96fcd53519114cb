//! Timezone resolution and calendar arithmetic
//!
//! - [`zone`]: IANA zone names and local wall-clock resolution
//! - [`calendar`]: day/month/year boundaries relative to "now"

pub mod calendar;
pub mod zone;

pub use calendar::{period_bounds, Calendar};
pub use zone::{local_to_instant, parse_timezone, TimeZoneName};

/// The IANA timezone type used throughout the crate
pub use chrono_tz::Tz;
