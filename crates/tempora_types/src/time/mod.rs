//! Civil time scalars and their integer storage encodings.
//!
//! All four scalars store as plain integers (`YYYYMMDD`, `HHMMSSMMM`, `HHMM`,
//! `YYYYMMDDHHMMSSMMM`), so their natural component order is also their
//! stored order. None of them carry a time zone.

mod local_date;
mod local_date_time;
mod local_minute;
mod local_time;

pub use local_date::LocalDate;
pub use local_date_time::LocalDateTime;
pub use local_minute::LocalMinute;
pub use local_time::LocalTime;
