use serde::{Deserialize, Serialize};

use crate::{Error, LocalDate, LocalTime, Result};

/// A date with wall-clock time, stored as a `YYYYMMDDHHMMSSMMM` integer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LocalDateTime {
    date: LocalDate,
    time: LocalTime,
}

impl LocalDateTime {
    pub fn new(date: LocalDate, time: LocalTime) -> Self {
        Self { date, time }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_components(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        millisecond: u16,
    ) -> Result<Self> {
        Ok(Self {
            date: LocalDate::new(year, month, day)?,
            time: LocalTime::new(hour, minute, second, millisecond)?,
        })
    }

    #[inline]
    pub fn date(&self) -> LocalDate {
        self.date
    }

    #[inline]
    pub fn time(&self) -> LocalTime {
        self.time
    }

    /// The `YYYYMMDDHHMMSSMMM` storage encoding: the date encoding shifted
    /// past the nine digits of the time encoding.
    pub fn to_iso_int(&self) -> i64 {
        self.date.to_iso_int() * 1_000_000_000 + self.time.to_iso_int()
    }

    pub fn from_iso_int(value: i64) -> Result<Self> {
        if value < 0 {
            return Err(Error::Validation(format!(
                "{value} is not a valid YYYYMMDDHHMMSSMMM date-time"
            )));
        }
        Ok(Self {
            date: LocalDate::from_iso_int(value / 1_000_000_000)?,
            time: LocalTime::from_iso_int(value % 1_000_000_000)?,
        })
    }
}

impl std::fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}T{}", self.date, self.time)
    }
}
