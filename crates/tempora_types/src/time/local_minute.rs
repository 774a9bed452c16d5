use serde::{Deserialize, Serialize};

use crate::{Error, LocalTime, Result};

/// A wall-clock time to minute precision, stored as an `HHMM` integer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LocalMinute {
    hour: u8,
    minute: u8,
}

impl LocalMinute {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 {
            return Err(Error::Validation(format!("hour {hour} is not between 0 and 23")));
        }
        if minute > 59 {
            return Err(Error::Validation(format!(
                "minute {minute} is not between 0 and 59"
            )));
        }
        Ok(Self { hour, minute })
    }

    #[inline]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[inline]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Minutes since midnight.
    pub fn minute_of_day(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    pub fn to_time(&self) -> LocalTime {
        LocalTime::new(self.hour, self.minute, 0, 0).expect("components are validated")
    }

    /// The `HHMM` storage encoding.
    pub fn to_iso_int(&self) -> i64 {
        self.hour as i64 * 100 + self.minute as i64
    }

    pub fn from_iso_int(value: i64) -> Result<Self> {
        if !(0..=2_359).contains(&value) {
            return Err(Error::Validation(format!("{value} is not a valid HHMM minute")));
        }
        Self::new((value / 100) as u8, (value % 100) as u8)
    }
}

impl std::fmt::Display for LocalMinute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
