use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A wall-clock time with millisecond precision, stored as an `HHMMSSMMM`
/// integer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LocalTime {
    hour: u8,
    minute: u8,
    second: u8,
    millisecond: u16,
}

impl LocalTime {
    pub fn new(hour: u8, minute: u8, second: u8, millisecond: u16) -> Result<Self> {
        if hour > 23 {
            return Err(Error::Validation(format!("hour {hour} is not between 0 and 23")));
        }
        if minute > 59 {
            return Err(Error::Validation(format!(
                "minute {minute} is not between 0 and 59"
            )));
        }
        if second > 59 {
            return Err(Error::Validation(format!(
                "second {second} is not between 0 and 59"
            )));
        }
        if millisecond > 999 {
            return Err(Error::Validation(format!(
                "millisecond {millisecond} is not between 0 and 999"
            )));
        }
        Ok(Self {
            hour,
            minute,
            second,
            millisecond,
        })
    }

    #[inline]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[inline]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    #[inline]
    pub fn second(&self) -> u8 {
        self.second
    }

    #[inline]
    pub fn millisecond(&self) -> u16 {
        self.millisecond
    }

    /// The `HHMMSSMMM` storage encoding.
    pub fn to_iso_int(&self) -> i64 {
        self.hour as i64 * 10_000_000
            + self.minute as i64 * 100_000
            + self.second as i64 * 1_000
            + self.millisecond as i64
    }

    pub fn from_iso_int(value: i64) -> Result<Self> {
        if !(0..=235_959_999).contains(&value) {
            return Err(Error::Validation(format!(
                "{value} is not a valid HHMMSSMMM time"
            )));
        }
        Self::new(
            (value / 10_000_000) as u8,
            (value / 100_000 % 100) as u8,
            (value / 1_000 % 100) as u8,
            (value % 1_000) as u16,
        )
    }
}

impl std::fmt::Display for LocalTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hour, self.minute, self.second, self.millisecond
        )
    }
}
