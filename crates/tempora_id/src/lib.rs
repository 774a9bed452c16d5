//! TemporalId: a 96-bit time-based ordered identifier.
//!
//! The identifier doubles as a primary key and a version token: its high four
//! bytes carry seconds since the Unix epoch (UTC, big-endian), so plain byte
//! order is also chronological order to one-second resolution. The remaining
//! bytes make the value unique within a second:
//!
//! * bytes 4..9: a per-process random value, drawn once at startup;
//! * bytes 9..12: a big-endian counter, randomly seeded, incremented per id.
//!
//! Two ids generated by the same process are therefore strictly ordered
//! except across a counter wrap-around; two ids generated by different
//! processes are ordered to one-second resolution only. Callers that need a
//! strict per-process guarantee should layer a retry loop on top (the data
//! source's ordered-id allocator does exactly that).

use std::sync::atomic::{AtomicU32, Ordering};

use once_cell::sync::Lazy;

// ----------------------------------------------------------------------------

/// Per-process state for id generation: five random bytes plus a seeded
/// counter shared by every [`TemporalId::new`] call in the process.
struct ProcessState {
    random: [u8; 5],
    counter: AtomicU32,
}

static PROCESS_STATE: Lazy<ProcessState> = Lazy::new(|| {
    let mut bytes = [0_u8; 9];
    if getrandom::getrandom(&mut bytes).is_err() {
        // Extremely unlikely. Fall back to the address of a stack local,
        // which at least varies between runs under ASLR.
        let fallback = (&bytes as *const _ as usize).to_ne_bytes();
        bytes[..fallback.len().min(9)].copy_from_slice(&fallback[..fallback.len().min(9)]);
    }

    let mut random = [0_u8; 5];
    random.copy_from_slice(&bytes[0..5]);

    // Keep headroom below the 24-bit wrap so a single process does not
    // wrap within one clock second under normal workloads.
    let seed = u32::from_be_bytes([0, bytes[6], bytes[7], bytes[8]]) & 0x3F_FFFF;

    ProcessState {
        random,
        counter: AtomicU32::new(seed),
    }
});

fn epoch_seconds() -> u32 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0) as u32
}

// ----------------------------------------------------------------------------

/// A 12-byte identifier whose byte order is also its chronological order.
///
/// [`TemporalId::ZERO`] is strictly less than every generated value and is
/// reserved for the root dataset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TemporalId([u8; 12]);

impl TemporalId {
    /// All zeroes. Less than any generated id; denotes the root dataset.
    pub const ZERO: Self = Self([0; 12]);

    /// All ones. Greater than any generated id.
    pub const MAX: Self = Self([0xFF; 12]);

    /// Generate a fresh id carrying the current UTC second.
    ///
    /// Strictly increasing within a process except across a (rare) counter
    /// wrap inside a single second.
    pub fn new() -> Self {
        let state = &*PROCESS_STATE;
        let count = state.counter.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;
        Self::from_parts(epoch_seconds(), state.random, count)
    }

    /// An id with the given timestamp and zeroed low bytes.
    ///
    /// Sorts before every id generated during that second; useful as a cutoff
    /// boundary.
    #[inline]
    pub fn from_timestamp(epoch_seconds: u32) -> Self {
        Self::from_parts(epoch_seconds, [0; 5], 0)
    }

    fn from_parts(epoch_seconds: u32, random: [u8; 5], counter: u32) -> Self {
        let mut bytes = [0_u8; 12];
        bytes[0..4].copy_from_slice(&epoch_seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        Self(bytes)
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Seconds since the Unix epoch embedded in the high bytes.
    #[inline]
    pub fn timestamp_seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// `true` for the [`TemporalId::ZERO`] sentinel.
    #[inline]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl std::fmt::Display for TemporalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TemporalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TemporalId({self})")
    }
}

// ----------------------------------------------------------------------------

/// Failed to parse a [`TemporalId`] from its 24-character hex form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid temporal id {value:?}: expected 24 hexadecimal characters")]
pub struct ParseTemporalIdError {
    pub value: String,
}

impl std::str::FromStr for TemporalId {
    type Err = ParseTemporalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTemporalIdError {
            value: s.to_owned(),
        };

        if s.len() != 24 || !s.is_ascii() {
            return Err(err());
        }

        let mut bytes = [0_u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::TemporalId;

    #[test]
    fn zero_is_least() {
        let id = TemporalId::new();
        assert!(TemporalId::ZERO < id);
        assert!(id < TemporalId::MAX);
        assert!(TemporalId::ZERO.is_zero());
        assert!(!id.is_zero());
    }

    #[test]
    fn timestamp_is_embedded() {
        let before = super::epoch_seconds();
        let id = TemporalId::new();
        let after = super::epoch_seconds();
        assert!(before <= id.timestamp_seconds());
        assert!(id.timestamp_seconds() <= after);
    }

    #[test]
    fn timestamp_orders_ids() {
        let early = TemporalId::from_timestamp(1_000);
        let late = TemporalId::from_timestamp(2_000);
        assert!(early < late);
        assert!(late < TemporalId::new());
    }

    #[test]
    fn ids_are_unique() {
        let a = TemporalId::new();
        let b = TemporalId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn hex_round_trip() {
        let id = TemporalId::new();
        let hex = id.to_string();
        assert_eq!(hex.len(), 24);
        assert_eq!(hex.parse::<TemporalId>().unwrap(), id);

        assert_eq!(
            "000000000000000000000000".parse::<TemporalId>().unwrap(),
            TemporalId::ZERO
        );
    }

    #[test]
    fn hex_rejects_malformed() {
        assert!("".parse::<TemporalId>().is_err());
        assert!("not-a-temporal-id".parse::<TemporalId>().is_err());
        assert!("00000000000000000000000g".parse::<TemporalId>().is_err());
        assert!("0000000000000000000000000".parse::<TemporalId>().is_err());
    }
}
