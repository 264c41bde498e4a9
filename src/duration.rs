//! Protobuf-style durations and their JSON text form (`"1.5s"`).
use std::fmt;

use crate::document::Document;
use crate::errors::ValidationErrors;
use crate::gates::GateContext;
use crate::loader::{Load, Loader};

/// Largest accepted number of seconds (10 000 years).
pub const MAX_SECONDS: i64 = 315_576_000_000;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Signed duration as seconds plus nanoseconds.
///
/// Values outside `[0, MAX_SECONDS]` are representable: the loader still
/// stores them after reporting the range error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    seconds: i64,
    nanos: i32,
}

impl Duration {
    pub const ZERO: Duration = Duration { seconds: 0, nanos: 0 };
    pub const MIN: Duration = Duration { seconds: i64::MIN, nanos: 0 };
    pub const MAX: Duration = Duration { seconds: i64::MAX, nanos: 999_999_999 };

    /// Normalizes so that `0 <= nanos < 1e9`.
    pub fn from_seconds_and_nanos(seconds: i64, nanos: i64) -> Self {
        let total = seconds as i128 * NANOS_PER_SECOND as i128 + nanos as i128;
        Self::from_nanos(total)
    }

    /// Saturates at [`Duration::MIN`] / [`Duration::MAX`].
    pub fn from_nanos(total: i128) -> Self {
        let per = NANOS_PER_SECOND as i128;
        match i64::try_from(total.div_euclid(per)) {
            Ok(seconds) => Duration { seconds, nanos: total.rem_euclid(per) as i32 },
            Err(_) if total < 0 => Duration::MIN,
            Err(_) => Duration::MAX,
        }
    }

    pub fn from_secs(seconds: i64) -> Self {
        Duration { seconds, nanos: 0 }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self::from_nanos(millis as i128 * 1_000_000)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn subsec_nanos(&self) -> i32 {
        self.nanos
    }

    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanos as i128
    }

    /// `None` for negative durations.
    pub fn to_std(&self) -> Option<std::time::Duration> {
        u64::try_from(self.seconds)
            .ok()
            .map(|s| std::time::Duration::new(s, self.nanos as u32))
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self::from_nanos(i128::try_from(d.as_nanos()).unwrap_or(i128::MAX))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.as_nanos();
        let sign = if total < 0 { "-" } else { "" };
        let abs = total.unsigned_abs();
        let per = NANOS_PER_SECOND as u128;
        write!(f, "{sign}{}.{:09}s", abs / per, abs % per)
    }
}

// -------------------------------- Parse ----------------------------------- //

/// Parses duration text. Returns the value (if one could be computed) and the
/// error to report (if any); a range error comes with a value.
pub fn parse_duration(text: &str) -> (Option<Duration>, Option<&'static str>) {
    let Some(body) = text.strip_suffix('s') else {
        return (None, Some("Not a duration (no s suffix)"));
    };
    let body = body.trim_ascii();
    let (whole, nanos) = match body.split_once('.') {
        None => (body, 0),
        Some((whole, frac)) => {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return (None, Some("Not a duration (not a number of nanoseconds)"));
            }
            if frac.len() > 9 {
                return (None, Some("Not a duration (too many digits after decimal)"));
            }
            let mut nanos: i64 = frac.parse().unwrap_or_default();
            for _ in frac.len()..9 {
                nanos *= 10;
            }
            (whole, nanos)
        }
    };
    let Ok(seconds) = whole.parse::<i64>() else {
        return (None, Some("Not a duration (not a number of seconds)"));
    };
    let value = Duration::from_seconds_and_nanos(seconds, nanos);
    if !(0..=MAX_SECONDS).contains(&seconds) {
        return (Some(value), Some("seconds must be in the range [0, 315576000000]"));
    }
    (Some(value), None)
}

pub struct DurationLoader;

impl Loader<Duration> for DurationLoader {
    fn load_into(&self, doc: &Document, _: &dyn GateContext, dst: &mut Duration, errors: &mut ValidationErrors) {
        let Some(text) = doc.as_str() else {
            errors.add_error("is not a string");
            return;
        };
        let (value, error) = parse_duration(text);
        if let Some(message) = error {
            errors.add_error(message);
        }
        if let Some(value) = value {
            *dst = value;
        }
    }
}

impl Load for Duration {
    const LOADER: &'static dyn Loader<Self> = &DurationLoader;
}

// ------------------------------- Tests ------------------------------------ //
