//! Cooperative countdown that can end any session.
//!
//! The widget owns a [`Timeout`], schedules the first tick from `init` and
//! re-arms it from `update` while [`Timeout::on_tick`] says to continue.
//! Expiry is reported exactly once, together with the default payload.

use super::event::Cmd;
use std::time::Duration;

pub const TICK: Duration = Duration::from_secs(1);

/// Result of feeding one tick to the countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<P> {
    Continue,
    Expired(Option<P>),
    /// Supervision is off or expiry was already reported.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Timeout<P> {
    remaining: Duration,
    payload: Option<P>,
    active: bool,
    expired: bool,
}

impl<P> Timeout<P> {
    /// A zero duration disables supervision.
    pub fn new(timeout: Duration, payload: Option<P>) -> Self {
        Self {
            remaining: timeout,
            payload,
            active: !timeout.is_zero(),
            expired: false,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, None)
    }

    pub fn is_active(&self) -> bool {
        self.active && !self.expired
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    /// Command delivering the next tick, or nothing when unsupervised.
    pub fn schedule<M>(&self, make: fn() -> M) -> Cmd<M>
    where
        M: Send + 'static,
    {
        if self.is_active() {
            Cmd::tick(TICK, move |_| make())
        } else {
            Cmd::None
        }
    }

    pub fn on_tick(&mut self) -> Tick<P> {
        if !self.is_active() {
            return Tick::Ignored;
        }
        self.remaining = self.remaining.saturating_sub(TICK);
        if self.remaining.is_zero() {
            self.expired = true;
            tracing::debug!("timeout expired");
            Tick::Expired(self.payload.take())
        } else {
            Tick::Continue
        }
    }

    /// Countdown suffix rendered next to the default choice, e.g. ` (4s)`.
    pub fn label(&self) -> String {
        if self.is_active() {
            format!(" ({}s)", self.remaining.as_secs_f64().ceil() as u64)
        } else {
            String::new()
        }
    }
}

/// Parse durations such as `30s`, `1m30s`, `500ms` or a bare number of
/// seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = raw.parse::<f64>() {
        if secs < 0.0 || !secs.is_finite() {
            return Err(format!("invalid duration {raw:?}"));
        }
        return Ok(Duration::from_secs_f64(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = raw;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {raw:?}"))?;
        if digits == 0 {
            return Err(format!("invalid duration {raw:?}"));
        }
        let value: f64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration {raw:?}"))?;
        rest = &rest[digits..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let secs = match &rest[..unit_len] {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            other => return Err(format!("unknown unit {other:?} in duration {raw:?}")),
        };
        total += Duration::from_secs_f64(secs);
        rest = &rest[unit_len..];
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_is_unsupervised() {
        let mut timeout: Timeout<()> = Timeout::new(Duration::ZERO, None);
        assert!(matches!(timeout.schedule(|| ()), Cmd::None));
        assert_eq!(timeout.on_tick(), Tick::Ignored);
        assert_eq!(timeout.label(), "");
    }

    #[test]
    fn test_expires_exactly_once_with_payload() {
        let mut timeout = Timeout::new(Duration::from_secs(2), Some("no"));
        assert_eq!(timeout.label(), " (2s)");
        assert_eq!(timeout.on_tick(), Tick::Continue);
        assert_eq!(timeout.label(), " (1s)");
        assert_eq!(timeout.on_tick(), Tick::Expired(Some("no")));
        assert_eq!(timeout.on_tick(), Tick::Ignored);
        assert!(matches!(timeout.schedule(|| ()), Cmd::None));
    }

    #[test]
    fn test_remaining_never_increases() {
        let mut timeout: Timeout<()> = Timeout::new(Duration::from_millis(3500), None);
        let mut last = timeout.remaining();
        while timeout.on_tick() == Tick::Continue {
            assert!(timeout.remaining() < last);
            last = timeout.remaining();
        }
        assert!(timeout.remaining().is_zero());
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("-1").is_err());
    }
}
