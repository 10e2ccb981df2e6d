//! Stored per-token burn record and decimal scaling

use crate::burn::BurnWindow;
use alloy::primitives::{Address, U512};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One token's burn totals across every window.
///
/// Window amounts are token units (already divided by `10^decimals`). All
/// eight are always present; a window that could not be computed holds 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRecord {
    pub address: String,
    #[serde(rename = "burn5min", default)]
    pub burn_5min: f64,
    #[serde(rename = "burn15min", default)]
    pub burn_15min: f64,
    #[serde(rename = "burn30min", default)]
    pub burn_30min: f64,
    #[serde(rename = "burn1h", default)]
    pub burn_1h: f64,
    #[serde(rename = "burn3h", default)]
    pub burn_3h: f64,
    #[serde(rename = "burn6h", default)]
    pub burn_6h: f64,
    #[serde(rename = "burn12h", default)]
    pub burn_12h: f64,
    #[serde(rename = "burn24h", default)]
    pub burn_24h: f64,
    pub last_updated: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
}

impl BurnRecord {
    /// Record with every window at zero
    pub fn empty(address: Address, now: DateTime<Utc>, next_update_in: Duration) -> Self {
        Self {
            address: address.to_checksum(None),
            burn_5min: 0.0,
            burn_15min: 0.0,
            burn_30min: 0.0,
            burn_1h: 0.0,
            burn_3h: 0.0,
            burn_6h: 0.0,
            burn_12h: 0.0,
            burn_24h: 0.0,
            last_updated: now,
            next_update: now + next_update_in,
        }
    }

    pub fn get(&self, window: BurnWindow) -> f64 {
        match window {
            BurnWindow::FiveMinutes => self.burn_5min,
            BurnWindow::FifteenMinutes => self.burn_15min,
            BurnWindow::ThirtyMinutes => self.burn_30min,
            BurnWindow::OneHour => self.burn_1h,
            BurnWindow::ThreeHours => self.burn_3h,
            BurnWindow::SixHours => self.burn_6h,
            BurnWindow::TwelveHours => self.burn_12h,
            BurnWindow::TwentyFourHours => self.burn_24h,
        }
    }

    pub fn set(&mut self, window: BurnWindow, amount: f64) {
        let slot = match window {
            BurnWindow::FiveMinutes => &mut self.burn_5min,
            BurnWindow::FifteenMinutes => &mut self.burn_15min,
            BurnWindow::ThirtyMinutes => &mut self.burn_30min,
            BurnWindow::OneHour => &mut self.burn_1h,
            BurnWindow::ThreeHours => &mut self.burn_3h,
            BurnWindow::SixHours => &mut self.burn_6h,
            BurnWindow::TwelveHours => &mut self.burn_12h,
            BurnWindow::TwentyFourHours => &mut self.burn_24h,
        };
        *slot = amount;
    }

    /// Seconds since `last_updated`
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_seconds().max(0)
    }

    /// Past its freshness hint
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now > self.next_update
    }
}

/// `raw / 10^decimals` as `f64`.
///
/// The integer and fractional parts are split exactly in base 10 and the
/// resulting decimal string is parsed once, so the only rounding is the final
/// conversion to the nearest `f64`.
pub fn scale_amount(raw: U512, decimals: u8) -> f64 {
    if raw.is_zero() {
        return 0.0;
    }

    let digits = raw.to_string();
    let decimals = decimals as usize;

    let text = if decimals == 0 {
        digits
    } else if digits.len() > decimals {
        let (int, frac) = digits.split_at(digits.len() - decimals);
        format!("{}.{}", int, frac)
    } else {
        format!("0.{}{}", "0".repeat(decimals - digits.len()), digits)
    };

    text.parse().unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_scale_five_tokens() {
        let raw = U512::from(5_000_000_000_000_000_000u128);
        assert_eq!(scale_amount(raw, 18), 5.0);
    }

    #[test]
    fn test_scale_zero_is_exact() {
        for decimals in [0u8, 6, 18, 36, 77] {
            let scaled = scale_amount(U512::ZERO, decimals);
            assert_eq!(scaled, 0.0);
            assert!(!scaled.is_nan());
        }
    }

    #[test]
    fn test_scale_fractions() {
        assert_eq!(scale_amount(U512::from(1u8), 18), 1e-18);
        assert_eq!(scale_amount(U512::from(1_500_000u64), 6), 1.5);
        assert_eq!(scale_amount(U512::from(42u8), 0), 42.0);
        assert_eq!(scale_amount(U512::from(123u8), 2), 1.23);
    }

    #[test]
    fn test_scale_beyond_f64_integer_precision() {
        // 2^64 + 1 raw units at 0 decimals rounds only once, at the end
        let raw = U512::from(u64::MAX) + U512::from(2u8);
        assert_eq!(scale_amount(raw, 0), 18_446_744_073_709_551_617f64);
    }

    #[test]
    fn test_record_serialization_keys() {
        let now = Utc::now();
        let mut record = BurnRecord::empty(
            address!("885c99a787BE6b41cbf964174C771A9f7ec48e04"),
            now,
            Duration::minutes(5),
        );
        record.set(BurnWindow::OneHour, 2.5);

        let json = serde_json::to_value(&record).unwrap();
        for window in BurnWindow::ALL {
            assert!(json.get(window.record_key()).is_some(), "{}", window);
        }
        assert_eq!(json["burn1h"], 2.5);
        assert_eq!(json["burn24h"], 0.0);
        assert!(json.get("lastUpdated").is_some());
        assert!(json.get("nextUpdate").is_some());
        assert_eq!(record.next_update - record.last_updated, Duration::minutes(5));

        let back: BurnRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let record = BurnRecord::empty(Address::ZERO, now, Duration::minutes(5));
        assert!(!record.is_stale(now + Duration::minutes(4)));
        assert!(record.is_stale(now + Duration::minutes(6)));
        assert_eq!(record.age_seconds(now + Duration::seconds(90)), 90);
    }
}
