//! The fixed trailing windows burns are aggregated over

use serde::Serialize;
use std::fmt;

/// One of the eight trailing windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BurnWindow {
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    ThreeHours,
    SixHours,
    TwelveHours,
    TwentyFourHours,
}

impl BurnWindow {
    /// All windows, shortest first
    pub const ALL: [BurnWindow; 8] = [
        BurnWindow::FiveMinutes,
        BurnWindow::FifteenMinutes,
        BurnWindow::ThirtyMinutes,
        BurnWindow::OneHour,
        BurnWindow::ThreeHours,
        BurnWindow::SixHours,
        BurnWindow::TwelveHours,
        BurnWindow::TwentyFourHours,
    ];

    /// Window length in seconds
    pub const fn seconds(self) -> u64 {
        match self {
            BurnWindow::FiveMinutes => 5 * 60,
            BurnWindow::FifteenMinutes => 15 * 60,
            BurnWindow::ThirtyMinutes => 30 * 60,
            BurnWindow::OneHour => 60 * 60,
            BurnWindow::ThreeHours => 3 * 60 * 60,
            BurnWindow::SixHours => 6 * 60 * 60,
            BurnWindow::TwelveHours => 12 * 60 * 60,
            BurnWindow::TwentyFourHours => 24 * 60 * 60,
        }
    }

    /// Short name ("5min", "1h", ...)
    pub const fn label(self) -> &'static str {
        match self {
            BurnWindow::FiveMinutes => "5min",
            BurnWindow::FifteenMinutes => "15min",
            BurnWindow::ThirtyMinutes => "30min",
            BurnWindow::OneHour => "1h",
            BurnWindow::ThreeHours => "3h",
            BurnWindow::SixHours => "6h",
            BurnWindow::TwelveHours => "12h",
            BurnWindow::TwentyFourHours => "24h",
        }
    }

    /// Field name in a stored record
    pub fn record_key(self) -> String {
        format!("burn{}", self.label())
    }
}

impl fmt::Display for BurnWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_strictly_increase() {
        for pair in BurnWindow::ALL.windows(2) {
            assert!(pair[0].seconds() < pair[1].seconds());
        }
        assert_eq!(BurnWindow::TwentyFourHours.seconds(), 86_400);
    }

    #[test]
    fn test_record_keys() {
        assert_eq!(BurnWindow::FiveMinutes.record_key(), "burn5min");
        assert_eq!(BurnWindow::TwentyFourHours.record_key(), "burn24h");
    }
}
