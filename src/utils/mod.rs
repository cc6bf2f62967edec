//! Utility functions and helpers for es-export
//!
//! - Time and duration utilities (engine keep-alive strings, summaries)
//! - File system helpers

use std::path::PathBuf;
use std::time::Duration;

/// Time utilities
pub mod time {
    use super::*;

    /// Format duration as human-readable string
    ///
    /// # Arguments
    /// * `duration` - Duration to format
    ///
    /// # Returns
    /// * `String` - Formatted duration (e.g., "1h 30m 45s")
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        let millis = duration.subsec_millis();

        if secs == 0 {
            return format!("{}ms", millis);
        }

        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        let mut parts = Vec::new();

        if hours > 0 {
            parts.push(format!("{}h", hours));
        }
        if minutes > 0 {
            parts.push(format!("{}m", minutes));
        }
        if seconds > 0 || parts.is_empty() {
            parts.push(format!("{}s", seconds));
        }

        parts.join(" ")
    }

    /// Parse an engine time value (e.g., "500ms", "30s", "1m", "1h", "1d")
    ///
    /// # Arguments
    /// * `s` - Duration string
    ///
    /// # Returns
    /// * `Option<Duration>` - Parsed duration or None
    pub fn parse_duration(s: &str) -> Option<Duration> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit())?;
        let (num_str, unit) = s.split_at(split);
        let num: u64 = num_str.parse().ok()?;

        let secs_per_unit: u64 = match unit {
            "ms" => return Some(Duration::from_millis(num)),
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            "d" => 86_400,
            _ => return None,
        };

        num.checked_mul(secs_per_unit).map(Duration::from_secs)
    }

    /// Documents per second, zero when nothing was processed
    pub fn rate(count: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if count == 0 || secs <= 0.0 {
            0.0
        } else {
            count as f64 / secs
        }
    }
}

/// File system utilities
pub mod fs {
    use super::*;

    /// Expand a leading `~` to the home directory
    pub fn expand_home(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }
}
