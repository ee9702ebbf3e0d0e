//! # Dashboard Aggregates
//!
//! Read-only statistics fetched from the database service and the helpers
//! that turn them into display strings.

use crate::price::{Currency, Price};
use serde::{Deserialize, Serialize};

/// Raw developer statistics as returned by the `get_dashboard_stats` RPC
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Completed purchase revenue in cents
    #[serde(default)]
    pub total_revenue: i64,
    #[serde(default)]
    pub total_downloads: i64,
    /// Distinct buyers in the current period
    #[serde(default)]
    pub active_users: i64,
    #[serde(default)]
    pub plugin_count: i64,
    #[serde(default)]
    pub previous_revenue: i64,
    #[serde(default)]
    pub previous_downloads: i64,
}

/// One bucket of the revenue chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    /// e.g. "2024-05"
    pub period: String,
    /// Cents
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub value: i64,
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
}

/// Stats paired with their display strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedDashboard {
    pub revenue: StatCard,
    pub downloads: StatCard,
    pub active_users: StatCard,
    pub plugins: StatCard,
}

impl FormattedDashboard {
    pub fn from_stats(stats: &DashboardStats) -> Self {
        Self {
            revenue: StatCard {
                value: stats.total_revenue,
                display: format_currency(
                    Price::from_cents(stats.total_revenue, Currency::USD).as_decimal(),
                ),
                change: Some(format_change(
                    stats.total_revenue as f64,
                    stats.previous_revenue as f64,
                )),
            },
            downloads: StatCard {
                value: stats.total_downloads,
                display: format_compact(stats.total_downloads),
                change: Some(format_change(
                    stats.total_downloads as f64,
                    stats.previous_downloads as f64,
                )),
            },
            active_users: StatCard {
                value: stats.active_users,
                display: format_compact(stats.active_users),
                change: None,
            },
            plugins: StatCard {
                value: stats.plugin_count,
                display: format_compact(stats.plugin_count),
                change: None,
            },
        }
    }
}

/// Short human-readable count: `1500 → "1.5K"`, `2_000_000 → "2M"`
pub fn format_compact(n: i64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e3, "K"), (1e6, "M"), (1e9, "B")];

    let abs = n.unsigned_abs() as f64;
    if abs < 1e3 {
        return n.to_string();
    }
    let sign = if n < 0 { "-" } else { "" };
    let mut label = String::new();
    for (scale, suffix) in UNITS {
        // Round before choosing the unit so 999_950 becomes "1M", not "1000K"
        let rounded = (abs / scale * 10.0).round() / 10.0;
        let scaled = format!("{:.1}", rounded);
        label = format!("{}{}", scaled.strip_suffix(".0").unwrap_or(&scaled), suffix);
        if rounded < 1000.0 {
            break;
        }
    }
    format!("{}{}", sign, label)
}

/// Dollar amount with cents and thousands separators: `12.5 → "$12.50"`
pub fn format_currency(dollars: f64) -> String {
    let cents = (dollars.abs() * 100.0).round() as u64;
    // Amounts that round to zero never carry a sign
    let sign = if dollars < 0.0 && cents > 0 { "-" } else { "" };
    let whole = group_thousands(cents / 100);
    format!("{}${}.{:02}", sign, whole, cents % 100)
}

/// Period-over-period change: `"+12.5%"`, `"-3.0%"`
pub fn format_change(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return if current > 0.0 {
            "+100.0%".to_string()
        } else {
            "0.0%".to_string()
        };
    }
    let pct = (current - previous) / previous.abs() * 100.0;
    if pct > 0.0 {
        format!("+{:.1}%", pct)
    } else {
        format!("{:.1}%", pct)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(0), "0");
        assert_eq!(format_compact(999), "999");
        assert_eq!(format_compact(1000), "1K");
        assert_eq!(format_compact(1500), "1.5K");
        assert_eq!(format_compact(2000), "2K");
        assert_eq!(format_compact(1_260_000), "1.3M");
        assert_eq!(format_compact(950_000), "950K");
        assert_eq!(format_compact(999_950), "1M");
        assert_eq!(format_compact(3_000_000_000), "3B");
        assert_eq!(format_compact(-1500), "-1.5K");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(12.5), "$12.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(-3.0), "-$3.00");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(-0.01), "-$0.01");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(112.5, 100.0), "+12.5%");
        assert_eq!(format_change(97.0, 100.0), "-3.0%");
        assert_eq!(format_change(100.0, 100.0), "0.0%");
        assert_eq!(format_change(10.0, 0.0), "+100.0%");
        assert_eq!(format_change(0.0, 0.0), "0.0%");
    }

    #[test]
    fn test_formatted_dashboard() {
        let stats = DashboardStats {
            total_revenue: 1250,
            total_downloads: 1500,
            active_users: 42,
            plugin_count: 3,
            previous_revenue: 1000,
            previous_downloads: 0,
        };
        let formatted = FormattedDashboard::from_stats(&stats);

        assert_eq!(formatted.revenue.display, "$12.50");
        assert_eq!(formatted.revenue.change.as_deref(), Some("+25.0%"));
        assert_eq!(formatted.downloads.display, "1.5K");
        assert_eq!(formatted.downloads.change.as_deref(), Some("+100.0%"));
        assert_eq!(formatted.active_users.display, "42");
        assert!(formatted.plugins.change.is_none());
    }
}
