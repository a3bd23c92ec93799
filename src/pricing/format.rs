//! Human-readable strings for durations, tiers and breakdowns.
//!
//! Presentation only. Nothing here feeds back into a price.

use rust_decimal::Decimal;

use super::calculators::{round_money, PriceBreakdown, RentalDuration};
use super::models::UnitType;

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// "0-4 hours", "168+ hours"
pub fn format_tier_range(min: Decimal, max: Option<Decimal>) -> String {
    match max {
        Some(max) => format!("{}-{} hours", min.normalize(), max.normalize()),
        None => format!("{}+ hours", min.normalize()),
    }
}

/// "3 hours", "1 day", "2 days, 6 hours"
pub fn format_duration(duration: &RentalDuration) -> String {
    if duration.hours < 24 {
        return plural(duration.hours, "hour");
    }

    let days = duration.hours / 24;
    let hours = duration.hours % 24;
    if hours == 0 {
        plural(days, "day")
    } else {
        format!("{}, {}", plural(days, "day"), plural(hours, "hour"))
    }
}

pub fn format_unit_type(unit_type: UnitType) -> &'static str {
    match unit_type {
        UnitType::Flat => "flat rate",
        UnitType::Hour => "per hour",
        UnitType::Day => "per day",
    }
}

/// Two decimal places, half-up. USD gets a `$` prefix, anything else a code suffix.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let rounded = round_money(amount, 2);
    if currency.eq_ignore_ascii_case("USD") {
        if rounded.is_sign_negative() && !rounded.is_zero() {
            format!("-${:.2}", rounded.abs())
        } else {
            format!("${:.2}", rounded)
        }
    } else {
        format!("{:.2} {}", rounded, currency.to_uppercase())
    }
}

fn with_quantity(line: String, quantity: i32) -> String {
    if quantity > 1 {
        format!("{} × {}", line, quantity)
    } else {
        line
    }
}

/// One-line description of how a price was produced.
pub fn format_breakdown(breakdown: &PriceBreakdown, currency: &str) -> String {
    match breakdown {
        PriceBreakdown::Flat { rate, quantity, .. } => with_quantity(
            format!("{} flat rate", format_money(*rate, currency)),
            *quantity,
        ),
        PriceBreakdown::PerHour {
            rate,
            hours,
            quantity,
            ..
        } => with_quantity(
            format!("{} × {}", plural(*hours, "hour"), format_money(*rate, currency)),
            *quantity,
        ),
        PriceBreakdown::PerDay {
            rate,
            days,
            quantity,
            ..
        } => with_quantity(
            format!("{} × {}", plural(*days, "day"), format_money(*rate, currency)),
            *quantity,
        ),
        PriceBreakdown::Tiered {
            tier_label,
            unit_type,
            rate,
            units,
            quantity,
            ..
        } => {
            let charge = match unit_type {
                UnitType::Flat => format!("{} flat rate", format_money(*rate, currency)),
                UnitType::Hour => format!("{} × {}", plural(*units, "hour"), format_money(*rate, currency)),
                UnitType::Day => format!("{} × {}", plural(*units, "day"), format_money(*rate, currency)),
            };
            with_quantity(format!("{}: {}", tier_label, charge), *quantity)
        }
        PriceBreakdown::ConfigurationError { message } => format!("Pricing unavailable: {}", message),
        PriceBreakdown::Error { .. } => "Price could not be calculated".to_string(),
    }
}
