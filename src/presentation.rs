//! Text helpers for rendering a page: realm names, percent formatting, tables.

use crate::core::{RankedRecord, Realm};
use std::fmt::Write;

/// Realm code to display name.
pub const REALM_NAMES: [(Realm, &str); 4] = [
    (Realm::Ru, "Russia"),
    (Realm::Eu, "Europe"),
    (Realm::Com, "America"),
    (Realm::Asia, "Asia"),
];

pub fn realm_display_name(realm: Realm) -> &'static str {
    REALM_NAMES
        .iter()
        .find(|(known, _)| *known == realm)
        .map(|(_, name)| *name)
        .unwrap_or("")
}

/// Display name for a raw realm code, `None` for unknown codes.
pub fn realm_display_name_for_code(code: &str) -> Option<&'static str> {
    Realm::from_code(code).map(realm_display_name)
}

const SIGNIFICANT_DIGITS: i32 = 4;

/// Four significant digits, shaped like JavaScript's `toPrecision(4)`:
/// `51.23`, `0.1235`, `1.235e+5`.
pub fn format_percent(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return format!("{:.*}", (SIGNIFICANT_DIGITS - 1) as usize, 0.0);
    }

    // Scientific formatting rounds first, so the exponent already accounts
    // for carries such as 9999.5 -> 1.000e4.
    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if !(-6..SIGNIFICANT_DIGITS).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{}", exponent.abs());
    }

    let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
    format!("{value:.decimals$}")
}

/// Plain-text table of one page plus a pagination footer.
pub fn render_page(rows: &[RankedRecord], page: u64, total: Option<usize>, page_size: u64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<24} {:<8} {:>8} {:>9} {:>7} {:>12}",
        "#", "player", "realm", "battles", "victories", "vpb", "experience"
    );

    if rows.is_empty() {
        let _ = writeln!(out, "  (no players on this page)");
    }
    for row in rows {
        let record = &row.record;
        let _ = writeln!(
            out,
            "{:>5}  {:<24} {:<8} {:>8} {:>9} {:>7} {:>12}",
            row.rank,
            record.username,
            realm_display_name(record.realm),
            record.battles,
            record.victories,
            format_percent(record.vpb),
            record.experience,
        );
    }

    match total {
        Some(total) => {
            let pages = (total as u64).div_ceil(page_size.max(1)).max(1);
            let _ = writeln!(out, "page {} of {pages}, {total} players", page + 1);
        }
        None => {
            let _ = writeln!(out, "page {}, counting players...", page + 1);
        }
    }
    out
}
