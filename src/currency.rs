//! Rupee formatting with en-IN digit grouping.

use crate::models::{Item, ItemKind};

/// Format an amount as rupees: last three digits grouped, then pairs
/// (1234567 renders as ₹12,34,567). Fractional amounts keep two decimals.
/// Rounded to whole paise first, so a carry propagates into the rupees.
pub fn format_inr(amount: f64) -> String {
    let negative = amount < 0.0;
    let paise = (amount.abs() * 100.0).round() as u64;
    let whole = paise / 100;
    let fraction = paise % 100;

    let grouped = group_indian(&whole.to_string());

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('₹');
    out.push_str(&grouped);
    if fraction > 0 {
        out.push_str(&format!(".{:02}", fraction));
    }
    out
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut groups: Vec<&str> = Vec::new();
    let bytes = head.as_bytes();
    let mut end = bytes.len();
    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Format an optional price; absent prices render as an empty string.
pub fn format_price(price: Option<f64>) -> String {
    price.map(format_inr).unwrap_or_default()
}

/// Format an optional per-day rental price.
pub fn format_price_per_day(price: Option<f64>) -> String {
    price
        .map(|p| format!("{}/day", format_inr(p)))
        .unwrap_or_default()
}

/// The price label a card renders for an item: a formatted amount for sales,
/// the literal "Free" for giveaways, a per-day rate for rentals, and nothing
/// for swaps.
pub fn price_label(item: &Item) -> Option<String> {
    match item.kind {
        ItemKind::Sell => Some(format_price(item.price)),
        ItemKind::Free => Some("Free".to_string()),
        ItemKind::Swap => None,
        ItemKind::Rent => Some(format_price_per_day(item.rental_price_per_day)),
    }
}
