//! Point-in-time sale price resolution.
//!
//! A variant's displayed price is a pure function of its base price and the
//! sales whose validity window contains "now". The resolved price is a
//! stored, denormalized field: it is recomputed whenever a sale is added or
//! removed, a window boundary is crossed, or the base price changes, never
//! derived lazily at read time.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// What a sale does to a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount", rename_all = "lowercase")]
pub enum SaleKind {
    /// Replace the price with a fixed amount.
    Fixed(Decimal),
    /// Take a percentage off.
    Percent(Decimal),
    /// Conditional promotion (gift, bundle); never alters the price.
    Condition,
}

/// A sale attached to a variant, directly or via collection/category
/// membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub pk: i64,
    pub name: String,
    #[serde(flatten)]
    pub kind: SaleKind,
    /// Validity window, half-open: `starts_at <= now < ends_at`.
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Sale {
    /// Whether the sale's validity window contains `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

/// The outcome of price resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    /// Effective display price.
    pub price: Decimal,
    /// The pre-sale price, present only when a sale actually changed it.
    pub old_price: Option<Decimal>,
}

/// Resolve the effective price of `base` under `sales` at instant `now`.
///
/// Only sales whose window contains `now` apply. Among applicable
/// fixed-price sales, the *last* in application order wins (last-write-wins,
/// a deliberate tie-break, not lowest-price-wins). The *last* applicable
/// percent sale is then applied on top of the fixed result (or of the base
/// price if no fixed sale applied). `Condition` sales never alter the price.
///
/// A variant with no applicable sales resolves to its base price; this is
/// the common case and is not an error.
pub fn resolve_price(base: Decimal, sales: &[Sale], now: DateTime<Utc>) -> ResolvedPrice {
    let mut fixed = None;
    let mut percent = None;
    for sale in sales.iter().filter(|sale| sale.is_active(now)) {
        match sale.kind {
            SaleKind::Fixed(amount) => fixed = Some(amount),
            SaleKind::Percent(amount) => percent = Some(amount),
            SaleKind::Condition => {}
        }
    }

    let mut price = fixed.unwrap_or(base);
    if let Some(pct) = percent {
        price = price * (Decimal::ONE_HUNDRED - pct) / Decimal::ONE_HUNDRED;
    }

    ResolvedPrice {
        old_price: (price != base).then_some(base),
        price,
    }
}

/// Format a price for display.
///
/// Whole numbers render with no decimal places, fractional prices with
/// exactly two; excess precision is truncated, not rounded.
pub fn format_price(price: Decimal) -> String {
    let truncated = price.round_dp_with_strategy(2, RoundingStrategy::ToZero);
    if truncated.fract().is_zero() {
        truncated.trunc().normalize().to_string()
    } else {
        format!("{truncated:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rust_decimal_macros::dec;

    fn sale(pk: i64, kind: SaleKind, active: bool) -> Sale {
        let now = Utc::now();
        let (starts_at, ends_at) = if active {
            (now - TimeDelta::days(1), now + TimeDelta::days(1))
        } else {
            (now - TimeDelta::days(10), now - TimeDelta::days(5))
        };
        Sale {
            pk,
            name: format!("sale {pk}"),
            kind,
            starts_at,
            ends_at,
        }
    }

    #[test]
    fn test_percent_sale() {
        let sales = vec![sale(1, SaleKind::Percent(dec!(20)), true)];
        let resolved = resolve_price(dec!(950.00), &sales, Utc::now());
        assert_eq!(format_price(resolved.price), "760");
        assert_eq!(resolved.old_price, Some(dec!(950.00)));
    }

    #[test]
    fn test_fixed_then_percent() {
        // Fixed applied first, percent on top of the fixed result.
        let sales = vec![
            sale(1, SaleKind::Fixed(dec!(800)), true),
            sale(2, SaleKind::Percent(dec!(10)), true),
        ];
        let resolved = resolve_price(dec!(950.00), &sales, Utc::now());
        assert_eq!(format_price(resolved.price), "720");
    }

    #[test]
    fn test_last_fixed_wins() {
        // Last-write-wins, even when an earlier fixed sale is cheaper.
        let sales = vec![
            sale(1, SaleKind::Fixed(dec!(500)), true),
            sale(2, SaleKind::Fixed(dec!(800)), true),
        ];
        let resolved = resolve_price(dec!(950.00), &sales, Utc::now());
        assert_eq!(resolved.price, dec!(800));
    }

    #[test]
    fn test_expired_sale_is_ignored() {
        let sales = vec![sale(1, SaleKind::Percent(dec!(50)), false)];
        let resolved = resolve_price(dec!(200.00), &sales, Utc::now());
        assert_eq!(format_price(resolved.price), "200");
        assert_eq!(resolved.old_price, None);
    }

    #[test]
    fn test_condition_sale_never_changes_price() {
        let sales = vec![sale(1, SaleKind::Condition, true)];
        let resolved = resolve_price(dec!(450.00), &sales, Utc::now());
        assert_eq!(resolved.price, dec!(450.00));
        assert_eq!(resolved.old_price, None);
    }

    #[test]
    fn test_no_sales_is_not_an_error() {
        let resolved = resolve_price(dec!(199.5), &[], Utc::now());
        assert_eq!(resolved.price, dec!(199.5));
        assert_eq!(resolved.old_price, None);
    }

    #[test]
    fn test_window_is_half_open() {
        let now = Utc::now();
        let boundary = Sale {
            pk: 1,
            name: "boundary".to_string(),
            kind: SaleKind::Percent(dec!(10)),
            starts_at: now - TimeDelta::days(1),
            ends_at: now,
        };
        assert!(!boundary.is_active(now));
    }

    #[test]
    fn test_format_price_display() {
        assert_eq!(format_price(dec!(200.00)), "200");
        assert_eq!(format_price(dec!(199.5)), "199.50");
        // Truncation, not banker's rounding.
        assert_eq!(format_price(dec!(10.999)), "10.99");
    }
}
