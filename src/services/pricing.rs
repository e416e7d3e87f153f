use rust_decimal::Decimal;

use crate::errors::BookingError;
use crate::models::{Discount, PricingInfo};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Base price plus every adjustment, before discounts. Saturates instead of overflowing;
/// `check_pricing` keeps stored pricing away from that edge.
pub fn subtotal(pricing: &PricingInfo) -> Decimal {
    pricing
        .adjustments
        .iter()
        .fold(pricing.base_price, |acc, a| acc.saturating_add(a.amount))
}

/// Applies discounts in list order against the running total and floors the result at zero.
pub fn calculate_total(pricing: &PricingInfo) -> Decimal {
    apply_discounts(pricing).0.max(Decimal::ZERO)
}

/// Sum of what each discount took off, evaluated in the same order as `calculate_total`.
pub fn discount_total(pricing: &PricingInfo) -> Decimal {
    apply_discounts(pricing).1
}

/// Returns the running total after every discount and the amount taken off.
fn apply_discounts(pricing: &PricingInfo) -> (Decimal, Decimal) {
    let mut running = subtotal(pricing);
    let mut taken = Decimal::ZERO;
    for discount in &pricing.discounts {
        let amount = match discount {
            Discount::Percentage { percent, .. } => running.saturating_mul(*percent / HUNDRED),
            Discount::Fixed { amount, .. } => *amount,
        };
        running = running.saturating_sub(amount);
        taken = taken.saturating_add(amount);
    }
    (running, taken)
}

/// Rejects inputs the calculator cannot price meaningfully, including amounts whose total
/// would not fit in a `Decimal`.
pub fn check_pricing(pricing: &PricingInfo) -> Result<(), BookingError> {
    if pricing.base_price < Decimal::ZERO {
        return Err(BookingError::validation(
            "pricing.base_price",
            "base price cannot be negative",
        ));
    }
    if pricing.currency.trim().len() != 3 {
        return Err(BookingError::validation(
            "pricing.currency",
            "currency must be a three-letter code",
        ));
    }

    let mut running = pricing
        .adjustments
        .iter()
        .try_fold(pricing.base_price, |acc, a| acc.checked_add(a.amount))
        .ok_or_else(|| {
            BookingError::validation("pricing.adjustments", "subtotal is too large to price")
        })?;
    let mut taken = Decimal::ZERO;

    for (idx, discount) in pricing.discounts.iter().enumerate() {
        let field = format!("pricing.discounts[{idx}]");
        let amount = match discount {
            Discount::Percentage { percent, .. } => {
                if *percent < Decimal::ZERO || *percent > HUNDRED {
                    return Err(BookingError::validation(
                        &field,
                        format!("{}: percentage must be within 0-100", discount.description()),
                    ));
                }
                running.checked_mul(*percent / HUNDRED)
            }
            Discount::Fixed { amount, .. } => {
                if *amount < Decimal::ZERO {
                    return Err(BookingError::validation(
                        &field,
                        format!("{}: fixed discount cannot be negative", discount.description()),
                    ));
                }
                Some(*amount)
            }
        };

        let next = amount.and_then(|amount| {
            Some((running.checked_sub(amount)?, taken.checked_add(amount)?))
        });
        match next {
            Some((r, t)) => {
                running = r;
                taken = t;
            }
            None => {
                return Err(BookingError::validation(
                    &field,
                    format!("{}: discount is too large to apply", discount.description()),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceAdjustment;
    use rust_decimal_macros::dec;

    fn pricing(base: Decimal) -> PricingInfo {
        let mut p = PricingInfo::new("USD");
        p.base_price = base;
        p
    }

    fn adjustment(amount: Decimal) -> PriceAdjustment {
        PriceAdjustment {
            amount,
            description: "travel fee".to_string(),
        }
    }

    fn percent(p: Decimal) -> Discount {
        Discount::Percentage {
            percent: p,
            description: "promo".to_string(),
        }
    }

    fn fixed(amount: Decimal) -> Discount {
        Discount::Fixed {
            amount,
            description: "voucher".to_string(),
        }
    }

    #[test]
    fn test_base_only() {
        assert_eq!(calculate_total(&pricing(dec!(200))), dec!(200));
    }

    #[test]
    fn test_adjustments_are_additive() {
        let mut p = pricing(dec!(200));
        p.adjustments = vec![adjustment(dec!(50)), adjustment(dec!(-20))];
        assert_eq!(subtotal(&p), dec!(230));
        assert_eq!(calculate_total(&p), dec!(230));
    }

    #[test]
    fn test_percentage_uses_running_total() {
        let mut p = pricing(dec!(200));
        p.adjustments = vec![adjustment(dec!(50))];
        // 250 - 10 = 240, then 10% of 240
        p.discounts = vec![fixed(dec!(10)), percent(dec!(10))];
        assert_eq!(calculate_total(&p), dec!(216));
        assert_eq!(discount_total(&p), dec!(34));
    }

    #[test]
    fn test_discount_order_matters() {
        let mut p = pricing(dec!(100));
        p.discounts = vec![percent(dec!(10)), fixed(dec!(10))];
        assert_eq!(calculate_total(&p), dec!(80));

        p.discounts = vec![fixed(dec!(10)), percent(dec!(10))];
        assert_eq!(calculate_total(&p), dec!(81));
    }

    #[test]
    fn test_total_floors_at_zero() {
        let mut p = pricing(dec!(50));
        p.discounts = vec![fixed(dec!(80))];
        assert_eq!(calculate_total(&p), Decimal::ZERO);
    }

    #[test]
    fn test_total_matches_subtotal_minus_discounts() {
        let mut p = pricing(dec!(120));
        p.adjustments = vec![adjustment(dec!(30)), adjustment(dec!(15.50))];
        p.discounts = vec![percent(dec!(15)), fixed(dec!(12.25)), percent(dec!(5))];
        let expected = (subtotal(&p) - discount_total(&p)).max(Decimal::ZERO);
        assert_eq!(calculate_total(&p), expected);
    }

    #[test]
    fn test_check_pricing_rejects_bad_discounts() {
        let mut p = pricing(dec!(100));
        p.discounts = vec![percent(dec!(120))];
        assert!(matches!(
            check_pricing(&p),
            Err(BookingError::Validation { .. })
        ));

        p.discounts = vec![fixed(dec!(-5))];
        assert!(check_pricing(&p).is_err());

        p.discounts = vec![percent(dec!(100)), fixed(dec!(0))];
        assert!(check_pricing(&p).is_ok());
    }

    #[test]
    fn test_check_pricing_rejects_negative_base_and_bad_currency() {
        assert!(check_pricing(&pricing(dec!(-1))).is_err());

        let mut p = pricing(dec!(10));
        p.currency = "DOLLARS".to_string();
        assert!(check_pricing(&p).is_err());
    }

    fn huge(units: i128) -> Decimal {
        Decimal::from_i128_with_scale(units, 0)
    }

    #[test]
    fn test_percentage_of_huge_total_does_not_overflow() {
        let base = huge(50_000_000_000_000_000_000_000_000_000);
        let mut p = pricing(base);
        p.discounts = vec![percent(dec!(50))];

        assert!(check_pricing(&p).is_ok());
        assert_eq!(calculate_total(&p), huge(25_000_000_000_000_000_000_000_000_000));
        assert_eq!(discount_total(&p), huge(25_000_000_000_000_000_000_000_000_000));
    }

    #[test]
    fn test_subtotal_overflow_is_rejected_not_panicking() {
        let mut p = pricing(Decimal::MAX);
        p.adjustments = vec![adjustment(dec!(1))];

        assert_eq!(subtotal(&p), Decimal::MAX);
        assert_eq!(calculate_total(&p), Decimal::MAX);
        match check_pricing(&p) {
            Err(BookingError::Validation { errors }) => {
                assert!(errors.contains_key("pricing.adjustments"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_stacked_fixed_discounts_overflow_is_rejected() {
        let mut p = pricing(dec!(10));
        p.discounts = vec![fixed(Decimal::MAX), fixed(Decimal::MAX)];

        assert_eq!(calculate_total(&p), Decimal::ZERO);
        match check_pricing(&p) {
            Err(BookingError::Validation { errors }) => {
                assert!(errors.contains_key("pricing.discounts[1]"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_discount_errors_name_the_discount() {
        let mut p = pricing(dec!(100));
        p.discounts = vec![fixed(dec!(5)), percent(dec!(101))];
        match check_pricing(&p) {
            Err(BookingError::Validation { errors }) => {
                assert_eq!(
                    errors.get("pricing.discounts[1]").map(String::as_str),
                    Some("promo: percentage must be within 0-100")
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
