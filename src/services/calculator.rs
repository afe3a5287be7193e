// src/services/calculator.rs
//
// Pure invoice arithmetic. Rounding is half-up to 2 decimals and happens at
// exactly three points: each line subtotal, the tax amount, and the final
// total. Nothing in between is rounded, so totals are reproducible.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::common::error::AppError;

const MONEY_SCALE: u32 = 2;

/// Computed invoice amounts, all at 2-decimal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal of one line: unit price x quantity, rounded half-up to 2 decimals.
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Result<Decimal, AppError> {
    if quantity <= 0 {
        return Err(AppError::InvalidLineItem(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(round2(unit_price * Decimal::from(quantity)))
}

/// Totals over an ordered list of (unit price, quantity) pairs.
///
/// The invoice subtotal is the sum of the already-rounded line subtotals and
/// is exact at 2 decimals without re-rounding. Tax is `subtotal * rate / 100`
/// rounded, and the grand total is `subtotal + tax - discount` rounded.
pub fn compute_totals(
    lines: &[(Decimal, i32)],
    tax_rate: Decimal,
    discount: Decimal,
) -> Result<InvoiceTotals, AppError> {
    if tax_rate.is_sign_negative() {
        return Err(AppError::InvalidTaxRate);
    }

    let mut subtotal = Decimal::ZERO;
    for &(unit_price, quantity) in lines {
        subtotal += line_subtotal(unit_price, quantity)?;
    }

    let tax_amount = round2(subtotal * tax_rate / Decimal::ONE_HUNDRED);
    let total = round2(subtotal + tax_amount - discount);

    Ok(InvoiceTotals {
        subtotal,
        tax_amount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn line_subtotal_rounds_half_up() {
        // 3 x 0.335 = 1.005 -> 1.01 under half-up
        assert_eq!(line_subtotal(dec("0.335"), 3).unwrap(), dec("1.01"));
        assert_eq!(line_subtotal(dec("10.00"), 3).unwrap(), dec("30.00"));
    }

    #[test]
    fn line_subtotal_rejects_non_positive_quantity() {
        assert!(matches!(
            line_subtotal(dec("1.00"), 0),
            Err(AppError::InvalidLineItem(_))
        ));
        assert!(matches!(
            line_subtotal(dec("1.00"), -2),
            Err(AppError::InvalidLineItem(_))
        ));
    }

    #[test]
    fn reference_example_tax_20_percent() {
        // Spec'd reference case: one line of 3 x 10.00 at 20% tax.
        let totals = compute_totals(&[(dec("10.00"), 3)], dec("20"), Decimal::ZERO).unwrap();
        assert_eq!(totals.subtotal, dec("30.00"));
        assert_eq!(totals.tax_amount, dec("6.00"));
        assert_eq!(totals.total, dec("36.00"));
    }

    #[test]
    fn discount_is_subtracted_after_tax() {
        let totals = compute_totals(&[(dec("50.00"), 2)], dec("10"), dec("5.50")).unwrap();
        assert_eq!(totals.subtotal, dec("100.00"));
        assert_eq!(totals.tax_amount, dec("10.00"));
        assert_eq!(totals.total, dec("104.50"));
    }

    #[test]
    fn tax_rounding_applies_to_the_sum_not_per_line() {
        // Two lines of 0.01 at 25%: per-line tax would vanish, the summed
        // subtotal taxes to 0.01.
        let totals =
            compute_totals(&[(dec("0.01"), 1), (dec("0.01"), 1)], dec("25"), Decimal::ZERO)
                .unwrap();
        assert_eq!(totals.subtotal, dec("0.02"));
        assert_eq!(totals.tax_amount, dec("0.01"));
        assert_eq!(totals.total, dec("0.03"));
    }

    #[test]
    fn negative_tax_rate_is_rejected() {
        assert!(matches!(
            compute_totals(&[(dec("1.00"), 1)], dec("-1"), Decimal::ZERO),
            Err(AppError::InvalidTaxRate)
        ));
    }

    #[test]
    fn empty_line_list_yields_zero_totals() {
        let totals = compute_totals(&[], dec("20"), Decimal::ZERO).unwrap();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    proptest! {
        // subtotal == sum(round2(price * qty)) for all valid line lists.
        #[test]
        fn subtotal_is_sum_of_rounded_lines(
            lines in prop::collection::vec((0u64..1_000_000, 1i32..1_000), 1..20),
            rate in 0u32..100,
        ) {
            let lines: Vec<(Decimal, i32)> = lines
                .into_iter()
                .map(|(cents, qty)| (Decimal::new(cents as i64, 2), qty))
                .collect();

            let expected: Decimal = lines
                .iter()
                .map(|&(p, q)| line_subtotal(p, q).unwrap())
                .sum();

            let totals =
                compute_totals(&lines, Decimal::from(rate), Decimal::ZERO).unwrap();
            prop_assert_eq!(totals.subtotal, expected);
            prop_assert_eq!(
                totals.total,
                (totals.subtotal + totals.tax_amount)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            );
        }
    }
}
