// 4.0 math.rs: proportional fill amounts. all products are taken in U256 so
// u128 * u128 can't overflow; results are floored back into u128.

use crate::types::U256;

/// `floor(numerator * target / denominator)`. Zero denominator yields zero.
pub fn partial_amount_floor(numerator: u128, denominator: u128, target: u128) -> u128 {
    partial_amount_with_remainder(numerator, denominator, target).0
}

// (floored quotient, remainder != 0)
fn partial_amount_with_remainder(numerator: u128, denominator: u128, target: u128) -> (u128, bool) {
    if denominator == 0 {
        return (0, false);
    }
    let product = U256::from(numerator) * U256::from(target);
    let denom = U256::from(denominator);
    let quotient = product / denom;
    let inexact = !(product % denom).is_zero();
    // numerator <= denominator for every fill, so the quotient fits
    (u128::try_from(quotient).unwrap_or(u128::MAX), inexact)
}

/// Base paid by the maker for `quote_filled` of a limit order.
pub fn limit_base_filled(quote_filled: u128, quote_amount: u128, base_amount: u128) -> u128 {
    partial_amount_floor(quote_filled, quote_amount, base_amount)
}

/// Quote-token fee owed by the taker for `quote_filled` of a limit order.
pub fn limit_fee_filled(quote_filled: u128, quote_amount: u128, fee_amount: u128) -> u128 {
    partial_amount_floor(quote_filled, quote_amount, fee_amount)
}

/// Base paid by the maker for rfq and otc fills. When the proportional amount
/// isn't exact it is floored and then lowered one more unit, so a taker can't
/// harvest the rounding by splitting a quote into many small fills.
pub fn rfq_base_filled(quote_filled: u128, quote_amount: u128, base_amount: u128) -> u128 {
    let (floored, inexact) = partial_amount_with_remainder(quote_filled, quote_amount, base_amount);
    if inexact {
        floored.saturating_sub(1)
    } else {
        floored
    }
}

/// Largest quote fill the maker can back with `spendable_base`, capped at
/// `remaining_quote`.
pub fn fillable_quote_amount(
    remaining_quote: u128,
    quote_amount: u128,
    base_amount: u128,
    spendable_base: u128,
) -> u128 {
    if base_amount == 0 {
        return remaining_quote;
    }
    let funded = partial_amount_floor(spendable_base.min(base_amount), base_amount, quote_amount);
    remaining_quote.min(funded)
}
