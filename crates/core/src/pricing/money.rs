use rust_decimal::{Decimal, RoundingStrategy};

pub const MONTHS_PER_YEAR: u32 = 12;

/// Rounds to cents with half-away-from-zero. Every derived amount in the
/// pipeline passes through here after each arithmetic step.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

pub fn annualize(monthly: Decimal) -> Decimal {
    round_money(monthly * Decimal::from(MONTHS_PER_YEAR))
}

/// `value × (1 − rate)` for a fractional rate (0.15 = 15%). Rates are held
/// to ±100%.
pub fn apply_rate(value: Decimal, rate: Decimal) -> Decimal {
    let rate = rate.clamp(Decimal::NEGATIVE_ONE, Decimal::ONE);
    round_money(value * (Decimal::ONE - rate))
}

/// `value × (1 − percent / 100)` for a whole-number percentage.
pub fn apply_percent(value: Decimal, percent: Decimal) -> Decimal {
    apply_rate(value, percent / Decimal::ONE_HUNDRED)
}
