//! Proportional credit for the unused part of a billing cycle, and the
//! precedence between that automatic credit and the operator's manual one.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::scenario::{CycleDates, Migration, Scenario};
use crate::pricing::input::parse_amount;
use crate::pricing::money::{annualize, non_negative, round_money};
use crate::pricing::rate_card::Module;
use crate::pricing::recurring::RecurringPrices;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    Automatic,
    /// Typed by the operator and switched on.
    Manual,
    /// Committed through the annual apply action.
    Applied,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditOutcome {
    pub current_annual_base: Decimal,
    pub annual_credit_base: Decimal,
    pub monthly_auto: Decimal,
    pub annual_auto: Decimal,
    pub monthly_credit: Decimal,
    pub monthly_source: CreditSource,
    pub annual_credit: Decimal,
    pub annual_source: CreditSource,
    pub first_month_total: Decimal,
    pub annual_delta: Decimal,
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Whole days from `from` to `to`; never negative, zero if either is invalid.
pub fn days_between(from: &str, to: &str) -> i64 {
    match (parse_date(from), parse_date(to)) {
        (Some(from), Some(to)) => (to - from).num_days().max(0),
        _ => 0,
    }
}

/// Credit for the days between changeover and cycle end, bounded by
/// `[0, full_value]`.
pub fn prorate(cycle: &CycleDates, full_value: Decimal) -> Decimal {
    let total_days = days_between(&cycle.start, &cycle.end);
    if total_days <= 0 {
        return Decimal::ZERO;
    }

    let unused_days = days_between(&cycle.changeover, &cycle.end);
    let credit = full_value * Decimal::from(unused_days) / Decimal::from(total_days);
    round_money(non_negative(credit.min(full_value)))
}

pub fn resolve_credits(scenario: &Scenario, recurring: &RecurringPrices) -> CreditOutcome {
    let migration = scenario.migration();

    let current_annual_base = match migration {
        Migration::MonthlyToAnnual => Decimal::ZERO,
        _ => scenario
            .annual_amount_paid
            .parse()
            .map(round_money)
            .unwrap_or_else(|| annualize(recurring.current_system_monthly)),
    };
    let legacy_paid: Decimal = Module::ALL
        .iter()
        .map(|module| scenario.current_modules.get(*module))
        .filter(|legacy| legacy.has_module)
        .map(|legacy| legacy.annual_amount_paid.or(Decimal::ZERO))
        .sum();
    let annual_credit_base = round_money(current_annual_base + legacy_paid);

    let monthly_cycle_credit = prorate(&scenario.monthly_cycle, recurring.current_monthly_total);
    let annual_cycle_credit = prorate(&scenario.annual_cycle, annual_credit_base);

    let monthly_auto = match migration {
        Migration::AnnualToMonthly => annual_cycle_credit,
        _ => monthly_cycle_credit,
    };
    let annual_auto = match migration {
        Migration::MonthlyToAnnual => monthly_cycle_credit,
        _ => annual_cycle_credit,
    };

    let (monthly_credit, monthly_source) = monthly_precedence(scenario, monthly_auto);
    let (annual_credit, annual_source) = annual_precedence(scenario, annual_auto);

    let first_month_total = round_money(non_negative(recurring.new_monthly_total - monthly_credit));
    let annual_delta = round_money(recurring.new_annual_total - annual_credit);

    tracing::debug!(
        event_name = "pricing.credits.resolved",
        migration = ?migration,
        monthly_source = ?monthly_source,
        annual_source = ?annual_source,
        "credits resolved"
    );

    CreditOutcome {
        current_annual_base,
        annual_credit_base,
        monthly_auto,
        annual_auto,
        monthly_credit,
        monthly_source,
        annual_credit,
        annual_source,
        first_month_total,
        annual_delta,
    }
}

fn monthly_precedence(scenario: &Scenario, automatic: Decimal) -> (Decimal, CreditSource) {
    if !scenario.monthly_credit.active {
        return (automatic, CreditSource::Automatic);
    }
    match parse_amount(&scenario.monthly_credit.value) {
        Some(manual) => (round_money(manual), CreditSource::Manual),
        None => (automatic, CreditSource::Automatic),
    }
}

fn annual_precedence(scenario: &Scenario, automatic: Decimal) -> (Decimal, CreditSource) {
    let manual = &scenario.annual_credit;
    if !manual.active {
        return (automatic, CreditSource::Automatic);
    }
    if let Some(applied) = parse_amount(&manual.applied) {
        return (round_money(applied), CreditSource::Applied);
    }
    match parse_amount(&manual.value) {
        Some(typed) => (round_money(typed), CreditSource::Manual),
        None => (automatic, CreditSource::Automatic),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::{days_between, prorate, resolve_credits, CreditSource};
    use crate::domain::scenario::{BillingMode, CycleDates, Scenario};
    use crate::pricing::input::RawAmount;
    use crate::pricing::rate_card::RateCard;
    use crate::pricing::recurring::calculate;

    fn scenario() -> Scenario {
        let today = NaiveDate::from_ymd_opt(2026, 1, 16).expect("valid date");
        Scenario::starting_on(today, &RateCard::default())
    }

    #[test]
    fn counts_whole_days_and_floors_at_zero() {
        assert_eq!(days_between("2026-01-01", "2026-01-31"), 30);
        assert_eq!(days_between("2026-01-31", "2026-01-01"), 0);
        assert_eq!(days_between("2026-02-30", "2026-03-01"), 0);
        assert_eq!(days_between("", "2026-03-01"), 0);
    }

    #[test]
    fn half_cycle_left_credits_half_the_value() {
        let cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-16");
        assert_eq!(prorate(&cycle, dec!(300)), dec!(150.00));
    }

    #[test]
    fn changeover_at_cycle_edges() {
        let at_end = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-31");
        let at_start = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-01");
        let after_end = CycleDates::new("2026-01-01", "2026-01-31", "2026-02-10");

        assert_eq!(prorate(&at_end, dec!(300)), dec!(0));
        assert_eq!(prorate(&at_start, dec!(300)), dec!(300));
        assert_eq!(prorate(&after_end, dec!(300)), dec!(0));
    }

    #[test]
    fn changeover_before_start_is_capped_at_full_value() {
        let cycle = CycleDates::new("2026-01-01", "2026-01-31", "2025-12-01");
        assert_eq!(prorate(&cycle, dec!(300)), dec!(300));
    }

    #[test]
    fn empty_or_invalid_cycle_credits_nothing() {
        let same_day = CycleDates::new("2026-01-01", "2026-01-01", "2026-01-01");
        let broken = CycleDates::new("01/01/2026", "2026-01-31", "2026-01-16");

        assert_eq!(prorate(&same_day, dec!(300)), dec!(0));
        assert_eq!(prorate(&broken, dec!(300)), dec!(0));
    }

    #[test]
    fn prorated_credit_is_rounded_to_cents() {
        let cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-21");
        assert_eq!(prorate(&cycle, dec!(100)), dec!(33.33));
    }

    #[test]
    fn monthly_credit_prorates_current_monthly_total() {
        let mut scenario = scenario();
        scenario.monthly_cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-16");
        scenario.current_monthly_override = RawAmount::text("300");

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.monthly_credit, dec!(150.00));
        assert_eq!(credits.monthly_source, CreditSource::Automatic);
        assert_eq!(credits.first_month_total, dec!(54.00));
    }

    #[test]
    fn first_month_total_never_goes_negative() {
        let scenario = scenario().with_monthly_manual_credit("5000");

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.monthly_credit, dec!(5000));
        assert_eq!(credits.first_month_total, dec!(0));
    }

    #[test]
    fn annual_base_uses_amount_paid_and_legacy_modules() {
        let mut scenario = scenario();
        scenario.billing_mode = BillingMode::Annual;
        scenario.annual_amount_paid = RawAmount::text("2.000,00");
        scenario.current_modules.vacation_control.has_module = true;
        scenario.current_modules.vacation_control.annual_amount_paid = RawAmount::text("400");
        scenario.current_modules.file_management.annual_amount_paid = RawAmount::text("999");
        scenario.annual_cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-16");

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.current_annual_base, dec!(2000));
        assert_eq!(credits.annual_credit_base, dec!(2400));
        assert_eq!(credits.annual_auto, dec!(1200.00));
    }

    #[test]
    fn annual_base_defaults_to_twelve_current_months() {
        let mut scenario = scenario();
        scenario.billing_mode = BillingMode::Annual;

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.current_annual_base, dec!(2448));
    }

    #[test]
    fn monthly_to_annual_migration_credits_the_monthly_cycle() {
        let mut scenario = scenario();
        scenario.billing_mode = BillingMode::Annual;
        scenario.migrating_from_monthly = true;
        scenario.annual_amount_paid = RawAmount::text("5000");
        scenario.current_monthly_override = RawAmount::text("300");
        scenario.monthly_cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-16");
        scenario.annual_cycle = CycleDates::new("2026-01-01", "2026-12-31", "2026-01-01");

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.current_annual_base, dec!(0));
        assert_eq!(credits.annual_auto, dec!(150.00));
    }

    #[test]
    fn annual_to_monthly_migration_credits_the_annual_cycle() {
        let mut scenario = scenario();
        scenario.migrating_from_annual = true;
        scenario.annual_amount_paid = RawAmount::text("1200");
        scenario.annual_cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-16");

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.monthly_auto, dec!(600.00));
        assert_eq!(credits.first_month_total, dec!(0));
    }

    #[test]
    fn migration_flag_outside_its_mode_is_ignored() {
        let mut scenario = scenario();
        scenario.migrating_from_monthly = true;
        scenario.annual_amount_paid = RawAmount::text("1200");
        scenario.annual_cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-16");

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.current_annual_base, dec!(1200));
        assert_eq!(credits.monthly_auto, dec!(0));
    }

    #[test]
    fn annual_precedence_is_applied_then_typed_then_automatic() -> Result<(), String> {
        let mut scenario = scenario();
        scenario.billing_mode = BillingMode::Annual;
        scenario.annual_cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-16");
        let card = RateCard::default();

        let typed_only = scenario.with_annual_manual_credit("100");
        let credits = resolve_credits(&typed_only, &calculate(&typed_only, &card));
        assert_eq!(credits.annual_source, CreditSource::Automatic);
        assert_eq!(credits.annual_credit, dec!(1224.00));

        let applied = typed_only.apply_annual_manual_credit().map_err(|err| err.to_string())?;
        let retyped = applied.with_annual_manual_credit("250");
        let credits = resolve_credits(&retyped, &calculate(&retyped, &card));
        assert_eq!(credits.annual_source, CreditSource::Applied);
        assert_eq!(credits.annual_credit, dec!(100));

        let mut typed_active = retyped.remove_annual_manual_credit();
        typed_active.annual_credit.active = true;
        let credits = resolve_credits(&typed_active, &calculate(&typed_active, &card));
        assert_eq!(credits.annual_source, CreditSource::Manual);
        assert_eq!(credits.annual_credit, dec!(250));
        Ok(())
    }

    #[test]
    fn manual_credits_ignore_cycle_dates() {
        let card = RateCard::default();
        let base = scenario().with_monthly_manual_credit("80");

        let mut shifted = base.clone();
        shifted.monthly_cycle = CycleDates::new("2026-01-01", "2026-01-31", "2026-01-02");

        let first = resolve_credits(&base, &calculate(&base, &card));
        let second = resolve_credits(&shifted, &calculate(&shifted, &card));

        assert_eq!(first.monthly_credit, dec!(80));
        assert_eq!(second.monthly_credit, dec!(80));
        assert_eq!(first.first_month_total, second.first_month_total);
    }

    #[test]
    fn annual_delta_subtracts_credit_from_new_annual_total() {
        let mut scenario = scenario().with_annual_manual_credit("200");
        scenario.billing_mode = BillingMode::Annual;
        scenario.annual_credit.active = true;

        let prices = calculate(&scenario, &RateCard::default());
        let credits = resolve_credits(&scenario, &prices);

        assert_eq!(credits.annual_delta, dec!(2248));
    }
}
