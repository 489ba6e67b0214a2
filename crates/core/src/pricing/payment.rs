//! Payment conditions for the annual contract and the retention offers.
//!
//! Expansion deals use the rate card's fixed tiers. Retention deals replace
//! them with operator-authored [`PaymentOffer`]s, which are free to combine a
//! percentage, a flat discount, a down payment and a custom installment
//! amount. Both end up as the same [`PaymentOptionQuote`] record.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::scenario::{PaymentOffer, Profile, Scenario};
use crate::pricing::money::{apply_percent, apply_rate, non_negative, round_money};
use crate::pricing::proration::CreditOutcome;
use crate::pricing::rate_card::{PaymentTier, RateCard};
use crate::pricing::recurring::RecurringPrices;

/// Schedules further off than this are flagged for the operator.
pub const RECONCILIATION_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installments {
    pub count: u32,
    pub first: Decimal,
    pub regular: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationWarning {
    pub expected_total: Decimal,
    pub scheduled_total: Decimal,
    pub difference: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOptionQuote {
    pub key: String,
    pub title: String,
    pub discount_percent: Decimal,
    pub discount_value: Decimal,
    /// Price before any discount.
    pub gross: Decimal,
    pub discounted: Decimal,
    pub credit: Decimal,
    pub total: Decimal,
    pub down_payment: Decimal,
    pub installments: Installments,
    /// Amount actually taken off the first installment; less than the
    /// vacation bonus when the installment could not absorb all of it.
    pub first_installment_bonus: Decimal,
    pub note: String,
    pub selected: bool,
    pub highlighted: bool,
    pub reconciliation: Option<ReconciliationWarning>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyOfferQuote {
    pub option: PaymentOptionQuote,
    /// Whole-number discount the offer actually reaches on the first month.
    pub achieved_percent: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPlan {
    /// Annual contract conditions; empty in monthly mode.
    pub options: Vec<PaymentOptionQuote>,
    /// Monthly retention condition; only for retention deals in monthly mode.
    pub monthly_offer: Option<MonthlyOfferQuote>,
}

impl PaymentPlan {
    pub fn selected(&self) -> Option<&PaymentOptionQuote> {
        self.options.iter().find(|option| option.selected)
    }
}

/// The annual amounts a discount is computed from.
#[derive(Clone, Copy, Debug)]
struct AnnualBasis {
    base: Decimal,
    modules: Decimal,
    credit: Decimal,
    modules_only: bool,
}

impl AnnualBasis {
    fn gross(&self) -> Decimal {
        round_money(self.base + self.modules)
    }

    fn discounted_by_rate(&self, rate: Decimal) -> Decimal {
        if self.modules_only {
            round_money(self.base + apply_rate(self.modules, rate))
        } else {
            apply_rate(self.gross(), rate)
        }
    }

    fn discounted_by_percent(&self, percent: Decimal) -> Decimal {
        self.discounted_by_rate(percent / Decimal::ONE_HUNDRED)
    }
}

pub fn plan_payments(
    scenario: &Scenario,
    card: &RateCard,
    recurring: &RecurringPrices,
    credits: &CreditOutcome,
) -> PaymentPlan {
    if !scenario.is_annual() {
        let monthly_offer = match scenario.profile {
            Profile::Retention => Some(monthly_offer(
                &scenario.monthly_retention_offer,
                credits.first_month_total,
                &scenario.selected_payment,
            )),
            Profile::Expansion => None,
        };
        return PaymentPlan { options: Vec::new(), monthly_offer };
    }

    let basis = AnnualBasis {
        base: recurring.base_annual,
        modules: recurring.modules_annual,
        credit: credits.annual_credit,
        modules_only: scenario.discount_applies_to_modules_only,
    };

    let options = match scenario.profile {
        Profile::Expansion => card
            .payment_tiers
            .iter()
            .map(|tier| {
                let bonus = recurring.vacation_bonus;
                fixed_tier_option(tier, &basis, bonus, &scenario.selected_payment)
            })
            .collect(),
        Profile::Retention => scenario
            .retention_offers
            .iter()
            .map(|offer| negotiated_option(offer, &basis, &scenario.selected_payment))
            .collect(),
    };

    PaymentPlan { options, monthly_offer: None }
}

fn fixed_tier_option(
    tier: &PaymentTier,
    basis: &AnnualBasis,
    vacation_bonus: Decimal,
    selected_key: &str,
) -> PaymentOptionQuote {
    let discounted = basis.discounted_by_rate(tier.discount_rate);
    let total = round_money(non_negative(discounted - basis.credit));
    let installments = schedule(total, tier.installments, vacation_bonus);

    PaymentOptionQuote {
        key: tier.key.clone(),
        title: tier.title.clone(),
        discount_percent: round_money(tier.discount_rate * Decimal::ONE_HUNDRED),
        discount_value: Decimal::ZERO,
        gross: basis.gross(),
        discounted,
        credit: basis.credit,
        total,
        down_payment: Decimal::ZERO,
        first_installment_bonus: round_money(installments.regular - installments.first),
        installments,
        note: String::new(),
        selected: tier.key == selected_key,
        highlighted: false,
        reconciliation: None,
    }
}

fn negotiated_option(
    offer: &PaymentOffer,
    basis: &AnnualBasis,
    selected_key: &str,
) -> PaymentOptionQuote {
    let percent = offer.discount_percent.or(Decimal::ZERO);
    let flat = offer.discount_value.or(Decimal::ZERO);
    let discounted = round_money(non_negative(basis.discounted_by_percent(percent) - flat));
    let total = round_money(non_negative(discounted - basis.credit));

    offer_quote(offer, basis.gross(), discounted, basis.credit, total, selected_key)
}

fn monthly_offer(offer: &PaymentOffer, base: Decimal, selected_key: &str) -> MonthlyOfferQuote {
    let percent = offer.discount_percent.or(Decimal::ZERO);
    let flat = offer.discount_value.or(Decimal::ZERO);
    let discounted = round_money(non_negative(apply_percent(base, percent) - flat));

    let achieved_percent = if base.is_zero() {
        Decimal::ZERO
    } else {
        ((Decimal::ONE - discounted / base) * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    };

    MonthlyOfferQuote {
        option: offer_quote(offer, base, discounted, Decimal::ZERO, discounted, selected_key),
        achieved_percent,
    }
}

fn offer_quote(
    offer: &PaymentOffer,
    gross: Decimal,
    discounted: Decimal,
    credit: Decimal,
    total: Decimal,
    selected_key: &str,
) -> PaymentOptionQuote {
    let count = offer.installments.max(1);
    let down_payment = round_money(offer.down_payment.or(Decimal::ZERO));
    let per_installment = match offer.installment_value.parse() {
        Some(explicit) => round_money(explicit),
        None => round_money(non_negative(total - down_payment) / Decimal::from(count)),
    };

    let scheduled_total = round_money(down_payment + per_installment * Decimal::from(count));
    let difference = round_money(scheduled_total - total);
    let reconciliation = (difference.abs() > RECONCILIATION_TOLERANCE).then(|| {
        tracing::info!(
            event_name = "pricing.offer.unreconciled",
            offer_key = %offer.key,
            expected_total = %total,
            scheduled_total = %scheduled_total,
            "offer schedule does not add up to its total"
        );
        ReconciliationWarning { expected_total: total, scheduled_total, difference }
    });

    PaymentOptionQuote {
        key: offer.key.clone(),
        title: offer.title.clone(),
        discount_percent: round_money(offer.discount_percent.or(Decimal::ZERO)),
        discount_value: round_money(offer.discount_value.or(Decimal::ZERO)),
        gross,
        discounted,
        credit,
        total,
        down_payment,
        installments: Installments { count, first: per_installment, regular: per_installment },
        first_installment_bonus: Decimal::ZERO,
        note: offer.note.clone(),
        selected: offer.key == selected_key,
        highlighted: offer.highlighted,
        reconciliation,
    }
}

/// Splits `total` into equal installments; the vacation bonus comes off the
/// first one when there is more than one.
fn schedule(total: Decimal, installments: u32, bonus: Decimal) -> Installments {
    let count = installments.max(1);
    let regular = round_money(total / Decimal::from(count));
    let first = if count > 1 && bonus > Decimal::ZERO {
        round_money(non_negative(regular - bonus))
    } else {
        regular
    };
    Installments { count, first, regular }
}
