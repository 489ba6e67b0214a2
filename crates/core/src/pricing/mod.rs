pub mod export;
pub mod input;
pub mod money;
pub mod payment;
pub mod proration;
pub mod rate_card;
pub mod recurring;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::scenario::Scenario;

use self::{
    payment::{plan_payments, PaymentPlan},
    proration::{resolve_credits, CreditOutcome},
    rate_card::RateCard,
    recurring::{calculate, RecurringPrices},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figure {
    pub key: String,
    pub label: String,
    pub amount: Decimal,
}

impl Figure {
    fn new(key: impl Into<String>, label: impl Into<String>, amount: Decimal) -> Self {
        Self { key: key.into(), label: label.into(), amount }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResults {
    pub recurring: RecurringPrices,
    pub credits: CreditOutcome,
    pub payments: PaymentPlan,
}

impl QuoteResults {
    /// Every displayed amount in proposal order.
    pub fn figures(&self) -> Vec<Figure> {
        let recurring = &self.recurring;
        let credits = &self.credits;

        let mut figures = vec![
            Figure::new(
                "current_monthly",
                "Plano atual (mensal)",
                recurring.current_monthly_total,
            ),
            Figure::new("new_monthly", "Novo plano (mensal)", recurring.new_monthly_total),
            Figure::new("monthly_delta", "Diferença mensal", recurring.monthly_delta),
            Figure::new("monthly_credit", "Crédito proporcional", credits.monthly_credit),
            Figure::new(
                "first_month_total",
                "Total a pagar no 1º mês",
                credits.first_month_total,
            ),
            Figure::new("annual_base", "Sistema (anual)", recurring.base_annual),
            Figure::new("annual_modules", "Módulos (anual)", recurring.modules_annual),
            Figure::new("annual_credit", "Crédito anual", credits.annual_credit),
            Figure::new("annual_delta", "Diferença anual", credits.annual_delta),
        ];

        figures.extend(self.payments.options.iter().map(|option| {
            Figure::new(format!("payment.{}", option.key), option.title.clone(), option.total)
        }));
        if let Some(offer) = &self.payments.monthly_offer {
            figures.push(Figure::new(
                format!("payment.{}", offer.option.key),
                offer.option.title.clone(),
                offer.option.total,
            ));
        }

        figures
    }
}

pub trait QuoteRuntime: Send + Sync {
    fn rate_card(&self) -> &RateCard;
    fn evaluate(&self, scenario: &Scenario) -> QuoteResults;
}

/// Runs the stages in order: recurring prices, credits, payment plan.
pub struct StandardQuoteRuntime {
    rate_card: RateCard,
}

impl StandardQuoteRuntime {
    pub fn new(rate_card: RateCard) -> Self {
        Self { rate_card }
    }
}

impl Default for StandardQuoteRuntime {
    fn default() -> Self {
        Self::new(RateCard::default())
    }
}

impl QuoteRuntime for StandardQuoteRuntime {
    fn rate_card(&self) -> &RateCard {
        &self.rate_card
    }

    fn evaluate(&self, scenario: &Scenario) -> QuoteResults {
        let recurring = calculate(scenario, &self.rate_card);
        let credits = resolve_credits(scenario, &recurring);
        let payments = plan_payments(scenario, &self.rate_card, &recurring, &credits);

        QuoteResults { recurring, credits, payments }
    }
}
