//! The record handed to the proposal renderer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::scenario::{BillingMode, ClientInfo, Profile, Scenario};
use crate::pricing::money::round_money;
use crate::pricing::payment::{MonthlyOfferQuote, PaymentOptionQuote};
use crate::pricing::recurring::ModuleLine;
use crate::pricing::{Figure, QuoteResults};

const CLIENT_SLUG_MAX_CHARS: usize = 30;
const DEFAULT_CLIENT_SLUG: &str = "empresa";
const DEFAULT_PLAN_SLUG: &str = "plano";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalExport {
    pub file_base: String,
    pub generated_on: NaiveDate,
    pub client: ClientInfo,
    pub profile: Profile,
    pub billing_mode: BillingMode,
    pub current_plan: String,
    pub new_plan: String,
    pub current_headcount: Decimal,
    pub new_headcount: Decimal,
    pub modules: Vec<ModuleLine>,
    pub figures: Vec<Figure>,
    pub payment_options: Vec<PaymentOptionQuote>,
    pub monthly_offer: Option<MonthlyOfferQuote>,
}

impl ProposalExport {
    pub fn build(scenario: &Scenario, results: &QuoteResults, generated_on: NaiveDate) -> Self {
        let recurring = &results.recurring;
        Self {
            file_base: proposal_file_base(
                &scenario.client.name,
                &scenario.new_plan,
                recurring.new_monthly_total,
                generated_on,
            ),
            generated_on,
            client: scenario.client.clone(),
            profile: scenario.profile,
            billing_mode: scenario.billing_mode,
            current_plan: scenario.current_plan.clone(),
            new_plan: scenario.new_plan.clone(),
            current_headcount: recurring.current_headcount,
            new_headcount: recurring.new_headcount,
            modules: recurring.module_lines.clone(),
            figures: results.figures(),
            payment_options: results.payments.options.clone(),
            monthly_offer: results.payments.monthly_offer.clone(),
        }
    }
}

/// `proposta-{client}-{plan}-R{amount}-{dd-mm-yyyy}`, with a comma decimal.
pub fn proposal_file_base(
    client_name: &str,
    plan: &str,
    new_monthly_total: Decimal,
    generated_on: NaiveDate,
) -> String {
    let client = if client_name.is_empty() {
        DEFAULT_CLIENT_SLUG.to_string()
    } else {
        slug(client_name).chars().take(CLIENT_SLUG_MAX_CHARS).collect()
    };
    let plan = match slug(plan) {
        plan if plan.is_empty() => DEFAULT_PLAN_SLUG.to_string(),
        plan => plan,
    };
    let amount = format!("{:.2}", round_money(new_monthly_total)).replace('.', ",");
    let date = generated_on.format("%d-%m-%Y");

    format!("proposta-{client}-{plan}-R{amount}-{date}")
}

/// ASCII word characters only, with whitespace runs turned into `-`.
fn slug(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || ch.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}
