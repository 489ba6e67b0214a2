use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::pricing::input::RawAmount;
use crate::pricing::rate_card::{Module, PaymentTier, RateCard};

pub const DEFAULT_PLAN: &str = "Pro";
pub const DEFAULT_HEADCOUNT: f64 = 30.0;
pub const MONTHLY_OFFER_KEY: &str = "monthly_offer";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Expansion,
    Retention,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    #[default]
    Monthly,
    Annual,
}

/// Which cycle is being refunded into the new plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Migration {
    None,
    MonthlyToAnnual,
    AnnualToMonthly,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSelection {
    pub included: bool,
    pub unit_price: RawAmount,
    /// Only read for licensed modules; per-head modules follow headcount.
    pub quantity: RawAmount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSelections {
    pub file_management: ModuleSelection,
    pub vacation_control: ModuleSelection,
    pub virtual_clock: ModuleSelection,
}

impl ModuleSelections {
    pub fn from_card(card: &RateCard) -> Self {
        let priced = |module: Module| ModuleSelection {
            included: false,
            unit_price: RawAmount::from(card.module_default(module)),
            quantity: RawAmount::Empty,
        };

        Self {
            file_management: priced(Module::FileManagement),
            vacation_control: priced(Module::VacationControl),
            virtual_clock: ModuleSelection {
                quantity: RawAmount::number(1.0),
                ..priced(Module::VirtualClock)
            },
        }
    }

    pub fn get(&self, module: Module) -> &ModuleSelection {
        match module {
            Module::FileManagement => &self.file_management,
            Module::VacationControl => &self.vacation_control,
            Module::VirtualClock => &self.virtual_clock,
        }
    }

    pub fn any_included(&self) -> bool {
        Module::ALL.iter().any(|module| self.get(*module).included)
    }
}

impl Default for ModuleSelections {
    fn default() -> Self {
        Self::from_card(&RateCard::default())
    }
}

/// What the customer already has, as entered from their last invoice.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyModule {
    pub has_module: bool,
    pub annual_amount_paid: RawAmount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentModules {
    pub file_management: LegacyModule,
    pub vacation_control: LegacyModule,
    pub virtual_clock: LegacyModule,
    pub virtual_clock_quantity: RawAmount,
}

impl CurrentModules {
    pub fn get(&self, module: Module) -> &LegacyModule {
        match module {
            Module::FileManagement => &self.file_management,
            Module::VacationControl => &self.vacation_control,
            Module::VirtualClock => &self.virtual_clock,
        }
    }
}

impl Default for CurrentModules {
    fn default() -> Self {
        Self {
            file_management: LegacyModule::default(),
            vacation_control: LegacyModule::default(),
            virtual_clock: LegacyModule::default(),
            virtual_clock_quantity: RawAmount::number(1.0),
        }
    }
}

/// ISO `YYYY-MM-DD` strings as typed; invalid dates degrade to zero credit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleDates {
    pub start: String,
    pub end: String,
    pub changeover: String,
}

impl CycleDates {
    pub fn single_day(date: NaiveDate) -> Self {
        let iso = date.format("%Y-%m-%d").to_string();
        Self { start: iso.clone(), end: iso.clone(), changeover: iso }
    }

    pub fn new(start: &str, end: &str, changeover: &str) -> Self {
        Self { start: start.to_string(), end: end.to_string(), changeover: changeover.to_string() }
    }
}

impl Default for CycleDates {
    fn default() -> Self {
        Self::single_day(Local::now().date_naive())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualCredit {
    pub value: String,
    pub active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnualManualCredit {
    /// Typed but not necessarily committed.
    pub value: String,
    pub active: bool,
    /// Committed through the apply action; wins over `value`.
    pub applied: String,
}

/// Operator-authored payment condition used in retention negotiations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentOffer {
    pub key: String,
    pub title: String,
    /// Whole-number percentage, `10` for 10%.
    pub discount_percent: RawAmount,
    /// Flat currency discount applied after the percentage.
    pub discount_value: RawAmount,
    pub down_payment: RawAmount,
    pub installments: u32,
    pub installment_value: RawAmount,
    pub note: String,
    pub highlighted: bool,
}

impl PaymentOffer {
    pub fn from_tier(tier: &PaymentTier) -> Self {
        let percent = tier.discount_rate * rust_decimal::Decimal::ONE_HUNDRED;
        Self {
            key: tier.key.clone(),
            title: tier.title.clone(),
            discount_percent: RawAmount::from(percent),
            installments: tier.installments,
            ..Self::default()
        }
    }

    pub fn monthly_default() -> Self {
        Self {
            key: MONTHLY_OFFER_KEY.to_string(),
            title: "Condição mensal".to_string(),
            installments: 1,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    pub name: String,
    pub tax_id: String,
}

/// The single source of truth for one pricing conversation.
///
/// Edits never mutate in place; see the `with_*` operations which return a
/// replacement value. Missing keys in a stored document fall back to the
/// defaults below, so older saves keep loading as fields are added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub profile: Profile,
    pub billing_mode: BillingMode,
    pub current_headcount: RawAmount,
    pub new_headcount: RawAmount,
    pub current_plan: String,
    pub new_plan: String,
    pub modules: ModuleSelections,
    pub preserve_current_base: bool,
    pub system_price_per_user: RawAmount,
    pub current_monthly_override: RawAmount,
    pub monthly_cycle: CycleDates,
    pub annual_cycle: CycleDates,
    pub monthly_credit: ManualCredit,
    pub annual_credit: AnnualManualCredit,
    pub current_modules: CurrentModules,
    pub annual_amount_paid: RawAmount,
    pub discount_applies_to_modules_only: bool,
    pub migrating_from_monthly: bool,
    pub migrating_from_annual: bool,
    pub selected_payment: String,
    pub retention_offers: Vec<PaymentOffer>,
    pub monthly_retention_offer: PaymentOffer,
    pub client: ClientInfo,
}

impl Scenario {
    pub fn starting_on(today: NaiveDate, card: &RateCard) -> Self {
        Self {
            profile: Profile::Expansion,
            billing_mode: BillingMode::Monthly,
            current_headcount: RawAmount::number(DEFAULT_HEADCOUNT),
            new_headcount: RawAmount::number(DEFAULT_HEADCOUNT),
            current_plan: DEFAULT_PLAN.to_string(),
            new_plan: DEFAULT_PLAN.to_string(),
            modules: ModuleSelections::from_card(card),
            preserve_current_base: false,
            system_price_per_user: RawAmount::Empty,
            current_monthly_override: RawAmount::Empty,
            monthly_cycle: CycleDates::single_day(today),
            annual_cycle: CycleDates::single_day(today),
            monthly_credit: ManualCredit::default(),
            annual_credit: AnnualManualCredit::default(),
            current_modules: CurrentModules::default(),
            annual_amount_paid: RawAmount::Empty,
            discount_applies_to_modules_only: false,
            migrating_from_monthly: false,
            migrating_from_annual: false,
            selected_payment: card
                .payment_tiers
                .first()
                .map(|tier| tier.key.clone())
                .unwrap_or_default(),
            retention_offers: card.payment_tiers.iter().map(PaymentOffer::from_tier).collect(),
            monthly_retention_offer: PaymentOffer::monthly_default(),
            client: ClientInfo::default(),
        }
    }

    /// The migration flags only mean something in the billing mode they
    /// migrate into.
    pub fn migration(&self) -> Migration {
        match self.billing_mode {
            BillingMode::Annual if self.migrating_from_monthly => Migration::MonthlyToAnnual,
            BillingMode::Monthly if self.migrating_from_annual => Migration::AnnualToMonthly,
            _ => Migration::None,
        }
    }

    pub fn is_annual(&self) -> bool {
        self.billing_mode == BillingMode::Annual
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::starting_on(Local::now().date_naive(), &RateCard::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::{BillingMode, Migration, Profile, Scenario};
    use crate::pricing::rate_card::RateCard;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date")
    }

    #[test]
    fn defaults_describe_a_thirty_seat_pro_customer() {
        let scenario = Scenario::starting_on(today(), &RateCard::default());

        assert_eq!(scenario.profile, Profile::Expansion);
        assert_eq!(scenario.billing_mode, BillingMode::Monthly);
        assert_eq!(scenario.current_plan, "Pro");
        assert_eq!(scenario.new_headcount.parse(), Some(dec!(30)));
        assert_eq!(scenario.modules.virtual_clock.unit_price.parse(), Some(dec!(39.9)));
        assert_eq!(scenario.monthly_cycle.start, "2026-03-10");
        assert_eq!(scenario.selected_payment, "upfront");
        assert_eq!(scenario.retention_offers.len(), 3);
        assert_eq!(scenario.retention_offers[1].discount_percent.parse(), Some(dec!(12)));
    }

    #[test]
    fn stored_documents_merge_over_defaults() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "billing_mode": "annual",
                "new_plan": "Ultimate",
                "modules": { "vacation_control": { "included": true } },
                "client": { "name": "Acme" }
            }"#,
        )
        .expect("partial scenario");

        assert_eq!(scenario.billing_mode, BillingMode::Annual);
        assert_eq!(scenario.new_plan, "Ultimate");
        assert_eq!(scenario.current_plan, "Pro");
        assert!(scenario.modules.vacation_control.included);
        assert!(!scenario.modules.file_management.included);
        assert_eq!(scenario.modules.file_management.unit_price.parse(), Some(dec!(1.5)));
        assert_eq!(scenario.client.name, "Acme");
        assert_eq!(scenario.retention_offers.len(), 3);
    }

    #[test]
    fn migration_flags_follow_billing_mode() {
        let mut scenario = Scenario::starting_on(today(), &RateCard::default());
        scenario.migrating_from_monthly = true;
        assert_eq!(scenario.migration(), Migration::None);

        scenario.billing_mode = BillingMode::Annual;
        assert_eq!(scenario.migration(), Migration::MonthlyToAnnual);

        scenario.migrating_from_monthly = false;
        scenario.migrating_from_annual = true;
        assert_eq!(scenario.migration(), Migration::None);

        scenario.billing_mode = BillingMode::Monthly;
        assert_eq!(scenario.migration(), Migration::AnnualToMonthly);
    }
}
