//! Rate card: list prices per plan and headcount bracket, module unit prices
//! and the fixed annual payment tiers.
//!
//! The card is an immutable value handed to the pricing runtime at
//! construction. The built-in [`RateCard::default`] carries the commercial
//! table; alternative cards are loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::input::MAX_AMOUNT;

/// Annotation some plan names carry in the picker; it never affects price.
pub const OFFLINE_SUFFIX: &str = " (Offline)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    FileManagement,
    VacationControl,
    VirtualClock,
}

impl Module {
    pub const ALL: [Module; 3] =
        [Module::FileManagement, Module::VacationControl, Module::VirtualClock];

    /// Per-head modules are priced by headcount; the virtual clock is licensed.
    pub fn is_per_head(self) -> bool {
        !matches!(self, Module::VirtualClock)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Module::FileManagement => "file_management",
            Module::VacationControl => "vacation_control",
            Module::VirtualClock => "virtual_clock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBracket {
    pub max_headcount: Decimal,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRates {
    pub name: String,
    pub brackets: Vec<PriceBracket>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRate {
    pub label: String,
    pub default_unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRates {
    pub file_management: ModuleRate,
    pub vacation_control: ModuleRate,
    pub virtual_clock: ModuleRate,
}

impl ModuleRates {
    pub fn rate(&self, module: Module) -> &ModuleRate {
        match module {
            Module::FileManagement => &self.file_management,
            Module::VacationControl => &self.vacation_control,
            Module::VirtualClock => &self.virtual_clock,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTier {
    pub key: String,
    pub title: String,
    /// Fraction, `0.15` for 15%.
    pub discount_rate: Decimal,
    pub installments: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    pub plans: Vec<PlanRates>,
    pub modules: ModuleRates,
    pub combo_price_per_user: Decimal,
    pub payment_tiers: Vec<PaymentTier>,
}

#[derive(Debug, Error)]
pub enum RateCardError {
    #[error("could not read rate card `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse rate card `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid rate card: {0}")]
    Invalid(String),
}

impl Default for RateCard {
    fn default() -> Self {
        let entry_brackets = brackets(&[(10, 79), (30, 168), (50, 255), (100, 460), (300, 1170)]);
        let pro_brackets = brackets(&[(10, 89), (30, 204), (50, 290), (100, 530), (300, 1410)]);
        let top_brackets = brackets(&[(10, 99), (30, 234), (50, 340), (100, 610), (300, 1620)]);

        Self {
            plans: vec![
                PlanRates { name: "Offline".to_string(), brackets: entry_brackets.clone() },
                PlanRates { name: "Basic".to_string(), brackets: entry_brackets },
                PlanRates { name: "Pro".to_string(), brackets: pro_brackets },
                PlanRates { name: "Ultimate".to_string(), brackets: top_brackets.clone() },
                PlanRates { name: "Ultimate Plus".to_string(), brackets: top_brackets },
            ],
            modules: ModuleRates {
                file_management: ModuleRate {
                    label: "Gestão de Arquivos".to_string(),
                    default_unit_price: Decimal::new(150, 2),
                },
                vacation_control: ModuleRate {
                    label: "Controle de Férias".to_string(),
                    default_unit_price: Decimal::new(120, 2),
                },
                virtual_clock: ModuleRate {
                    label: "Ponto Virtual".to_string(),
                    default_unit_price: Decimal::new(3990, 2),
                },
            },
            combo_price_per_user: Decimal::new(250, 2),
            payment_tiers: vec![
                PaymentTier {
                    key: "upfront".to_string(),
                    title: "À Vista".to_string(),
                    discount_rate: Decimal::new(15, 2),
                    installments: 1,
                },
                PaymentTier {
                    key: "boleto_4x".to_string(),
                    title: "Boleto 4x".to_string(),
                    discount_rate: Decimal::new(12, 2),
                    installments: 4,
                },
                PaymentTier {
                    key: "card_12x".to_string(),
                    title: "Cartão 12x".to_string(),
                    discount_rate: Decimal::new(7, 2),
                    installments: 12,
                },
            ],
        }
    }
}

fn price_in_range(price: Decimal) -> bool {
    (Decimal::ZERO..=MAX_AMOUNT).contains(&price)
}

fn brackets(rows: &[(i64, i64)]) -> Vec<PriceBracket> {
    rows.iter()
        .map(|(max_headcount, price)| PriceBracket {
            max_headcount: Decimal::from(*max_headcount),
            price: Decimal::from(*price),
        })
        .collect()
}

impl RateCard {
    pub fn load(path: &Path) -> Result<Self, RateCardError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| RateCardError::ReadFile { path: path.to_path_buf(), source })?;
        let card = toml::from_str::<RateCard>(&raw)
            .map_err(|source| RateCardError::ParseFile { path: path.to_path_buf(), source })?;
        card.validate()?;
        Ok(card)
    }

    pub fn plan_names(&self) -> impl Iterator<Item = &str> {
        self.plans.iter().map(|plan| plan.name.as_str())
    }

    pub fn plan(&self, plan_name: &str) -> Option<&PlanRates> {
        let key = plan_name.replace(OFFLINE_SUFFIX, "");
        self.plans.iter().find(|plan| plan.name == key)
    }

    /// First bracket whose ceiling covers the headcount, else the top bracket.
    pub fn find_bracket(&self, plan_name: &str, headcount: Decimal) -> Option<&PriceBracket> {
        let plan = self.plan(plan_name)?;
        plan.brackets
            .iter()
            .find(|bracket| bracket.max_headcount >= headcount)
            .or_else(|| plan.brackets.last())
    }

    /// Monthly list price; unknown plans price at zero.
    pub fn lookup_tier(&self, plan_name: &str, headcount: Decimal) -> Decimal {
        self.find_bracket(plan_name, headcount).map(|bracket| bracket.price).unwrap_or_default()
    }

    pub fn module_default(&self, module: Module) -> Decimal {
        self.modules.rate(module).default_unit_price
    }

    pub fn validate(&self) -> Result<(), RateCardError> {
        if self.plans.is_empty() {
            return Err(RateCardError::Invalid("at least one plan is required".to_string()));
        }

        for plan in &self.plans {
            if plan.brackets.is_empty() {
                return Err(RateCardError::Invalid(format!(
                    "plan `{}` has no price brackets",
                    plan.name
                )));
            }
            let ascending =
                plan.brackets.windows(2).all(|pair| pair[0].max_headcount < pair[1].max_headcount);
            if !ascending {
                return Err(RateCardError::Invalid(format!(
                    "plan `{}` brackets must ascend by max_headcount",
                    plan.name
                )));
            }
            if plan.brackets.iter().any(|bracket| !price_in_range(bracket.price)) {
                return Err(RateCardError::Invalid(format!(
                    "plan `{}` has a price outside 0..={MAX_AMOUNT}",
                    plan.name
                )));
            }
        }

        let invalid_module =
            Module::ALL.iter().find(|module| !price_in_range(self.module_default(**module)));
        if let Some(module) = invalid_module {
            return Err(RateCardError::Invalid(format!(
                "module `{}` default unit price must be in range 0..={MAX_AMOUNT}",
                module.as_str()
            )));
        }

        if !price_in_range(self.combo_price_per_user) {
            return Err(RateCardError::Invalid(format!(
                "combo_price_per_user must be in range 0..={MAX_AMOUNT}"
            )));
        }

        for tier in &self.payment_tiers {
            if tier.discount_rate < Decimal::ZERO || tier.discount_rate >= Decimal::ONE {
                return Err(RateCardError::Invalid(format!(
                    "payment tier `{}` discount_rate must be in range 0..1",
                    tier.key
                )));
            }
            if tier.installments == 0 {
                return Err(RateCardError::Invalid(format!(
                    "payment tier `{}` needs at least one installment",
                    tier.key
                )));
            }
        }

        Ok(())
    }
}
