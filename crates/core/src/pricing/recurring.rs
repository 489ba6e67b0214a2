use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::scenario::Scenario;
use crate::pricing::money::{annualize, round_money};
use crate::pricing::rate_card::{Module, RateCard};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLine {
    pub module: Module,
    pub label: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub monthly: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPrices {
    pub current_headcount: Decimal,
    pub new_headcount: Decimal,
    pub current_list_price: Decimal,
    /// Manual override when typed, else the list price.
    pub current_system_monthly: Decimal,
    pub current_modules_monthly: Decimal,
    pub current_monthly_total: Decimal,
    pub current_combo: bool,
    pub same_scenario: bool,
    pub base_preserved: bool,
    pub new_system_monthly: Decimal,
    /// The base actually billed: `new_system_monthly` unless preserved.
    pub base_monthly: Decimal,
    pub module_lines: Vec<ModuleLine>,
    pub combo_applied: bool,
    pub modules_monthly: Decimal,
    pub new_monthly_total: Decimal,
    pub monthly_delta: Decimal,
    pub base_annual: Decimal,
    pub modules_annual: Decimal,
    pub new_annual_total: Decimal,
    /// Taken off the first annual installment only.
    pub vacation_bonus: Decimal,
}

impl RecurringPrices {
    pub fn module_monthly(&self, module: Module) -> Decimal {
        self.module_lines
            .iter()
            .find(|line| line.module == module)
            .map(|line| line.monthly)
            .unwrap_or_default()
    }
}

pub fn calculate(scenario: &Scenario, card: &RateCard) -> RecurringPrices {
    let current_headcount = scenario.current_headcount.or(Decimal::ZERO);
    let new_headcount = scenario.new_headcount.or(Decimal::ZERO);

    let current_list_price = list_price(card, &scenario.current_plan, current_headcount);
    let current_system_monthly = scenario
        .current_monthly_override
        .parse()
        .map(round_money)
        .unwrap_or(current_list_price);

    let (current_modules_monthly, current_combo) =
        current_modules_monthly(scenario, card, current_headcount);
    let current_monthly_total = round_money(current_system_monthly + current_modules_monthly);

    let same_scenario =
        scenario.current_plan == scenario.new_plan && current_headcount == new_headcount;

    let new_system_monthly = match scenario.system_price_per_user.parse() {
        Some(per_user) if per_user > Decimal::ZERO => round_money(per_user * new_headcount),
        _ => list_price(card, &scenario.new_plan, new_headcount),
    };

    let base_preserved =
        same_scenario && scenario.modules.any_included() && scenario.preserve_current_base;
    let base_monthly = if base_preserved { current_system_monthly } else { new_system_monthly };

    let module_lines = new_module_lines(scenario, card, new_headcount);
    let combo_applied = scenario.modules.file_management.included
        && scenario.modules.vacation_control.included;
    let modules_monthly = if combo_applied {
        let combo = round_money(card.combo_price_per_user * new_headcount);
        let clock = module_line_total(&module_lines, Module::VirtualClock);
        round_money(combo + clock)
    } else {
        round_money(module_lines.iter().map(|line| line.monthly).sum())
    };

    let new_monthly_total = round_money(base_monthly + modules_monthly);
    let monthly_delta = round_money(new_monthly_total - current_monthly_total);

    let base_annual = annualize(base_monthly);
    let modules_annual = annualize(modules_monthly);
    let new_annual_total = round_money(base_annual + modules_annual);

    let vacation_bonus = if scenario.is_annual() && scenario.modules.vacation_control.included {
        round_money(module_line_total(&module_lines, Module::VacationControl) * Decimal::TWO)
    } else {
        Decimal::ZERO
    };

    RecurringPrices {
        current_headcount,
        new_headcount,
        current_list_price,
        current_system_monthly,
        current_modules_monthly,
        current_monthly_total,
        current_combo,
        same_scenario,
        base_preserved,
        new_system_monthly,
        base_monthly,
        module_lines,
        combo_applied,
        modules_monthly,
        new_monthly_total,
        monthly_delta,
        base_annual,
        modules_annual,
        new_annual_total,
        vacation_bonus,
    }
}

fn list_price(card: &RateCard, plan_name: &str, headcount: Decimal) -> Decimal {
    match card.find_bracket(plan_name, headcount) {
        Some(bracket) => bracket.price,
        None => {
            tracing::warn!(
                event_name = "pricing.rate_card.unknown_plan",
                plan = plan_name,
                "plan is missing from the rate card; pricing at zero"
            );
            Decimal::ZERO
        }
    }
}

fn unit_price(scenario: &Scenario, card: &RateCard, module: Module) -> Decimal {
    scenario.modules.get(module).unit_price.or(card.module_default(module))
}

fn new_module_lines(scenario: &Scenario, card: &RateCard, headcount: Decimal) -> Vec<ModuleLine> {
    Module::ALL
        .iter()
        .copied()
        .filter(|module| scenario.modules.get(*module).included)
        .map(|module| {
            let quantity = if module.is_per_head() {
                headcount
            } else {
                scenario.modules.get(module).quantity.or(Decimal::ZERO)
            };
            let unit_price = unit_price(scenario, card, module);
            ModuleLine {
                module,
                label: card.modules.rate(module).label.clone(),
                quantity,
                unit_price,
                monthly: round_money(unit_price * quantity),
            }
        })
        .collect()
}

fn module_line_total(lines: &[ModuleLine], module: Module) -> Decimal {
    lines.iter().find(|line| line.module == module).map(|line| line.monthly).unwrap_or_default()
}

/// Per-head legacy modules are valued at the standard unit price; the
/// virtual clock uses the unit price on the proposal.
fn current_modules_monthly(
    scenario: &Scenario,
    card: &RateCard,
    headcount: Decimal,
) -> (Decimal, bool) {
    let legacy = &scenario.current_modules;
    let has_files = legacy.file_management.has_module;
    let has_vacation = legacy.vacation_control.has_module;

    let clock = if legacy.virtual_clock.has_module {
        let quantity = legacy.virtual_clock_quantity.or(Decimal::ZERO);
        round_money(unit_price(scenario, card, Module::VirtualClock) * quantity)
    } else {
        Decimal::ZERO
    };

    if has_files && has_vacation {
        let combo = round_money(card.combo_price_per_user * headcount);
        return (round_money(combo + clock), true);
    }

    let per_head = |present: bool, module: Module| {
        if present {
            round_money(card.module_default(module) * headcount)
        } else {
            Decimal::ZERO
        }
    };
    let total = per_head(has_files, Module::FileManagement)
        + per_head(has_vacation, Module::VacationControl)
        + clock;
    (round_money(total), false)
}
