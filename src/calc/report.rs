use serde::{Deserialize, Serialize};

use super::model::{CalcSettings, DerivedOutput, InputRecord, PriceSlot, SlotOutput};
use super::services::derive_with;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    RawMaterial,
    Labor,
    ServicesAndFixed,
    Marketing,
    Packaging,
}

impl CostCategory {
    pub const ALL: [CostCategory; 5] = [
        CostCategory::RawMaterial,
        CostCategory::Labor,
        CostCategory::ServicesAndFixed,
        CostCategory::Marketing,
        CostCategory::Packaging,
    ];

    fn of_field(field: &str) -> Self {
        match field {
            "carne_fresca" | "sal" => CostCategory::RawMaterial,
            "corte_carne" | "sueldo1" | "trabajador_adicional" | "empleado_ventas" => {
                CostCategory::Labor
            }
            "redes_sociales" => CostCategory::Marketing,
            _ => CostCategory::ServicesAndFixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLine {
    pub field: &'static str,
    pub category: CostCategory,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: CostCategory,
    pub amount: f64,
}

/// How one bag's price splits between cost and profit (or loss).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub cost_per_unit: f64,
    /// Absolute value of the profit or loss per bag.
    pub margin_amount: f64,
    pub is_loss: bool,
    /// Share of the price taken by cost; `None` when the price is zero.
    pub cost_share_pct: Option<f64>,
    /// Share of the price left as profit, negative for a loss.
    pub profit_share_pct: Option<f64>,
}

impl Composition {
    fn new(cost_per_unit: f64, slot: &SlotOutput) -> Self {
        let price = slot.price;
        let share = |part: f64| (price > 0.0).then(|| part / price * 100.0);
        Self {
            cost_per_unit,
            margin_amount: slot.profit_per_unit.abs(),
            is_loss: slot.is_loss(),
            cost_share_pct: share(cost_per_unit),
            profit_share_pct: share(slot.profit_per_unit),
        }
    }
}

/// Derived figures plus the series the charts are drawn from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub output: DerivedOutput,
    pub cost_breakdown: Vec<CostLine>,
    pub category_totals: Vec<CategoryTotal>,
    pub actual: Composition,
    pub suggested: Composition,
}

impl Report {
    pub fn composition(&self, slot: PriceSlot) -> &Composition {
        match slot {
            PriceSlot::Actual => &self.actual,
            PriceSlot::Suggested => &self.suggested,
        }
    }
}

pub fn build_report(input: &InputRecord, settings: &CalcSettings) -> Result<Report, CoreError> {
    let output = derive_with(input, settings)?;

    let mut cost_breakdown: Vec<CostLine> = input
        .cost_fields()
        .into_iter()
        .map(|(field, amount)| CostLine {
            field,
            category: CostCategory::of_field(field),
            amount,
        })
        .collect();
    cost_breakdown.push(CostLine {
        field: "empaques",
        category: CostCategory::Packaging,
        amount: output.packaging_cost,
    });

    let category_totals = CostCategory::ALL
        .into_iter()
        .map(|category| CategoryTotal {
            category,
            amount: cost_breakdown
                .iter()
                .filter(|line| line.category == category)
                .map(|line| line.amount)
                .sum(),
        })
        .collect();

    Ok(Report {
        actual: Composition::new(output.cost_per_unit, &output.actual),
        suggested: Composition::new(output.cost_per_unit, &output.suggested),
        output,
        cost_breakdown,
        category_totals,
    })
}
