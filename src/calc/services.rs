use tracing::debug;

use super::model::{CalcSettings, DerivedOutput, InputRecord, SlotOutput};
use crate::error::CoreError;

/// Margins at or above this percentage fall back to [`CEILING_PRICE_FACTOR`].
pub const MARGIN_CEILING_PCT: f64 = 95.0;
/// Price multiple of the unit cost used once the margin hits the ceiling.
pub const CEILING_PRICE_FACTOR: f64 = 20.0;

/// Derives every figure for `input` using the default packaging cost.
pub fn derive(input: &InputRecord) -> Result<DerivedOutput, CoreError> {
    derive_with(input, &CalcSettings::default())
}

pub fn derive_with(input: &InputRecord, settings: &CalcSettings) -> Result<DerivedOutput, CoreError> {
    input.validate()?;

    let (packaging_cost, total_cost, cost_per_unit) = unit_costs(input, settings)?;
    let units = input.total_unidades as f64;

    let slot = |price: f64| {
        let profit_per_unit = price - cost_per_unit;
        SlotOutput {
            price,
            profit_per_unit,
            total_profit: profit_per_unit * units,
            margin_pct: margin_from_price(price, cost_per_unit).unwrap_or(0.0),
        }
    };

    let out = DerivedOutput {
        packaging_cost,
        total_cost,
        cost_per_unit,
        actual: slot(input.precio_venta),
        suggested: slot(input.precio_venta_sugerido),
    };
    debug!(
        total_cost = out.total_cost,
        cost_per_unit = out.cost_per_unit,
        "derived outputs"
    );
    Ok(out)
}

/// Cost per bag, independent of either selling price.
pub fn cost_per_unit(input: &InputRecord, settings: &CalcSettings) -> Result<f64, CoreError> {
    input.validate()?;
    Ok(unit_costs(input, settings)?.2)
}

// Caller guarantees `total_unidades >= 1`.
fn unit_costs(input: &InputRecord, settings: &CalcSettings) -> Result<(f64, f64, f64), CoreError> {
    let units = input.total_unidades as f64;
    let packaging_cost = units * settings.unit_packaging_cost;
    let total_cost = input
        .cost_fields()
        .iter()
        .map(|(_, amount)| amount)
        .sum::<f64>()
        + packaging_cost;
    // Finite lines can still overflow once summed.
    if !total_cost.is_finite() {
        return Err(CoreError::invalid(
            "total_cost",
            "cost lines add up to more than can be represented",
        ));
    }
    Ok((packaging_cost, total_cost, total_cost / units))
}

/// Selling price that yields `margin_pct` over `cost_per_unit`.
///
/// The margin is clamped to `[0, 95)`; negative or NaN margins count as 0.
/// At 95 % and above the divisor gets too close to zero, so the price is
/// `cost_per_unit * 20` instead.
pub fn price_from_margin(cost_per_unit: f64, margin_pct: f64) -> f64 {
    let margin = if margin_pct.is_nan() {
        0.0
    } else {
        margin_pct.max(0.0)
    };
    if margin >= MARGIN_CEILING_PCT {
        return cost_per_unit * CEILING_PRICE_FACTOR;
    }
    cost_per_unit / (1.0 - margin / 100.0)
}

/// Margin implied by selling at `price`; `None` when the price is not positive.
pub fn margin_from_price(price: f64, cost_per_unit: f64) -> Option<f64> {
    if price > 0.0 {
        Some((price - cost_per_unit) / price * 100.0)
    } else {
        None
    }
}
