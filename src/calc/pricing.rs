//! Direct price entry versus target-margin entry.
//!
//! Each price slot is driven by exactly one [`PriceMode`] at a time. Setting a
//! price switches the slot to direct entry, setting a margin switches it to
//! target-margin entry; whichever happened last is what the next evaluation
//! uses.

use serde::{Deserialize, Serialize};

use super::model::{CalcSettings, DerivedOutput, InputRecord, PriceSlot};
use super::services::{cost_per_unit, derive_with, price_from_margin};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PriceMode {
    /// Use the price already in the record for this slot.
    #[default]
    Direct,
    /// Use this price, overriding the record.
    Price { price: f64 },
    /// Derive the price from the unit cost.
    TargetMargin { margin_pct: f64 },
}

impl PriceMode {
    fn resolve(&self, current: f64, cost_per_unit: f64) -> Result<f64, CoreError> {
        match *self {
            PriceMode::Direct => Ok(current),
            PriceMode::Price { price } => {
                if !price.is_finite() || price < 0.0 {
                    return Err(CoreError::invalid(
                        "price",
                        format!("must be a finite, non-negative number, got {}", price),
                    ));
                }
                Ok(price)
            }
            PriceMode::TargetMargin { margin_pct } => Ok(price_from_margin(cost_per_unit, margin_pct)),
        }
    }
}

/// The active input mode of both price slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceControls {
    #[serde(default)]
    pub actual: PriceMode,
    #[serde(default)]
    pub suggested: PriceMode,
}

impl PriceControls {
    pub fn mode(&self, slot: PriceSlot) -> PriceMode {
        match slot {
            PriceSlot::Actual => self.actual,
            PriceSlot::Suggested => self.suggested,
        }
    }

    fn mode_mut(&mut self, slot: PriceSlot) -> &mut PriceMode {
        match slot {
            PriceSlot::Actual => &mut self.actual,
            PriceSlot::Suggested => &mut self.suggested,
        }
    }

    /// Direct price edit; replaces any target margin on this slot.
    pub fn set_price(&mut self, slot: PriceSlot, price: f64) {
        *self.mode_mut(slot) = PriceMode::Price { price };
    }

    /// Target margin edit; replaces any direct price on this slot.
    pub fn set_margin(&mut self, slot: PriceSlot, margin_pct: f64) {
        *self.mode_mut(slot) = PriceMode::TargetMargin { margin_pct };
    }

    /// Back to the record's own price for this slot.
    pub fn clear(&mut self, slot: PriceSlot) {
        *self.mode_mut(slot) = PriceMode::Direct;
    }
}

/// A record with both prices resolved, and what it derives to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub record: InputRecord,
    pub output: DerivedOutput,
}

/// Resolves each slot's price through its active mode, then derives.
pub fn evaluate(
    record: &InputRecord,
    controls: &PriceControls,
    settings: &CalcSettings,
) -> Result<Evaluation, CoreError> {
    let unit_cost = cost_per_unit(record, settings)?;

    let mut resolved = *record;
    for slot in PriceSlot::ALL {
        let price = controls.mode(slot).resolve(record.price(slot), unit_cost)?;
        resolved.set_price(slot, price);
    }

    let output = derive_with(&resolved, settings)?;
    Ok(Evaluation {
        record: resolved,
        output,
    })
}
