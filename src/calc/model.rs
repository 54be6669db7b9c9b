use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Packaging cost per bag when nothing else is configured.
pub const DEFAULT_UNIT_PACKAGING_COST: f64 = 2.0;

/// One period's production costs, output and prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub carne_fresca: f64,
    pub sal: f64,
    pub corte_carne: f64,
    pub sueldo1: f64,
    pub trabajador_adicional: f64,
    #[serde(default)]
    pub empleado_ventas: f64,
    #[serde(default)]
    pub redes_sociales: f64,
    pub luz: f64,
    pub agua: f64,
    pub fumigacion: f64,
    pub liquidos_limpieza: f64,
    pub otro_liquido: f64,
    pub total_unidades: i64,
    pub precio_venta: f64,
    pub precio_venta_sugerido: f64,
}

impl InputRecord {
    /// The reference month the cost form starts from.
    pub fn baseline() -> Self {
        Self {
            carne_fresca: 52473.06,
            sal: 31.35,
            corte_carne: 1024.14,
            sueldo1: 7266.95,
            trabajador_adicional: 3000.00,
            empleado_ventas: 0.0,
            redes_sociales: 0.0,
            luz: 651.25,
            agua: 145.34,
            fumigacion: 726.69,
            liquidos_limpieza: 297.01,
            otro_liquido: 18.35,
            total_unidades: 453,
            precio_venta: 145.18,
            precio_venta_sugerido: 196.00,
        }
    }

    /// Every cost line with its field name, in form order.
    pub fn cost_fields(&self) -> [(&'static str, f64); 12] {
        [
            ("carne_fresca", self.carne_fresca),
            ("sal", self.sal),
            ("corte_carne", self.corte_carne),
            ("sueldo1", self.sueldo1),
            ("trabajador_adicional", self.trabajador_adicional),
            ("empleado_ventas", self.empleado_ventas),
            ("redes_sociales", self.redes_sociales),
            ("luz", self.luz),
            ("agua", self.agua),
            ("fumigacion", self.fumigacion),
            ("liquidos_limpieza", self.liquidos_limpieza),
            ("otro_liquido", self.otro_liquido),
        ]
    }

    pub fn price(&self, slot: PriceSlot) -> f64 {
        match slot {
            PriceSlot::Actual => self.precio_venta,
            PriceSlot::Suggested => self.precio_venta_sugerido,
        }
    }

    pub fn set_price(&mut self, slot: PriceSlot, price: f64) {
        match slot {
            PriceSlot::Actual => self.precio_venta = price,
            PriceSlot::Suggested => self.precio_venta_sugerido = price,
        }
    }

    /// Checks the unit divisor and that every amount is a finite, non-negative number.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.total_unidades < 1 {
            return Err(CoreError::invalid(
                "total_unidades",
                format!("must be at least 1, got {}", self.total_unidades),
            ));
        }
        let prices = [
            ("precio_venta", self.precio_venta),
            ("precio_venta_sugerido", self.precio_venta_sugerido),
        ];
        for (field, value) in self.cost_fields().into_iter().chain(prices) {
            if !value.is_finite() {
                return Err(CoreError::invalid(field, "must be a finite number"));
            }
            if value < 0.0 {
                return Err(CoreError::invalid(
                    field,
                    format!("must not be negative, got {}", value),
                ));
            }
        }
        Ok(())
    }
}

/// Tunables of the calculation that are not part of a period's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcSettings {
    pub unit_packaging_cost: f64,
}

impl CalcSettings {
    pub fn new(unit_packaging_cost: f64) -> Result<Self, CoreError> {
        if !unit_packaging_cost.is_finite() || unit_packaging_cost < 0.0 {
            return Err(CoreError::invalid(
                "unit_packaging_cost",
                format!("must be a finite, non-negative number, got {}", unit_packaging_cost),
            ));
        }
        Ok(Self {
            unit_packaging_cost,
        })
    }
}

impl Default for CalcSettings {
    fn default() -> Self {
        Self {
            unit_packaging_cost: DEFAULT_UNIT_PACKAGING_COST,
        }
    }
}

/// The two candidate prices every figure is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSlot {
    Actual,
    Suggested,
}

impl PriceSlot {
    pub const ALL: [PriceSlot; 2] = [PriceSlot::Actual, PriceSlot::Suggested];
}

/// Profit figures for one selling price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotOutput {
    pub price: f64,
    /// Negative when the price does not cover the unit cost.
    pub profit_per_unit: f64,
    pub total_profit: f64,
    /// Zero when the price is zero.
    pub margin_pct: f64,
}

impl SlotOutput {
    pub fn is_loss(&self) -> bool {
        self.profit_per_unit < 0.0
    }
}

/// Everything derived from an [`InputRecord`]. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedOutput {
    pub packaging_cost: f64,
    pub total_cost: f64,
    pub cost_per_unit: f64,
    pub actual: SlotOutput,
    pub suggested: SlotOutput,
}

impl DerivedOutput {
    pub fn slot(&self, slot: PriceSlot) -> &SlotOutput {
        match slot {
            PriceSlot::Actual => &self.actual,
            PriceSlot::Suggested => &self.suggested,
        }
    }
}
