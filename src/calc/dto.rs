use serde::{Deserialize, Serialize};

use super::model::InputRecord;
use super::pricing::PriceControls;
use super::report::Report;

/// Request body for evaluating a record under explicit price modes.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub record: InputRecord,
    #[serde(default)]
    pub controls: PriceControls,
}

/// Resolved record plus its report.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub record: InputRecord,
    pub report: Report,
}

#[derive(Debug, Deserialize)]
pub struct PriceFromMarginQuery {
    pub cost_per_unit: f64,
    pub margin_pct: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceResponse {
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct MarginFromPriceQuery {
    pub price: f64,
    pub cost_per_unit: f64,
}

/// `margin_pct` is `null` when the price is not positive.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarginResponse {
    pub margin_pct: Option<f64>,
}
