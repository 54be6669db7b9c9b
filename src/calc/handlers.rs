use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    EvaluateRequest, EvaluateResponse, MarginFromPriceQuery, MarginResponse, PriceFromMarginQuery,
    PriceResponse,
};
use super::model::InputRecord;
use super::pricing::evaluate;
use super::report::{build_report, Report};
use super::services::{margin_from_price, price_from_margin};
use crate::{
    error::{reject, CoreError},
    state::AppState,
};

pub fn calc_routes() -> Router<AppState> {
    Router::new()
        .route("/calc/baseline", get(baseline))
        .route("/calc/derive", post(derive_report))
        .route("/calc/evaluate", post(evaluate_record))
        .route("/calc/price-from-margin", get(price_for_margin))
        .route("/calc/margin-from-price", get(margin_for_price))
}

pub async fn baseline() -> Json<InputRecord> {
    Json(InputRecord::baseline())
}

#[instrument(skip(state, record))]
pub async fn derive_report(
    State(state): State<AppState>,
    Json(record): Json<InputRecord>,
) -> Result<Json<Report>, (StatusCode, String)> {
    let report = build_report(&record, &state.config.calc).map_err(reject)?;
    info!(
        total_cost = report.output.total_cost,
        cost_per_unit = report.output.cost_per_unit,
        "report derived"
    );
    Ok(Json(report))
}

#[instrument(skip(state, body))]
pub async fn evaluate_record(
    State(state): State<AppState>,
    Json(body): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, (StatusCode, String)> {
    let settings = &state.config.calc;
    let evaluation = evaluate(&body.record, &body.controls, settings).map_err(reject)?;
    let report = build_report(&evaluation.record, settings).map_err(reject)?;
    Ok(Json(EvaluateResponse {
        record: evaluation.record,
        report,
    }))
}

#[instrument]
pub async fn price_for_margin(
    Query(q): Query<PriceFromMarginQuery>,
) -> Result<Json<PriceResponse>, (StatusCode, String)> {
    if !q.cost_per_unit.is_finite() || q.cost_per_unit < 0.0 {
        return Err(reject(CoreError::invalid(
            "cost_per_unit",
            "must be a finite, non-negative number",
        )));
    }
    Ok(Json(PriceResponse {
        price: price_from_margin(q.cost_per_unit, q.margin_pct),
    }))
}

#[instrument]
pub async fn margin_for_price(
    Query(q): Query<MarginFromPriceQuery>,
) -> Result<Json<MarginResponse>, (StatusCode, String)> {
    for (field, value) in [("price", q.price), ("cost_per_unit", q.cost_per_unit)] {
        if !value.is_finite() {
            return Err(reject(CoreError::invalid(field, "must be a finite number")));
        }
    }
    Ok(Json(MarginResponse {
        margin_pct: margin_from_price(q.price, q.cost_per_unit),
    }))
}
