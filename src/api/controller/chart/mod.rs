//! Chart controller: connects chart routes to the chart service.

use axum::extract::{Query, State};
use axum::Json;

use crate::api::dto::chart_dto::{DatesQuery, DayChartResponse, FineQuery, MetricDatesQuery};
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::time;
use crate::domain::chart::merger;
use crate::domain::chart::model::{
    CanonicalSeries, MergedChart, RankTrendView, RankView, TrendPoint,
};
use crate::domain::chart::service::sanitize_dates;
use crate::errors::AppError;

fn require_dates(raw: Vec<String>) -> Result<Vec<String>, AppError> {
    let dates = sanitize_dates(&raw);
    if dates.is_empty() {
        return Err(AppError::BodyParsingError("no valid dates supplied".into()));
    }
    Ok(dates)
}

pub struct ChartController;

impl ChartController {
    pub async fn get_day_chart(
        State(state): State<AppState>,
        Query(query): Query<DatesQuery>,
    ) -> Result<Json<ApiResponse<DayChartResponse>>, AppError> {
        let dates = require_dates(query.date_list())?;
        let chart = state
            .chart_service
            .day_chart(&dates)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        let template_keys = merger::template_keys(&chart, &dates);
        let visible_keys = template_keys
            .iter()
            .take(merger::MAX_TEMPLATE_SERIES)
            .cloned()
            .collect();
        to_json(Ok(DayChartResponse { chart, template_keys, visible_keys }))
    }

    pub async fn get_cart_fine(
        State(state): State<AppState>,
        Query(query): Query<FineQuery>,
    ) -> Result<Json<ApiResponse<CanonicalSeries>>, AppError> {
        let Some(date) = time::date_only(&query.date).map(str::to_string) else {
            return Err(AppError::BodyParsingError(format!("invalid date {}", query.date)));
        };
        to_json(state.chart_service.cart_fine(&date).await)
    }

    pub async fn get_rank_chart(
        State(state): State<AppState>,
        Query(query): Query<DatesQuery>,
    ) -> Result<Json<ApiResponse<RankView>>, AppError> {
        let dates = require_dates(query.date_list())?;
        to_json(state.chart_service.rank_day(&dates).await)
    }

    pub async fn get_rank_trend(
        State(state): State<AppState>,
        Query(query): Query<DatesQuery>,
    ) -> Result<Json<ApiResponse<Vec<RankTrendView>>>, AppError> {
        let dates = require_dates(query.date_list())?;
        to_json(state.chart_service.rank_trend(&dates).await)
    }

    pub async fn get_overlay(
        State(state): State<AppState>,
        Query(query): Query<MetricDatesQuery>,
    ) -> Result<Json<ApiResponse<MergedChart>>, AppError> {
        let dates = require_dates(query.date_list())?;
        let merged = state
            .chart_service
            .overlay(&query.metric, &dates)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("metric {}", query.metric)))?;
        to_json(Ok(merged))
    }

    pub async fn get_trend(
        State(state): State<AppState>,
        Query(query): Query<MetricDatesQuery>,
    ) -> Result<Json<ApiResponse<Vec<TrendPoint>>>, AppError> {
        let dates = require_dates(query.date_list())?;
        to_json(state.chart_service.trend(&query.metric, &dates).await)
    }
}
