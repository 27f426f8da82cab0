use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::dto::{
    BulkImportResponse, ExportQuery, ListVibesQuery, MessageResponse, PaginatedVibesResponse,
    StatsQuery, StreakQuery, StreakResponse, VibeRequest,
};
use crate::error::{AppError, AppResult};
use crate::models::vibe::{NewVibe, Vibe};
use crate::services::analytics::VibeStatistics;
use crate::services::export::ExportFormat;
use crate::services::recommendation::Recommendation;
use crate::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| {
            AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
        })
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    params
        .map(|Query(inner)| inner)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn vibe_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    match path {
        Ok(Path(id)) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest("Invalid vibe ID".into())),
    }
}

pub async fn create_vibe(
    State(state): State<AppState>,
    payload: Result<Json<VibeRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Vibe>)> {
    let vibe = body(payload)?.into_new_vibe()?;
    let created = state.vibes.create(vibe).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_vibes(
    State(state): State<AppState>,
    params: Result<Query<ListVibesQuery>, QueryRejection>,
) -> AppResult<Json<PaginatedVibesResponse>> {
    let params = query(params)?;
    let filter = params.filter().map_err(AppError::BadRequest)?;
    let page = params.page();

    let (vibes, total) = state.vibes.list(&filter, page, params.sort()).await?;
    Ok(Json(PaginatedVibesResponse::new(vibes, total, page)))
}

pub async fn get_vibe(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Vibe>> {
    let id = vibe_id(path)?;
    Ok(Json(state.vibes.get(id).await?))
}

pub async fn update_vibe(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<VibeRequest>, JsonRejection>,
) -> AppResult<Json<Vibe>> {
    let id = vibe_id(path)?;
    let vibe = body(payload)?.into_new_vibe()?;
    Ok(Json(state.vibes.update(id, vibe).await?))
}

pub async fn delete_vibe(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let id = vibe_id(path)?;
    state.vibes.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Vibe deleted successfully".into(),
    }))
}

pub async fn get_stats(
    State(state): State<AppState>,
    params: Result<Query<StatsQuery>, QueryRejection>,
) -> AppResult<Json<VibeStatistics>> {
    let params = query(params)?;
    let period = params.period().map_err(AppError::BadRequest)?;

    Ok(Json(state.vibes.statistics(period).await?))
}

pub async fn get_today(State(state): State<AppState>) -> AppResult<Json<Recommendation>> {
    Ok(Json(state.vibes.recommendation().await?))
}

pub async fn get_streak(
    State(state): State<AppState>,
    params: Result<Query<StreakQuery>, QueryRejection>,
) -> AppResult<Json<StreakResponse>> {
    let params = query(params)?;
    let mood = params
        .mood
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'mood' query parameter".into()))?;

    let streaks = state.vibes.streak(&mood).await?;
    Ok(Json(StreakResponse {
        mood,
        current_streak: streaks.current,
        longest_streak: streaks.longest,
    }))
}

pub async fn export_vibes(
    State(state): State<AppState>,
    params: Result<Query<ExportQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let params = query(params)?;
    let format: ExportFormat = params.format.as_deref().unwrap_or_default().parse()?;
    let filter = params.filter().map_err(AppError::BadRequest)?;

    let file = state.vibes.export(&filter, format, params.sort()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, file.content_disposition()),
        ],
        file.body,
    ))
}

pub async fn bulk_import(
    State(state): State<AppState>,
    payload: Result<Json<Vec<VibeRequest>>, JsonRejection>,
) -> AppResult<(StatusCode, Json<BulkImportResponse>)> {
    let requests = body(payload)?;
    if requests.is_empty() {
        return Err(AppError::BadRequest("No vibes provided in the request body".into()));
    }

    let vibes = requests
        .into_iter()
        .enumerate()
        .map(|(index, request)| {
            request.into_new_vibe().map_err(|e| match e {
                AppError::Validation(msg) => AppError::Validation(format!(
                    "Validation error for vibe at index {index}: {msg}"
                )),
                other => other,
            })
        })
        .collect::<AppResult<Vec<NewVibe>>>()?;

    let imported_count = state.vibes.bulk_import(vibes).await?;
    Ok((
        StatusCode::CREATED,
        Json(BulkImportResponse {
            message: format!("{imported_count} vibes imported successfully"),
            imported_count,
        }),
    ))
}
