//! Reservation create, cancel and list endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use database::reservation::{self, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use database::validation::{validate_email, validate_required};
use database::{
    normalize_email, ListQuery, NewReservation, Reservation, ReservationStats, ReservationStatus,
    SortOrder,
};
use mailer::Email;
use notifier::NotificationKind;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::emails;
use crate::error::{AppError, AppJson, Result};
use crate::routes::notification_data;
use crate::state::AppState;

/// Request to create a reservation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub name: Option<String>,
    pub affiliation: Option<String>,
    pub favorite: Option<String>,
    pub email: Option<String>,
    pub line_user_id: Option<String>,
}

/// Created reservation as returned to the form.
#[derive(Debug, Serialize)]
pub struct CreatedReservation {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: ReservationStatus,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct CreateReservationResponse {
    pub success: bool,
    pub message: String,
    pub reservation: CreatedReservation,
}

/// Request to cancel a reservation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelReservationRequest {
    pub reservation_id: Option<String>,
    pub email: Option<String>,
}

/// Cancelled reservation as returned to the cancel page.
#[derive(Debug, Serialize)]
pub struct CancelledReservation {
    pub id: String,
    pub name: String,
    pub status: ReservationStatus,
    pub cancelled_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelReservationResponse {
    pub success: bool,
    pub message: String,
    pub reservation: CancelledReservation,
}

/// Query parameters for the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub count: usize,
    pub limit: i64,
    pub sort: String,
}

#[derive(Debug, Serialize)]
pub struct ListReservationsResponse {
    pub success: bool,
    pub data: Vec<Reservation>,
    pub stats: ReservationStats,
    pub meta: ListMeta,
}

/// Create a reservation if seats remain.
pub async fn create_reservation(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<CreateReservationResponse>)> {
    validate_required("name", req.name.as_deref())?;
    validate_required("affiliation", req.affiliation.as_deref())?;
    validate_required("favorite", req.favorite.as_deref())?;
    validate_required("email", req.email.as_deref())?;

    let new = NewReservation {
        name: req.name.unwrap_or_default(),
        affiliation: req.affiliation.unwrap_or_default(),
        favorite: req.favorite.unwrap_or_default(),
        email: req.email.unwrap_or_default(),
        line_user_id: req.line_user_id,
    }
    .normalized();
    validate_email(&new.email)?;

    let created = reservation::insert_if_capacity(state.db.pool(), &new, state.config.capacity).await?;
    info!(reservation_id = %created.id, linked = created.line_user_id.is_some(), "Reservation created");

    let outcome = state
        .notifier
        .dispatch(
            created.line_user_id.as_deref(),
            NotificationKind::ReservationConfirmed.as_str(),
            &notification_data(&created),
        )
        .await;
    info!(reservation_id = %created.id, outcome = ?outcome, "Confirmation notification finished");

    if state.config.send_confirmation_email {
        match emails::confirmation_email(state.notifier.event(), &created) {
            Ok(email) => send_email(&state, &created.id, &email).await,
            Err(e) => warn!(reservation_id = %created.id, error = %e, "Rendering confirmation email failed"),
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateReservationResponse {
            success: true,
            message: "予約が完了しました".to_string(),
            reservation: CreatedReservation {
                id: created.id,
                name: created.name,
                email: created.email,
                status: created.status,
                created_at: created.created_at,
            },
        }),
    ))
}

/// Cancel a reservation identified by id and email.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AppJson(req): AppJson<CancelReservationRequest>,
) -> Result<Json<CancelReservationResponse>> {
    let (Some(id), Some(email)) = (
        req.reservation_id.filter(|v| !v.trim().is_empty()),
        req.email.filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(AppError::Validation(
            "予約IDとメールアドレスを入力してください".to_string(),
        ));
    };
    let email = normalize_email(&email);
    validate_email(&email)?;

    let found = reservation::find_by_id_and_email(state.db.pool(), id.trim(), &email).await?;
    if found.status == ReservationStatus::Cancelled {
        return Err(AppError::AlreadyCancelled);
    }

    let updated =
        reservation::cancel_reservation(state.db.pool(), &found.id, &reservation::now_timestamp()).await?;
    info!(reservation_id = %updated.id, "Reservation cancelled");

    if updated.line_user_id.is_some() {
        let outcome = state
            .notifier
            .dispatch(
                updated.line_user_id.as_deref(),
                NotificationKind::ReservationCancelled.as_str(),
                &notification_data(&updated),
            )
            .await;
        info!(reservation_id = %updated.id, outcome = ?outcome, "Cancellation notification finished");
    }

    match emails::cancellation_email(state.notifier.event(), &updated) {
        Ok(email) => send_email(&state, &updated.id, &email).await,
        Err(e) => warn!(reservation_id = %updated.id, error = %e, "Rendering cancellation email failed"),
    }

    Ok(Json(CancelReservationResponse {
        success: true,
        message: "予約をキャンセルしました".to_string(),
        reservation: CancelledReservation {
            id: updated.id,
            name: updated.name,
            status: updated.status,
            cancelled_at: updated.cancelled_at,
        },
    }))
}

/// List reservations with aggregate stats.
pub async fn get_reservations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListReservationsResponse>> {
    let query = list_query(&params);
    let pool = state.db.pool();

    let data = reservation::list_reservations(pool, &query).await?;
    let stats = reservation::reservation_stats(pool, state.config.capacity).await?;

    Ok(Json(ListReservationsResponse {
        success: true,
        meta: ListMeta {
            count: data.len(),
            limit: query.limit,
            sort: query.sort.to_string(),
        },
        data,
        stats,
    }))
}

/// Interpret list parameters, falling back to defaults for bad values.
fn list_query(params: &ListParams) -> ListQuery {
    let limit = params
        .limit
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.min(MAX_LIST_LIMIT))
        .unwrap_or(DEFAULT_LIST_LIMIT);

    let sort = match params.sort.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(value) => SortOrder::parse(value).unwrap_or_else(|| {
            warn!(sort = %value, "Unknown sort field, using default");
            SortOrder::default()
        }),
        None => SortOrder::default(),
    };

    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(value) => {
            let parsed = ReservationStatus::parse(value);
            if parsed.is_none() {
                warn!(status = %value, "Unknown status filter, listing all");
            }
            parsed
        }
    };

    ListQuery { status, sort, limit }
}

/// Send an email if a mailer is configured; failures are only logged.
async fn send_email(state: &AppState, reservation_id: &str, email: &Email) {
    let Some(mailer) = state.mailer.as_ref() else {
        info!(reservation_id = %reservation_id, "No mailer configured, skipping email");
        return;
    };

    match mailer.send(email).await {
        Ok(()) => info!(reservation_id = %reservation_id, subject = %email.subject, "Email sent"),
        Err(e) => warn!(reservation_id = %reservation_id, error = %e, "Email failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::SortField;

    fn params(limit: Option<&str>, sort: Option<&str>, status: Option<&str>) -> ListParams {
        ListParams {
            limit: limit.map(String::from),
            sort: sort.map(String::from),
            status: status.map(String::from),
        }
    }

    #[test]
    fn test_list_query_defaults() {
        let query = list_query(&ListParams::default());
        assert_eq!(query, ListQuery::default());
    }

    #[test]
    fn test_list_query_parsing() {
        let query = list_query(&params(Some("5"), Some("name"), Some("cancelled")));
        assert_eq!(query.limit, 5);
        assert_eq!(query.sort.field, SortField::Name);
        assert!(!query.sort.descending);
        assert_eq!(query.status, Some(ReservationStatus::Cancelled));
    }

    #[test]
    fn test_list_query_bad_values_fall_back() {
        let query = list_query(&params(Some("-3"), Some("-password"), Some("pending")));
        assert_eq!(query.limit, DEFAULT_LIST_LIMIT);
        assert_eq!(query.sort, SortOrder::default());
        assert_eq!(query.status, None);

        let query = list_query(&params(Some("5000"), None, Some("all")));
        assert_eq!(query.limit, MAX_LIST_LIMIT);
        assert_eq!(query.status, None);
    }
}
