use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{Datelike, Local};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};

use crate::dashboard::{self, DashboardInputs, RECENT_NOTIFICATION_LIMIT};
use crate::db;
use crate::error::{AppError, ResultExt};
use crate::models::{
    AttendanceReport, DashboardSummary, FeesReport, MarksReport, NewUser, NotificationRow,
    ParentInfo, StudentProfile, TimetableRow,
};
use crate::summary;

pub struct AppState {
    pub pool: PgPool,
}

type SharedState = Arc<AppState>;

const ALL_FIELDS_REQUIRED: &str = "All fields are required.";

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub branch: Option<String>,
    pub hallticketnumber: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn into_new_user(self) -> Result<NewUser, AppError> {
        let field = |value: &Option<String>| {
            present(value)
                .map(str::to_string)
                .ok_or_else(|| AppError::bad_request(ALL_FIELDS_REQUIRED))
        };

        Ok(NewUser {
            name: field(&self.name)?,
            username: field(&self.username)?,
            email: field(&self.email)?,
            phone: field(&self.phone)?,
            branch: field(&self.branch)?,
            hall_ticket_number: field(&self.hallticketnumber)?,
            password: self
                .password
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::bad_request(ALL_FIELDS_REQUIRED))?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub hall_ticket_number: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub hallticketnumber: Option<String>,
    pub email: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationRequest {
    pub message: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimetableParams {
    pub branch: Option<String>,
    pub section: Option<String>,
}

impl TimetableParams {
    /// Filtering only applies when both branch and section are given.
    pub fn filter(&self) -> Option<(&str, &str)> {
        match (present(&self.branch), present(&self.section)) {
            (Some(branch), Some(section)) => Some((branch, section)),
            _ => None,
        }
    }
}

/// POST /register
async fn register(
    State(state): State<SharedState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    let user = body.into_new_user()?;
    let id = db::create_user(&state.pool, &user)
        .await
        .or_internal("Registration failed.")?;

    info!(user_id = id, hall_ticket = %user.hall_ticket_number, "user registered");
    Ok(Json(json!({ "message": "Registration successful!", "userId": id })))
}

/// POST /login
async fn login(
    State(state): State<SharedState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(hall_ticket), Some(password)) = (
        present(&body.hall_ticket_number),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request(
            "Hall Ticket Number and Password are required.",
        ));
    };

    let user = db::find_user(&state.pool, hall_ticket, None)
        .await
        .or_internal("Internal server error.")?;

    match user {
        Some(user) if user.password == password => {
            Ok(Json(json!({ "message": "Login successful!", "user": user })))
        }
        _ => Err(AppError::unauthorized(
            "Invalid Hall Ticket Number or Password.",
        )),
    }
}

/// PUT /update-password
///
/// Requires the current password.
async fn update_password(
    State(state): State<SharedState>,
    Json(body): Json<PasswordChangeRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(hall_ticket), Some(email), Some(old_password), Some(new_password)) = (
        present(&body.hallticketnumber),
        present(&body.email),
        body.old_password.as_deref(),
        body.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request(ALL_FIELDS_REQUIRED));
    };

    let user = db::find_user(&state.pool, hall_ticket, Some(email))
        .await
        .or_internal("Database error")?
        .ok_or_else(|| AppError::not_found("User not found!"))?;

    if user.password != old_password {
        return Err(AppError::unauthorized("Incorrect old password!"));
    }

    db::update_password(&state.pool, hall_ticket, email, new_password)
        .await
        .or_internal("Error updating password")?;

    Ok(Json(json!({ "message": "Password updated successfully!" })))
}

/// POST /forgot-password
///
/// Resets the password given a matching hall ticket and email.
async fn forgot_password(
    State(state): State<SharedState>,
    Json(body): Json<PasswordChangeRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(hall_ticket), Some(email), Some(new_password)) = (
        present(&body.hallticketnumber),
        present(&body.email),
        body.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request(ALL_FIELDS_REQUIRED));
    };

    db::find_user(&state.pool, hall_ticket, Some(email))
        .await
        .or_internal("Database error")?
        .ok_or_else(|| AppError::not_found("User not found!"))?;

    db::update_password(&state.pool, hall_ticket, email, new_password)
        .await
        .or_internal("Error resetting password")?;

    Ok(Json(json!({ "message": "Password reset successfully!" })))
}

/// GET /student/{hallticketnumber}
async fn get_student(
    State(state): State<SharedState>,
    Path(hall_ticket): Path<String>,
) -> Result<Json<StudentProfile>, AppError> {
    db::fetch_student(&state.pool, &hall_ticket)
        .await
        .or_internal("Error fetching student profile.")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Student not found."))
}

/// GET /parents/{hallticketnumber}
async fn get_parent(
    State(state): State<SharedState>,
    Path(hall_ticket): Path<String>,
) -> Result<Json<ParentInfo>, AppError> {
    db::fetch_parent(&state.pool, &hall_ticket)
        .await
        .or_internal("Error fetching parent information.")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Parent information not found."))
}

/// GET /notifications
async fn list_notifications(
    State(state): State<SharedState>,
) -> Result<Json<Vec<NotificationRow>>, AppError> {
    let rows = db::fetch_notifications(&state.pool, None)
        .await
        .or_internal("Error fetching notifications.")?;
    Ok(Json(rows))
}

/// POST /notifications
async fn create_notification(
    State(state): State<SharedState>,
    Json(body): Json<NotificationRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(message), Some(category)) = (present(&body.message), present(&body.category))
    else {
        return Err(AppError::bad_request("Message and category are required."));
    };

    let id = db::insert_notification(&state.pool, message, category, Local::now().date_naive())
        .await
        .or_internal("Error adding notification")?;

    Ok(Json(json!({ "message": "Notification added successfully!", "id": id })))
}

/// GET /timetable?branch=CSE&section=A
async fn list_timetable(
    State(state): State<SharedState>,
    Query(params): Query<TimetableParams>,
) -> Result<Json<Vec<TimetableRow>>, AppError> {
    let (branch, section) = params.filter().unzip();
    let rows = db::fetch_timetable(&state.pool, None, branch, section)
        .await
        .or_internal("Error fetching timetable data.")?;
    Ok(Json(rows))
}

/// GET /attendance/{hallticketnumber}
///
/// Overall, month-by-month and per-subject attendance.
async fn get_attendance(
    State(state): State<SharedState>,
    Path(hall_ticket): Path<String>,
) -> Result<Json<AttendanceReport>, AppError> {
    let rows = db::fetch_attendance(&state.pool, &hall_ticket)
        .await
        .or_internal("Error fetching attendance.")?;
    Ok(Json(summary::summarize_attendance(&rows)))
}

/// GET /marks/{hallticketnumber}
async fn get_marks(
    State(state): State<SharedState>,
    Path(hall_ticket): Path<String>,
) -> Result<Json<MarksReport>, AppError> {
    let rows = db::fetch_marks(&state.pool, &hall_ticket)
        .await
        .or_internal("Error fetching marks data.")?;
    Ok(Json(summary::summarize_marks(&rows)?))
}

/// GET /fees/{hallticketnumber}
async fn get_fees(
    State(state): State<SharedState>,
    Path(hall_ticket): Path<String>,
) -> Result<Json<FeesReport>, AppError> {
    let rows = db::fetch_fees(&state.pool, &hall_ticket)
        .await
        .or_internal("Error fetching fees data.")?;
    Ok(Json(summary::summarize_fees(&rows)?))
}

/// GET /dashboard/{hallticketnumber}
///
/// Quick overview: identity, attendance status, marks average, pending fees,
/// latest notifications and today's classes.
async fn get_dashboard(
    State(state): State<SharedState>,
    Path(hall_ticket): Path<String>,
) -> Result<Json<DashboardSummary>, AppError> {
    let pool = &state.pool;
    let student = db::fetch_student(pool, &hall_ticket)
        .await
        .or_internal("Database error")?
        .ok_or_else(|| AppError::not_found("Student not found."))?;

    let today = Local::now().weekday();
    let attendance = db::fetch_attendance(pool, &hall_ticket)
        .await
        .or_internal("Error fetching attendance")?;
    let fees = db::fetch_fees(pool, &hall_ticket)
        .await
        .or_internal("Error fetching fees")?;
    let notifications = db::fetch_notifications(pool, Some(RECENT_NOTIFICATION_LIMIT as i64))
        .await
        .or_internal("Error fetching notifications")?;
    let timetable = db::fetch_timetable(
        pool,
        Some(dashboard::day_name(today)),
        Some(student.branch.as_str()),
        Some(student.section.as_str()),
    )
    .await
    .or_internal("Error fetching timetable")?;
    let marks = db::fetch_marks(pool, &hall_ticket)
        .await
        .or_internal("Error fetching marks")?;

    let summary = dashboard::compose_dashboard(
        DashboardInputs {
            student: &student,
            attendance: &attendance,
            marks: &marks,
            fees: &fees,
            notifications: &notifications,
            timetable: &timetable,
        },
        today,
    );
    Ok(Json(summary))
}

pub fn router(pool: PgPool) -> Router {
    let state = Arc::new(AppState { pool });

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/update-password", put(update_password))
        .route("/forgot-password", post(forgot_password))
        .route("/student/{hallticketnumber}", get(get_student))
        .route("/parents/{hallticketnumber}", get(get_parent))
        .route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/timetable", get(list_timetable))
        .route("/attendance/{hallticketnumber}", get(get_attendance))
        .route("/marks/{hallticketnumber}", get(get_marks))
        .route("/fees/{hallticketnumber}", get(get_fees))
        .route("/dashboard/{hallticketnumber}", get(get_dashboard))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(pool: PgPool, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(pool);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server is running on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn full_registration() -> RegisterRequest {
        RegisterRequest {
            name: Some("Priya Sharma".to_string()),
            username: Some("priya".to_string()),
            email: Some("priya.sharma@example.edu".to_string()),
            phone: Some("9876543210".to_string()),
            branch: Some("CSE".to_string()),
            hallticketnumber: Some("21A91A0501".to_string()),
            password: Some("secret".to_string()),
        }
    }

    #[test]
    fn registration_with_every_field_builds_a_user() {
        let user = full_registration().into_new_user().unwrap();
        assert_eq!(user.hall_ticket_number, "21A91A0501");
        assert_eq!(user.username, "priya");
    }

    #[test]
    fn registration_rejects_missing_or_blank_fields() {
        let mut request = full_registration();
        request.phone = None;
        let err = request.into_new_user().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, ALL_FIELDS_REQUIRED);

        let mut request = full_registration();
        request.branch = Some("   ".to_string());
        assert!(request.into_new_user().is_err());

        let mut request = full_registration();
        request.password = Some(String::new());
        assert!(request.into_new_user().is_err());
    }

    #[test]
    fn login_body_uses_camel_case_hall_ticket() {
        let body: LoginRequest =
            serde_json::from_str(r#"{"hallTicketNumber":"21A91A0501","password":"x"}"#).unwrap();
        assert_eq!(body.hall_ticket_number.as_deref(), Some("21A91A0501"));
    }

    #[test]
    fn password_change_body_field_names() {
        let body: PasswordChangeRequest = serde_json::from_str(
            r#"{"hallticketnumber":"21A91A0501","email":"a@b.c","oldPassword":"o","newPassword":"n"}"#,
        )
        .unwrap();
        assert_eq!(body.old_password.as_deref(), Some("o"));
        assert_eq!(body.new_password.as_deref(), Some("n"));
    }

    #[test]
    fn timetable_filter_needs_branch_and_section() {
        let params = TimetableParams {
            branch: Some("CSE".to_string()),
            section: Some("A".to_string()),
        };
        assert_eq!(params.filter(), Some(("CSE", "A")));

        let params = TimetableParams {
            branch: Some("CSE".to_string()),
            section: None,
        };
        assert_eq!(params.filter(), None);
        assert_eq!(TimetableParams::default().filter(), None);
    }
}
