//! # Meeting Record Handlers
//!
//! HTTP CRUD surface over the meeting record store. Plumbing only: the
//! interesting behavior (live transcripts, insights, deltas) lives on the
//! WebSocket side; these routes exist so clients can create and manage
//! the meetings they then observe.

use crate::error::AppError;
use crate::meetings::MeetingCreate;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::info;

/// `GET /api/meetings`: all meeting records, newest first.
pub async fn list_meetings(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.meetings.list())
}

/// `POST /api/meetings`: create an active meeting.
pub async fn create_meeting(
    state: web::Data<AppState>,
    payload: web::Json<MeetingCreate>,
) -> Result<HttpResponse, AppError> {
    let meeting = state.meetings.create(&payload.title)?;
    info!(meeting_id = %meeting.id, title = %meeting.title, "Meeting created");
    Ok(HttpResponse::Created().json(meeting))
}

/// `GET /api/meetings/{meeting_id}`: one meeting record or 404.
pub async fn get_meeting(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let meeting = state.meetings.get(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(meeting))
}

/// `POST /api/meetings/{meeting_id}/stop`: mark a meeting stopped. The
/// live state stays in memory so post-meeting questions keep working.
pub async fn stop_meeting(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let meeting = state.meetings.stop(&path.into_inner())?;
    info!(meeting_id = %meeting.id, "Meeting stopped");
    Ok(HttpResponse::Ok().json(meeting))
}

/// `DELETE /api/meetings/{meeting_id}`: remove the meeting record.
pub async fn delete_meeting(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let meeting_id = path.into_inner();
    state.meetings.delete(&meeting_id)?;
    info!(meeting_id = %meeting_id, "Meeting deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use actix_web::{test, App};
    use serde_json::json;

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/api/meetings", web::get().to(list_meetings))
            .route("/api/meetings", web::post().to(create_meeting))
            .route("/api/meetings/{meeting_id}", web::get().to(get_meeting))
            .route("/api/meetings/{meeting_id}/stop", web::post().to(stop_meeting))
            .route("/api/meetings/{meeting_id}", web::delete().to(delete_meeting));
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_create_then_get_meeting() {
        let state = AppState::new(AppConfig::default());
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/meetings")
            .set_json(json!({"title": "Planning"}))
            .to_request();
        let created: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["title"], "Planning");
        assert_eq!(created["status"], "active");

        let id = created["id"].as_str().unwrap();
        let req = test::TestRequest::get()
            .uri(&format!("/api/meetings/{}", id))
            .to_request();
        let fetched: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["id"], created["id"]);
    }

    #[actix_web::test]
    async fn test_create_rejects_empty_title() {
        let state = AppState::new(AppConfig::default());
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/meetings")
            .set_json(json!({"title": "  "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_get_unknown_meeting_is_404() {
        let state = AppState::new(AppConfig::default());
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/meetings/nope")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[actix_web::test]
    async fn test_stop_and_delete_meeting() {
        let state = AppState::new(AppConfig::default());
        let app = test_app!(state);
        let meeting = state.meetings.create("to stop").unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/api/meetings/{}/stop", meeting.id))
            .to_request();
        let stopped: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stopped["status"], "stopped");
        assert!(stopped["ended_at"].is_string());

        let req = test::TestRequest::delete()
            .uri(&format!("/api/meetings/{}", meeting.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 204);
        assert_eq!(state.meetings.count(), 0);
    }

    #[actix_web::test]
    async fn test_list_meetings() {
        let state = AppState::new(AppConfig::default());
        let app = test_app!(state);
        state.meetings.create("one").unwrap();
        state.meetings.create("two").unwrap();

        let req = test::TestRequest::get().uri("/api/meetings").to_request();
        let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }
}
