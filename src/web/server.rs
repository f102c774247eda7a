use actix_cors::Cors;
use actix_files as fs;
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpServer};
use log::info;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::core::error::ServiceError;
use crate::core::mailer::Mailer;
use crate::core::notifier::NotificationHub;
use crate::db::Database;
use crate::services::password_reset::PasswordResetService;
use crate::services::uploads::{UploadStore, PUBLIC_PREFIX};
use crate::web::{handlers, ws};

const CORS_MAX_AGE_SECS: usize = 12 * 60 * 60;
const UPLOAD_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Origins accepted in addition to the configured list
const ORIGIN_PREFIXES: [&str; 5] = [
    "http://localhost",
    "http://127.0.0.1",
    "http://192.168",
    "http://10.",
    "http://172.",
];
const PRODUCTION_ORIGINS: [&str; 2] = ["https://sutportfolio.online", "https://www.sutportfolio.online"];

/// Shared application state for web handlers
pub struct AppState {
    pub db: Arc<Database>,
    pub hub: Arc<NotificationHub>,
    pub password_resets: PasswordResetService,
    pub uploads: UploadStore,
    pub session_ttl_hours: i64,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Arc<Database>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            password_resets: PasswordResetService::new(db.clone(), mailer, &config.frontend_url),
            uploads: UploadStore::new(config.upload_dir.clone(), &config.base_url),
            hub: Arc::new(NotificationHub::new()),
            session_ttl_hours: config.session_ttl_hours,
            started_at: Instant::now(),
            db,
        }
    }
}

/// Start the HTTP server and run until it is stopped
pub async fn start_web_server(config: AppConfig, state: web::Data<AppState>) -> std::io::Result<()> {
    let address = (config.bind_address.clone(), config.port);
    info!("Starting web server on http://{}:{}", address.0, address.1);

    let extra_origins = Arc::new(config.allowed_origins.clone());
    let upload_dir = state.uploads.dir().to_path_buf();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(build_cors(extra_origins.clone()))
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope(PUBLIC_PREFIX)
                    .wrap(middleware::DefaultHeaders::new().add((header::CACHE_CONTROL, UPLOAD_CACHE_CONTROL)))
                    .service(fs::Files::new("", upload_dir.clone())),
            )
            .configure(configure_routes)
    })
    .bind(address)?
    .run();

    server.await
}

fn build_cors(extra_origins: Arc<Vec<String>>) -> Cors {
    Cors::default()
        .allowed_origin_fn(move |origin, _req| {
            origin
                .to_str()
                .map(|origin| origin_allowed(origin, &extra_origins))
                .unwrap_or(false)
        })
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"])
        .allow_any_header()
        .supports_credentials()
        .max_age(CORS_MAX_AGE_SECS)
}

pub fn origin_allowed(origin: &str, extra_origins: &[String]) -> bool {
    ORIGIN_PREFIXES.iter().any(|prefix| origin.starts_with(prefix))
        || PRODUCTION_ORIGINS.contains(&origin)
        || extra_origins.iter().any(|extra| extra == origin)
}

/// API and root routes. Literal paths are registered before their `{id}` siblings.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| ServiceError::validation(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| ServiceError::validation(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _req| ServiceError::validation(err.to_string()).into()))
        .route("/health", web::get().to(handlers::system::health))
        .route("/ping", web::get().to(handlers::system::ping))
        .route("/ws", web::get().to(ws::ws_connect))
        .service(
            web::scope("/api")
                // System
                .route("/system/status", web::get().to(handlers::system::get_system_status))
                // Authentication
                .route("/login", web::post().to(handlers::auth::login))
                .route("/logout", web::post().to(handlers::auth::logout))
                .route("/me", web::get().to(handlers::auth::me))
                .route("/forgot-password", web::post().to(handlers::auth::forgot_password))
                .route("/reset-password", web::post().to(handlers::auth::reset_password))
                // Self service
                .route("/users/me", web::put().to(handlers::users::update_me))
                .route("/users/me/profile", web::get().to(handlers::users::my_profile))
                .route("/users/me/profile-image", web::put().to(handlers::users::update_profile_image))
                .route("/users/me/personal-info", web::put().to(handlers::users::update_personal_info))
                .route("/users/me/education", web::put().to(handlers::users::update_education))
                .route("/users/me/onboarding", web::get().to(handlers::users::onboarding_status))
                .route("/users/me/onboarding", web::put().to(handlers::users::complete_onboarding))
                // Profile lookups, user administration and reference administration need a completed onboarding
                .route("/teacher/users/{id}/profile", web::get().to(handlers::users::get_user_profile))
                // User administration
                .route("/admin/users", web::get().to(handlers::users::list_users))
                .route("/admin/users", web::post().to(handlers::users::create_user))
                .route("/admin/users/{id}/profile", web::get().to(handlers::users::get_user_profile))
                .route("/admin/users/{id}", web::get().to(handlers::users::get_user))
                .route("/admin/users/{id}", web::put().to(handlers::users::update_user))
                .route("/admin/users/{id}", web::delete().to(handlers::users::delete_user))
                // Reference data
                .route("/reference/education-levels", web::get().to(handlers::reference::list_education_levels))
                .route("/reference/school-types", web::get().to(handlers::reference::list_school_types))
                .route("/reference/curriculum-types", web::get().to(handlers::reference::list_curriculum_types))
                .route("/reference/schools", web::get().to(handlers::reference::search_schools))
                .route("/admin/education-levels", web::post().to(handlers::reference::create_education_level))
                .route("/admin/education-levels/{id}", web::put().to(handlers::reference::update_education_level))
                .route("/admin/education-levels/{id}", web::delete().to(handlers::reference::delete_education_level))
                .route("/admin/school-types", web::post().to(handlers::reference::create_school_type))
                .route("/admin/school-types/{id}", web::put().to(handlers::reference::update_school_type))
                .route("/admin/school-types/{id}", web::delete().to(handlers::reference::delete_school_type))
                .route("/admin/curriculum-types", web::post().to(handlers::reference::create_curriculum_type))
                .route("/admin/curriculum-types/{id}", web::put().to(handlers::reference::update_curriculum_type))
                .route("/admin/curriculum-types/{id}", web::delete().to(handlers::reference::delete_curriculum_type))
                .route("/admin/schools", web::post().to(handlers::reference::create_school))
                .route("/admin/schools/{id}", web::put().to(handlers::reference::update_school))
                .route("/admin/schools/{id}", web::delete().to(handlers::reference::delete_school))
                // Colors and fonts
                .route("/colors", web::get().to(handlers::appearance::list_colors))
                .route("/colors/{id}", web::get().to(handlers::appearance::get_colors))
                .route("/fonts", web::get().to(handlers::appearance::list_fonts))
                .route("/admin/colors", web::post().to(handlers::appearance::create_colors))
                .route("/admin/colors/{id}", web::put().to(handlers::appearance::update_colors))
                .route("/admin/colors/{id}", web::delete().to(handlers::appearance::delete_colors))
                .route("/admin/fonts", web::get().to(handlers::appearance::admin_list_fonts))
                .route("/admin/fonts", web::post().to(handlers::appearance::create_font))
                .route("/admin/fonts/{id}", web::put().to(handlers::appearance::update_font))
                .route("/admin/fonts/{id}", web::delete().to(handlers::appearance::delete_font))
                // Templates
                .route("/templates", web::get().to(handlers::templates::list_templates))
                .route("/templates/{id}", web::get().to(handlers::templates::get_template))
                .route("/portfolio/template", web::post().to(handlers::templates::create_template))
                .route("/admin/templates/{id}", web::delete().to(handlers::templates::delete_template))
                // Portfolio editor
                .route("/portfolio", web::post().to(handlers::portfolios::create_portfolio))
                .route("/portfolio/use-template/{id}", web::post().to(handlers::portfolios::use_template))
                .route("/portfolio/my", web::get().to(handlers::portfolios::list_my_portfolios))
                .route("/portfolio/active", web::get().to(handlers::portfolios::get_active_portfolio))
                .route("/portfolio/section", web::post().to(handlers::portfolios::create_section))
                .route("/portfolio/section/{id}", web::patch().to(handlers::portfolios::update_section))
                .route("/portfolio/section/{id}", web::delete().to(handlers::portfolios::delete_section))
                .route("/portfolio/block", web::post().to(handlers::portfolios::create_block))
                .route("/portfolio/block/{id}", web::patch().to(handlers::portfolios::update_block))
                .route("/portfolio/block/{id}", web::delete().to(handlers::portfolios::delete_block))
                .route("/portfolio/{id}", web::get().to(handlers::portfolios::get_portfolio))
                .route("/portfolio/{id}", web::patch().to(handlers::portfolios::update_portfolio))
                .route("/portfolio/{id}", web::delete().to(handlers::portfolios::delete_portfolio))
                // Submission workflow
                .route("/portfolio-submissions", web::post().to(handlers::submissions::submit))
                .route("/portfolio-submissions", web::get().to(handlers::submissions::list_submissions))
                .route("/portfolio-submissions/pending", web::get().to(handlers::submissions::list_pending))
                .route("/portfolio-submissions/my", web::get().to(handlers::submissions::list_mine))
                .route("/portfolio-submissions/status/{status}", web::get().to(handlers::submissions::list_by_status))
                .route(
                    "/portfolio-submissions/portfolio/{portfolio_id}",
                    web::get().to(handlers::submissions::list_by_portfolio),
                )
                .route("/portfolio-submissions/{id}", web::get().to(handlers::submissions::get_submission))
                .route("/portfolio-submissions/{id}", web::delete().to(handlers::submissions::delete_submission))
                .route("/portfolio-submissions/{id}/status", web::patch().to(handlers::submissions::update_status))
                .route("/portfolio-submissions/{id}/mark-reviewed", web::patch().to(handlers::submissions::mark_reviewed))
                .route("/portfolio-submissions/{id}/approve", web::patch().to(handlers::submissions::approve))
                .route(
                    "/portfolio-submissions/{id}/approve-with-scorecard",
                    web::post().to(handlers::submissions::approve_with_scorecard),
                )
                // Scorecards and feedback
                .route("/scorecards", web::post().to(handlers::reviews::create_scorecard))
                .route("/scorecards", web::get().to(handlers::reviews::list_scorecards))
                .route("/scorecards/submission/{id}/latest", web::get().to(handlers::reviews::latest_scorecard))
                .route("/scorecards/{id}", web::get().to(handlers::reviews::get_scorecard))
                .route("/scorecards/{id}", web::put().to(handlers::reviews::update_scorecard))
                .route("/feedback", web::post().to(handlers::reviews::create_feedback))
                .route("/feedback", web::get().to(handlers::reviews::list_feedback))
                .route("/feedback/submission/{id}/latest", web::get().to(handlers::reviews::latest_feedback))
                .route("/feedback/{id}", web::get().to(handlers::reviews::get_feedback))
                .route("/feedback/{id}", web::put().to(handlers::reviews::update_feedback))
                // Announcements
                .route("/announcements", web::get().to(handlers::announcements::list_public))
                .route("/announcements/{id}", web::get().to(handlers::announcements::get_public))
                .route("/announcement-categories", web::get().to(handlers::announcements::list_categories))
                .route("/admin/announcements", web::get().to(handlers::announcements::admin_list))
                .route("/admin/announcements", web::post().to(handlers::announcements::create))
                .route("/admin/announcements/{id}", web::get().to(handlers::announcements::admin_get))
                .route("/admin/announcements/{id}", web::put().to(handlers::announcements::update))
                .route("/admin/announcements/{id}", web::delete().to(handlers::announcements::delete))
                // Notifications
                .route("/notifications/students", web::post().to(handlers::notifications::notify_students))
                .route("/notifications", web::get().to(handlers::notifications::list_mine))
                .route("/notifications/unread-count", web::get().to(handlers::notifications::unread_count))
                .route("/notifications/read-all", web::patch().to(handlers::notifications::mark_all_read))
                .route("/notifications/{id}", web::get().to(handlers::notifications::get_notification))
                .route("/notifications/{id}", web::put().to(handlers::notifications::update_notification))
                .route("/notifications/{id}", web::delete().to(handlers::notifications::delete_notification))
                .route("/notifications/{id}/read", web::patch().to(handlers::notifications::mark_read))
                // Uploads
                .route("/upload", web::post().to(handlers::uploads::upload_file))
                .route("/upload/{filename}", web::delete().to(handlers::uploads::delete_file)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mailer::LogMailer;
    use crate::models::education::EducationInput;
    use crate::models::review::{CriteriaInput, FeedbackInput, ScorecardInput};
    use crate::models::user::AccountType;
    use crate::services::portfolios::fixtures::portfolio;
    use crate::services::users::fixtures;
    use crate::services::{auth, education, feedback, scorecards, submissions};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    fn test_state(upload_dir: &std::path::Path) -> web::Data<AppState> {
        let config = AppConfig {
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        let db = Arc::new(Database::open_in_memory().unwrap());
        web::Data::new(AppState::new(&config, db, Arc::new(LogMailer)))
    }

    /// Seed an account with a live session; returns its id and the bearer header value
    async fn bearer_for(state: &web::Data<AppState>, email: &str, account_type: AccountType) -> (i64, String) {
        let conn = state.db.lock().await;
        let user = fixtures::user(&conn, email, account_type);
        let token = auth::create_session(&conn, user.id, 24).unwrap();
        (user.id, format!("Bearer {}", token))
    }

    async fn student_bearer(state: &web::Data<AppState>) -> String {
        bearer_for(state, "student@example.com", AccountType::Student).await.1
    }

    fn finished_education() -> EducationInput {
        EducationInput {
            education_level_id: Some(1),
            school_name: Some("Suranaree School".to_string()),
            school_type_id: Some(1),
            status: Some("current".to_string()),
            start_date: chrono::NaiveDate::from_ymd_opt(2023, 5, 16),
            ..Default::default()
        }
    }

    fn get_with(uri: &str, bearer: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(uri)
            .insert_header((header::AUTHORIZATION, bearer.to_string()))
    }

    #[actix_web::test]
    async fn test_health_and_ping() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(test_state(dir.path())).configure(configure_routes)).await;

        let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(body, json!({ "status": "ok" }));

        let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(body, json!({ "message": "pong" }));
    }

    #[actix_web::test]
    async fn test_system_status_reports_version() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(test_state(dir.path())).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/system/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["connected_clients"], 0);
    }

    #[actix_web::test]
    async fn test_login_then_me() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        {
            let conn = state.db.lock().await;
            fixtures::user(&conn, "student@example.com", AccountType::Student);
        }
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "email": " Student@Example.com ", "password": "secret1" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["email"], "student@example.com");
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(test_state(dir.path())).configure(configure_routes)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "authorization required");
    }

    #[actix_web::test]
    async fn test_student_cannot_reach_admin_routes() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let bearer = student_bearer(&state).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/admin/users")
            .insert_header((header::AUTHORIZATION, bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "insufficient permissions");
    }

    #[actix_web::test]
    async fn test_non_numeric_portfolio_id() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let bearer = student_bearer(&state).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/portfolio/abc")
            .insert_header((header::AUTHORIZATION, bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid portfolio id");
    }

    #[actix_web::test]
    async fn test_active_portfolio_absent() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let bearer = student_bearer(&state).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/portfolio/active")
            .insert_header((header::AUTHORIZATION, bearer))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["message"], "No active portfolio found");
    }

    #[actix_web::test]
    async fn test_public_reference_data() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(test_state(dir.path())).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/reference/education-levels").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().map(|levels| levels.len()), Some(4));
    }

    #[actix_web::test]
    async fn test_origin_allowed() {
        let extras = vec!["https://portfolio.example.com".to_string()];
        assert!(origin_allowed("http://localhost:3001", &extras));
        assert!(origin_allowed("http://192.168.1.20:3000", &extras));
        assert!(origin_allowed("https://www.sutportfolio.online", &extras));
        assert!(origin_allowed("https://portfolio.example.com", &extras));
        assert!(!origin_allowed("https://evil.example.com", &extras));
        assert!(!origin_allowed("https://localhost.evil.com", &extras));
    }

    #[actix_web::test]
    async fn test_student_reads_results_of_own_submission_only() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let (student_id, student) = bearer_for(&state, "student@example.com", AccountType::Student).await;
        let (_, stranger) = bearer_for(&state, "other@example.com", AccountType::Student).await;
        let (teacher_id, _) = bearer_for(&state, "teacher@example.com", AccountType::Teacher).await;

        let submission_id = {
            let mut conn = state.db.lock().await;
            let p = portfolio(&mut conn, student_id, "Portfolio");
            let submission = submissions::submit(&mut conn, student_id, p.id).unwrap();
            let criteria = vec![CriteriaInput {
                criteria_number: 1,
                criteria_name: "Presentation".to_string(),
                max_score: 10.0,
                score: 8.0,
                weight_percent: 100.0,
                order_index: 1,
                ..Default::default()
            }];
            let input = ScorecardInput {
                portfolio_submission_id: Some(submission.id),
                general_comment: "Solid work".to_string(),
                score_criteria: criteria,
            };
            scorecards::create_scorecard(&mut conn, teacher_id, &input).unwrap();
            let note = FeedbackInput {
                portfolio_submission_id: Some(submission.id),
                overall_comment: "Well organised".to_string(),
                ..Default::default()
            };
            feedback::create_feedback(&conn, teacher_id, &note).unwrap();
            submission.id
        };
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let uri = format!("/api/scorecards/submission/{}/latest", submission_id);
        let body: Value = test::call_and_read_body_json(&app, get_with(&uri, &student).to_request()).await;
        assert_eq!(body["data"]["general_comment"], "Solid work");
        let scorecard_id = body["data"]["ID"].as_i64().unwrap();

        let body: Value = test::call_and_read_body_json(&app, get_with(&format!("/api/scorecards/{}", scorecard_id), &student).to_request()).await;
        assert_eq!(body["data"]["portfolio_submission_id"], submission_id);

        let uri = format!("/api/feedback/submission/{}/latest", submission_id);
        let body: Value = test::call_and_read_body_json(&app, get_with(&uri, &student).to_request()).await;
        assert_eq!(body["data"]["overall_comment"], "Well organised");

        let resp = test::call_service(&app, get_with(&uri, &stranger).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Feedback not found");

        // Writing results stays with reviewers
        let req = test::TestRequest::post()
            .uri("/api/feedback")
            .insert_header((header::AUTHORIZATION, student))
            .set_json(json!({ "portfolio_submission_id": submission_id, "overall_comment": "self praise" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_admin_routes_wait_for_onboarding() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let (admin_id, admin) = bearer_for(&state, "admin@example.com", AccountType::Admin).await;
        let (_, teacher) = bearer_for(&state, "teacher@example.com", AccountType::Teacher).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        for (uri, bearer) in [
            ("/api/admin/users".to_string(), &admin),
            (format!("/api/teacher/users/{}/profile", admin_id), &teacher),
        ] {
            let resp = test::call_service(&app, get_with(&uri, bearer).to_request()).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "onboarding required");
        }

        // Self service stays open so the profile can be completed
        let resp = test::call_service(&app, get_with("/api/users/me/onboarding", &admin).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        {
            let conn = state.db.lock().await;
            education::upsert_education(&conn, admin_id, &finished_education()).unwrap();
        }
        let body: Value = test::call_and_read_body_json(&app, get_with("/api/admin/users", &admin).to_request()).await;
        assert_eq!(body["data"].as_array().map(|users| users.len()), Some(2));
    }

    #[actix_web::test]
    async fn test_self_update_routes() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let bearer = student_bearer(&state).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::put()
            .uri("/api/users/me")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .set_json(json!({ "first_name": "Malee", "account_type_id": 3 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["first_name"], "Malee");
        assert_eq!(body["data"]["account_type_id"], AccountType::Student.id());

        let req = test::TestRequest::put()
            .uri("/api/users/me/profile-image")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .set_json(json!({ "profile_image_url": "/uploads/avatar.png" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["profile_image_url"], "/uploads/avatar.png");

        let req = test::TestRequest::put()
            .uri("/api/users/me/profile-image")
            .insert_header((header::AUTHORIZATION, bearer))
            .set_json(json!({ "profile_image_url": "ftp://nowhere" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_websocket_needs_a_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(test_state(dir.path())).configure(configure_routes)).await;

        for uri in ["/ws", "/ws?token=", "/ws?token=not-a-session"] {
            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header((header::CONNECTION, "upgrade"))
                .insert_header((header::UPGRADE, "websocket"))
                .insert_header((header::SEC_WEBSOCKET_VERSION, "13"))
                .insert_header((header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ=="))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
