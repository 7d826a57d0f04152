use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::VerifiedUser,
    errors::AppError,
    models::dto::request::{ListQuery, SubmissionHistoryQuery},
    models::dto::response::{ProgressResponse, QuizListResponse, QuizResponse, SubmissionView},
};

#[get("/api/users/me/progress")]
async fn get_my_progress(
    state: web::Data<AppState>,
    user: VerifiedUser,
) -> Result<HttpResponse, AppError> {
    let progress = state.grading_service.progress(&user.0).await?;
    Ok(HttpResponse::Ok().json(ProgressResponse::from(progress)))
}

#[get("/api/users/me/quizzes")]
async fn get_my_quizzes(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
    user: VerifiedUser,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let (quizzes, total) = state
        .quiz_service
        .list_quizzes_by_user(&user.0, query.offset, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(QuizListResponse {
        items: quizzes.into_iter().map(QuizResponse::from).collect(),
        total,
        offset: query.offset,
        limit: query.limit,
    }))
}

#[get("/api/users/me/submissions")]
async fn get_my_submissions(
    state: web::Data<AppState>,
    query: web::Query<SubmissionHistoryQuery>,
    user: VerifiedUser,
) -> Result<HttpResponse, AppError> {
    let submissions = state
        .quiz_service
        .submission_history(&user.0, query.quiz_id.as_deref())
        .await?;

    let views: Vec<SubmissionView> = submissions.into_iter().map(SubmissionView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

#[get("/health")]
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    match state.db.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "database": "reachable",
        })),
        Err(err) => {
            log::error!("Health check failed: {}", err);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "degraded",
                "database": "unreachable",
            }))
        }
    }
}
