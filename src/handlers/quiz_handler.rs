use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::VerifiedUser,
    errors::AppError,
    models::domain::SubmissionAnswer,
    models::dto::request::{GenerateQuizRequest, ListQuery, SubmitAnswersRequest},
    models::dto::response::{GradeResultResponse, QuizListResponse, QuizResponse},
    services::generation_pipeline::QuizGenerationInput,
};

#[post("/api/quizzes/generate")]
async fn generate_quiz(
    state: web::Data<AppState>,
    request: web::Json<GenerateQuizRequest>,
    user: VerifiedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let input = QuizGenerationInput {
        source: request.source.to_domain()?,
        question_type: request.question_type,
        count: request.count,
        difficulty: request.difficulty.unwrap_or_default(),
        title: request.title,
        topic: request.topic,
        tags: request.tags,
        user_id: user.0,
    };

    let generated = state.generation_pipeline.generate(input).await?;
    let response = QuizResponse::from(generated.quiz).with_warning(generated.warning);
    Ok(HttpResponse::Created().json(response))
}

#[get("/api/quizzes/{id}")]
async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    _user: VerifiedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_quiz(&id).await?;
    Ok(HttpResponse::Ok().json(QuizResponse::from(quiz)))
}

#[get("/api/quizzes")]
async fn list_quizzes(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
    _user: VerifiedUser,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let (quizzes, total) = state
        .quiz_service
        .list_quizzes(query.offset, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(QuizListResponse {
        items: quizzes.into_iter().map(QuizResponse::from).collect(),
        total,
        offset: query.offset,
        limit: query.limit,
    }))
}

#[post("/api/quizzes/{id}/submissions")]
async fn submit_answers(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswersRequest>,
    user: VerifiedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let answers: Vec<SubmissionAnswer> = request
        .answers
        .into_iter()
        .map(|a| SubmissionAnswer {
            question_id: a.question_id,
            selected_index: a.selected_index,
        })
        .collect();

    let result = state.grading_service.grade(&user.0, &id, answers).await?;
    Ok(HttpResponse::Created().json(GradeResultResponse::from(result)))
}
