pub mod quiz_handler;
pub mod user_handler;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(quiz_handler::generate_quiz)
        .service(quiz_handler::get_quiz)
        .service(quiz_handler::list_quizzes)
        .service(quiz_handler::submit_answers)
        .service(user_handler::get_my_progress)
        .service(user_handler::get_my_quizzes)
        .service(user_handler::get_my_submissions)
        .service(user_handler::health_check);
}
