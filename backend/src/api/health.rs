use crate::models::{ErrorResponse, HealthResponse};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{catch, get, Request};

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "YouTube Transcript Extractor API is running".to_string(),
    })
}

#[catch(400)]
pub fn bad_request() -> ErrorResponse {
    ErrorResponse::bad_request("Request body is not valid JSON")
}

#[catch(404)]
pub fn not_found(request: &Request) -> ErrorResponse {
    ErrorResponse::not_found(format!("No route for {} {}", request.method(), request.uri()))
}

#[catch(422)]
pub fn unprocessable() -> ErrorResponse {
    ErrorResponse::new(
        Status::UnprocessableEntity,
        "Request body does not match the expected shape",
    )
}

#[catch(500)]
pub fn internal_error() -> ErrorResponse {
    ErrorResponse::server_error("unexpected failure")
}
