/// Uniform success envelope `{statusCode, data, message, success: true}`.

use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data,
            message: message.into(),
            success: status_code < 400,
        }
    }
}

pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::new(200, data, message))
}

pub fn created<T: Serialize>(data: T, message: impl Into<String>) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::new(201, data, message))
}
