use crate::image::ImageCdn;
use actix_web::{http::header::ContentType, HttpResponse};
use anyhow::anyhow;
use askama::Template;
use derive_more::{Display, Error};
use log_error::LogError;

pub mod catalog;
pub mod pages;
pub mod product;

pub type Response = Result<HttpResponse, ControllerError>;

/// Shared page context.
#[derive(Debug, Clone)]
pub struct Site {
    pub images: ImageCdn,
    pub contact_url: String,
}

#[derive(Debug, Display, Error)]
pub enum ControllerError {
    NotFound,
    #[error(ignore)]
    InternalServerError(anyhow::Error),
    #[error(ignore)]
    #[display("Invalid field {field}")]
    InvalidInput { field: String, msg: String },
}

impl From<anyhow::Error> for ControllerError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalServerError(err)
    }
}

impl From<actix::MailboxError> for ControllerError {
    fn from(err: actix::MailboxError) -> Self {
        Self::InternalServerError(err.into())
    }
}

impl actix_web::error::ResponseError for ControllerError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        use ControllerError::*;
        match self {
            NotFound => NotFoundPage {}
                .render()
                .log_error("Unable to render error template")
                .map(|res| {
                    HttpResponse::NotFound()
                        .content_type(ContentType::html())
                        .body(res)
                })
                .unwrap_or_else(|| HttpResponse::NotFound().body(())),
            InternalServerError(err) => {
                log::error!("{err:?}");
                InternalServerErrorPage {}
                    .render()
                    .log_error("Unable to render error template")
                    .map(|res| {
                        HttpResponse::InternalServerError()
                            .content_type(ContentType::html())
                            .body(res)
                    })
                    .unwrap_or_else(|| HttpResponse::InternalServerError().body(err.to_string()))
            }
            InvalidInput { field, msg } => {
                log::warn!("{self}: {msg}");
                HttpResponse::BadRequest().body(format!("{field}\n{msg}"))
            }
        }
    }
}

#[derive(Template)]
#[template(path = "500.html")]
pub struct InternalServerErrorPage {}

#[derive(Template)]
#[template(path = "404.html")]
pub struct NotFoundPage {}

pub async fn not_found() -> Response {
    Err(ControllerError::NotFound)
}

pub fn render_template(t: impl Template) -> Result<HttpResponse, ControllerError> {
    let result = t
        .render()
        .map_err(|x| ControllerError::InternalServerError(anyhow!(x)))?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(result))
}
