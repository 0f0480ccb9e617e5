// Error handling for the HTTP layer
// Maps `MobileError` onto HTTP status codes and the response envelope

use std::fmt::{Display, Formatter};

use actix_web::HttpResponse;
use actix_web::http::StatusCode;

use mobile_common::MobileError;
use mobile_common::error::{
    ACCESS_DENIED, DATA_VALIDATION_FAILED, ErrorCode, PARAMETER_VALIDATE_ERROR,
    RESOURCE_CONFLICT, RESOURCE_NOT_FOUND, SERVER_ERROR, SERVICE_UNAVAILABLE,
};

use crate::model::response;

// Local wrapper so actix's ResponseError can be implemented
// (orphan rules forbid implementing it on anyhow::Error)
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<MobileError> for AppError {
    fn from(value: MobileError) -> Self {
        AppError {
            inner: anyhow::Error::new(value),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    fn classify(&self) -> (StatusCode, ErrorCode<'static>) {
        match self.downcast_ref::<MobileError>() {
            Some(e) => classify(e),
            None => (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR),
        }
    }
}

/// HTTP status and error code for a domain error
pub fn classify(error: &MobileError) -> (StatusCode, ErrorCode<'static>) {
    if error.is_not_found() {
        return (StatusCode::NOT_FOUND, RESOURCE_NOT_FOUND);
    }
    if error.is_conflict() {
        return (StatusCode::CONFLICT, RESOURCE_CONFLICT);
    }

    match error {
        MobileError::IllegalArgument(_) | MobileError::MissingParametersSource(_) => {
            (StatusCode::BAD_REQUEST, PARAMETER_VALIDATE_ERROR)
        }
        MobileError::InvalidMetadata { .. } | MobileError::InvalidResource(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, DATA_VALIDATION_FAILED)
        }
        MobileError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE),
        MobileError::Kube(_) => match error.upstream_status() {
            Some(403) => (StatusCode::FORBIDDEN, ACCESS_DENIED),
            Some(401) => (StatusCode::UNAUTHORIZED, ACCESS_DENIED),
            Some(status) => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                SERVER_ERROR,
            ),
            None => (StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE),
        },
        _ => (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR),
    }
}

impl actix_web::error::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, code) = self.classify();
        response::Result::<String>::http_response(
            status.as_u16(),
            code.code,
            self.inner.to_string(),
            String::new(),
        )
    }
}
