use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::filters::body::BodyDeserializeError;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (*code, code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, "no such route".to_owned())
    } else if let Some(e) = err.find::<reject::MissingHeader>() {
        (ApiErrorCode::InvalidUser, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidHeader>() {
        (ApiErrorCode::InvalidUser, e.to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<reject::UnsupportedMediaType>() {
        (ApiErrorCode::UnsupportedMediaType, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        // every route that matched the path disagreed on the method
        let code = ApiErrorCode::MethodNotAllowed;
        (code, code.to_string())
    } else {
        error!(rejection = ?err, "unhandled rejection");
        let code = ApiErrorCode::InternalError;
        (code, code.to_string())
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("You cannot befriend yourself")]
    SelfRelationship,
    #[error("You are already connected with this user")]
    AlreadyConnected,
    #[error("Friendship not found")]
    NotFound,
    #[error("This friendship cannot change that way")]
    InvalidTransition,
    #[error("Conflicting update, try again")]
    Conflict,
    #[error("User not found")]
    UnknownUser,
    #[error("Missing or invalid user")]
    InvalidUser,
    #[error("Malformed request")]
    BadRequest,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Unsupported media type")]
    UnsupportedMediaType,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::SelfRelationship => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::AlreadyConnected => StatusCode::CONFLICT,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InvalidTransition => StatusCode::CONFLICT,
            ApiErrorCode::Conflict => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::UnknownUser => StatusCode::NOT_FOUND,
            ApiErrorCode::InvalidUser => StatusCode::UNAUTHORIZED,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<FriendshipError> for ApiErrorCode {
    fn from(error: FriendshipError) -> Self {
        match error {
            FriendshipError::SelfRelationship => ApiErrorCode::SelfRelationship,
            FriendshipError::DuplicateRelationship => ApiErrorCode::AlreadyConnected,
            FriendshipError::NotFound => ApiErrorCode::NotFound,
            FriendshipError::UnknownCounterpart => ApiErrorCode::UnknownUser,
            FriendshipError::InvalidTransition(_) => ApiErrorCode::InvalidTransition,
            FriendshipError::Conflict => ApiErrorCode::Conflict,
            FriendshipError::NoMirror(id) => {
                error!(friendship_id = %id, "integrity fault surfaced to api");
                ApiErrorCode::InternalError
            }
            FriendshipError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<UserError> for ApiErrorCode {
    fn from(error: UserError) -> Self {
        match error {
            UserError::UserNotFound => ApiErrorCode::InvalidUser,
            UserError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}
