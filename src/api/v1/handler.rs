use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// A friendship as its owner sees it.
#[derive(Debug, Serialize)]
pub struct FriendshipView {
    pub id: FriendshipId,
    pub friend_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the friendship was accepted.
    pub since: Option<DateTime<Utc>>,
}

impl From<&FriendshipEdge> for FriendshipView {
    fn from(edge: &FriendshipEdge) -> Self {
        let status = edge.status();
        FriendshipView {
            id: edge.id(),
            friend_id: edge.counterpart_id(),
            status,
            created_at: edge.created_at(),
            updated_at: edge.updated_at(),
            since: (status == FriendshipStatus::Accepted).then(|| edge.updated_at()),
        }
    }
}

fn reply(edge: &FriendshipEdge, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ApiResponse::ok(FriendshipView::from(edge))),
        status,
    )
}

#[derive(Debug, Deserialize)]
pub struct FriendRequest {
    /// Username or user id.
    pub friend: String,
}

pub async fn request_friendship(
    body: FriendRequest,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let edge = friendship_service
        .request(user_id, &body.friend)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(reply(&edge, StatusCode::CREATED))
}

#[derive(Debug, Default, Deserialize)]
pub struct FriendshipListQuery {
    #[serde(default)]
    pub category: FriendshipCategory,
}

pub async fn list_friendships(
    query: FriendshipListQuery,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let edges = friendship_service
        .list_for(user_id, query.category)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let views: Vec<FriendshipView> = edges.iter().map(FriendshipView::from).collect();
    Ok(warp::reply::json(&ApiResponse::ok(views)))
}

pub async fn show_friendship(
    friend: String,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let edge = friendship_service
        .show(user_id, &friend)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(reply(&edge, StatusCode::OK))
}

pub async fn accept_friendship(
    id: FriendshipId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let edge = friendship_service
        .accept(user_id, id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(reply(&edge, StatusCode::OK))
}

pub async fn block_friendship(
    id: FriendshipId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let edge = friendship_service
        .block(user_id, id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(reply(&edge, StatusCode::OK))
}

pub async fn block_user(
    body: FriendRequest,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let edge = friendship_service
        .block_user(user_id, &body.friend)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(reply(&edge, StatusCode::OK))
}

pub async fn mutual_friendship(
    id: FriendshipId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mirror = friendship_service
        .find_mutual(user_id, id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let view = mirror.as_ref().map(FriendshipView::from);
    Ok(warp::reply::json(&ApiResponse::ok(view)))
}

#[derive(Debug, Serialize)]
pub struct DestroyResponse {
    pub destroyed: FriendshipId,
}

pub async fn destroy_friendship(
    id: FriendshipId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    friendship_service
        .destroy_mutual(user_id, id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(DestroyResponse {
        destroyed: id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn view_reports_the_owners_label() {
        let edge = FriendshipEdge::initiate(UserId::generate(), UserId::generate(), Utc::now());
        let mirror = edge.mirror();

        let json = serde_json::to_value(FriendshipView::from(&mirror)).unwrap();

        assert_eq!(json["status"], "requested");
        assert_eq!(json["friend_id"], edge.owner_id().0.to_string());
        assert!(json["since"].is_null());
    }

    #[rstest]
    fn accepted_view_carries_since() {
        let mut edge = FriendshipEdge::initiate(UserId::generate(), UserId::generate(), Utc::now());
        edge.transition(FriendshipOp::Accept, Utc::now()).unwrap();

        let view = FriendshipView::from(&edge);

        assert_eq!(view.status, FriendshipStatus::Accepted);
        assert_eq!(view.since, Some(edge.updated_at()));
    }

    #[rstest]
    fn error_response_has_no_data() {
        let response: ApiResponse<FriendshipView> =
            ApiResponse::err(ApiErrorCode::NotFound, "friendship not found");

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["message"], "friendship not found");
    }
}
