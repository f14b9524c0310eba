use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::domain_model::*;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

/// Session handling is external; the caller's identity arrives as a header.
pub const ACTOR_HEADER: &str = "x-user-id";

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let friendships = server.friendship_service.clone();

    let request = warp::path!("friendships")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships.clone()))
        .and_then(handler::request_friendship);

    let list = warp::path!("friendships")
        .and(warp::get())
        .and(warp::query::<handler::FriendshipListQuery>())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships.clone()))
        .and_then(handler::list_friendships);

    let show = warp::path!("friendships" / "by_friend" / String)
        .and(warp::get())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships.clone()))
        .and_then(handler::show_friendship);

    let accept = warp::path!("friendships" / FriendshipId / "accept")
        .and(warp::put())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships.clone()))
        .and_then(handler::accept_friendship);

    let block = warp::path!("friendships" / FriendshipId / "block")
        .and(warp::put())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships.clone()))
        .and_then(handler::block_friendship);

    let mutual = warp::path!("friendships" / FriendshipId / "mutual")
        .and(warp::get())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships.clone()))
        .and_then(handler::mutual_friendship);

    let destroy = warp::path!("friendships" / FriendshipId)
        .and(warp::delete())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships.clone()))
        .and_then(handler::destroy_friendship);

    let block_user = warp::path!("blocks")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_actor(server.user_service.clone()))
        .and(with(friendships))
        .and_then(handler::block_user);

    request
        .or(list)
        .or(show)
        .or(accept)
        .or(block)
        .or(mutual)
        .or(destroy)
        .or(block_user)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_actor(
    user_service: Arc<dyn UserService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::<String>(ACTOR_HEADER).and_then(move |actor: String| {
        let user_service = user_service.clone();
        async move {
            user_service
                .resolve(actor.trim())
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::*;
    use rstest::rstest;
    use serde_json::{Value, json};
    use warp::http::StatusCode;
    use warp::test::RequestBuilder;

    async fn server() -> Arc<Server> {
        let settings = Settings {
            http: Http {
                address: "127.0.0.1:0".to_owned(),
                tls: None,
            },
            log: Log {
                filter: "info".to_owned(),
            },
            mail: Mail {
                backend: "log".to_owned(),
                sender: "friends@rapport.test".to_owned(),
                queue_capacity: 16,
            },
            store: Store {
                backend: "memory".to_owned(),
                dsn: None,
                max_connections: 1,
                lock_wait_timeout_secs: 5,
                run_migrations: false,
                seed_users: vec!["kjellski".to_owned(), "fred".to_owned(), "anna".to_owned()],
            },
        };
        Arc::new(Server::try_new(&settings).await.unwrap())
    }

    async fn call(server: &Arc<Server>, request: RequestBuilder) -> (StatusCode, Value) {
        let api = routes(server.clone()).recover(recover_error);
        let response = request.reply(&api).await;
        let body = serde_json::from_slice(response.body()).unwrap();
        (response.status(), body)
    }

    fn as_actor(actor: &str) -> RequestBuilder {
        warp::test::request().header(ACTOR_HEADER, actor)
    }

    fn befriend(actor: &str, friend: &str) -> RequestBuilder {
        as_actor(actor)
            .method("POST")
            .path("/friendships")
            .json(&json!({ "friend": friend }))
    }

    async fn user_id(server: &Arc<Server>, name: &str) -> String {
        server.user_service.resolve(name).await.unwrap().0.to_string()
    }

    #[rstest]
    #[tokio::test]
    async fn friendship_lifecycle_over_http() {
        let server = server().await;
        let kjellski = user_id(&server, "kjellski").await;

        let (status, body) = call(&server, befriend("kjellski", "fred")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "pending");
        let sent = body["data"]["id"].as_str().unwrap().to_owned();

        let (status, body) = call(
            &server,
            as_actor("fred").path("/friendships?category=requested"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["friend_id"], kjellski);

        let (status, body) = call(&server, as_actor("fred").path("/friendships/by_friend/kjellski")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "requested");
        let received = body["data"]["id"].as_str().unwrap().to_owned();

        let (status, body) = call(
            &server,
            as_actor("fred").path(&format!("/friendships/{received}/mutual")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], sent);

        let (status, body) = call(
            &server,
            as_actor("fred")
                .method("PUT")
                .path(&format!("/friendships/{received}/accept")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "accepted");
        assert!(!body["data"]["since"].is_null());

        let (status, body) = call(
            &server,
            as_actor(&kjellski)
                .method("DELETE")
                .path(&format!("/friendships/{sent}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["destroyed"], sent);

        let (_, body) = call(&server, as_actor("kjellski").path("/friendships")).await;
        assert_eq!(body["data"], json!([]));

        server.shutdown().await;
    }

    #[rstest]
    #[tokio::test]
    async fn block_routes_only_touch_the_actor() {
        let server = server().await;

        let (_, body) = call(&server, befriend("kjellski", "fred")).await;
        let sent = body["data"]["id"].as_str().unwrap().to_owned();

        let (status, body) = call(
            &server,
            as_actor("kjellski")
                .method("PUT")
                .path(&format!("/friendships/{sent}/block")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "blocked");

        let (_, body) = call(&server, as_actor("fred").path("/friendships")).await;
        assert_eq!(body["data"][0]["status"], "requested");

        let (status, body) = call(
            &server,
            as_actor("anna")
                .method("POST")
                .path("/blocks")
                .json(&json!({ "friend": "fred" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "blocked");

        let (_, body) = call(&server, as_actor("fred").path("/friendships?category=blocked")).await;
        assert_eq!(body["data"], json!([]));
    }

    #[rstest]
    #[case::missing(None)]
    #[case::unknown(Some("nobody"))]
    #[case::unknown_id(Some("00000000-0000-0000-0000-000000000000"))]
    #[tokio::test]
    async fn actor_must_be_a_known_user(#[case] actor: Option<&str>) {
        let server = server().await;
        let request = match actor {
            Some(actor) => as_actor(actor),
            None => warp::test::request(),
        };

        let (status, body) = call(&server, request.path("/friendships")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "InvalidUser");
    }

    #[rstest]
    #[tokio::test]
    async fn actor_may_be_given_by_id() {
        let server = server().await;
        let anna = user_id(&server, "anna").await;

        let (status, _) = call(&server, as_actor(&anna).path("/friendships")).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[tokio::test]
    async fn friendships_of_others_are_not_found() {
        let server = server().await;
        let (_, body) = call(&server, befriend("kjellski", "fred")).await;
        let sent = body["data"]["id"].as_str().unwrap().to_owned();

        let (status, body) = call(
            &server,
            as_actor("anna")
                .method("PUT")
                .path(&format!("/friendships/{sent}/accept")),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NotFound");
    }

    #[rstest]
    #[case::self_request("kjellski", StatusCode::UNPROCESSABLE_ENTITY, "SelfRelationship")]
    #[case::unknown_friend("nobody", StatusCode::NOT_FOUND, "UnknownUser")]
    #[tokio::test]
    async fn rejected_requests_report_the_reason(
        #[case] friend: &str,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let server = server().await;

        let (actual, body) = call(&server, befriend("kjellski", friend)).await;

        assert_eq!(actual, status);
        assert_eq!(body["error"]["code"], code);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_request_conflicts() {
        let server = server().await;
        call(&server, befriend("kjellski", "fred")).await;

        let (status, body) = call(&server, befriend("fred", "kjellski")).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "AlreadyConnected");
    }

    #[rstest]
    #[case::malformed_body(
        as_actor("kjellski")
            .method("POST")
            .path("/friendships")
            .header("content-type", "application/json")
            .body("{\"friend\":"),
        StatusCode::BAD_REQUEST,
        "BadRequest"
    )]
    #[case::unknown_category(
        as_actor("kjellski").path("/friendships?category=friends"),
        StatusCode::BAD_REQUEST,
        "BadRequest"
    )]
    #[case::wrong_method(
        as_actor("kjellski").method("PATCH").path("/friendships"),
        StatusCode::METHOD_NOT_ALLOWED,
        "MethodNotAllowed"
    )]
    #[case::unknown_route(
        as_actor("kjellski").path("/friends"),
        StatusCode::NOT_FOUND,
        "NotFound"
    )]
    #[case::malformed_id(
        as_actor("kjellski").method("PUT").path("/friendships/42/accept"),
        StatusCode::NOT_FOUND,
        "NotFound"
    )]
    #[tokio::test]
    async fn client_mistakes_are_not_internal_errors(
        #[case] request: RequestBuilder,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let server = server().await;

        let (actual, body) = call(&server, request).await;

        assert_eq!(actual, status);
        assert_eq!(body["error"]["code"], code);
        let message = body["error"]["message"].as_str().unwrap();
        assert!(!message.contains("Rejection"), "leaked: {message}");
    }
}
