//! Server tests — routing, middleware, and the application pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rq_container::{Environment, Services};
use rq_database::{
    ConnectionPool, DatabaseConnectable, DatabaseIdentifier, Databases, DatabasesProvider,
    MemoryDatabase, PoolConfig,
};
use rq_http::{Abort, HttpMessage, MediaType, Method, Response, Status};
use rq_request::Request;
use rq_server::*;
use serde_json::{Value, json};

async fn ok(_request: Request) -> HandlerResult {
    Ok(Response::text("ok"))
}

fn body_json(response: &Response) -> Value {
    serde_json::from_slice(&response.body).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

mod router {
    use super::*;

    fn router() -> Router {
        let mut router = Router::new();
        router
            .get("/", ok)
            .get("/users/:id", ok)
            .get("/users/:id/posts/:post", ok)
            .get("/files/**", ok)
            .get("/any/*/end", ok)
            .post("/users", ok);
        router
    }

    #[test]
    fn parses_segments() {
        assert_eq!(
            Segment::parse_path("/a/:b/*/**"),
            vec![
                Segment::Constant("a".into()),
                Segment::Parameter("b".into()),
                Segment::Anything,
                Segment::CatchAll,
            ]
        );
        assert!(Segment::parse_path("/").is_empty());
    }

    #[test]
    fn captures_named_parameters() {
        let params = router().resolve(&Method::Get, "/users/7/posts/99").unwrap();
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post"), Some("99"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn root_and_trailing_slashes() {
        let router = router();
        assert!(router.resolve(&Method::Get, "/").unwrap().is_empty());
        assert!(router.resolve(&Method::Get, "/users/7/").is_ok());
    }

    #[test]
    fn catch_all_takes_the_rest() {
        let params = router().resolve(&Method::Get, "/files/a/b/c.txt").unwrap();
        assert_eq!(params.get("**"), Some("a/b/c.txt"));
        assert!(router().resolve(&Method::Get, "/files").is_err());
    }

    #[test]
    fn anything_matches_one_segment_without_capture() {
        let router = router();
        assert!(router.resolve(&Method::Get, "/any/thing/end").unwrap().is_empty());
        assert!(router.resolve(&Method::Get, "/any/end").is_err());
    }

    #[test]
    fn distinguishes_not_found_from_wrong_method() {
        let router = router();
        assert_eq!(
            router.resolve(&Method::Get, "/nowhere").unwrap_err(),
            RouteError::NotFound("/nowhere".into())
        );
        let err = router.resolve(&Method::Delete, "/users/1").unwrap_err();
        assert!(matches!(err, RouteError::MethodNotAllowed { .. }));
        assert_eq!(Abort::from(err).status(), Status::MethodNotAllowed);
        assert!(router.resolve(&Method::Post, "/users").is_ok());
    }

    #[test]
    fn first_registered_route_wins() {
        let mut router = Router::new();
        router.get("/users/me", ok).get("/users/:id", ok);
        assert!(router.resolve(&Method::Get, "/users/me").unwrap().is_empty());
        assert_eq!(router.len(), 2);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware + application pipeline
// ─────────────────────────────────────────────────────────────────────────────

mod pipeline {
    use super::*;

    fn memory() -> DatabaseIdentifier<MemoryDatabase> {
        DatabaseIdentifier::new("memory")
    }

    /// Rejects requests without an `x-api-key` header.
    struct RequireKey;

    impl Middleware for RequireKey {
        async fn before(&self, request: &mut Request) -> MiddlewareResult {
            match request.http.header("x-api-key") {
                Some(_) => MiddlewareResult::allow(),
                None => {
                    MiddlewareResult::block(Abort::new(Status::Custom(401), "missing api key"))
                }
            }
        }

        fn name(&self) -> &str {
            "require-key"
        }
    }

    /// Stamps every response and counts how often it ran.
    struct Stamp {
        name: &'static str,
        priority: i32,
        runs: Arc<AtomicUsize>,
    }

    impl Middleware for Stamp {
        async fn before(&self, request: &mut Request) -> MiddlewareResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            request.http.append_header("x-seen-by", self.name);
            MiddlewareResult::allow()
        }

        async fn after(&self, _head: &RequestHead, response: &mut Response) {
            response.headers.push(("x-stamp".into(), self.name.into()));
        }

        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    async fn seen_by(request: Request) -> HandlerResult {
        let seen: Vec<&str> = request
            .http
            .headers()
            .iter()
            .filter(|(k, _)| k == "x-seen-by")
            .map(|(_, v)| v.as_str())
            .collect();
        Response::json(&json!({ "seen": seen }))
    }

    async fn count(request: Request) -> HandlerResult {
        let conn = request.connect(Some(&memory())).await?;
        Response::json(&json!({ "n": conn.increment("hits", 1) }))
    }

    async fn echo(mut request: Request) -> HandlerResult {
        let value: Value = request.content().decode()?;
        Response::json(&json!({ "echo": value }))
    }

    async fn fail(_request: Request) -> HandlerResult {
        Err(Abort::internal("boom"))
    }

    async fn app_with(
        configure: impl FnOnce(&mut Application),
    ) -> (Arc<Application>, ConnectionPool<MemoryDatabase>) {
        let mut databases = Databases::new();
        let pool = databases.add(&memory(), MemoryDatabase::new(), PoolConfig::default());
        let mut services = Services::new();
        services.provider(DatabasesProvider::new(databases)).unwrap();

        let mut app = Application::new(services, Environment::testing());
        app.add_middleware(RequestLogging);
        app.router_mut()
            .get("/seen", seen_by)
            .post("/count", count)
            .post("/echo", echo)
            .get("/fail", fail);
        configure(&mut app);
        app.boot().await.unwrap();
        (Arc::new(app), pool)
    }

    #[tokio::test]
    async fn refuses_requests_before_boot_and_after_shutdown() {
        let app = Application::new(Services::new(), Environment::testing());
        assert_eq!(app.state(), ServerState::Uninitialized);
        let response = app.respond(HttpMessage::new(Method::Get, "/")).await;
        assert_eq!(response.status(), Status::ServiceUnavailable);

        app.boot().await.unwrap();
        assert_eq!(app.state(), ServerState::Running);
        app.shutdown().await;
        app.shutdown().await;
        let response = app.respond(HttpMessage::new(Method::Get, "/")).await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
        assert_eq!(app.state(), ServerState::Shutdown);
    }

    #[tokio::test]
    async fn routes_and_reports_missing_routes() {
        let (app, _) = app_with(|_| {}).await;
        let response = app.respond(HttpMessage::new(Method::Get, "/missing")).await;
        assert_eq!(response.status(), Status::NotFound);
        assert!(body_json(&response)["error"]["message"].as_str().unwrap().contains("/missing"));

        let response = app.respond(HttpMessage::new(Method::Delete, "/seen")).await;
        assert_eq!(response.status(), Status::MethodNotAllowed);
    }

    #[tokio::test]
    async fn middleware_runs_in_priority_order() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (app, _) = app_with(|app| {
            app.add_middleware(Stamp { name: "late", priority: 10, runs: runs.clone() });
            app.add_middleware(Stamp { name: "early", priority: -10, runs: runs.clone() });
        })
        .await;
        assert_eq!(app.middleware().names(), vec!["request-logging", "early", "late"]);

        let response = app.respond(HttpMessage::new(Method::Get, "/seen")).await;
        assert_eq!(body_json(&response)["seen"], json!(["early", "late"]));
        let stamps: Vec<_> = response
            .headers
            .iter()
            .filter(|(k, _)| k == "x-stamp")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(stamps, vec!["early", "late"]);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn blocking_middleware_short_circuits() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (app, pool) = app_with(|app| {
            app.add_middleware(RequireKey);
            app.add_middleware(Stamp { name: "after-key", priority: 5, runs: runs.clone() });
        })
        .await;

        let response = app.respond(HttpMessage::new(Method::Post, "/count")).await;
        assert_eq!(response.status, 401);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(pool.opened_count(), 0);

        let allowed = HttpMessage::new(Method::Post, "/count").with_header("X-Api-Key", "k");
        assert_eq!(app.respond(allowed).await.status(), Status::Ok);
    }

    #[tokio::test]
    async fn connections_are_released_after_each_response() {
        let (app, pool) = app_with(|_| {}).await;
        for expected in 1..=3 {
            let response = app.respond(HttpMessage::new(Method::Post, "/count")).await;
            assert_eq!(body_json(&response)["n"], expected);
            assert_eq!(pool.active_count(), 0);
        }
        assert_eq!(pool.opened_count(), 1);
    }

    #[tokio::test]
    async fn handler_errors_become_responses() {
        let (app, _) = app_with(|_| {}).await;
        let response = app.respond(HttpMessage::new(Method::Get, "/fail")).await;
        assert_eq!(response.status(), Status::InternalServerError);
        assert_eq!(body_json(&response)["error"]["message"], "boom");

        let untyped = HttpMessage::new(Method::Post, "/echo");
        let response = app.respond(untyped).await;
        assert_eq!(response.status(), Status::UnsupportedMediaType);

        let typed =
            HttpMessage::new(Method::Post, "/echo").with_body(r#"{"a":1}"#, MediaType::json());
        let response = app.respond(typed).await;
        assert_eq!(body_json(&response)["echo"]["a"], 1);
    }

    #[tokio::test]
    async fn shutdown_closes_the_pools() {
        let (app, pool) = app_with(|_| {}).await;
        app.shutdown().await;
        assert!(pool.is_closed());
    }
}
