//! End-to-end tests driving the full middleware pipeline over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rookery_auth::{Claims, hash_password};
use rookery_core::{MemoryStorage, Post, Role, User};
use rookery_server::{AppConfig, AppState, build_router};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    state: AppState,
    storage: Arc<MemoryStorage>,
    _shutdown: tokio::sync::oneshot::Sender<()>,
    _handle: JoinHandle<()>,
}

async fn start_server(config: AppConfig) -> TestServer {
    let storage = Arc::new(MemoryStorage::with_default_roles());
    let state = AppState::with_memory_storage(&config, storage.clone());
    start_with_state(state, storage).await
}

async fn start_with_state(state: AppState, storage: Arc<MemoryStorage>) -> TestServer {
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = rx.await;
        })
        .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        state,
        storage,
        _shutdown: tx,
        _handle: handle,
    }
}

/// Config with the limiter off so unrelated tests never trip it.
fn quiet_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.rate_limiter.enabled = false;
    config
}

fn token_for(state: &AppState, user_id: i64) -> String {
    let claims = Claims::issue(user_id, state.token_lifetime, &state.token_issuer);
    state.authenticator.generate_token(&claims).unwrap()
}

fn seed_user(storage: &MemoryStorage, id: i64, name: &str, role: Role) {
    storage.insert_user(User::new(
        id,
        name,
        format!("{name}@rookery.dev"),
        role,
    ));
}

#[tokio::test]
async fn healthz_is_public() {
    let server = start_server(quiet_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/healthz", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn wrong_auth_scheme_is_rejected_without_collaborator_calls() {
    let server = start_server(quiet_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/v1/users/me", server.base))
        .header("authorization", "Token abc")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    assert_eq!(server.storage.user_lookup_count(), 0);
}

#[tokio::test]
async fn missing_and_garbage_tokens_are_unauthorized() {
    let server = start_server(quiet_config()).await;
    let client = reqwest::Client::new();
    let url = format!("{}/v1/users/me", server.base);

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(&url)
        .bearer_auth("definitely.not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn bearer_flow_resolves_identity_through_the_cache() {
    let server = start_server(quiet_config()).await;
    seed_user(&server.storage, 7, "wren", Role::new("user", 1));
    let token = token_for(&server.state, 7);
    let client = reqwest::Client::new();
    let url = format!("{}/v1/users/me", server.base);

    for _ in 0..2 {
        let resp = client.get(&url).bearer_auth(&token).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["id"], 7);
        assert_eq!(body["username"], "wren");
    }

    // Second request was served from the cache.
    assert_eq!(server.storage.user_lookup_count(), 1);
}

#[tokio::test]
async fn disabled_cache_reads_persistence_on_every_request() {
    let mut config = quiet_config();
    config.cache.enabled = false;
    let server = start_server(config).await;
    seed_user(&server.storage, 7, "wren", Role::new("user", 1));
    let token = token_for(&server.state, 7);
    let client = reqwest::Client::new();
    let url = format!("{}/v1/users/me", server.base);

    for _ in 0..2 {
        let resp = client.get(&url).bearer_auth(&token).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    assert_eq!(server.storage.user_lookup_count(), 2);
}

/// A persistence backend that fails every user lookup.
struct FailingUserStore;

#[async_trait::async_trait]
impl rookery_core::UserStore for FailingUserStore {
    async fn get_by_id(&self, _id: i64) -> Result<Option<User>, rookery_core::StorageError> {
        Err(rookery_core::StorageError::backend("connection reset"))
    }

    async fn get_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<User>, rookery_core::StorageError> {
        Err(rookery_core::StorageError::backend("connection reset"))
    }

    async fn update(&self, _user: &User) -> Result<(), rookery_core::StorageError> {
        Err(rookery_core::StorageError::backend("connection reset"))
    }
}

#[tokio::test]
async fn failing_user_lookup_is_unauthorized_not_internal() {
    let config = quiet_config();
    let reference = Arc::new(MemoryStorage::with_default_roles());
    let state = AppState::new(
        &config,
        Arc::new(FailingUserStore),
        reference.clone(),
        reference.clone(),
    );
    let server = start_with_state(state, reference).await;
    let token = token_for(&server.state, 7);

    let resp = reqwest::Client::new()
        .get(format!("{}/v1/users/me", server.base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let server = start_server(quiet_config()).await;
    seed_user(&server.storage, 7, "wren", Role::new("user", 1));

    let mut claims = Claims::issue(7, time::Duration::hours(1), &server.state.token_issuer);
    claims.iat -= 3 * 3600;
    claims.nbf -= 3 * 3600;
    claims.exp -= 3 * 3600;
    let token = server.state.authenticator.generate_token(&claims).unwrap();

    let resp = reqwest::Client::new()
        .get(format!("{}/v1/users/me", server.base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn token_issuance_round_trip() {
    let server = start_server(quiet_config()).await;
    let hash = hash_password("hunter2").unwrap();
    server.storage.insert_user(
        User::new(3, "kite", "kite@rookery.dev", Role::new("user", 1)).with_password_hash(hash),
    );

    let client = reqwest::Client::new();
    let url = format!("{}/v1/authentication/token", server.base);

    // Wrong password and unknown email fail identically.
    let resp = client
        .post(&url)
        .json(&json!({ "email": "kite@rookery.dev", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(&url)
        .json(&json!({ "email": "nobody@rookery.dev", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Valid credentials issue a token usable as a bearer credential.
    let resp = client
        .post(&url)
        .json(&json!({ "email": "kite@rookery.dev", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let resp = client
        .get(format!("{}/v1/users/me", server.base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], 3);
}

#[tokio::test]
async fn ownership_and_precedence_govern_mutations() {
    let server = start_server(quiet_config()).await;
    let storage = &server.storage;
    seed_user(storage, 1, "owner", Role::new("user", 1));
    seed_user(storage, 2, "bystander", Role::new("user", 1));
    seed_user(storage, 3, "mod", Role::new("moderator", 2));
    seed_user(storage, 4, "root", Role::new("admin", 3));
    storage.insert_post(Post::new(10, 1, "first post", "hello"));

    let client = reqwest::Client::new();
    let url = format!("{}/v1/posts/10", server.base);
    let patch_body = json!({ "title": "edited" });

    // Owner may edit regardless of rank.
    let resp = client
        .patch(&url)
        .bearer_auth(token_for(&server.state, 1))
        .json(&patch_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "edited");

    // Non-owner with insufficient rank is forbidden.
    let resp = client
        .patch(&url)
        .bearer_auth(token_for(&server.state, 2))
        .json(&patch_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Non-owner moderator outranks the requirement for edits...
    let resp = client
        .patch(&url)
        .bearer_auth(token_for(&server.state, 3))
        .json(&patch_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // ...but deletion requires admin.
    let resp = client
        .delete(&url)
        .bearer_auth(token_for(&server.state, 3))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(&url)
        .bearer_auth(token_for(&server.state, 4))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn absent_post_is_404_and_malformed_id_is_400() {
    let server = start_server(quiet_config()).await;
    seed_user(&server.storage, 1, "owner", Role::new("user", 1));
    let token = token_for(&server.state, 1);
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/v1/posts/999", server.base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .get(format!("{}/v1/posts/not-a-number", server.base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn basic_auth_challenge_and_activation() {
    let server = start_server(quiet_config()).await;
    server.storage.insert_user(
        User::new(5, "fledgling", "fledgling@rookery.dev", Role::new("user", 1)).inactive(),
    );
    let client = reqwest::Client::new();
    let url = format!("{}/v1/users/activate/5", server.base);

    // No credentials: 401 with a Basic challenge.
    let resp = client.put(&url).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let challenge = resp.headers()["www-authenticate"].to_str().unwrap();
    assert!(challenge.starts_with("Basic "));

    // Wrong credentials.
    let resp = client
        .put(&url)
        .basic_auth("admin", Some("wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Default configured pair succeeds and the user becomes active.
    let resp = client
        .put(&url)
        .basic_auth("admin", Some("admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let user = rookery_core::UserStore::get_by_id(server.storage.as_ref(), 5)
        .await
        .unwrap()
        .unwrap();
    assert!(user.is_active);
}

#[tokio::test]
async fn activation_invalidates_the_cached_identity() {
    let server = start_server(quiet_config()).await;
    server.storage.insert_user(
        User::new(8, "nestling", "nestling@rookery.dev", Role::new("user", 1)).inactive(),
    );
    let token = token_for(&server.state, 8);
    let client = reqwest::Client::new();
    let me_url = format!("{}/v1/users/me", server.base);

    // Populate the cache with the inactive copy.
    let resp = client.get(&me_url).bearer_auth(&token).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["is_active"], false);

    // Activate through the admin endpoint; the write invalidates the cache.
    let resp = client
        .put(format!("{}/v1/users/activate/8", server.base))
        .basic_auth("admin", Some("admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    // Well within the TTL, yet the fresh state is visible.
    let resp = client.get(&me_url).bearer_auth(&token).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn fixed_window_limits_then_recovers() {
    let mut config = AppConfig::default();
    config.rate_limiter.requests_per_window = 20;
    config.rate_limiter.window_secs = 2;
    let server = start_server(config).await;
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", server.base);

    for i in 0..20 {
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), 200, "request {i} should be admitted");
    }

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 429);
    let retry_after: u64 = resp.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1 && retry_after <= 2);

    // After the window passes the count resets.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn disabled_limiter_admits_everything() {
    let mut config = AppConfig::default();
    config.rate_limiter.enabled = false;
    let server = start_server(config).await;
    let client = reqwest::Client::new();

    for _ in 0..50 {
        let resp = client
            .get(format!("{}/healthz", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
}
