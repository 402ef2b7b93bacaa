use async_trait::async_trait;
use blog_api::{
    AppConfig, AppState,
    auth::AccessClaims,
    create_router,
    models::{CommentRow, CreatePostRequest, Post, ReplyRow, UpdatePostRequest, User},
    repository::{MemoryRepository, Repository, RepositoryState},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Repository wrapper that counts post lookups, so tests can assert an
/// operation was rejected before any content-store access.
struct CountingRepo {
    inner: MemoryRepository,
    post_reads: AtomicUsize,
    post_writes: AtomicUsize,
}

impl CountingRepo {
    fn new() -> Self {
        Self {
            inner: MemoryRepository::new(),
            post_reads: AtomicUsize::new(0),
            post_writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Repository for CountingRepo {
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        self.inner.create_user(user).await
    }
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.inner.get_user(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.inner.find_user_by_email(email).await
    }
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        self.inner.find_user_by_username(username).await
    }
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
        self.inner.users_by_ids(ids).await
    }
    async fn set_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), sqlx::Error> {
        self.inner.set_refresh_token(user_id, token).await
    }
    async fn create_post(
        &self,
        author_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<Post, sqlx::Error> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_post(author_id, req).await
    }
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
        self.post_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_post(id).await
    }
    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<Post>, sqlx::Error> {
        self.inner.list_posts(offset, limit).await
    }
    async fn count_posts(&self) -> Result<i64, sqlx::Error> {
        self.inner.count_posts().await
    }
    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_post(id, req).await
    }
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<CommentRow, sqlx::Error> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_comment(post_id, author_id, body).await
    }
    async fn get_comment(&self, id: Uuid) -> Result<Option<CommentRow>, sqlx::Error> {
        self.inner.get_comment(id).await
    }
    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRow>, sqlx::Error> {
        self.inner.comments_for_post(post_id).await
    }
    async fn create_reply(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<ReplyRow, sqlx::Error> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_reply(comment_id, author_id, body).await
    }
    async fn replies_for_comments(
        &self,
        comment_ids: &[Uuid],
    ) -> Result<Vec<ReplyRow>, sqlx::Error> {
        self.inner.replies_for_comments(comment_ids).await
    }
}

struct TestApp {
    address: String,
    repo: Arc<CountingRepo>,
    config: AppConfig,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(CountingRepo::new());
    let config = AppConfig::default();

    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: config.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        config,
    }
}

/// Seeds a user straight into the store, bypassing the registration endpoint.
async fn seed_user(app: &TestApp, username: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "$2b$12$irrelevant.for.these.tests".to_string(),
        role: "user".to_string(),
        is_verified: false,
        bio: None,
        profile_image: None,
        followers: 0,
        following: 0,
        refresh_token: None,
        created_at: Utc::now(),
    };
    app.repo.create_user(user.clone()).await.unwrap()
}

fn sign_access_token(app: &TestApp, user: &User, issued_at: i64, expires_at: i64) -> String {
    let claims = AccessClaims {
        sub: user.id,
        role: user.role.clone(),
        iat: issued_at as usize,
        exp: expires_at as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app.config.jwt_secret.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/users/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_expired_token_rejected_without_side_effect() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = seed_user(&app, "carol").await;

    let now = Utc::now().timestamp();
    let expired = sign_access_token(&app, &user, now - 3600, now - 1800);

    let response = client
        .post(format!("{}/blog/new-blog", app.address))
        .bearer_auth(&expired)
        .json(&serde_json::json!({
            "title": "Should not exist",
            "content": "body",
            "category": "misc",
            "tags": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // The gate short-circuited: the content store was never touched.
    assert_eq!(app.repo.post_writes.load(Ordering::SeqCst), 0);
    assert_eq!(app.repo.inner.count_posts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = seed_user(&app, "mallory").await;

    // Well-formed claims signed with the wrong secret.
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user.id,
        role: user.role.clone(),
        iat: now as usize,
        exp: (now + 900) as usize,
    };
    let tampered = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"not-the-signing-secret"),
    )
    .unwrap();

    let response = client
        .get(format!("{}/users/me", app.address))
        .bearer_auth(&tampered)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_token_for_vanished_user_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // A well-signed token whose subject was never stored.
    let ghost = User {
        id: Uuid::new_v4(),
        role: "user".to_string(),
        ..Default::default()
    };
    let now = Utc::now().timestamp();
    let token = sign_access_token(&app, &ghost, now, now + 900);

    let response = client
        .get(format!("{}/users/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_malformed_id_rejected_before_storage_lookup() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = seed_user(&app, "victor").await;
    let now = Utc::now().timestamp();
    let token = sign_access_token(&app, &user, now, now + 900);

    let response = client
        .patch(format!("{}/blog/definitely-not-a-uuid", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "title": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Validation fired before any post read or write.
    assert_eq!(app.repo.post_reads.load(Ordering::SeqCst), 0);
    assert_eq!(app.repo.post_writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_local_header_bypass_resolves_stored_user() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = seed_user(&app, "dev").await;

    // Env::Local honors x-user-id for a user that actually exists.
    let response = client
        .get(format!("{}/users/me", app.address))
        .header("x-user-id", user.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "dev");

    // An unknown id in the bypass header still falls through to token auth.
    let response = client
        .get(format!("{}/users/me", app.address))
        .header("x-user-id", Uuid::new_v4().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_login_overwrites_refresh_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Register through the API so the password hash is real.
    let response = client
        .post(format!("{}/users/register", app.address))
        .json(&serde_json::json!({
            "username": "peyton",
            "email": "peyton@example.com",
            "password": "hunter22"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let first: serde_json::Value = response.json().await.unwrap();
    let first_refresh = first["refreshToken"].as_str().unwrap().to_string();

    let stored = app
        .repo
        .find_user_by_email("peyton@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(first_refresh.as_str()));

    // A later login replaces the single active value (last writer wins).
    let response = client
        .post(format!("{}/users/login", app.address))
        .json(&serde_json::json!({
            "email": "peyton@example.com",
            "password": "hunter22"
        }))
        .send()
        .await
        .unwrap();
    let second: serde_json::Value = response.json().await.unwrap();
    let second_refresh = second["refreshToken"].as_str().unwrap().to_string();

    let stored = app
        .repo
        .find_user_by_email("peyton@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(second_refresh.as_str())
    );
}
