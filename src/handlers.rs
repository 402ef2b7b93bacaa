use crate::{
    AppState,
    auth::{AuthUser, issue_token_pair},
    enrich,
    error::{ApiError, Success},
    models::{
        CreateCommentRequest, CreatePostRequest, CreateReplyRequest, LoginRequest, PostDetail,
        PostPage, PostWithAuthor, RegisterRequest, TokenPair, UpdatePostRequest, User,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// ListQuery
///
/// Query parameters of GET /blog. Both arrive as raw strings so that
/// non-numeric junk falls back to the defaults instead of failing extraction.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// 1-based page number; defaults to 1.
    pub page: Option<String>,
    /// Page size; defaults to 10.
    pub limit: Option<String>,
}

// --- Helpers ---

/// Parses a path identifier, rejecting malformed values before any storage
/// access happens.
fn parse_object_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation(format!("Malformed {what} id")))
}

// --- Auth Handlers ---

/// register_user
///
/// [Public Route] Creates an account and signs the first token pair in the
/// same round trip. Email is stored lowercased; uniqueness covers both email
/// and username. The password is bcrypt-hashed before the row is written.
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = TokenPair),
        (status = 400, description = "Invalid or duplicate registration data")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Success<TokenPair>>), ApiError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Invalid Request Data".to_string()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    if state.repo.find_user_by_email(&email).await?.is_some()
        || state.repo.find_user_by_username(&username).await?.is_some()
    {
        return Err(ApiError::Validation("User already exists".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Unexpected(format!("password hashing failed: {e}")))?;

    let user = User {
        id: Uuid::new_v4(),
        username,
        email,
        password_hash,
        role: "user".to_string(),
        is_verified: false,
        bio: None,
        profile_image: None,
        followers: 0,
        following: 0,
        refresh_token: None,
        created_at: Utc::now(),
    };

    let created = state.repo.create_user(user).await?;
    let pair = issue_token_pair(&state.repo, &state.config, &created).await?;

    Ok((StatusCode::CREATED, Success::of(pair)))
}

/// login_user
///
/// [Public Route] Verifies credentials and signs a fresh token pair. The
/// persisted refresh token is overwritten, so the previous session's refresh
/// flow stops working. Unknown email and wrong password produce the same
/// response; a credential failure is never a server error.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Success<TokenPair>>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Invalid Request Data".to_string()));
    }

    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Validation("Invalid credentials".to_string()))?;

    let matches = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::Unexpected(format!("password verification failed: {e}")))?;
    if !matches {
        return Err(ApiError::Validation("Invalid credentials".to_string()));
    }

    let pair = issue_token_pair(&state.repo, &state.config, &user).await?;
    Ok(Success::of(pair))
}

/// get_me
///
/// [Authenticated Route] Returns the gate-resolved user record. The secret
/// fields never serialize, so the response carries identity and profile only.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(AuthUser { user, .. }: AuthUser) -> Json<Success<User>> {
    Success::of(user)
}

// --- Blog Handlers ---

/// list_blogs
///
/// [Authenticated Route] One page of posts, newest first, each with a
/// one-line author summary plus the pagination bookkeeping.
#[utoipa::path(
    get,
    path = "/blog",
    params(ListQuery),
    responses((status = 200, description = "Page of posts", body = PostPage))
)]
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Success<PostPage>>, ApiError> {
    let (page, page_size) =
        enrich::resolve_page_params(query.page.as_deref(), query.limit.as_deref());
    let page = enrich::load_post_page(&state.repo, page, page_size).await?;
    Ok(Success::of(page))
}

/// create_blog
///
/// [Authenticated Route] Persists a new post and immediately re-reads it
/// through the author join, so the response is already the enriched shape.
/// The author is the authenticated identity, immutable afterwards.
#[utoipa::path(
    post,
    path = "/blog/new-blog",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = PostWithAuthor),
        (status = 400, description = "Missing required fields")
    )
)]
pub async fn create_blog(
    AuthUser { id: author_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Success<PostWithAuthor>>), ApiError> {
    if payload.title.trim().is_empty()
        || payload.content.trim().is_empty()
        || payload.category.trim().is_empty()
    {
        return Err(ApiError::Validation("Invalid Request Data".to_string()));
    }

    let post = state.repo.create_post(author_id, payload).await?;
    let enriched = enrich::load_post_with_author(&state.repo, post).await?;
    Ok((StatusCode::CREATED, Success::of(enriched)))
}

/// get_blog_details
///
/// [Authenticated Route] The full nested view: post, author profile, every
/// comment with its author, every reply with its author. One request, no
/// follow-up fetches for the client.
#[utoipa::path(
    get,
    path = "/blog/{blogId}",
    params(("blogId" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "No such post")
    )
)]
pub async fn get_blog_details(
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
) -> Result<Json<Success<PostDetail>>, ApiError> {
    let id = parse_object_id(&blog_id, "blog")?;
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;
    let detail = enrich::load_post_detail(&state.repo, post).await?;
    Ok(Success::of(detail))
}

/// update_blog
///
/// [Authenticated Route] Partial field merge: only provided fields change.
/// The id is validated before any storage access, and the response re-runs
/// the author join (without comments) on the updated record.
#[utoipa::path(
    patch,
    path = "/blog/{blogId}",
    params(("blogId" = String, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = PostWithAuthor),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "No such post")
    )
)]
pub async fn update_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Success<PostWithAuthor>>, ApiError> {
    let id = parse_object_id(&blog_id, "blog")?;
    let updated = state
        .repo
        .update_post(id, payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;
    let enriched = enrich::load_post_with_author(&state.repo, updated).await?;
    Ok(Success::of(enriched))
}

/// add_comment
///
/// [Authenticated Route] Appends a comment (with an empty reply list) to a
/// post and returns the post re-run through the full nested reshape, the new
/// comment ordered last.
#[utoipa::path(
    post,
    path = "/blog/{blogId}/comments",
    params(("blogId" = String, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = PostDetail),
        (status = 400, description = "Malformed id or empty comment"),
        (status = 404, description = "No such post")
    )
)]
pub async fn add_comment(
    AuthUser { id: author_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Success<PostDetail>>), ApiError> {
    let post_id = parse_object_id(&blog_id, "blog")?;
    if payload.comment.trim().is_empty() {
        return Err(ApiError::Validation("Invalid Request Data".to_string()));
    }

    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    state
        .repo
        .create_comment(post_id, author_id, payload.comment.trim())
        .await?;

    let detail = enrich::load_post_detail(&state.repo, post).await?;
    Ok((StatusCode::CREATED, Success::of(detail)))
}

/// add_reply
///
/// [Authenticated Route] Appends a reply to one specific comment of a post.
/// Both targets must exist and the comment must belong to that post; sibling
/// comments' reply lists are untouched. Returns the full nested reshape.
#[utoipa::path(
    post,
    path = "/blog/{blogId}/comments/{commentId}/reply",
    params(
        ("blogId" = String, Path, description = "Post ID"),
        ("commentId" = String, Path, description = "Comment ID")
    ),
    request_body = CreateReplyRequest,
    responses(
        (status = 201, description = "Reply added", body = PostDetail),
        (status = 400, description = "Malformed id or empty reply"),
        (status = 404, description = "No such post or comment")
    )
)]
pub async fn add_reply(
    AuthUser { id: author_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(String, String)>,
    Json(payload): Json<CreateReplyRequest>,
) -> Result<(StatusCode, Json<Success<PostDetail>>), ApiError> {
    let post_id = parse_object_id(&blog_id, "blog")?;
    let comment_id = parse_object_id(&comment_id, "comment")?;
    if payload.reply.trim().is_empty() {
        return Err(ApiError::Validation("Invalid Request Data".to_string()));
    }

    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    // The comment must exist AND hang off this post; a valid comment id under
    // a different post is still a miss.
    let comment = state
        .repo
        .get_comment(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    state
        .repo
        .create_reply(comment.id, author_id, payload.reply.trim())
        .await?;

    let detail = enrich::load_post_detail(&state.repo, post).await?;
    Ok((StatusCode::CREATED, Success::of(detail)))
}
