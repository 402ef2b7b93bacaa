use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `AuthUser` layer applied in `lib.rs`;
/// handlers receive a resolved identity or never run at all.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /users/me
        // The authenticated user's own record, secrets stripped.
        .route("/users/me", get(handlers::get_me))
        // GET /blog?page=..&limit=..
        // Paginated post list, newest first, author summaries joined in.
        .route("/blog", get(handlers::list_blogs))
        // POST /blog/new-blog
        // Submits a new post; the response carries the author join already.
        .route("/blog/new-blog", post(handlers::create_blog))
        // GET /blog/{blogId} serves the full nested comment/reply tree;
        // PATCH /blog/{blogId} applies a partial field merge.
        .route(
            "/blog/{blogId}",
            get(handlers::get_blog_details).patch(handlers::update_blog),
        )
        // POST /blog/{blogId}/comments
        // Appends a comment; responds with the re-enriched post.
        .route("/blog/{blogId}/comments", post(handlers::add_comment))
        // POST /blog/{blogId}/comments/{commentId}/reply
        // Appends a reply to one specific comment of the post.
        .route(
            "/blog/{blogId}/comments/{commentId}/reply",
            post(handlers::add_reply),
        )
}
