use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table: credentials, role, and
/// public profile fields. `password_hash` and `refresh_token` never leave the
/// process; both are excluded from serialization so no response or log can
/// carry them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    // Stored lowercased; uniqueness is enforced on the lowercased value.
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    // RBAC field: 'user' or 'admin'.
    pub role: String,
    pub is_verified: bool,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub followers: i64,
    pub following: i64,
    // Single active value per account, overwritten on each issuance.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub refresh_token: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// A blog post row from the `posts` table. The author reference is immutable
/// after creation; `likes` and `views` are adjusted externally.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub likes: i64,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CommentRow
///
/// Raw database row (internal use). Comments are independent rows referencing
/// their post, so comment growth never rewrites the post row. `seq` is the
/// append-order sequence the read path sorts by.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct CommentRow {
    pub id: Uuid,
    pub seq: i64,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// ReplyRow
///
/// Raw database row (internal use). Replies carry their own unique id because
/// new replies are addressed to a specific comment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct ReplyRow {
    pub id: Uuid,
    pub seq: i64,
    pub comment_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input for POST /users/register. The password is hashed before it touches
/// storage and is never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input for POST /users/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreatePostRequest
///
/// Input for POST /blog/new-blog. Title, content, and category must be
/// non-empty; the tag set may be empty.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// UpdatePostRequest
///
/// Partial update payload for PATCH /blog/{blogId}. Only fields that are
/// `Some` are written; everything else keeps its stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// CreateCommentRequest
///
/// Input for POST /blog/{blogId}/comments. The body key is `comment`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub comment: String,
}

/// CreateReplyRequest
///
/// Input for POST /blog/{blogId}/comments/{commentId}/reply. The body key is
/// `reply`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateReplyRequest {
    pub reply: String,
}

// --- Enriched Response Shapes (Output) ---

/// TokenPair
///
/// Output of registration and login: the short-lived access token and the
/// long-lived refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// AuthorDetails
///
/// One-line author summary joined onto posts in list views and write-path
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthorDetails {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// AuthorProfile
///
/// Public profile block attached to the post detail view and to every comment
/// and reply in the nested tree.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthorProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

/// PostWithAuthor
///
/// A post joined with its author details but without the comment tree.
/// Returned by the write paths (create, update) so clients never need a
/// second round trip for the author block.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub likes: i64,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub author: AuthorDetails,
}

/// EnrichedReply
///
/// A reply with its author block resolved.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrichedReply {
    pub id: Uuid,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub user: AuthorProfile,
}

/// EnrichedComment
///
/// A comment with its author block and its replies, each reply carrying its
/// own author block. Reply order is append order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrichedComment {
    pub id: Uuid,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub user: AuthorProfile,
    pub replies: Vec<EnrichedReply>,
}

/// PostDetail
///
/// The full nested view of a post: author profile plus the complete
/// comment/reply tree, every level author-qualified. This is the shape
/// returned by GET /blog/{blogId} and by the comment/reply write paths.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub likes: i64,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub author: AuthorProfile,
    pub comments: Vec<EnrichedComment>,
}

/// PostSummary
///
/// One row of the paginated list view: post fields plus the one-line author
/// summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub likes: i64,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author: AuthorDetails,
}

/// PostPage
///
/// Output of GET /blog: one page of posts, newest first, with the pagination
/// bookkeeping the clients render from.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostPage {
    pub page: u64,
    pub total_pages: u64,
    pub total_blogs: i64,
    pub blogs: Vec<PostSummary>,
}
