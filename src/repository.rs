use crate::models::{CommentRow, CreatePostRequest, Post, ReplyRow, UpdatePostRequest, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers and the
/// enrichment pipeline talk to this trait only, so the concrete backend
/// (Postgres in production, the in-memory store in tests) can be swapped
/// behind `Arc<dyn Repository>`.
///
/// Every method returns `Result<_, sqlx::Error>`: a storage failure must
/// surface to the caller as a server error, never as an empty result set.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    /// Batched profile lookup for the enrichment pipeline: one call per
    /// request, keyed by the full author-id set.
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error>;
    /// Overwrites the single active refresh token (last writer wins).
    async fn set_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), sqlx::Error>;

    // --- Posts ---
    async fn create_post(
        &self,
        author_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<Post, sqlx::Error>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, sqlx::Error>;
    /// One page of posts, newest-created-first.
    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<Post>, sqlx::Error>;
    async fn count_posts(&self) -> Result<i64, sqlx::Error>;
    /// Partial field merge; only `Some` fields change. Returns None when no
    /// post has that id.
    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error>;

    // --- Comments & Replies (append-only) ---
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<CommentRow, sqlx::Error>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<CommentRow>, sqlx::Error>;
    /// All comments of a post in append order.
    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRow>, sqlx::Error>;
    async fn create_reply(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<ReplyRow, sqlx::Error>;
    /// All replies for a set of comments in one round trip, append order.
    async fn replies_for_comments(
        &self,
        comment_ids: &[Uuid],
    ) -> Result<Vec<ReplyRow>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_verified, bio, \
     profile_image, followers, following, refresh_token, created_at";

const POST_COLUMNS: &str =
    "id, author_id, title, content, category, tags, likes, views, created_at, updated_at";

/// PostgresRepository
///
/// Production implementation of the `Repository` trait over a shared PgPool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, role, is_verified, bio, \
             profile_image, followers, following, refresh_token, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.is_verified)
        .bind(&user.bio)
        .bind(&user.profile_image)
        .bind(user.followers)
        .bind(user.following)
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
    }

    async fn set_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<Post, sqlx::Error> {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (id, author_id, title, content, category, tags, likes, views, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, 0, NOW(), NOW()) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(new_id)
        .bind(author_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.category)
        .bind(&req.tags)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_posts(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
    }

    /// COALESCE keeps stored values for fields the request leaves unset, so a
    /// partial PATCH body never clobbers the rest of the row.
    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts \
             SET title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 category = COALESCE($4, category), \
                 tags = COALESCE($5, tags), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.category)
        .bind(&req.tags)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<CommentRow, sqlx::Error> {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (id, post_id, author_id, body, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, seq, post_id, author_id, body, created_at",
        )
        .bind(new_id)
        .bind(post_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<CommentRow>, sqlx::Error> {
        sqlx::query_as::<_, CommentRow>(
            "SELECT id, seq, post_id, author_id, body, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRow>, sqlx::Error> {
        sqlx::query_as::<_, CommentRow>(
            "SELECT id, seq, post_id, author_id, body, created_at \
             FROM comments WHERE post_id = $1 ORDER BY seq ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_reply(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<ReplyRow, sqlx::Error> {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, ReplyRow>(
            "INSERT INTO replies (id, comment_id, author_id, body, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, seq, comment_id, author_id, body, created_at",
        )
        .bind(new_id)
        .bind(comment_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
    }

    async fn replies_for_comments(
        &self,
        comment_ids: &[Uuid],
    ) -> Result<Vec<ReplyRow>, sqlx::Error> {
        sqlx::query_as::<_, ReplyRow>(
            "SELECT id, seq, comment_id, author_id, body, created_at \
             FROM replies WHERE comment_id = ANY($1) ORDER BY seq ASC",
        )
        .bind(comment_ids.to_vec())
        .fetch_all(&self.pool)
        .await
    }
}

// --- In-Memory Implementation (Tests / DB-less local runs) ---

#[derive(Default)]
struct MemoryInner {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<CommentRow>,
    replies: Vec<ReplyRow>,
    comment_seq: i64,
    reply_seq: i64,
}

/// MemoryRepository
///
/// In-memory implementation of the `Repository` trait used by the test
/// suite. Vectors keep insertion order, which doubles as
/// append order; `comment_seq`/`reply_seq` mirror the database sequences.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryInner>,
    /// When true, every operation reports a simulated storage failure.
    should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            inner: Mutex::new(MemoryInner::default()),
            should_fail: true,
        }
    }

    fn guard(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol(
                "simulated storage failure".to_string(),
            ));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock means a panic mid-test; propagating it is correct.
        self.inner.lock().expect("memory repository lock poisoned")
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        self.guard()?;
        let mut inner = self.lock();
        // Mirrors the unique constraints on users(email) and users(username).
        if inner
            .users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(sqlx::Error::Protocol(
                "unique constraint violation on users".to_string(),
            ));
        }
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.guard()?;
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.guard()?;
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn set_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), sqlx::Error> {
        self.guard()?;
        let mut inner = self.lock();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) {
            user.refresh_token = Some(token.to_string());
        }
        Ok(())
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<Post, sqlx::Error> {
        self.guard()?;
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            title: req.title,
            content: req.content,
            category: req.category,
            tags: req.tags,
            likes: 0,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        self.lock().posts.push(post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
        self.guard()?;
        Ok(self.lock().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_posts(&self, offset: i64, limit: i64) -> Result<Vec<Post>, sqlx::Error> {
        self.guard()?;
        // Insertion order is creation order, so newest-first is the reverse.
        Ok(self
            .lock()
            .posts
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_posts(&self) -> Result<i64, sqlx::Error> {
        self.guard()?;
        Ok(self.lock().posts.len() as i64)
    }

    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error> {
        self.guard()?;
        let mut inner = self.lock();
        let Some(post) = inner.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(content) = req.content {
            post.content = content;
        }
        if let Some(category) = req.category {
            post.category = category;
        }
        if let Some(tags) = req.tags {
            post.tags = tags;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<CommentRow, sqlx::Error> {
        self.guard()?;
        let mut inner = self.lock();
        inner.comment_seq += 1;
        let comment = CommentRow {
            id: Uuid::new_v4(),
            seq: inner.comment_seq,
            post_id,
            author_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        inner.comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<CommentRow>, sqlx::Error> {
        self.guard()?;
        Ok(self.lock().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRow>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_reply(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<ReplyRow, sqlx::Error> {
        self.guard()?;
        let mut inner = self.lock();
        inner.reply_seq += 1;
        let reply = ReplyRow {
            id: Uuid::new_v4(),
            seq: inner.reply_seq,
            comment_id,
            author_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        inner.replies.push(reply.clone());
        Ok(reply)
    }

    async fn replies_for_comments(
        &self,
        comment_ids: &[Uuid],
    ) -> Result<Vec<ReplyRow>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .lock()
            .replies
            .iter()
            .filter(|r| comment_ids.contains(&r.comment_id))
            .cloned()
            .collect())
    }
}
