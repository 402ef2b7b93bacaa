//! Enrichment pipeline: reconstructs the "post with full detail" view in a
//! bounded number of round trips. Entities are fetched in batched key-set
//! lookups (comments for the post, replies for the whole comment-id set, one
//! user fetch covering every author at every level), then the nested tree is
//! assembled in memory keyed by id. Never one lookup per row.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        AuthorDetails, AuthorProfile, CommentRow, EnrichedComment, EnrichedReply, Post, PostDetail,
        PostPage, PostSummary, PostWithAuthor, ReplyRow, User,
    },
    repository::RepositoryState,
};

/// Default page number when the query string omits one or supplies junk.
pub const DEFAULT_PAGE: u64 = 1;
/// Default page size under the same rule.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

fn profile_of(user: &User) -> AuthorProfile {
    AuthorProfile {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        profile_image: user.profile_image.clone(),
    }
}

fn details_of(user: &User) -> AuthorDetails {
    AuthorDetails {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

/// assemble_post_tree
///
/// Pure in-memory reshape: stitches pre-fetched rows into the nested
/// post → comments → replies tree, each level author-qualified. Comment and
/// reply ordering is the append order the rows arrived in; nothing is
/// re-sorted here. A comment or reply whose author cannot be resolved from
/// `users` is omitted, the same inner-join semantics the storage layer
/// applies between rows and profiles.
pub fn assemble_post_tree(
    post: Post,
    comments: Vec<CommentRow>,
    replies: Vec<ReplyRow>,
    users: &[User],
) -> Result<PostDetail, ApiError> {
    let profiles: HashMap<Uuid, AuthorProfile> =
        users.iter().map(|u| (u.id, profile_of(u))).collect();

    let author = profiles
        .get(&post.author_id)
        .cloned()
        .ok_or_else(|| ApiError::Unexpected(format!("author missing for post {}", post.id)))?;

    // Group replies under their comment id, preserving input order.
    let mut replies_by_comment: HashMap<Uuid, Vec<EnrichedReply>> = HashMap::new();
    for reply in replies {
        let Some(user) = profiles.get(&reply.author_id) else {
            continue;
        };
        replies_by_comment
            .entry(reply.comment_id)
            .or_default()
            .push(EnrichedReply {
                id: reply.id,
                text: reply.body,
                created_at: reply.created_at,
                user: user.clone(),
            });
    }

    let enriched_comments = comments
        .into_iter()
        .filter_map(|comment| {
            let user = profiles.get(&comment.author_id)?;
            Some(EnrichedComment {
                id: comment.id,
                text: comment.body,
                created_at: comment.created_at,
                user: user.clone(),
                replies: replies_by_comment.remove(&comment.id).unwrap_or_default(),
            })
        })
        .collect();

    Ok(PostDetail {
        id: post.id,
        title: post.title,
        content: post.content,
        category: post.category,
        tags: post.tags,
        likes: post.likes,
        views: post.views,
        created_at: post.created_at,
        updated_at: post.updated_at,
        author,
        comments: enriched_comments,
    })
}

/// load_post_detail
///
/// The full read path behind GET /blog/{blogId} and the comment/reply write
/// responses: three batched fetches (comments, replies by comment-id set,
/// users by author-id set) and one in-memory assembly.
pub async fn load_post_detail(
    repo: &RepositoryState,
    post: Post,
) -> Result<PostDetail, ApiError> {
    let comments = repo.comments_for_post(post.id).await?;
    let comment_ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
    let replies = if comment_ids.is_empty() {
        Vec::new()
    } else {
        repo.replies_for_comments(&comment_ids).await?
    };

    // Author-id set across all three levels, fetched once.
    let mut author_ids: Vec<Uuid> = Vec::with_capacity(1 + comments.len() + replies.len());
    author_ids.push(post.author_id);
    author_ids.extend(comments.iter().map(|c| c.author_id));
    author_ids.extend(replies.iter().map(|r| r.author_id));
    author_ids.sort_unstable();
    author_ids.dedup();

    let users = repo.users_by_ids(&author_ids).await?;
    assemble_post_tree(post, comments, replies, &users)
}

/// load_post_with_author
///
/// The write-path reshape: the post joined with its author details, comments
/// excluded. Used by create and update responses.
pub async fn load_post_with_author(
    repo: &RepositoryState,
    post: Post,
) -> Result<PostWithAuthor, ApiError> {
    let author = repo
        .get_user(post.author_id)
        .await?
        .ok_or_else(|| ApiError::Unexpected(format!("author missing for post {}", post.id)))?;

    Ok(PostWithAuthor {
        id: post.id,
        title: post.title,
        content: post.content,
        category: post.category,
        tags: post.tags,
        likes: post.likes,
        views: post.views,
        created_at: post.created_at,
        updated_at: post.updated_at,
        author: details_of(&author),
    })
}

/// load_post_page
///
/// One page of posts, newest first, each joined with the one-line author
/// summary. `page` and `page_size` must already be resolved (>= 1).
pub async fn load_post_page(
    repo: &RepositoryState,
    page: u64,
    page_size: u64,
) -> Result<PostPage, ApiError> {
    let total = repo.count_posts().await?;
    let offset = ((page - 1) * page_size) as i64;
    let posts = repo.list_posts(offset, page_size as i64).await?;

    let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let users = repo.users_by_ids(&author_ids).await?;
    let details: HashMap<Uuid, AuthorDetails> =
        users.iter().map(|u| (u.id, details_of(u))).collect();

    let blogs = posts
        .into_iter()
        .filter_map(|post| {
            let author = details.get(&post.author_id)?.clone();
            Some(PostSummary {
                id: post.id,
                title: post.title,
                category: post.category,
                tags: post.tags,
                likes: post.likes,
                views: post.views,
                created_at: post.created_at,
                author,
            })
        })
        .collect();

    Ok(PostPage {
        page,
        total_pages: total_pages(total, page_size),
        total_blogs: total,
        blogs,
    })
}

/// resolve_page_params
///
/// Query-string pagination with forgiving parsing: missing, non-numeric, or
/// zero values fall back to page 1 / size 10 rather than erroring.
pub fn resolve_page_params(page: Option<&str>, limit: Option<&str>) -> (u64, u64) {
    let page = page
        .and_then(|p| p.parse::<u64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(DEFAULT_PAGE);
    let limit = limit
        .and_then(|l| l.parse::<u64>().ok())
        .filter(|l| *l >= 1)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    (page, limit)
}

/// total_pages = ceil(total / page_size); zero posts means zero pages.
pub fn total_pages(total: i64, page_size: u64) -> u64 {
    (total.max(0) as u64).div_ceil(page_size)
}
