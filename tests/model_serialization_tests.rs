use blog_api::{
    error::Success,
    models::{
        AuthorProfile, EnrichedComment, EnrichedReply, PostDetail, PostPage, TokenPair,
        UpdatePostRequest, User,
    },
};
use chrono::Utc;
use uuid::Uuid;

#[test]
fn test_user_serialization_hides_secrets() {
    let user = User {
        id: Uuid::new_v4(),
        username: "ada".to_string(),
        email: "ada@example.com".to_string(),
        password_hash: "$2b$12$secret".to_string(),
        role: "user".to_string(),
        is_verified: true,
        bio: Some("pioneer".to_string()),
        profile_image: None,
        followers: 3,
        following: 1,
        refresh_token: Some("refresh-secret".to_string()),
        created_at: Utc::now(),
    };

    let json = serde_json::to_value(&user).unwrap();

    // Public surface is camelCase.
    assert_eq!(json["username"], "ada");
    assert_eq!(json["isVerified"], true);
    assert!(json.get("createdAt").is_some());
    assert!(json.get("profileImage").is_some());

    // The credential and session secrets never serialize under any name.
    let raw = serde_json::to_string(&user).unwrap();
    assert!(!raw.contains("secret"));
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("password_hash").is_none());
    assert!(json.get("refreshToken").is_none());
    assert!(json.get("refresh_token").is_none());
}

#[test]
fn test_token_pair_uses_camel_case_keys() {
    let pair = TokenPair {
        access_token: "aaa".to_string(),
        refresh_token: "rrr".to_string(),
    };
    let json = serde_json::to_value(&pair).unwrap();
    assert_eq!(json["accessToken"], "aaa");
    assert_eq!(json["refreshToken"], "rrr");
    assert!(json.get("access_token").is_none());
}

#[test]
fn test_success_envelope_flattens_payload() {
    let pair = TokenPair {
        access_token: "aaa".to_string(),
        refresh_token: "rrr".to_string(),
    };
    let envelope = Success {
        success: true,
        body: pair,
    };
    let json = serde_json::to_value(&envelope).unwrap();

    // Payload fields sit next to the flag, not nested under a key.
    assert_eq!(json["success"], true);
    assert_eq!(json["accessToken"], "aaa");
    assert!(json.get("body").is_none());
}

#[test]
fn test_post_page_key_names() {
    let page = PostPage {
        page: 1,
        total_pages: 2,
        total_blogs: 15,
        blogs: vec![],
    };
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["totalBlogs"], 15);
    assert!(json["blogs"].as_array().unwrap().is_empty());
}

#[test]
fn test_update_request_omits_unset_fields() {
    let req = UpdatePostRequest {
        title: Some("t".to_string()),
        ..Default::default()
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("title"));
    assert!(!json.contains("content"));
    assert!(!json.contains("category"));
    assert!(!json.contains("tags"));
}

#[test]
fn test_post_detail_nested_shape() {
    let author = AuthorProfile {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        profile_image: Some("https://img".to_string()),
    };
    let detail = PostDetail {
        id: Uuid::new_v4(),
        title: "t".to_string(),
        author: author.clone(),
        comments: vec![EnrichedComment {
            id: Uuid::new_v4(),
            text: "c".to_string(),
            created_at: Utc::now(),
            user: author.clone(),
            replies: vec![EnrichedReply {
                id: Uuid::new_v4(),
                text: "r".to_string(),
                created_at: Utc::now(),
                user: author,
            }],
        }],
        ..Default::default()
    };

    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["author"]["profileImage"], "https://img");
    let comment = &json["comments"][0];
    assert_eq!(comment["text"], "c");
    assert_eq!(comment["user"]["username"], "alice");
    assert_eq!(comment["replies"][0]["text"], "r");
    assert_eq!(comment["replies"][0]["user"]["email"], "alice@example.com");
    assert!(comment["replies"][0].get("createdAt").is_some());
}
