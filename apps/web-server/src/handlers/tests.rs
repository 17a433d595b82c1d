use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

use yatube_core::domain::{Follow, Group, Post, Reaction, ReactionKind, User};
use yatube_core::error::RepoError;
use yatube_core::pagination::PAGE_SIZE;
use yatube_core::ports::{
    BaseRepository, FollowRepository, PostFilter, PostRepository, PostSearch, ReactionRepository,
};
use yatube_infra::{JwtConfig, JwtTokenService};

use super::configure_routes;
use super::posts::index_cache_key;
use crate::config::AppConfig;
use crate::middleware::auth::ACCESS_TOKEN_COOKIE;
use crate::state::AppState;

const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

/// In-memory state writing media into a scratch directory.
fn test_state() -> (AppState, TempDir) {
    let media = tempfile::tempdir().unwrap();
    let config = AppConfig {
        media_root: media.path().to_path_buf(),
        ..AppConfig::default()
    };
    let tokens = Arc::new(JwtTokenService::new(JwtConfig::default()));
    (AppState::in_memory(&config, tokens), media)
}

async fn create_user(state: &AppState, username: &str, is_staff: bool) -> User {
    let user = User {
        is_staff,
        ..User::new(
            username.to_string(),
            format!("{username}@example.com"),
            "hash".to_string(),
        )
    };
    state.users.create(user).await.unwrap()
}

async fn create_group(state: &AppState, title: &str, slug: &str) -> Group {
    let group = Group::new(title.into(), slug.into(), "Test description".into());
    state.groups.create(group).await.unwrap()
}

async fn create_post(state: &AppState, author: &User, text: &str, group: Option<&Group>) -> Post {
    let post = Post::new(author.id, text.into(), group.map(|g| g.id), None);
    state.posts.create(post).await.unwrap()
}

fn bearer(state: &AppState, user: &User) -> (header::HeaderName, String) {
    let token = state
        .tokens
        .generate_token(user.id, &user.username, user.roles())
        .unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

async fn reactions(state: &AppState, kind: ReactionKind, post: &Post) -> u64 {
    state.reactions.count_for_post(kind, post.id).await.unwrap()
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[actix_web::test]
async fn anonymous_users_are_sent_to_login_with_next() {
    let (state, _media) = test_state();
    let app = app!(state);
    let post_id = Uuid::new_v4();

    let cases = [
        ("/create/".to_string(), "/auth/login/?next=/create/".to_string()),
        ("/follow/?page=2".to_string(), "/auth/login/?next=/follow/%3Fpage%3D2".to_string()),
        (
            format!("/posts/{post_id}/edit/"),
            format!("/auth/login/?next=/posts/{post_id}/edit/"),
        ),
        (
            format!("/posts/{post_id}/like/"),
            format!("/auth/login/?next=/posts/{post_id}/like/"),
        ),
    ];

    for (uri, expected) in cases {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(location(&resp), expected);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{post_id}/comment/"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_web::test]
async fn public_pages_render_their_templates() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let group = create_group(&state, "Test group", "first_slug").await;
    let post = create_post(&state, &author, "Test text", Some(&group)).await;
    let app = app!(state);

    let pages = [
        ("/".to_string(), "posts/index.html"),
        ("/group/first_slug/".to_string(), "posts/group_list.html"),
        ("/profile/Author/".to_string(), "posts/profile.html"),
        (format!("/posts/{}/", post.id), "posts/post_detail.html"),
    ];

    for (uri, template) in pages {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["template"], template);
    }
}

#[actix_web::test]
async fn missing_objects_are_not_found() {
    let (state, _media) = test_state();
    let app = app!(state);

    for uri in [
        "/group/nope/".to_string(),
        "/profile/nobody/".to_string(),
        format!("/posts/{}/", Uuid::new_v4()),
        "/posts/not-a-uuid/".to_string(),
        "/unexisting_page/".to_string(),
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn group_and_profile_feeds_are_filtered() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let other = create_user(&state, "Other", false).await;
    let group = create_group(&state, "Test group", "first_slug").await;
    let other_group = create_group(&state, "Other group", "second_slug").await;
    create_post(&state, &author, "In first group", Some(&group)).await;
    create_post(&state, &other, "In second group", Some(&other_group)).await;
    let app = app!(state);

    let req = test::TestRequest::get().uri("/group/first_slug/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let posts = body["context"]["page_obj"]["object_list"].as_array().unwrap().clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["text"], "In first group");
    assert_eq!(posts[0]["group"]["slug"], "first_slug");
    assert_eq!(body["context"]["group"]["title"], "Test group");

    let req = test::TestRequest::get().uri("/profile/Other/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let posts = body["context"]["page_obj"]["object_list"].as_array().unwrap().clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["author"]["username"], "Other");
    assert_eq!(body["context"]["following"], false);
}

#[actix_web::test]
async fn create_post_persists_and_redirects_to_profile() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let group = create_group(&state, "Test group", "first_slug").await;
    let app = app!(state);

    let group_id = group.id.to_string();
    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(bearer(&state, &author))
        .set_form([("text", "Test text"), ("group", group_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/Author/");

    let posts = state.posts.list(PostFilter::All, 0, 10).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "Test text");
    assert_eq!(posts[0].author_id, author.id);
    assert_eq!(posts[0].group_id, Some(group.id));
}

#[actix_web::test]
async fn create_post_stores_uploaded_image() {
    let (state, media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let app = app!(state);

    let image = format!("data:image/gif;base64,{}", STANDARD.encode(SMALL_GIF));
    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(bearer(&state, &author))
        .set_form([("text", "With picture"), ("image", image.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let post = state.posts.list(PostFilter::All, 0, 1).await.unwrap().remove(0);
    let path = post.image.expect("image stored");
    assert!(path.starts_with("posts/") && path.ends_with(".gif"));
    assert_eq!(std::fs::read(media.path().join(&path)).unwrap(), SMALL_GIF);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["context"]["post"]["image"], format!("/media/{path}"));
}

#[actix_web::test]
async fn invalid_post_form_is_rerendered_with_errors() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(bearer(&state, &author))
        .set_form([
            ("text", "  "),
            ("group", "00000000-0000-0000-0000-000000000000"),
            ("image", "bm90IGFuIGltYWdl"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "posts/create_post.html");
    let errors = &body["context"]["errors"];
    assert!(errors["text"].is_array());
    assert!(errors["group"].is_array());
    assert!(errors["image"].is_array());
    assert_eq!(state.posts.count(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn only_the_author_can_edit() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let stranger = create_user(&state, "Stranger", false).await;
    let post = create_post(&state, &author, "Original", None).await;
    let app = app!(state);
    let edit_uri = format!("/posts/{}/edit/", post.id);

    let req = test::TestRequest::get()
        .uri(&edit_uri)
        .insert_header(bearer(&state, &stranger))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let req = test::TestRequest::post()
        .uri(&edit_uri)
        .insert_header(bearer(&state, &stranger))
        .set_form([("text", "Hijacked")])
        .to_request();
    test::call_service(&app, req).await;
    let unchanged = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "Original");

    let req = test::TestRequest::get()
        .uri(&edit_uri)
        .insert_header(bearer(&state, &author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["template"], "posts/create_post.html");
    assert_eq!(body["context"]["is_edit"], true);
    assert_eq!(body["context"]["form"]["text"], "Original");

    let req = test::TestRequest::post()
        .uri(&edit_uri)
        .insert_header(bearer(&state, &author))
        .set_form([("text", "Edited")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let edited = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "Edited");
    assert_eq!(edited.pub_date, post.pub_date);
}

#[actix_web::test]
async fn comments_are_saved_and_blank_ones_dropped() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let reader = create_user(&state, "Reader", false).await;
    let post = create_post(&state, &author, "Test text", None).await;
    let app = app!(state);
    let comment_uri = format!("/posts/{}/comment/", post.id);

    for text in ["Nice post", "   "] {
        let req = test::TestRequest::post()
            .uri(&comment_uri)
            .insert_header(bearer(&state, &reader))
            .set_form([("text", text)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    }

    let comments = state.comments.list_for_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Nice post");
    assert_eq!(comments[0].author_id, reader.id);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["context"]["comments"][0]["author"]["username"], "Reader");
}

#[actix_web::test]
async fn follow_is_idempotent_and_feeds_the_follow_page() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let follower = create_user(&state, "Follower", false).await;
    let bystander = create_user(&state, "Bystander", false).await;
    create_post(&state, &author, "From the author", None).await;
    let app = app!(state);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/profile/Author/follow/")
            .insert_header(bearer(&state, &follower))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/Author/");
    }
    assert_eq!(state.follows.list().await.unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri("/profile/Follower/follow/")
        .insert_header(bearer(&state, &follower))
        .to_request();
    test::call_service(&app, req).await;
    assert!(!state.follows.exists(follower.id, follower.id).await.unwrap());

    let feed = |user: &User| {
        test::TestRequest::get()
            .uri("/follow/")
            .insert_header(bearer(&state, user))
            .to_request()
    };
    let body: Value = test::call_and_read_body_json(&app, feed(&follower)).await;
    assert_eq!(body["template"], "posts/index.html");
    assert_eq!(body["context"]["page_obj"]["count"], 1);
    let body: Value = test::call_and_read_body_json(&app, feed(&bystander)).await;
    assert_eq!(body["context"]["page_obj"]["count"], 0);

    let req = test::TestRequest::get()
        .uri("/profile/Author/")
        .insert_header(bearer(&state, &follower))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["context"]["following"], true);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/profile/Author/unfollow/")
            .insert_header(bearer(&state, &follower))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }
    assert!(!state.follows.exists(follower.id, author.id).await.unwrap());
}

#[actix_web::test]
async fn likes_and_dislikes_are_idempotent_toggles() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let reader = create_user(&state, "Reader", false).await;
    let post = create_post(&state, &author, "Test text", None).await;
    let app = app!(state);

    let hit = |action: &str| {
        test::TestRequest::post()
            .uri(&format!("/posts/{}/{action}/", post.id))
            .insert_header(bearer(&state, &reader))
            .to_request()
    };

    for action in ["like", "like", "dislike"] {
        let resp = test::call_service(&app, hit(action)).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    }

    assert_eq!(reactions(&state, ReactionKind::Like, &post).await, 1);
    assert_eq!(reactions(&state, ReactionKind::Dislike, &post).await, 1);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["context"]["likes"], 1);
    assert_eq!(body["context"]["dislikes"], 1);

    test::call_service(&app, hit("unlike")).await;
    test::call_service(&app, hit("unlike")).await;
    assert_eq!(reactions(&state, ReactionKind::Like, &post).await, 0);
    assert_eq!(reactions(&state, ReactionKind::Dislike, &post).await, 1);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/like/", Uuid::new_v4()))
        .insert_header(bearer(&state, &reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn feeds_paginate_by_ten() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let group = create_group(&state, "Test group", "first_slug").await;
    for i in 0..15 {
        create_post(&state, &author, &format!("Post {i}"), Some(&group)).await;
    }
    let app = app!(state);

    let cases = [
        ("/group/first_slug/", PAGE_SIZE as usize, 1),
        ("/group/first_slug/?page=2", 5, 2),
        ("/profile/Author/?page=abc", 10, 1),
        ("/profile/Author/?page=99", 5, 2),
    ];

    for (uri, expected_len, expected_number) in cases {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let page = &body["context"]["page_obj"];
        assert_eq!(page["object_list"].as_array().unwrap().len(), expected_len, "{uri}");
        assert_eq!(page["number"], expected_number, "{uri}");
        assert_eq!(page["num_pages"], 2);
    }

    let req = test::TestRequest::get().uri("/group/first_slug/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["context"]["page_obj"]["object_list"][0]["text"], "Post 14");
}

#[actix_web::test]
async fn index_page_is_cached_until_cleared() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let app = app!(state);

    let index = || test::TestRequest::get().uri("/").to_request();
    let before = test::call_and_read_body(&app, index()).await;

    create_post(&state, &author, "Author_First_cache", None).await;
    let cached = test::call_and_read_body(&app, index()).await;
    assert_eq!(before, cached);

    state.cache.delete(&index_cache_key(None)).await.unwrap();
    let fresh = test::call_and_read_body(&app, index()).await;
    assert_ne!(before, fresh);

    let body: Value = serde_json::from_slice(&fresh).unwrap();
    assert_eq!(body["context"]["page_obj"]["object_list"][0]["text"], "Author_First_cache");
}

#[actix_web::test]
async fn admin_requires_staff() {
    let (state, _media) = test_state();
    let user = create_user(&state, "User", false).await;
    let staff = create_user(&state, "Staff", true).await;
    let author = create_user(&state, "Author", false).await;
    create_post(&state, &author, "Cats are great", None).await;
    create_post(&state, &author, "Dogs are fine", None).await;
    let app = app!(state);

    let req = test::TestRequest::get().uri("/admin/posts/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let req = test::TestRequest::get()
        .uri("/admin/posts/")
        .insert_header(bearer(&state, &user))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/admin/posts/?q=cats&pub_date=today")
        .insert_header(bearer(&state, &staff))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let rows = body["context"]["rows"]["object_list"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["author"], "Author");
    assert_eq!(rows[0]["group"], "-empty-");
}

#[actix_web::test]
async fn admin_creates_groups_and_regroups_posts() {
    let (state, _media) = test_state();
    let staff = create_user(&state, "Staff", true).await;
    let author = create_user(&state, "Author", false).await;
    let post = create_post(&state, &author, "Test text", None).await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/admin/groups/")
        .insert_header(bearer(&state, &staff))
        .set_form([("title", "Cats and Dogs"), ("description", "Pets")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let group = state.groups.find_by_slug("cats-and-dogs").await.unwrap().unwrap();

    let req = test::TestRequest::post()
        .uri("/admin/groups/")
        .insert_header(bearer(&state, &staff))
        .set_form([("title", "Cats and Dogs"), ("description", "Again")])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["context"]["errors"]["slug"].is_array());

    let group_id = group.id.to_string();
    let req = test::TestRequest::post()
        .uri(&format!("/admin/posts/{}/", post.id))
        .insert_header(bearer(&state, &staff))
        .set_form([("group", group_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let regrouped = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(regrouped.group_id, Some(group.id));

    let req = test::TestRequest::post()
        .uri(&format!("/admin/posts/{}/", post.id))
        .insert_header(bearer(&state, &staff))
        .set_form([("group", "")])
        .to_request();
    test::call_service(&app, req).await;
    let cleared = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(cleared.group_id, None);
}

#[actix_web::test]
async fn signup_login_and_cookie_session() {
    let (state, _media) = test_state();
    let app = app!(state);

    let signup = || {
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_json(serde_json::json!({
                "username": "leo",
                "email": "leo@example.com",
                "password": "war-and-peace",
            }))
            .to_request()
    };
    let resp = test::call_service(&app, signup()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = test::call_service(&app, signup()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "leo"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([
            ("username", "leo"),
            ("password", "war-and-peace"),
            ("next", "/create/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/create/");
    let token = resp
        .response()
        .cookies()
        .find(|c| c.name() == ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap();

    let req = test::TestRequest::get()
        .uri("/auth/me/")
        .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["username"], "leo");
    assert_eq!(body["roles"], serde_json::json!(["user"]));
}

/// Follow storage whose existence check always misses, so duplicates reach the insert.
struct UncheckedFollows(Arc<dyn FollowRepository>);

#[async_trait]
impl FollowRepository for UncheckedFollows {
    async fn exists(&self, _user_id: Uuid, _author_id: Uuid) -> Result<bool, RepoError> {
        Ok(false)
    }

    async fn create(&self, follow: Follow) -> Result<Follow, RepoError> {
        self.0.create(follow).await
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError> {
        self.0.delete_pair(user_id, author_id).await
    }

    async fn list(&self) -> Result<Vec<Follow>, RepoError> {
        self.0.list().await
    }
}

/// Reaction storage whose existence check always misses.
struct UncheckedReactions(Arc<dyn ReactionRepository>);

#[async_trait]
impl ReactionRepository for UncheckedReactions {
    async fn exists(
        &self,
        _kind: ReactionKind,
        _post_id: Uuid,
        _user_id: Uuid,
    ) -> Result<bool, RepoError> {
        Ok(false)
    }

    async fn create(&self, reaction: Reaction) -> Result<Reaction, RepoError> {
        self.0.create(reaction).await
    }

    async fn delete_pair(
        &self,
        kind: ReactionKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, RepoError> {
        self.0.delete_pair(kind, post_id, user_id).await
    }

    async fn count_for_post(&self, kind: ReactionKind, post_id: Uuid) -> Result<u64, RepoError> {
        self.0.count_for_post(kind, post_id).await
    }

    async fn list(&self, kind: ReactionKind) -> Result<Vec<Reaction>, RepoError> {
        self.0.list(kind).await
    }
}

/// Post storage that reads fine but refuses every update.
struct ReadOnlyPosts(Arc<dyn PostRepository>);

#[async_trait]
impl BaseRepository<Post, Uuid> for ReadOnlyPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        self.0.create(post).await
    }

    async fn update(&self, _post: Post) -> Result<Post, RepoError> {
        Err(RepoError::Connection("connection reset".into()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.delete(id).await
    }
}

#[async_trait]
impl PostRepository for ReadOnlyPosts {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>, RepoError> {
        self.0.find_by_ids(ids).await
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        self.0.count(filter).await
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        self.0.list(filter, offset, limit).await
    }

    async fn search(&self, query: &PostSearch) -> Result<Vec<Post>, RepoError> {
        self.0.search(query).await
    }
}

fn stored_images(media: &TempDir) -> usize {
    std::fs::read_dir(media.path().join("posts"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[actix_web::test]
async fn storage_unique_constraint_absorbs_duplicate_follows_and_reactions() {
    let (mut state, _media) = test_state();
    state.follows = Arc::new(UncheckedFollows(state.follows.clone()));
    state.reactions = Arc::new(UncheckedReactions(state.reactions.clone()));
    let author = create_user(&state, "Author", false).await;
    let reader = create_user(&state, "Reader", false).await;
    let post = create_post(&state, &author, "Test text", None).await;
    let app = app!(state);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/profile/Author/follow/")
            .insert_header(bearer(&state, &reader))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/Author/");
    }
    assert_eq!(state.follows.list().await.unwrap().len(), 1);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/like/", post.id))
            .insert_header(bearer(&state, &reader))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    }
    assert_eq!(reactions(&state, ReactionKind::Like, &post).await, 1);
}

#[actix_web::test]
async fn bodiless_or_json_submissions_fall_back_to_empty_forms() {
    let (state, _media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let post = create_post(&state, &author, "Test text", None).await;
    let app = app!(state);
    let comment_uri = format!("/posts/{}/comment/", post.id);

    let req = test::TestRequest::post()
        .uri(&comment_uri)
        .insert_header(bearer(&state, &author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let req = test::TestRequest::post()
        .uri(&comment_uri)
        .insert_header(bearer(&state, &author))
        .set_json(serde_json::json!({ "text": "Sent as JSON" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(state.comments.list_for_post(post.id).await.unwrap().is_empty());

    for uri in ["/create/".to_string(), format!("/posts/{}/edit/", post.id)] {
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&state, &author))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["template"], "posts/create_post.html");
        assert!(body["context"]["errors"]["text"].is_array(), "{uri}");
    }
    assert_eq!(state.posts.count(PostFilter::All).await.unwrap(), 1);
}

#[actix_web::test]
async fn token_for_a_vanished_user_is_not_mistaken_for_a_duplicate() {
    let (state, media) = test_state();
    create_user(&state, "Author", false).await;
    let ghost = User::new("Ghost".into(), "ghost@example.com".into(), "hash".into());
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/profile/Author/follow/")
        .insert_header(bearer(&state, &ghost))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(state.follows.list().await.unwrap().is_empty());

    let image = STANDARD.encode(SMALL_GIF);
    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(bearer(&state, &ghost))
        .set_form([("text", "Nobody wrote this"), ("image", image.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.posts.count(PostFilter::All).await.unwrap(), 0);
    assert_eq!(stored_images(&media), 0);
}

#[actix_web::test]
async fn failed_edit_removes_the_freshly_stored_image() {
    let (mut state, media) = test_state();
    let author = create_user(&state, "Author", false).await;
    let post = create_post(&state, &author, "Original", None).await;
    state.posts = Arc::new(ReadOnlyPosts(state.posts.clone()));
    let app = app!(state);

    let image = STANDARD.encode(SMALL_GIF);
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(bearer(&state, &author))
        .set_form([("text", "Edited"), ("image", image.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(stored_images(&media), 0);
    let unchanged = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "Original");
}
