//! Presentation helpers shared by the page handlers.

use std::collections::{HashMap, HashSet};

use actix_web::{HttpResponse, http::header, web};
use serde::Deserialize;
use uuid::Uuid;

use yatube_core::domain::{Comment, Group, Post, User};
use yatube_core::pagination::{PAGE_SIZE, Page, Paginator};
use yatube_core::ports::PostFilter;
use yatube_shared::dto::{AuthorView, CommentView, GroupView, PostView};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// `?page=` as submitted. Parsing is left to [`Paginator::get_page`].
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// 302 to `location`.
pub fn redirect(location: impl Into<String>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.into()))
        .finish()
}

/// The submitted form, or an empty one when the body is missing or not urlencoded.
pub fn submitted<T: Default>(form: Option<web::Form<T>>) -> T {
    form.map(web::Form::into_inner).unwrap_or_default()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn post_url(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

pub fn author_view(user: &User) -> AuthorView {
    AuthorView {
        id: user.id,
        username: user.username.clone(),
    }
}

pub fn group_view(group: &Group) -> GroupView {
    GroupView {
        id: group.id,
        title: group.title.clone(),
        slug: group.slug.clone(),
        description: group.description.clone(),
    }
}

fn distinct(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    ids.collect::<HashSet<_>>().into_iter().collect()
}

/// Look up users by id in one round trip.
pub async fn users_by_id(
    state: &AppState,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, User>> {
    let users = state.users.find_by_ids(&distinct(ids)).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

/// Look up posts by id in one round trip.
pub async fn posts_by_id(
    state: &AppState,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, Post>> {
    let posts = state.posts.find_by_ids(&distinct(ids)).await?;
    Ok(posts.into_iter().map(|p| (p.id, p)).collect())
}

/// Look up groups by id in one round trip.
pub async fn groups_by_id(
    state: &AppState,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, Group>> {
    let groups = state.groups.find_by_ids(&distinct(ids)).await?;
    Ok(groups.into_iter().map(|g| (g.id, g)).collect())
}

fn missing_author(id: Uuid) -> AppError {
    AppError::Internal(format!("author {id} missing"))
}

/// Resolve authors, groups and image URLs for a batch of posts.
pub async fn post_views(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostView>> {
    let authors = users_by_id(state, posts.iter().map(|p| p.author_id)).await?;
    let groups = groups_by_id(state, posts.iter().filter_map(|p| p.group_id)).await?;

    posts
        .into_iter()
        .map(|post| {
            let author = authors
                .get(&post.author_id)
                .ok_or_else(|| missing_author(post.author_id))?;

            Ok(PostView {
                id: post.id,
                text: post.text,
                pub_date: post.pub_date,
                author: author_view(author),
                group: post.group_id.and_then(|id| groups.get(&id)).map(group_view),
                image: post.image.as_deref().map(|path| state.media_url_for(path)),
            })
        })
        .collect()
}

pub async fn post_view(state: &AppState, post: Post) -> AppResult<PostView> {
    let post_id = post.id;
    post_views(state, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("post {post_id} vanished")))
}

pub async fn comment_views(
    state: &AppState,
    comments: Vec<Comment>,
) -> AppResult<Vec<CommentView>> {
    let authors = users_by_id(state, comments.iter().map(|c| c.author_id)).await?;

    comments
        .into_iter()
        .map(|comment| {
            let author = authors
                .get(&comment.author_id)
                .ok_or_else(|| missing_author(comment.author_id))?;

            Ok(CommentView {
                id: comment.id,
                text: comment.text,
                created: comment.created,
                author: author_view(author),
            })
        })
        .collect()
}

/// One page of a post feed, newest first.
pub async fn paginate_posts(
    state: &AppState,
    filter: PostFilter,
    page: Option<&str>,
) -> AppResult<Page<PostView>> {
    let count = state.posts.count(filter).await?;
    let info = Paginator::new(count, PAGE_SIZE).get_page(page);
    let posts = state.posts.list(filter, info.offset(), info.limit()).await?;

    Ok(Page::new(post_views(state, posts).await?, info))
}
