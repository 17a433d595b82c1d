//! Post feeds, post pages and authoring.

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use uuid::Uuid;

use yatube_core::DomainError;
use yatube_core::domain::{Comment, Post, ReactionKind};
use yatube_core::forms::{CommentForm, FormErrors, ImageUpload, PostForm};
use yatube_core::pagination::Page;
use yatube_core::ports::PostFilter;
use yatube_shared::Rendered;
use yatube_shared::dto::{AuthorView, CommentView, GroupView, PostView};

use super::views::{
    PageQuery, author_view, comment_views, group_view, paginate_posts, post_url, post_view,
    profile_url, redirect, submitted,
};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Directory under the media root post images are stored in.
const UPLOAD_TO: &str = "posts";

#[derive(Serialize)]
struct FeedContext {
    page_obj: Page<PostView>,
}

#[derive(Serialize)]
struct GroupContext {
    group: GroupView,
    page_obj: Page<PostView>,
}

#[derive(Serialize)]
struct ProfileContext {
    author: AuthorView,
    page_obj: Page<PostView>,
    following: bool,
}

#[derive(Serialize)]
struct DetailContext {
    post: PostView,
    comments: Vec<CommentView>,
    form: CommentForm,
    likes: u64,
    dislikes: u64,
}

#[derive(Serialize)]
struct PostFormContext {
    form: PostForm,
    errors: FormErrors,
    groups: Vec<GroupView>,
    is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<PostView>,
}

fn render<C: Serialize>(template: &str, context: C) -> HttpResponse {
    HttpResponse::Ok().json(Rendered::new(template, context))
}

/// Cache key of one index page, keyed on the raw `?page=` value.
pub fn index_cache_key(page: Option<&str>) -> String {
    format!("index_page:{}", page.unwrap_or(""))
}

/// GET / - every post, newest first. Pages are cached for a short while.
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let key = index_cache_key(query.page.as_deref());

    if let Some(body) = state.cache.get(&key).await {
        tracing::debug!(key = %key, "Serving index page from cache");
        return Ok(HttpResponse::Ok().content_type(ContentType::json()).body(body));
    }

    let page_obj = paginate_posts(&state, PostFilter::All, query.page.as_deref()).await?;
    let rendered = Rendered::new("posts/index.html", FeedContext { page_obj });
    let body = serde_json::to_string(&rendered).map_err(|e| AppError::Internal(e.to_string()))?;

    if let Err(e) = state
        .cache
        .set(&key, &body, Some(state.index_cache_ttl))
        .await
    {
        tracing::warn!(key = %key, error = %e, "Failed to cache index page");
    }

    Ok(HttpResponse::Ok().content_type(ContentType::json()).body(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("Group", &slug))?;

    let page_obj =
        paginate_posts(&state, PostFilter::Group(group.id), query.page.as_deref()).await?;

    Ok(render(
        "posts/group_list.html",
        GroupContext {
            group: group_view(&group),
            page_obj,
        },
    ))
}

/// GET /profile/{username}/
pub async fn profile(
    identity: OptionalIdentity,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    let page_obj =
        paginate_posts(&state, PostFilter::Author(author.id), query.page.as_deref()).await?;

    let following = match identity.0 {
        Some(me) => state.follows.exists(me.user_id, author.id).await?,
        None => false,
    };

    Ok(render(
        "posts/profile.html",
        ProfileContext {
            author: author_view(&author),
            page_obj,
            following,
        },
    ))
}

async fn get_post(state: &AppState, post_id: Uuid) -> AppResult<Post> {
    state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id).into())
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = get_post(&state, path.into_inner()).await?;
    let post_id = post.id;

    let comments = state.comments.list_for_post(post_id).await?;
    let likes = state.reactions.count_for_post(ReactionKind::Like, post_id).await?;
    let dislikes = state.reactions.count_for_post(ReactionKind::Dislike, post_id).await?;

    Ok(render(
        "posts/post_detail.html",
        DetailContext {
            post: post_view(&state, post).await?,
            comments: comment_views(&state, comments).await?,
            form: CommentForm::default(),
            likes,
            dislikes,
        },
    ))
}

async fn render_post_form(
    state: &AppState,
    form: PostForm,
    errors: FormErrors,
    post: Option<Post>,
) -> AppResult<HttpResponse> {
    let groups = state.groups.list().await?;
    let post = match post {
        Some(post) => Some(post_view(state, post).await?),
        None => None,
    };

    Ok(render(
        "posts/create_post.html",
        PostFormContext {
            form,
            errors,
            groups: groups.iter().map(group_view).collect(),
            is_edit: post.is_some(),
            post,
        },
    ))
}

async fn store_image(state: &AppState, image: Option<ImageUpload>) -> AppResult<Option<String>> {
    match image {
        Some(upload) => {
            let path = state
                .media
                .save(UPLOAD_TO, upload.format.extension(), &upload.bytes)
                .await?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

/// Best-effort removal of a stored image; failures are only logged.
async fn remove_image(state: &AppState, path: &str) {
    if let Err(e) = state.media.delete(path).await {
        tracing::warn!(path = %path, error = %e, "Failed to remove image");
    }
}

/// GET /create/
pub async fn post_create_form(
    _identity: Identity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    render_post_form(&state, PostForm::default(), FormErrors::new(), None).await
}

/// POST /create/ - publish, then go to the author's profile.
pub async fn post_create(
    identity: Identity,
    state: web::Data<AppState>,
    form: Option<web::Form<PostForm>>,
) -> AppResult<HttpResponse> {
    let form = submitted(form);
    let groups = state.groups.list().await?;

    let valid = match form.clean(&groups) {
        Ok(valid) => valid,
        Err(errors) => return render_post_form(&state, form, errors, None).await,
    };

    let image = store_image(&state, valid.image).await?;
    let stored = image.clone();
    let post = match state
        .posts
        .create(Post::new(identity.user_id, valid.text, valid.group_id, image))
        .await
    {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = stored {
                remove_image(&state, &path).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(post_id = %post.id, author = %identity.username, "Post created");

    Ok(redirect(profile_url(&identity.username)))
}

/// GET /posts/{post_id}/edit/ - only the author may edit.
pub async fn post_edit_form(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = get_post(&state, path.into_inner()).await?;
    if !post.is_authored_by(identity.user_id) {
        return Ok(redirect(post_url(post.id)));
    }

    let form = PostForm::from_values(&post.text, post.group_id);
    render_post_form(&state, form, FormErrors::new(), Some(post)).await
}

/// POST /posts/{post_id}/edit/ - `pub_date` is left untouched.
pub async fn post_edit(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: Option<web::Form<PostForm>>,
) -> AppResult<HttpResponse> {
    let mut post = get_post(&state, path.into_inner()).await?;
    if !post.is_authored_by(identity.user_id) {
        return Ok(redirect(post_url(post.id)));
    }

    let form = submitted(form);
    let groups = state.groups.list().await?;

    let valid = match form.clean(&groups) {
        Ok(valid) => valid,
        Err(errors) => return render_post_form(&state, form, errors, Some(post)).await,
    };

    let image = store_image(&state, valid.image).await?;
    let stored = image.clone();
    let replaced = image.as_ref().and(post.image.clone());
    post.edit(valid.text, valid.group_id, image);
    let post = match state.posts.update(post).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = stored {
                remove_image(&state, &path).await;
            }
            return Err(e.into());
        }
    };

    if let Some(old) = replaced {
        remove_image(&state, &old).await;
    }

    tracing::info!(post_id = %post.id, author = %identity.username, "Post edited");

    Ok(redirect(post_url(post.id)))
}

/// POST /posts/{post_id}/comment/ - invalid comments are dropped without feedback.
pub async fn add_comment(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: Option<web::Form<CommentForm>>,
) -> AppResult<HttpResponse> {
    let post = get_post(&state, path.into_inner()).await?;

    match submitted(form).clean() {
        Ok(text) => {
            let comment = state
                .comments
                .create(Comment::new(post.id, identity.user_id, text))
                .await?;
            tracing::info!(
                post_id = %post.id,
                comment_id = %comment.id,
                author = %identity.username,
                "Comment added"
            );
        }
        Err(errors) => {
            tracing::debug!(post_id = %post.id, ?errors, "Comment rejected");
        }
    }

    Ok(redirect(post_url(post.id)))
}

/// GET /follow/ - posts by the authors the user follows.
pub async fn follow_index(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page_obj = paginate_posts(
        &state,
        PostFilter::FollowedBy(identity.user_id),
        query.page.as_deref(),
    )
    .await?;

    Ok(render("posts/index.html", FeedContext { page_obj }))
}
