//! Staff-only change lists over every table.
//!
//! Lists are 100 rows a page with an optional `q` search; empty cells read
//! `-empty-`. Non-staff users get 403.

use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use yatube_core::DomainError;
use yatube_core::domain::{Group, ReactionKind};
use yatube_core::error::RepoError;
use yatube_core::forms::{FormErrors, GroupForm, PostForm};
use yatube_core::pagination::{Page, Paginator};
use yatube_core::ports::PostSearch;
use yatube_shared::Rendered;

use super::views::{groups_by_id, posts_by_id, redirect, submitted, users_by_id};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const ADMIN_PAGE_SIZE: u64 = 100;
const EMPTY_VALUE: &str = "-empty-";

#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub q: Option<String>,
    /// `today`, `past_7_days`, `this_month` or `this_year`.
    pub pub_date: Option<String>,
    pub page: Option<String>,
}

impl AdminQuery {
    fn search(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
    }
}

#[derive(Serialize)]
struct ChangeList<R> {
    model: &'static str,
    search: Option<String>,
    rows: Page<R>,
}

#[derive(Serialize)]
struct PostRow {
    pk: Uuid,
    text: String,
    pub_date: DateTime<Utc>,
    author: String,
    group: String,
}

#[derive(Serialize)]
struct GroupRow {
    pk: Uuid,
    title: String,
    slug: String,
    description: String,
}

#[derive(Serialize)]
struct CommentRow {
    pk: Uuid,
    text: String,
    post: String,
    author: String,
    created: DateTime<Utc>,
}

#[derive(Serialize)]
struct FollowRow {
    pk: Uuid,
    user: String,
    author: String,
}

#[derive(Serialize)]
struct ReactionRow {
    pk: Uuid,
    post: String,
    user: String,
}

#[derive(Serialize)]
struct GroupFormContext {
    model: &'static str,
    form: GroupForm,
    errors: FormErrors,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostGroupForm {
    #[serde(default)]
    pub group: Option<String>,
}

fn require_staff(identity: &Identity) -> AppResult<()> {
    if identity.is_staff() {
        Ok(())
    } else {
        tracing::debug!(username = %identity.username, "Admin access refused");
        Err(AppError::Forbidden)
    }
}

fn paginate<T>(items: Vec<T>, page: Option<&str>) -> Page<T> {
    let info = Paginator::new(items.len() as u64, ADMIN_PAGE_SIZE).get_page(page);
    let rows = items
        .into_iter()
        .skip(info.offset() as usize)
        .take(info.limit() as usize)
        .collect();
    Page::new(rows, info)
}

fn change_list<R: Serialize>(
    model: &'static str,
    query: &AdminQuery,
    rows: Vec<R>,
) -> HttpResponse {
    HttpResponse::Ok().json(Rendered::new(
        "admin/change_list.html",
        ChangeList {
            model,
            search: query.search(),
            rows: paginate(rows, query.page.as_deref()),
        },
    ))
}

fn cell(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| EMPTY_VALUE.to_string())
}

/// Start of the `pub_date` filter window, `None` for an unknown filter.
fn published_since(filter: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let start = match filter {
        "today" => today,
        "past_7_days" => today.checked_sub_days(Days::new(7))?,
        "this_month" => today.with_day(1)?,
        "this_year" => NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
        _ => return None,
    };
    Some(start.and_hms_opt(0, 0, 0)?.and_utc())
}

async fn usernames(
    state: &AppState,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, String>> {
    Ok(users_by_id(state, ids)
        .await?
        .into_iter()
        .map(|(id, user)| (id, user.username))
        .collect())
}

/// Posts shown by their display string.
async fn post_labels(
    state: &AppState,
    ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, String>> {
    Ok(posts_by_id(state, ids)
        .await?
        .into_iter()
        .map(|(id, post)| (id, post.to_string()))
        .collect())
}

/// GET /admin/posts/
pub async fn posts(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AdminQuery>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let published_since = match query.pub_date.as_deref() {
        None | Some("") => None,
        Some(filter) => Some(published_since(filter, Utc::now()).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown pub_date filter: {filter}"))
        })?),
    };

    let posts = state
        .posts
        .search(&PostSearch {
            text: query.search(),
            published_since,
        })
        .await?;

    let authors = usernames(&state, posts.iter().map(|p| p.author_id)).await?;
    let groups = groups_by_id(&state, posts.iter().filter_map(|p| p.group_id)).await?;

    let rows = posts
        .into_iter()
        .map(|post| PostRow {
            pk: post.id,
            author: cell(authors.get(&post.author_id).cloned()),
            group: cell(
                post.group_id
                    .and_then(|id| groups.get(&id))
                    .map(|g| g.title.clone()),
            ),
            text: post.text,
            pub_date: post.pub_date,
        })
        .collect();

    Ok(change_list("post", &query, rows))
}

/// POST /admin/posts/{post_id}/ - change a post's group in place; blank clears it.
pub async fn update_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Form<PostGroupForm>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let post_id = path.into_inner();
    let mut post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id))?;

    let groups = state.groups.list().await?;
    let group_id = PostForm {
        text: post.text.clone(),
        group: form.into_inner().group,
        image: None,
    }
    .clean(&groups)
    .map_err(|errors| AppError::BadRequest(errors.get("group").join(" ")))?
    .group_id;

    post.group_id = group_id;
    state.posts.update(post).await?;

    tracing::info!(%post_id, staff = %identity.username, "Post group changed");

    Ok(redirect("/admin/posts/"))
}

/// GET /admin/groups/
pub async fn groups(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AdminQuery>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let groups = match query.search() {
        Some(needle) => state.groups.search(&needle).await?,
        None => state.groups.list().await?,
    };

    let rows = groups
        .into_iter()
        .map(|g| GroupRow {
            pk: g.id,
            title: g.title,
            slug: g.slug,
            description: cell(Some(g.description)),
        })
        .collect();

    Ok(change_list("group", &query, rows))
}

fn group_form_page(form: GroupForm, errors: FormErrors) -> HttpResponse {
    HttpResponse::Ok().json(Rendered::new(
        "admin/change_form.html",
        GroupFormContext {
            model: "group",
            form,
            errors,
        },
    ))
}

/// POST /admin/groups/ - the slug is prepopulated from the title when blank.
pub async fn create_group(
    identity: Identity,
    state: web::Data<AppState>,
    form: Option<web::Form<GroupForm>>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let form = submitted(form);
    let valid = match form.clean() {
        Ok(valid) => valid,
        Err(errors) => return Ok(group_form_page(form, errors)),
    };

    let duplicate_slug = || {
        let mut errors = FormErrors::new();
        errors.add("slug", "Group with this Slug already exists.");
        errors
    };

    if state.groups.find_by_slug(&valid.slug).await?.is_some() {
        return Ok(group_form_page(form, duplicate_slug()));
    }

    let group = Group::new(valid.title, valid.slug, valid.description);
    match state.groups.create(group).await {
        Ok(group) => {
            tracing::info!(slug = %group.slug, staff = %identity.username, "Group created");
            Ok(redirect("/admin/groups/"))
        }
        Err(RepoError::Constraint(_)) => Ok(group_form_page(form, duplicate_slug())),
        Err(e) => Err(e.into()),
    }
}

/// GET /admin/comments/
pub async fn comments(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AdminQuery>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let comments = state
        .comments
        .search(query.search().as_deref().unwrap_or(""))
        .await?;

    let authors = usernames(&state, comments.iter().map(|c| c.author_id)).await?;
    let posts = post_labels(&state, comments.iter().map(|c| c.post_id)).await?;

    let rows = comments
        .into_iter()
        .map(|c| CommentRow {
            pk: c.id,
            post: cell(posts.get(&c.post_id).cloned()),
            author: cell(authors.get(&c.author_id).cloned()),
            text: c.text,
            created: c.created,
        })
        .collect();

    Ok(change_list("comment", &query, rows))
}

/// GET /admin/follows/
pub async fn follows(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AdminQuery>,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let follows = state.follows.list().await?;
    let names = usernames(
        &state,
        follows.iter().flat_map(|f| [f.user_id, f.author_id]),
    )
    .await?;

    let rows = follows
        .into_iter()
        .map(|f| FollowRow {
            pk: f.id,
            user: cell(names.get(&f.user_id).cloned()),
            author: cell(names.get(&f.author_id).cloned()),
        })
        .collect();

    Ok(change_list("follow", &query, rows))
}

async fn reactions(
    identity: Identity,
    state: &AppState,
    query: &AdminQuery,
    kind: ReactionKind,
) -> AppResult<HttpResponse> {
    require_staff(&identity)?;

    let reactions = state.reactions.list(kind).await?;
    let users = usernames(state, reactions.iter().map(|r| r.user_id)).await?;
    let posts = post_labels(state, reactions.iter().map(|r| r.post_id)).await?;

    let rows = reactions
        .into_iter()
        .map(|r| ReactionRow {
            pk: r.id,
            post: cell(posts.get(&r.post_id).cloned()),
            user: cell(users.get(&r.user_id).cloned()),
        })
        .collect();

    let model = match kind {
        ReactionKind::Like => "like",
        ReactionKind::Dislike => "dislike",
    };
    Ok(change_list(model, query, rows))
}

/// GET /admin/likes/
pub async fn likes(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AdminQuery>,
) -> AppResult<HttpResponse> {
    reactions(identity, &state, &query, ReactionKind::Like).await
}

/// GET /admin/dislikes/
pub async fn dislikes(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AdminQuery>,
) -> AppResult<HttpResponse> {
    reactions(identity, &state, &query, ReactionKind::Dislike).await
}
