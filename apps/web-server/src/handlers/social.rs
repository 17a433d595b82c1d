//! Follows, likes and dislikes.
//!
//! Every action here is idempotent and ends in a redirect. The existence
//! check only saves a write; the storage unique constraint decides, and a
//! violation means someone else got there first.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use yatube_core::DomainError;
use yatube_core::domain::{Follow, Reaction, ReactionKind, User};
use yatube_core::error::RepoError;

use super::views::{post_url, profile_url, redirect};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

async fn get_author(state: &AppState, username: &str) -> AppResult<User> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", username).into())
}

/// POST /profile/{username}/follow/ - following yourself does nothing.
pub async fn profile_follow(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = get_author(&state, &path).await?;

    let is_self = author.id == identity.user_id;
    if !is_self && !state.follows.exists(identity.user_id, author.id).await? {
        let follow = Follow::new(identity.user_id, author.id);
        match state.follows.create(follow).await {
            Ok(_) => tracing::info!(user = %identity.username, author = %author.username, "Followed"),
            Err(RepoError::Constraint(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(redirect(profile_url(&author.username)))
}

/// POST /profile/{username}/unfollow/
pub async fn profile_unfollow(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = get_author(&state, &path).await?;

    let removed = state
        .follows
        .delete_pair(identity.user_id, author.id)
        .await?;
    if removed > 0 {
        tracing::info!(user = %identity.username, author = %author.username, "Unfollowed");
    }

    Ok(redirect(profile_url(&author.username)))
}

async fn ensure_post(state: &AppState, post_id: Uuid) -> AppResult<()> {
    match state.posts.find_by_id(post_id).await? {
        Some(_) => Ok(()),
        None => Err(DomainError::not_found("Post", post_id).into()),
    }
}

async fn react(
    identity: Identity,
    state: &AppState,
    post_id: Uuid,
    kind: ReactionKind,
) -> AppResult<HttpResponse> {
    ensure_post(state, post_id).await?;

    if !state.reactions.exists(kind, post_id, identity.user_id).await? {
        match state
            .reactions
            .create(Reaction::new(kind, post_id, identity.user_id))
            .await
        {
            Ok(_) => tracing::info!(%post_id, user = %identity.username, %kind, "Reaction added"),
            Err(RepoError::Constraint(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(redirect(post_url(post_id)))
}

async fn unreact(
    identity: Identity,
    state: &AppState,
    post_id: Uuid,
    kind: ReactionKind,
) -> AppResult<HttpResponse> {
    ensure_post(state, post_id).await?;

    let removed = state
        .reactions
        .delete_pair(kind, post_id, identity.user_id)
        .await?;
    if removed > 0 {
        tracing::info!(%post_id, user = %identity.username, %kind, "Reaction removed");
    }

    Ok(redirect(post_url(post_id)))
}

/// GET|POST /posts/{post_id}/like/
pub async fn like_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    react(identity, &state, path.into_inner(), ReactionKind::Like).await
}

/// GET|POST /posts/{post_id}/dislike/
pub async fn dislike_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    react(identity, &state, path.into_inner(), ReactionKind::Dislike).await
}

/// GET|POST /posts/{post_id}/unlike/
pub async fn unlike_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    unreact(identity, &state, path.into_inner(), ReactionKind::Like).await
}

/// GET|POST /posts/{post_id}/undislike/
pub async fn undislike_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    unreact(identity, &state, path.into_inner(), ReactionKind::Dislike).await
}
