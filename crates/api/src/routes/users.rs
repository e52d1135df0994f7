//! User directory endpoints, served through the read-through cache.
//!
//! Reads populate the cache lazily with the well-known keys and TTLs;
//! the mutation writes the store first, then invalidates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use cache::{get_or_set, keys};
use common::UserId;
use domain::{Capability, Role, User};
use serde::Deserialize;
use store::{Store, StoreError};

use crate::error::ApiError;
use crate::routes::{AppState, actor_from_headers, require};

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub role: Role,
    pub phone: String,
}

/// GET /users — all users (cached).
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<User>>, ApiError> {
    let store = &state.store;
    let users = get_or_set(state.cache.as_ref(), keys::USERS_ALL, keys::LIST_TTL, || {
        store.list_users()
    })
    .await?;
    Ok(Json(users))
}

/// GET /users/shippers — delivery staff (cached).
#[tracing::instrument(skip(state))]
pub async fn shippers<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<User>>, ApiError> {
    let store = &state.store;
    let users = get_or_set(
        state.cache.as_ref(),
        keys::USERS_SHIPPERS,
        keys::LIST_TTL,
        || store.list_shippers(),
    )
    .await?;
    Ok(Json(users))
}

/// GET /users/role/{role} — users holding one role (cached).
#[tracing::instrument(skip(state))]
pub async fn by_role<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(role): Path<String>,
) -> Result<Json<Vec<User>>, ApiError> {
    let role: Role = role.parse().map_err(|e: String| ApiError::BadRequest(e))?;

    let store = &state.store;
    let users = get_or_set(
        state.cache.as_ref(),
        &keys::users_by_role(role.as_str()),
        keys::LIST_TTL,
        || async move {
            let users = store.list_users().await?;
            Ok::<_, StoreError>(users.into_iter().filter(|u| u.role == role).collect::<Vec<_>>())
        },
    )
    .await?;
    Ok(Json(users))
}

/// GET /users/{id} — one user (cached).
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user_id = UserId::new(id);
    let store = &state.store;
    let user = get_or_set(
        state.cache.as_ref(),
        &keys::user(id),
        keys::ENTITY_TTL,
        || async move {
            store
                .get_user(user_id)
                .await?
                .ok_or(StoreError::UserNotFound(user_id))
        },
    )
    .await?;
    Ok(Json(user))
}

/// PUT /users/{id} — update a user; store first, then invalidate.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    require(actor, Capability::ManageUsers, "manage users")?;

    let user_id = UserId::new(id);
    let previous = state
        .store
        .get_user(user_id)
        .await?
        .ok_or(StoreError::UserNotFound(user_id))?;

    let updated = state
        .store
        .update_user(user_id, &req.name, req.role, &req.phone)
        .await?;

    // Both the previous and the new role's keys go stale.
    let invalidations =
        keys::user_write_invalidations(id, &[previous.role.as_str(), updated.role.as_str()]);
    state.cache.del_many(&invalidations).await;

    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub role: Role,
    pub phone: String,
}

/// POST /users — create a user and invalidate the list keys.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<(axum::http::StatusCode, Json<User>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    require(actor, Capability::ManageUsers, "manage users")?;

    let user = state
        .store
        .insert_user(&req.name, req.role, &req.phone)
        .await?;

    let invalidations = keys::user_write_invalidations(user.id.value(), &[user.role.as_str()]);
    state.cache.del_many(&invalidations).await;

    Ok((axum::http::StatusCode::CREATED, Json(user)))
}
