use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::posts::{
    CreatePostInput, PostIdInput, PostSlugInput, PostTitleInput, UpdatePostInput,
};

use super::error::ApiError;
use super::models::PostUpdateRequest;
use super::state::ApiState;

fn path_to_api(err: PathRejection) -> ApiError {
    ApiError::invalid_input(err.body_text())
}

fn json_to_api(err: JsonRejection) -> ApiError {
    ApiError::bad_request("Malformed request body", Some(err.body_text()))
}

pub async fn create_post(
    State(state): State<ApiState>,
    payload: Result<Json<CreatePostInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload.map_err(json_to_api)?;
    let post = state.posts.create(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.posts.find_all().await?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_to_api)?;
    let post = state.posts.find_by_id(PostIdInput { id }).await?;
    Ok(Json(post))
}

pub async fn get_post_by_title(
    State(state): State<ApiState>,
    title: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(title) = title.map_err(path_to_api)?;
    let post = state.posts.find_by_title(PostTitleInput { title }).await?;
    Ok(Json(post))
}

pub async fn get_post_by_slug(
    State(state): State<ApiState>,
    slug: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(slug) = slug.map_err(path_to_api)?;
    let post = state.posts.find_by_slug(PostSlugInput { slug }).await?;
    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_to_api)?;
    let Json(payload) = payload.map_err(json_to_api)?;

    let post = state
        .posts
        .update(UpdatePostInput {
            id,
            title: payload.title,
            slug: payload.slug,
            content: payload.content,
        })
        .await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_to_api)?;
    state.posts.delete(PostIdInput { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}
