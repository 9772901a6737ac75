use crate::{
    auth::AuthenticatedPrincipal, error::AppError, models::TaskInput, query::TaskQueryParams,
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;

/// Retrieves one page of tasks matching the query.
///
/// Every filter is optional; blank values and `all` impose no constraint.
///
/// ## Query Parameters:
/// - `search`: Case-insensitive substring of title, description or a tag.
/// - `status`: `pending`, `in-progress` or `completed`.
/// - `priority`: `low`, `medium` or `high`.
/// - `category`, `tag`: Exact match.
/// - `due_from`, `due_to`: Inclusive due-date bounds, RFC 3339 or `YYYY-MM-DD`.
/// - `sort`: `created_at` (default), `updated_at`, `due_date`, `priority`, `status`, `title`.
/// - `order`: `asc` or `desc` (default).
/// - `page`, `page_size`: 1-based page and page size.
///
/// ## Responses:
/// - `200 OK`: A `PageResult`.
/// - `401 Unauthorized`: No accepted credentials.
/// - `422 Unprocessable Entity`: Unparsable dates, inverted date range or bad paging values.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    query_params: web::Query<TaskQueryParams>,
    _principal: AuthenticatedPrincipal,
) -> Result<impl Responder, AppError> {
    let page = state.tasks.list(&query_params).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Creates a new task.
///
/// ## Request Body:
/// A JSON object matching `TaskInput`. Only `title` is required. `tags` may be an
/// array or a comma-separated string.
///
/// ## Responses:
/// - `201 Created`: The new `Task`.
/// - `400 Bad Request`: The body is not valid JSON for a task.
/// - `422 Unprocessable Entity`: Input validation failed (e.g. blank title).
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<TaskInput>,
    _principal: AuthenticatedPrincipal,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.create(task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: The `Task`.
/// - `404 Not Found`: No task with this ID.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    _principal: AuthenticatedPrincipal,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.get(task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Replaces the editable fields of a task.
///
/// The status only changes when the body names one.
///
/// ## Responses:
/// - `200 OK`: The updated `Task`.
/// - `404 Not Found`: No task with this ID.
/// - `422 Unprocessable Entity`: Input validation failed.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
    _principal: AuthenticatedPrincipal,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .update(task_id.into_inner(), task_data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Flips a task between completed and pending.
#[post("/{id}/toggle")]
pub async fn toggle_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    _principal: AuthenticatedPrincipal,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.toggle(task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task.
///
/// ## Responses:
/// - `204 No Content`: The task was deleted.
/// - `404 Not Found`: No task with this ID.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    _principal: AuthenticatedPrincipal,
) -> Result<impl Responder, AppError> {
    state.tasks.delete(task_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
