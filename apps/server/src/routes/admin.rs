//! Administrative API. Every handler takes the [`Admin`] extractor first, so
//! unauthenticated requests are rejected before any payload is read.

use actix_web::{HttpResponse, delete, get, post, put, web};
use tracing::info;
use webring::validation::{validate_new_member, validate_update};
use webring::{Member, MemberId, MemberUpdate, NewMember};

use crate::auth::Admin;
use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route create_member,
    route force_recheck,
    route member_by_id,
    route disabled_members,
    route dead_end_members,
    route all_members,
    route enable_member,
    route disable_member,
    route update_member,
    route delete_member,
}

async fn find_member(state: &AppState, id: MemberId) -> Result<Member, ApiError> {
    state.store().find_by_id(id).await?.ok_or(ApiError::MemberNotFound(id))
}

/// Apply `update` to the stored member and persist it when something changed
async fn apply_update(state: &AppState, id: MemberId, update: &MemberUpdate) -> Result<Member, ApiError> {
    let mut member = find_member(state, id).await?;
    if update.apply(&mut member) {
        state.store().update(&member).await?;
        info!(id, domain = %member.domain, "Member updated");
    }
    Ok(member)
}

#[post("/sites")]
pub async fn create_member(
    _: Admin,
    state: web::Data<AppState>,
    body: web::Json<NewMember>,
) -> Result<HttpResponse, ApiError> {
    let member = body.into_inner();
    validate_new_member(&member)?;

    let created = state.store().create(member).await?;
    info!(id = created.id, domain = %created.domain, "Member added");
    Ok(HttpResponse::Created().json(created))
}

/// Run a check pass now, after any pass already in progress
#[post("/sites/force-recheck")]
pub async fn force_recheck(_: Admin, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    info!("Manual check run requested");
    let summary = state.monitor.run_check().await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/sites/id/{id}")]
pub async fn member_by_id(
    _: Admin,
    state: web::Data<AppState>,
    id: web::Path<MemberId>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(find_member(&state, *id).await?))
}

#[get("/sites/disabled")]
pub async fn disabled_members(_: Admin, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.directory.list_by_status(|m| !m.enabled).await?))
}

#[get("/sites/all-dead-end")]
pub async fn dead_end_members(_: Admin, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.directory.list_by_status(|m| m.dead_end).await?))
}

#[get("/sites/all-plus-disabled")]
pub async fn all_members(_: Admin, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.directory.list_all().await?))
}

#[put("/sites/id/{id}/enable")]
pub async fn enable_member(
    _: Admin,
    state: web::Data<AppState>,
    id: web::Path<MemberId>,
) -> Result<HttpResponse, ApiError> {
    let member = apply_update(&state, *id, &MemberUpdate::set_enabled(true)).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[put("/sites/id/{id}/disable")]
pub async fn disable_member(
    _: Admin,
    state: web::Data<AppState>,
    id: web::Path<MemberId>,
) -> Result<HttpResponse, ApiError> {
    let member = apply_update(&state, *id, &MemberUpdate::set_enabled(false)).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[put("/sites/id/{id}/update")]
pub async fn update_member(
    _: Admin,
    state: web::Data<AppState>,
    id: web::Path<MemberId>,
    body: web::Json<MemberUpdate>,
) -> Result<HttpResponse, ApiError> {
    validate_update(&body)?;
    let member = apply_update(&state, *id, &body).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[delete("/sites/id/{id}")]
pub async fn delete_member(
    _: Admin,
    state: web::Data<AppState>,
    id: web::Path<MemberId>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if !state.store().delete(id).await? {
        return Err(ApiError::MemberNotFound(id));
    }

    info!(id, "Member removed");
    Ok(HttpResponse::NoContent().finish())
}
