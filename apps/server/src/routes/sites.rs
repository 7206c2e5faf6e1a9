use actix_web::{HttpResponse, get, web};

use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route enabled_members,
    route member_by_domain,
}

/// Enabled members, dead ends included
#[get("/sites/all")]
pub async fn enabled_members(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let members = state.directory.list_by_status(|m| m.enabled).await?;
    Ok(HttpResponse::Ok().json(members))
}

#[get("/sites/name/{domain}")]
pub async fn member_by_domain(
    state: web::Data<AppState>,
    domain: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let domain = domain.into_inner();
    match state.store().find_by_domain(&domain).await? {
        Some(member) if member.enabled => Ok(HttpResponse::Ok().json(member)),
        _ => Err(ApiError::DomainNotFound(domain)),
    }
}
