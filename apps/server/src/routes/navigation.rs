//! Public ring navigation: the current ring, neighbour lookups and the
//! redirects member sites link to.

use actix_web::http::header::{CACHE_CONTROL, LOCATION, PRAGMA};
use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use webring::Member;

use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route ring_index,
    route next_redirect,
    route prev_redirect,
    route next_member,
    route prev_member,
}

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    source: Option<String>,
}

impl SourceQuery {
    fn source(&self) -> Result<&str, ApiError> {
        self.source
            .as_deref()
            .map(str::trim)
            .filter(|source| !source.is_empty())
            .ok_or(ApiError::MissingParameter("source"))
    }
}

/// Neighbours change as members join, leave or go dead, so never let a
/// browser or proxy cache the hop
fn redirect_to(member: &Member) -> HttpResponse {
    HttpResponse::TemporaryRedirect()
        .insert_header((LOCATION, member.url()))
        .insert_header((CACHE_CONTROL, "no-cache, no-store, must-revalidate"))
        .insert_header((PRAGMA, "no-cache"))
        .finish()
}

/// Eligible members in ring order
#[get("/")]
pub async fn ring_index(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.directory.list_eligible().await?))
}

#[get("/next")]
pub async fn next_redirect(
    state: web::Data<AppState>,
    query: web::Query<SourceQuery>,
) -> Result<HttpResponse, ApiError> {
    let member = state.directory.next(query.source()?).await?;
    Ok(redirect_to(&member))
}

#[get("/prev")]
pub async fn prev_redirect(
    state: web::Data<AppState>,
    query: web::Query<SourceQuery>,
) -> Result<HttpResponse, ApiError> {
    let member = state.directory.previous(query.source()?).await?;
    Ok(redirect_to(&member))
}

#[get("/sites/next/{domain}")]
pub async fn next_member(
    state: web::Data<AppState>,
    domain: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.directory.next(&domain).await?))
}

#[get("/sites/prev/{domain}")]
pub async fn prev_member(
    state: web::Data<AppState>,
    domain: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.directory.previous(&domain).await?))
}
