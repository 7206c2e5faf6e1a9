use std::future::{Ready, ready};

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};

use crate::error::ApiError;
use crate::state::AppState;

/// Marker extractor for admin handlers.
///
/// Resolves only when the request carries `Authorization: Bearer <api_token>`.
pub struct Admin;

impl FromRequest for Admin {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let expected = req.app_data::<web::Data<AppState>>().map(|state| state.api_token.as_str());
        let provided = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        ready(match (expected, provided) {
            (Some(expected), Some(provided)) if tokens_match(expected, provided) => Ok(Admin),
            _ => {
                tracing::debug!(path = req.path(), "Rejected admin request");
                Err(ApiError::Unauthorized)
            }
        })
    }
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(expected: &str, provided: &str) -> bool {
    let (expected, provided) = (expected.as_bytes(), provided.as_bytes());
    expected.len() == provided.len()
        && expected.iter().zip(provided).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("secret", "secret"));
        assert!(!tokens_match("secret", "secreT"));
        assert!(!tokens_match("secret", "secret2"));
        assert!(!tokens_match("secret", ""));
    }
}
