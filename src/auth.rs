use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Identity extractor. Verification happens upstream (gateway or reverse
/// proxy); this server trusts the forwarded identifier as-is and only
/// requires that it is present and non-empty.
#[derive(Debug, Clone)]
pub struct VerifiedUser(pub String);

impl FromRequest for VerifiedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty());

        ready(match user_id {
            Some(id) => Ok(VerifiedUser(id.to_string())),
            None => Err(AppError::Unauthorized(format!(
                "Missing or empty {} header",
                USER_ID_HEADER
            ))),
        })
    }
}
