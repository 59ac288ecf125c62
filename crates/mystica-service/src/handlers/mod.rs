//! API handlers.

pub mod balances;
pub mod health;
pub mod loot;
pub mod rewards;

use std::str::FromStr;

use crate::error::ApiError;

/// Parse a path or body identifier, mapping failures to 400.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid {what} '{raw}': {e}")))
}
