//! SQLite persistence. Every public operation runs in a single transaction
//! and returns the hydrated record, or `NotFound` / `Conflict`.

pub mod api_keys;
pub mod inventory;
pub mod restocks;
pub mod roles;
pub mod schedules;
pub mod users;

use crate::authz::Scope;
use crate::errors::AppError;

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> AppError {
    let is_unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        AppError::conflict(message)
    } else {
        AppError::Database(err)
    }
}

/// Parse stored scope names, skipping ones this build no longer knows.
pub(crate) fn parse_scopes<I>(names: I) -> Vec<Scope>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .filter_map(|name| match name.parse::<Scope>() {
            Ok(scope) => Some(scope),
            Err(_) => {
                tracing::warn!(scope = %name, "ignoring unknown stored scope");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scopes_are_dropped() {
        let scopes = parse_scopes(vec!["get_shifts".to_string(), "fly".to_string()]);
        assert_eq!(scopes, vec![Scope::GetShifts]);
    }
}
