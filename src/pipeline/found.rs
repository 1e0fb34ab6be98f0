use crate::error::AppError;

fn not_found(id: i64, resource: &str) -> AppError {
    AppError::NotFound {
        resource: resource.to_string(),
        id,
    }
}

/// Turns a zero-row lookup or mutation into a not-found failure.
pub fn check_entity_found(id: i64, affected: u64, resource: &str) -> Result<(), AppError> {
    if affected == 0 {
        return Err(not_found(id, resource));
    }
    Ok(())
}

/// Single-row lookup form: a missing row counts as zero affected.
pub fn require_found<T>(id: i64, row: Option<T>, resource: &str) -> Result<T, AppError> {
    row.ok_or_else(|| not_found(id, resource))
}
