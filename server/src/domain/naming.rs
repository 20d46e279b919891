//! Name rules shared by prompts and scenarios

use std::future::Future;

use super::error::{DomainError, DomainResult};
use crate::core::constants::{DUPLICATE_NAME_MAX_PROBES, RESOURCE_NAME_MAX_LEN};
use crate::data::DataError;

/// Trimmed, non-empty name within the length limit
pub fn validate_name(kind: &str, name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{} name is required", kind)));
    }
    if name.chars().count() > RESOURCE_NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "{} name must be at most {} characters",
            kind, RESOURCE_NAME_MAX_LEN
        )));
    }
    Ok(name.to_string())
}

/// `"{name} (Copy)"` for the first probe, `"{name} (Copy N)"` after that
pub fn copy_name(name: &str, probe: u32) -> String {
    if probe <= 1 {
        format!("{} (Copy)", name)
    } else {
        format!("{} (Copy {})", name, probe)
    }
}

/// First copy name for which `exists` reports false
pub async fn free_copy_name<F, Fut>(name: &str, mut exists: F) -> DomainResult<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, DataError>>,
{
    for probe in 1..=DUPLICATE_NAME_MAX_PROBES {
        let candidate = copy_name(name, probe);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    Err(DomainError::duplicate(format!(
        "Too many copies of '{}'",
        name
    )))
}

/// Map a unique-constraint race on insert/update to `Duplicate`
pub fn duplicate_on_conflict(kind: &str, name: &str) -> impl FnOnce(DataError) -> DomainError {
    let message = format!("A {} named '{}' already exists", kind, name);
    move |e| {
        if e.is_conflict() {
            DomainError::Duplicate(message)
        } else {
            e.into()
        }
    }
}
