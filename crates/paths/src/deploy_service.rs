//! MTA deploy-service v2 API paths
//!
//! All deploy-service resources are scoped to a CF space.

pub const API_PREFIX: &str = "/api/v2";

/// Header the deploy-service uses to pin follow-up requests to the instance
/// that accepted an asynchronous upload
pub const APP_INSTANCE_HEADER: &str = "x-cf-app-instance";

pub fn files(space: &str) -> String {
    format!("{API_PREFIX}/spaces/{space}/files")
}

pub fn files_async(space: &str) -> String {
    format!("{API_PREFIX}/spaces/{space}/files/async")
}

pub fn file_job(space: &str, job: &str) -> String {
    format!("{API_PREFIX}/spaces/{space}/files/jobs/{job}")
}

pub fn operations(space: &str) -> String {
    format!("{API_PREFIX}/spaces/{space}/operations")
}

pub fn operation(space: &str, operation: &str) -> String {
    format!("{API_PREFIX}/spaces/{space}/operations/{operation}")
}

pub fn mta(space: &str, mta: &str) -> String {
    format!("{API_PREFIX}/spaces/{space}/mtas/{mta}")
}

/// Last path segment of a `Location` header
///
/// Used for both `.../files/jobs/<job>` and `.../operations/<operation>`.
pub fn id_from_location(location: &str) -> Option<&str> {
    let id = location
        .split('?')
        .next()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_location() {
        assert_eq!(
            id_from_location("/api/v2/spaces/s1/operations/op-1?embed=messages"),
            Some("op-1")
        );
        assert_eq!(
            id_from_location("https://deploy-service.example.com/api/v2/spaces/s1/files/jobs/j1"),
            Some("j1")
        );
        assert_eq!(id_from_location(""), None);
    }
}
