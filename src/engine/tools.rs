//! URL utilities for collection endpoints.

use reqwest::Url;

use crate::RestError;

/// Relative reference of the id listing below a collection base.
const IDS_REF: &str = "./__ids";

/// Parse a collection base URL, appending `/` so ids join as children rather than siblings.
pub fn normalize_base(base: &str) -> Result<Url, RestError> {
    if base.is_empty() {
        return Err(RestError::Config("baseURL must be provided".to_string()));
    }
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|e| RestError::Config(format!("invalid base URL {base}: {e}")))
}

/// Per-resource URL: the id joined onto the base as a relative reference.
pub fn resource_url(base: &Url, id: &str) -> Result<Url, RestError> {
    base.join(id)
        .map_err(|e| RestError::Config(format!("cannot join id {id} onto {base}: {e}")))
}

/// The `__ids` listing of a collection.
pub fn ids_url(base: &Url) -> Result<Url, RestError> {
    resource_url(base, IDS_REF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_appends_slash() {
        let base = normalize_base("http://h/coll").unwrap();
        assert_eq!(base.as_str(), "http://h/coll/");
    }

    #[test]
    fn test_normalize_keeps_existing_slash() {
        let base = normalize_base("http://h/coll/").unwrap();
        assert_eq!(base.as_str(), "http://h/coll/");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(normalize_base(""), Err(RestError::Config(_))));
    }

    #[test]
    fn test_normalize_rejects_relative() {
        assert!(matches!(
            normalize_base(":http//localhost/endpoint/"),
            Err(RestError::Config(_))
        ));
    }

    #[test]
    fn test_resource_url_joins_id_as_child() {
        let base = normalize_base("http://h/coll").unwrap();
        assert_eq!(
            resource_url(&base, "a").unwrap().as_str(),
            "http://h/coll/a"
        );
        assert_eq!(
            resource_url(&base, "2d3e16e0-61cb-4322-8aff-3b01c59f4daa")
                .unwrap()
                .as_str(),
            "http://h/coll/2d3e16e0-61cb-4322-8aff-3b01c59f4daa"
        );
    }

    #[test]
    fn test_ids_url() {
        let base = normalize_base("http://localhost/endpoint").unwrap();
        assert_eq!(
            ids_url(&base).unwrap().as_str(),
            "http://localhost/endpoint/__ids"
        );
    }
}
