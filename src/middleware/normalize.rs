use uuid::Uuid;

/// Placeholder substituted for dynamic path segments.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Collapse UUID and integer segments into `{id}` so every concrete URL
/// of a route lands on one stats key.
///
///   /projects/42/risks            → /projects/{id}/risks
///   /projects/123e4567-e89b-...   → /projects/{id}
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_dynamic(segment) {
                ID_PLACEHOLDER
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_dynamic(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    // Hyphenated form only; 32-char hex blobs stay literal
    segment.len() == 36 && Uuid::try_parse(segment).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_collapse_to_one_key() {
        let a = normalize_path("/projects/123e4567-e89b-12d3-a456-426614174000");
        let b = normalize_path("/projects/987FCDEB-51A2-4bc3-9d2e-0f1a2b3c4d5e");
        assert_eq!(a, "/projects/{id}");
        assert_eq!(a, b);
    }

    #[test]
    fn integers_collapse_to_same_placeholder() {
        assert_eq!(normalize_path("/projects/42"), "/projects/{id}");
        assert_eq!(normalize_path("/projects/99"), "/projects/{id}");
        assert_eq!(
            normalize_path("/portfolios/7/projects/8/risks"),
            "/portfolios/{id}/projects/{id}/risks"
        );
    }

    #[test]
    fn static_segments_untouched() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/v2/reports"), "/v2/reports");
        assert_eq!(normalize_path("/projects/{id}"), "/projects/{id}");
        assert_eq!(normalize_path("/users/-12"), "/users/-12");
        assert_eq!(
            normalize_path("/blobs/123e4567e89b12d3a456426614174000"),
            "/blobs/123e4567e89b12d3a456426614174000"
        );
    }

    #[test]
    fn trailing_slash_preserved() {
        assert_eq!(normalize_path("/projects/42/"), "/projects/{id}/");
    }
}
