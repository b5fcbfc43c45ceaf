//! Identifier normalization for backend references.
//!
//! Commerce backends hand out identifiers in several encodings depending on
//! API generation: plain scalars ("123"), `gid://` URLs
//! ("gid://shopify/ProductVariant/123"), and base64-wrapped `gid://` URLs
//! (legacy SDK ids). Mutation calls need one stable scalar form, so every
//! reference entering the core is normalized to the trailing path segment.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::warn;

use crate::commerce::CommerceError;

/// Normalize a variant or line-item reference to its stable scalar id.
///
/// Accepted forms:
/// - plain scalar (`"123"`, `"li_1"`) - returned unchanged
/// - `gid://` URL - trailing path segment, query string stripped
/// - base64-encoded `gid://` URL - decoded, then as above
///
/// # Errors
///
/// Returns [`CommerceError::IdentifierResolution`] for references that
/// decode to nothing usable (empty, bare `gid://`, undecodable blobs with
/// path separators).
pub fn normalize_reference(reference: &str) -> Result<String, CommerceError> {
    if reference.is_empty() {
        return Err(unresolvable(reference));
    }

    if reference.starts_with("gid://") {
        return trailing_segment(reference).ok_or_else(|| unresolvable(reference));
    }

    // Legacy SDKs base64-wrap the gid form
    if let Ok(bytes) = BASE64.decode(reference)
        && let Ok(decoded) = String::from_utf8(bytes)
        && decoded.starts_with("gid://")
    {
        return trailing_segment(&decoded).ok_or_else(|| unresolvable(reference));
    }

    // A plain scalar has no path structure left to strip
    if reference.contains('/') {
        return Err(unresolvable(reference));
    }

    Ok(reference.to_string())
}

/// Normalize, falling back to the raw reference when resolution fails.
///
/// Used on backend *responses*: a reference we cannot decode is still a
/// stable opaque key, so it is kept verbatim rather than dropped.
pub(crate) fn normalize_or_raw(reference: &str) -> String {
    normalize_reference(reference).unwrap_or_else(|_| {
        warn!(reference, "keeping unnormalizable backend reference verbatim");
        reference.to_string()
    })
}

fn trailing_segment(gid: &str) -> Option<String> {
    let path = gid.split('?').next().unwrap_or(gid);
    let segment = path.rsplit('/').next().unwrap_or("");
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

fn unresolvable(reference: &str) -> CommerceError {
    CommerceError::IdentifierResolution(reference.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_scalar_passes_through() {
        assert_eq!(normalize_reference("123").unwrap(), "123");
        assert_eq!(normalize_reference("li_1").unwrap(), "li_1");
    }

    #[test]
    fn test_gid_url_strips_to_trailing_segment() {
        assert_eq!(
            normalize_reference("gid://shopify/ProductVariant/123").unwrap(),
            "123"
        );
    }

    #[test]
    fn test_gid_query_string_stripped() {
        assert_eq!(
            normalize_reference("gid://shopify/CartLine/abc?cart=Z2lk").unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_base64_wrapped_gid() {
        // base64("gid://shopify/ProductVariant/123")
        let encoded = "Z2lkOi8vc2hvcGlmeS9Qcm9kdWN0VmFyaWFudC8xMjM=";
        assert_eq!(normalize_reference(encoded).unwrap(), "123");
    }

    #[test]
    fn test_empty_reference_rejected() {
        assert!(matches!(
            normalize_reference(""),
            Err(CommerceError::IdentifierResolution(_))
        ));
    }

    #[test]
    fn test_bare_gid_rejected() {
        assert!(matches!(
            normalize_reference("gid://"),
            Err(CommerceError::IdentifierResolution(_))
        ));
        assert!(matches!(
            normalize_reference("gid://shopify/ProductVariant/"),
            Err(CommerceError::IdentifierResolution(_))
        ));
    }

    #[test]
    fn test_pathlike_non_gid_rejected() {
        assert!(matches!(
            normalize_reference("variants/123"),
            Err(CommerceError::IdentifierResolution(_))
        ));
    }

    #[test]
    fn test_normalize_or_raw_keeps_opaque_reference() {
        assert_eq!(normalize_or_raw("variants/123"), "variants/123");
        assert_eq!(normalize_or_raw("gid://shopify/CartLine/xyz"), "xyz");
    }
}
