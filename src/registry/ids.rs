use crate::error::{Error, Result};

const MAX_BRAND_ID_LEN: usize = 64;

fn is_valid_id_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

/// Brand ids become directory names, so the character set is restricted to
/// lowercase ASCII alphanumerics, hyphens, and underscores.
pub fn validate_brand_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidBrandId("brand id cannot be empty".into()));
    }
    if id.len() > MAX_BRAND_ID_LEN {
        return Err(Error::InvalidBrandId(format!(
            "brand id cannot exceed {MAX_BRAND_ID_LEN} characters"
        )));
    }
    if !id.chars().all(is_valid_id_char) {
        return Err(Error::InvalidBrandId(format!(
            "brand id '{id}' may only contain lowercase letters, digits, hyphens, and underscores"
        )));
    }
    if id.starts_with('-') || id.starts_with('_') {
        return Err(Error::InvalidBrandId(
            "brand id cannot start with a hyphen or underscore".into(),
        ));
    }
    Ok(())
}

/// Derives a brand id from a display name: alphanumeric runs lowercased and
/// joined by single hyphens, truncated to the id length limit.
#[must_use]
pub fn slugify(display_name: &str) -> String {
    let mut slug = String::with_capacity(display_name.len());
    let mut pending_hyphen = false;

    for c in display_name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug.truncate(MAX_BRAND_ID_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_safe_ids() {
        assert!(validate_brand_id("acme").is_ok());
        assert!(validate_brand_id("acme-co").is_ok());
        assert!(validate_brand_id("acme_co2").is_ok());
    }

    #[test]
    fn test_validate_rejects_unsafe_ids() {
        assert!(validate_brand_id("").is_err());
        assert!(validate_brand_id("Acme").is_err());
        assert!(validate_brand_id("acme co").is_err());
        assert!(validate_brand_id("../etc").is_err());
        assert!(validate_brand_id("-acme").is_err());
        assert!(validate_brand_id("_acme").is_err());
        assert!(validate_brand_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Co"), "acme-co");
        assert_eq!(slugify("  Acme  &  Sons!  "), "acme-sons");
        assert_eq!(slugify("ACME"), "acme");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_slugify_output_is_valid() {
        for name in ["Acme Co", "A,B,C", "x", "Brand 2000"] {
            validate_brand_id(&slugify(name)).unwrap();
        }
    }
}
