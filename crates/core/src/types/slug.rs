//! URL slugs for catalog entities.

/// Turn a display name into a URL slug.
///
/// Keeps ASCII alphanumerics (lowercased), collapses every other run of
/// characters into a single `-`, and trims dashes from both ends.
///
/// ```
/// use lumen_core::slugify;
///
/// assert_eq!(slugify("Edison Bulb, 60W (Warm)"), "edison-bulb-60w-warm");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Pendant Lights"), "pendant-lights");
        assert_eq!(slugify("  --LED__Strip--  "), "led-strip");
        assert_eq!(slugify("Café Lamp"), "caf-lamp");
        assert_eq!(slugify("!!!"), "");
    }
}
