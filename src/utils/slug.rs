//! Anchor slugs for headings.

/// Convert heading text to a URL fragment.
///
/// Non-ASCII text is transliterated first, then every run of characters
/// outside `[a-z0-9]` collapses into a single `-`.
pub fn slugify_anchor(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
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
