/// Fallback slug for titles with no ASCII alphanumerics.
pub const FALLBACK_SLUG: &str = "recipe";

/// Maximum slug length in bytes, before any collision suffix.
pub const MAX_SLUG_LEN: usize = 80;

/// Turn a title into a URL slug: lower-case ASCII alphanumerics separated by
/// single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Pick the first free slug among `base`, `base-2`, `base-3`, ...
///
/// `taken` holds every existing slug that starts with `base`.
pub fn resolve_collision(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.iter().any(|s| s == candidate))
        .unwrap_or_else(|| base.to_string())
}
