//! Title derivation from names.

/// Convert a slug (kebab-case or `snake_case`) to title case.
///
/// Replaces `-` and `_` with spaces, then capitalizes the first letter of each word.
///
/// # Examples
///
/// ```
/// use midy_storage::titlecase_from_slug;
///
/// assert_eq!(titlecase_from_slug("setup-guide"), "Setup Guide");
/// assert_eq!(titlecase_from_slug("my_page"), "My Page");
/// ```
#[must_use]
pub fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        capitalize_first_into(word, &mut result);
    }
    result
}

/// Title for a folder or page derived from its last logical segment.
///
/// The root has no segment and is titled "Home".
#[must_use]
pub fn title_from_name(name: &str) -> String {
    match name {
        "" => "Home".to_owned(),
        slug => titlecase_from_slug(slug),
    }
}

/// Capitalize the first character of a word, appending to `buf`.
fn capitalize_first_into(word: &str, buf: &mut String) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        buf.extend(first.to_uppercase());
        buf.push_str(chars.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titlecase_from_slug() {
        assert_eq!(titlecase_from_slug("setup-guide"), "Setup Guide");
        assert_eq!(titlecase_from_slug("my_page"), "My Page");
        assert_eq!(titlecase_from_slug("complex-name_here"), "Complex Name Here");
        assert_eq!(titlecase_from_slug("simple"), "Simple");
        assert_eq!(titlecase_from_slug("--"), "");
    }

    #[test]
    fn test_title_from_name_root() {
        assert_eq!(title_from_name(""), "Home");
        assert_eq!(title_from_name("about-us"), "About Us");
    }
}
