use std::collections::HashSet;

/// Strips all HTML tags from a string, leaving only the plain text content.
/// Used for titles, names, quotes and other plain-text admin inputs.
pub fn strip_all_html(input: &str) -> String {
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

/// Sanitizes an admin-entered HTML fragment down to a safe subset of tags
/// and attributes. Scripting capabilities (`onclick`, `onerror`, ...) are
/// removed entirely.
pub fn sanitize_html_fragment(input: &str) -> String {
    let tags_to_allow = [
        "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "em", "p", "br", "a", "ul", "ol",
        "li", "blockquote", "hr", "img", "span", "div",
    ];
    let safe_tags = tags_to_allow.iter().cloned().collect::<HashSet<_>>();

    let safe_attributes = ["src", "href", "alt", "title", "class", "width", "height"];
    let generic_attributes = safe_attributes.iter().cloned().collect::<HashSet<_>>();

    ammonia::Builder::new()
        .tags(safe_tags)
        .generic_attributes(generic_attributes)
        .link_rel(Some("nofollow ugc"))
        .clean(input)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_removes_tags_but_keeps_text() {
        assert_eq!(
            strip_all_html("<b>Personal</b> Training<script>alert(1)</script>"),
            "Personal Training"
        );
    }

    #[test]
    fn fragment_keeps_safe_tags_and_drops_handlers() {
        let cleaned = sanitize_html_fragment("<p onclick=\"x()\">Hi <em>there</em></p>");
        assert!(cleaned.contains("<p>"));
        assert!(cleaned.contains("<em>there</em>"));
        assert!(!cleaned.contains("onclick"));
    }
}
