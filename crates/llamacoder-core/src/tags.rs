//! Comma-separated tag lists as stored on a chat.

/// Splits a stored tag string into trimmed, non-empty tags.
pub fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Joins tags back into the stored representation, dropping blanks.
pub fn stringify_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|tag| tag.as_ref().trim())
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Adds `tag` unless it is already present.
pub fn add_tag(tags: Option<&str>, tag: &str) -> String {
    let mut parsed = parse_tags(tags);
    let tag = tag.trim();
    if !parsed.iter().any(|existing| existing == tag) {
        parsed.push(tag.to_string());
    }
    stringify_tags(&parsed)
}

pub fn remove_tag(tags: Option<&str>, tag: &str) -> String {
    let parsed = parse_tags(tags);
    let kept: Vec<&String> = parsed.iter().filter(|existing| *existing != tag).collect();
    stringify_tags(&kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_drops_blanks() {
        assert_eq!(parse_tags(None), Vec::<String>::new());
        assert_eq!(parse_tags(Some("")), Vec::<String>::new());
        assert_eq!(parse_tags(Some(" a, ,b ,")), vec!["a", "b"]);
    }

    #[test]
    fn add_is_idempotent() {
        let once = add_tag(Some("ui"), "game");
        assert_eq!(once, "ui,game");
        assert_eq!(add_tag(Some(&once), "game"), "ui,game");
        assert_eq!(add_tag(None, "first"), "first");
    }

    #[test]
    fn remove_keeps_other_tags() {
        assert_eq!(remove_tag(Some("a,b,c"), "b"), "a,c");
        assert_eq!(remove_tag(Some("a"), "a"), "");
        assert_eq!(remove_tag(None, "a"), "");
    }
}
