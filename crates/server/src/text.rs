use uuid::Uuid;

/// Derives a URL-friendly slug from a board title. Slugs are display sugar
/// and not guaranteed unique.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_dash = true;

    for ch in value.trim().chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() {
            slug.push(lower);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Extracts mentioned user ids from a comment's HTML fragment. The editor
/// marks mentions as `data-id="<uuid>"` attributes.
pub fn extract_mention_ids(html: &str) -> Vec<Uuid> {
    let mut ids = Vec::new();
    let mut rest = html;

    while let Some(start) = rest.find("data-id=\"") {
        rest = &rest[start + "data-id=\"".len()..];
        let Some(end) = rest.find('"') else {
            break;
        };
        if let Ok(id) = Uuid::parse_str(&rest[..end]) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        rest = &rest[end + 1..];
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Sprint 12 -- Backlog!  "), "sprint-12-backlog");
        assert_eq!(slugify("Ops/Infra"), "ops-infra");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn extract_mention_ids_finds_unique_uuids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let html = format!(
            "<p>ping <span data-id=\"{a}\">@ann</span> and <span data-id=\"{b}\">@bo</span> \
             again <span data-id=\"{a}\">@ann</span> <span data-id=\"oops\">bad</span></p>"
        );
        assert_eq!(extract_mention_ids(&html), vec![a, b]);
    }
}
