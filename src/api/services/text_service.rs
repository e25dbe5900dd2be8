//! Short text projections for list views.

/// Collapse whitespace and cut at a word boundary within `limit` characters,
/// appending `…` when anything was removed.
pub fn make_excerpt(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= limit {
        return collapsed;
    }

    let head: String = collapsed.chars().take(limit).collect();
    let head = match head.rfind(' ') {
        Some(cut) => &head[..cut],
        None => head.as_str(),
    };
    format!("{}…", head.trim_end())
}

/// Description preview: texts up to `limit` characters are returned as is,
/// longer ones are cut at the end of the word that crosses the limit.
pub fn short_description(description: &str, limit: usize) -> String {
    let text = description.trim();
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }

    let end = chars[limit..]
        .iter()
        .position(|c| c.is_whitespace())
        .map_or(chars.len(), |offset| limit + offset);
    let head: String = chars[..end].iter().collect();
    format!("{}...", head.trim_end())
}
