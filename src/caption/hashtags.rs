/// Hashtags for a topic name: one per word, acronyms kept as they are.
///
/// `"EUR USD"` -> `["#EUR", "#USD"]`, `"near-earth objects"` ->
/// `["#Near", "#Earth", "#Objects"]`.
pub fn topic_hashtags(display_name: &str) -> Vec<String> {
    display_name
        .split(|c: char| c.is_whitespace() || c == '/' || c == '-')
        .filter_map(normalize_token)
        .map(|token| format!("#{}", token))
        .collect()
}

/// Topic tags followed by the source tag and the domain tag.
///
/// Topic tags are kept as written, repeats included. The source and domain
/// tags are skipped when the line already carries them.
pub fn hashtag_line(display_name: &str, source_tag: &str, domain_tag: &str) -> String {
    let mut tags = topic_hashtags(display_name);
    for tag in [source_tag, domain_tag] {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags.join(" ")
}

fn normalize_token(raw: &str) -> Option<String> {
    let token: String = raw.chars().filter(|c| c.is_alphanumeric()).collect();
    if token.is_empty() {
        return None;
    }
    if is_acronym(&token) {
        return Some(token);
    }
    let mut chars = token.chars();
    let first = chars.next()?;
    Some(
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    )
}

fn is_acronym(token: &str) -> bool {
    let mut letters = token.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}
