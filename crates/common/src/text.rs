/// Split `text` into pieces of at most `max_chars` characters.
///
/// Splits prefer the last newline, then the last whitespace inside the
/// window, and only cut mid-word when neither exists. Never splits inside a
/// UTF-8 character.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.chars().count() > max_chars {
        let window_end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let window = &rest[..window_end];

        let split = if rest[window_end..].starts_with(char::is_whitespace) {
            window_end
        } else {
            window
                .rfind('\n')
                .or_else(|| window.rfind(char::is_whitespace))
                .filter(|&i| i > 0)
                .unwrap_or(window_end)
        };

        let (head, tail) = rest.split_at(split);
        let head = head.trim_end();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        rest = tail.trim_start();
    }
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
