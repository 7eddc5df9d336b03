//! Terminal commands. Each opens the configured database directly; none of
//! them needs the HTTP server running.

pub mod doctor;
pub mod export;
pub mod migrate;
pub mod remote_schema;
pub mod search;
pub mod stats;

/// Shorten `content` to `max_chars` characters for one-line previews.
pub(crate) fn preview(content: &str, max_chars: usize) -> String {
    let single_line = content.replace('\n', " ");
    match single_line.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &single_line[..idx]),
        None => single_line,
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ünïcödé text", 4), "ünïc...");
        assert_eq!(preview("two\nlines", 20), "two lines");
    }
}
