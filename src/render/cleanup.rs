//! Text cleanup applied to chunk text before it is emitted.

use regex::Regex;
use std::sync::OnceLock;

/// Marker every informal bullet is rewritten to.
pub const LIST_MARKER: &str = "* ";

fn bullet_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?m)^[·•]\s*").unwrap(),
            Regex::new(r"(?m)^--\t").unwrap(),
            Regex::new(r"(?m)^、\s*").unwrap(),
        ]
    })
}

fn blank_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// Rewrite line-leading `·`, `•`, `--<tab>` and `、` markers as `* `.
pub fn normalize_list_markers(text: &str) -> String {
    bullet_patterns()
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, LIST_MARKER).into_owned())
}

/// Collapse runs of blank lines to one blank line and trim the ends.
pub fn collapse_blank_lines(text: &str) -> String {
    blank_run().replace_all(text.trim(), "\n\n").into_owned()
}
