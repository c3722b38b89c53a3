//! # Rolling Summary Builder
//!
//! Derives the textual meeting summary from the full transcript sequence.
//! Pure function of its input: no hidden state, so it can be recomputed
//! at any time (the state manager rate-limits how often that happens).

/// How many trailing transcript lines the summary shows.
pub const SUMMARY_TAIL_LINES: usize = 8;

/// Build the summary: a header with the total segment count, an elision
/// marker when older lines are cut off, then the most recent
/// [`SUMMARY_TAIL_LINES`] lines in chronological order, each bulleted.
/// An empty transcript produces an empty string.
pub fn build_summary(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }

    let total = lines.len();
    let mut rendered = Vec::with_capacity(total.min(SUMMARY_TAIL_LINES) + 2);
    rendered.push(format!("Summary of {} transcript segments:", total));

    if total > SUMMARY_TAIL_LINES {
        rendered.push(format!(
            "... {} earlier lines omitted",
            total - SUMMARY_TAIL_LINES
        ));
    }

    let start = total.saturating_sub(SUMMARY_TAIL_LINES);
    rendered.extend(lines[start..].iter().map(|line| format!("- {}", line)));
    rendered.join("\n")
}
