//! Normalizes raw assistant replies into readable plain text.
//!
//! Upstream replies arrive as loosely-structured markdown-ish prose with
//! inconsistent bullet and numbering conventions. [`format_reply`] runs an
//! ordered pipeline of rewrites over the text; the order is load-bearing,
//! since later steps operate on the output shape of earlier ones. The
//! pipeline is total over any input and is NOT idempotent in general.
use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static NUMBERED_BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\s\*\*)").expect("valid regex"));
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\s)").expect("valid regex"));
static SUB_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}-\s").expect("valid regex"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S) - ").expect("valid regex"));
static FOR_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(- For\s)").expect("valid regex"));
static IN_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(- In\s)").expect("valid regex"));
static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Overview of|Feasibility and|Benefits for|Challenges and|Regulatory|Market Insights)")
        .expect("valid regex")
});
static COLON_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\s*-)").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static NUMBERED_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\s)([A-Z])").expect("valid regex"));

/// Removes paired `**` emphasis markers, keeping the enclosed text.
fn strip_bold(text: &str) -> String {
    BOLD.replace_all(text, "$1").into_owned()
}

/// Inserts a blank line before numbered-list markers that still carry a bold
/// marker. Runs after [`strip_bold`], so in the full pipeline this never
/// fires; it exists so numbered items keep their spacing if the pipeline is
/// ever reordered, and must not stack with [`break_numbered_items`].
fn break_numbered_bold_items(text: &str) -> String {
    NUMBERED_BOLD.replace_all(text, "\n\n$1").into_owned()
}

/// Inserts a blank line before every numbered-list marker (`1. `, `2. `, ...).
fn break_numbered_items(text: &str) -> String {
    NUMBERED.replace_all(text, "\n\n$1").into_owned()
}

/// Moves dashes preceded by two or more whitespace characters onto their own
/// line, indented by three spaces.
fn indent_sub_bullets(text: &str) -> String {
    SUB_BULLET.replace_all(text, "\n   - ").into_owned()
}

/// Moves remaining single-space-prefixed dashes onto their own line. The
/// pattern requires a non-whitespace character before the space so the
/// three-space output of [`indent_sub_bullets`] is left alone (the regex
/// crate has no lookbehind).
fn break_bullets(text: &str) -> String {
    BULLET.replace_all(text, "${1}\n- ").into_owned()
}

/// Gives "- For ..." stakeholder bullets a line of their own.
fn break_for_bullets(text: &str) -> String {
    FOR_BULLET.replace_all(text, "\n$1").into_owned()
}

/// Gives "- In ..." regional bullets a line of their own.
fn break_in_bullets(text: &str) -> String {
    IN_BULLET.replace_all(text, "\n$1").into_owned()
}

/// Inserts a newline before known section-heading phrases, wherever they
/// occur in the text.
fn break_section_headings(text: &str) -> String {
    SECTION_HEADING.replace_all(text, "\n$1").into_owned()
}

/// Breaks the line after a colon that introduces a dash bullet, keeping the
/// original whitespace and dash.
fn break_after_colon(text: &str) -> String {
    COLON_DASH.replace_all(text, ":\n$1").into_owned()
}

/// Collapses runs of three or more newlines down to exactly two.
fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUNS.replace_all(text, "\n\n").into_owned()
}

/// Pushes the heading text of a numbered item onto its own line when the
/// marker is immediately followed by an uppercase letter.
fn split_numbered_headings(text: &str) -> String {
    NUMBERED_UPPER.replace_all(text, "${1}\n${2}").into_owned()
}

/// Formats an upstream reply for display.
///
/// Applies the rewrite steps in a fixed sequence; do not reorder them.
/// Returns the input unchanged (modulo trimming) when no step matches.
pub fn format_reply(text: &str) -> String {
    let text = strip_bold(text);
    let text = break_numbered_bold_items(&text);
    let text = break_numbered_items(&text);
    let text = indent_sub_bullets(&text);
    let text = break_bullets(&text);
    let text = break_for_bullets(&text);
    let text = break_in_bullets(&text);
    let text = break_section_headings(&text);
    let text = break_after_colon(&text);
    let text = collapse_blank_lines(&text);
    let text = text.trim();
    split_numbered_headings(text)
}
