//! Removing markdown code fences from model output.

const FENCE: &str = "```";

/// Language tags dropped when they occupy the first line on their own.
pub const LANGUAGE_TAGS: &[&str] = &[
    "python",
    "java",
    "c",
    "cpp",
    "rust",
    "go",
    "ts",
    "js",
    "javascript",
    "csharp",
];

/// Strip enclosing ```` ``` ```` fences and bare language tag lines.
///
/// Fence and tag removal repeat until the text stops changing, so nested
/// fences and stacked tags are all removed and stripping twice is the same
/// as stripping once.
///
/// ```
/// use broker_sdk::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```python\nprint(1)\n```"), "print(1)");
/// assert_eq!(strip_code_fences("print(1)"), "print(1)");
/// ```
pub fn strip_code_fences(text: &str) -> String {
    let mut stripped = text.trim();
    loop {
        let next = strip_once(stripped);
        if next.len() == stripped.len() {
            return stripped.to_string();
        }
        stripped = next;
    }
}

fn strip_once(text: &str) -> &str {
    let mut stripped = text.trim();

    if stripped.starts_with(FENCE) && stripped.ends_with(FENCE) {
        stripped = if stripped.len() >= 2 * FENCE.len() {
            stripped[FENCE.len()..stripped.len() - FENCE.len()].trim()
        } else {
            ""
        };
    }

    if let Some((first_line, rest)) = stripped.split_once('\n') {
        let tag = first_line.trim().to_ascii_lowercase();
        if LANGUAGE_TAGS.contains(&tag.as_str()) {
            stripped = rest.trim_start();
        }
    }

    stripped
}
