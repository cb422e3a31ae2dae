//! Text cleanup applied to corpus rows before embedding.

/// Collapse whitespace and strip punctuation artifacts left by document
/// conversion.
///
/// Rules, applied in order:
/// 1. every whitespace run (newlines included) becomes one space, ends trimmed
/// 2. the substring `". ,"` is removed
/// 3. `".."` and then `". ."` become `"."`
/// 4. remaining `'\n'` are removed and the ends trimmed
///
/// The rule pass repeats until the text stops changing, so removing an
/// artifact never leaves a double space or a fresh `".."` behind and the
/// function is idempotent.
pub fn normalize_text(input: &str) -> String {
    let mut current = collapse_whitespace(input);
    loop {
        let next = collapse_whitespace(&apply_rules(&current));
        if next == current {
            return next;
        }
        current = next;
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn apply_rules(input: &str) -> String {
    input
        .replace(". ,", "")
        .replace("..", ".")
        .replace(". .", ".")
        .replace('\n', "")
        .trim()
        .to_string()
}
