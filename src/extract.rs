//! Code-block extraction from model output.
//!
//! Model responses wrap code in fenced blocks surrounded by prose.
//! Only the fenced content is usable downstream.

/// Extracts the contents of all fenced code blocks from `content`.
///
/// Lines whose trimmed text starts with ``` toggle block state and are
/// dropped, as is everything outside a block. Multiple blocks are
/// concatenated in input order. A trailing unterminated fence includes the
/// remaining lines to end of input.
pub(crate) fn extract_code(content: &str) -> String {
    let mut block_lines: Vec<&str> = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_block = !in_block;
            continue;
        }
        if in_block {
            block_lines.push(line);
        }
    }

    block_lines.join("\n")
}
