use crate::error::PayloadError;
use serde_json::Value;
use tracing::warn;

/// Parses recovered payload bytes as JSON, repairing truncation damage.
///
/// Compiled exports are occasionally cut off mid-object by upstream transfer
/// limits, so a plain parse-or-fail would lose otherwise recoverable works.
/// The strategy is two-tiered: a balanced-bracket scan finds the longest
/// structurally safe prefix first, and only if that fails does a blunt
/// truncate-and-complete pass run. Undecodable byte sequences are replaced
/// rather than rejected.
pub fn parse_resilient(bytes: &[u8]) -> Result<Value, PayloadError> {
    let text = String::from_utf8_lossy(bytes);

    let direct_err = match serde_json::from_str(&text) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if let Some(end) = balanced_end(&text)
        && end < text.len()
        && let Ok(value) = serde_json::from_str(&text[..end])
    {
        warn!(
            dropped = text.len() - end,
            "payload carried trailing garbage; truncated at structural boundary"
        );
        return Ok(value);
    }

    if let Some(value) = blunt_repair(&text) {
        warn!("payload was cut mid-structure; recovered a shorter document");
        return Ok(value);
    }

    Err(PayloadError::Corrupt {
        detail: direct_err.to_string(),
    })
}

/// Scans for the byte offset at which the top-level JSON structure ends.
///
/// Walks the text tracking quoted-string state (honoring backslash escapes)
/// and a stack of open `{`/`[`. Three events terminate the scan:
/// a closing bracket with an empty stack (underflow), a closing bracket that
/// does not match the innermost opener, or the stack emptying normally. The
/// first two truncate *before* the offending character, the last truncates
/// just past the closer. Returns `None` when the text ends with the stack
/// still open, or when no structure was seen at all.
fn balanced_end(text: &str) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' | '[' => stack.push(ch),
            '}' | ']' => {
                let Some(opener) = stack.pop() else {
                    return Some(offset);
                };
                let matches = (opener == '{' && ch == '}') || (opener == '[' && ch == ']');
                if !matches {
                    return Some(offset);
                }
                if stack.is_empty() {
                    return Some(offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Last-resort repair for payloads cut off mid-structure.
///
/// Strips trailing whitespace and commas, then walks the text recording
/// every offset at which a value could have just ended (a closing bracket,
/// a closing quote, a comma) together with the brackets still open there.
/// Candidates are retried newest-first as `prefix + missing closers`; the
/// first one that parses wins. A cut that lands anywhere after a complete
/// value is therefore recoverable, at the cost of losing everything behind
/// the cut.
fn blunt_repair(text: &str) -> Option<Value> {
    let trimmed = text.trim_end_matches([',', ' ', '\t', '\n', '\r']);

    let mut candidates: Vec<(usize, String)> = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in trimmed.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => {
                in_string = !in_string;
                if !in_string {
                    candidates.push((offset + 1, closers_for(&stack)));
                }
            }
            _ if in_string => {}
            '{' | '[' => stack.push(ch),
            '}' | ']' => {
                stack.pop();
                candidates.push((offset + 1, closers_for(&stack)));
            }
            ',' => candidates.push((offset, closers_for(&stack))),
            _ => {}
        }
    }

    // Key strings produce false candidates ("{\"alpha\"}" and the like);
    // the parse attempt weeds them out.
    for (cut, closers) in candidates.into_iter().rev() {
        let candidate = format!("{}{}", &trimmed[..cut], closers);
        if let Ok(value) = serde_json::from_str(&candidate) {
            return Some(value);
        }
    }
    None
}

fn closers_for(stack: &[char]) -> String {
    stack
        .iter()
        .rev()
        .map(|open| if *open == '{' { '}' } else { ']' })
        .collect()
}
