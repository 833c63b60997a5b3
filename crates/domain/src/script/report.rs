//! Redirects result-reporting calls of custom code into the shared result map.

use std::sync::LazyLock;

use regex::Regex;

use super::render::{REPORT_RESULT_CALL, RESULTS_VAR};

static REPORT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}\s*\(", regex::escape(REPORT_RESULT_CALL)))
        .unwrap_or_else(|err| unreachable!("report call pattern is valid: {err}"))
});

static RESPONSE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:response|"response"|'response')\s*:"#)
        .unwrap_or_else(|err| unreachable!("response key pattern is valid: {err}"))
});

/// Rewrite every report-result call in `code` into an assignment of the
/// reported value to `results["<key>"]`.
///
/// `report({ response: X, ... })` becomes `results["key"] = X`, dropping the
/// other properties; any other single argument is assigned as a whole. A call whose parentheses never close is
/// left untouched.
#[must_use]
pub fn redirect_reports(code: &str, key: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;

    while let Some(found) = REPORT_CALL.find(rest) {
        let Some(close) = top_level(&rest[found.end()..], &[')']) else {
            break;
        };
        let argument = rest[found.end()..found.end() + close].trim();
        let value = response_property(argument).unwrap_or(argument);

        out.push_str(&rest[..found.start()]);
        out.push_str(&format!("{RESULTS_VAR}[{key:?}] = {value}"));
        rest = &rest[found.end() + close + 1..];
    }

    out.push_str(rest);
    out
}

/// Value of the `response` property when `argument` is an object literal
/// declaring one.
fn response_property(argument: &str) -> Option<&str> {
    let inner = argument.strip_prefix('{')?;
    let close = top_level(inner, &['}'])?;
    if !inner[close + 1..].trim().is_empty() {
        return None;
    }

    let mut fields = &inner[..close];
    loop {
        let end = top_level(fields, &[',']).unwrap_or(fields.len());
        let field = &fields[..end];
        if let Some(key) = RESPONSE_KEY.find(field) {
            let value = field[key.end()..].trim();
            return (!value.is_empty()).then_some(value);
        }
        if end == fields.len() {
            return None;
        }
        fields = &fields[end + 1..];
    }
}

/// Byte offset of the first of `stops` outside nested brackets and string
/// literals. A closing bracket that is not a stop ends the nesting level it
/// belongs to.
fn top_level(text: &str, stops: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if depth == 0 && stops.contains(&c) {
            return Some(offset);
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}
