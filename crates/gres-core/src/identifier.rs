//! Device identifier grammar
//!
//! An identifier has the form `[<prefix>:]<range-or-list>`. Everything after
//! the last colon is a hostlist-style expression that expands into device
//! suffixes; the text before it is prepended to every suffix.
//!
//! The expression is a list of items separated by commas or whitespace:
//! - `lo-hi` with decimal bounds expands to every number in `lo..=hi`
//! - `pre[1,3-4]suf` expands the bracket group and wraps each number
//! - anything else is taken verbatim
//!
//! Written order and duplicates are preserved. A leading zero on the lower
//! bound of a range fixes the width of every generated number (`00-02`).

use crate::{GresError, GresResult};

/// Upper bound on the number of tokens a single item may expand to
pub const MAX_RANGE: u64 = 64 * 1024;

/// A parsed identifier: a literal prefix and the expanded suffixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// Literal prefix (text before the last colon, colon excluded)
    pub prefix: String,
    /// Expanded suffixes in written order
    pub suffixes: Vec<String>,
}

impl Identifier {
    /// Parse an identifier string
    pub fn parse(identifier: &str) -> GresResult<Self> {
        let (prefix, expression) = split_prefix(identifier);
        let suffixes = expand_tokens(expression).map_err(|reason| GresError::ConfigParse {
            identifier: identifier.to_string(),
            reason,
        })?;

        Ok(Self {
            prefix: prefix.to_string(),
            suffixes,
        })
    }

    /// Device labels: prefix followed by each suffix
    pub fn majors(&self) -> impl Iterator<Item = String> + '_ {
        self.suffixes
            .iter()
            .map(move |suffix| format!("{}{}", self.prefix, suffix))
    }

    /// Number of expanded devices
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    /// Whether the identifier expands to no devices
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}

/// Split an identifier at its last colon into `(prefix, expression)`.
///
/// Without a colon the whole string is the expression and the prefix is empty.
pub fn split_prefix(identifier: &str) -> (&str, &str) {
    match identifier.rfind(':') {
        Some(colon) => (&identifier[..colon], &identifier[colon + 1..]),
        None => ("", identifier),
    }
}

/// Expand a range/list expression into its tokens
pub fn expand(expression: &str) -> GresResult<Vec<String>> {
    expand_tokens(expression).map_err(|reason| GresError::ConfigParse {
        identifier: expression.to_string(),
        reason,
    })
}

fn expand_tokens(expression: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    for item in split_items(expression)? {
        if item.is_empty() {
            continue;
        }
        expand_item(item, &mut tokens)?;
    }
    Ok(tokens)
}

/// Split on commas and whitespace that are not inside a bracket group
fn split_items(expression: &str) -> Result<Vec<&str>, String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in expression.char_indices() {
        match c {
            '[' => {
                if depth > 0 {
                    return Err(format!("nested '[' at offset {}", i));
                }
                depth += 1;
            }
            ']' => {
                if depth == 0 {
                    return Err(format!("unmatched ']' at offset {}", i));
                }
                depth -= 1;
            }
            c if depth == 0 && (c == ',' || c.is_whitespace()) => {
                items.push(&expression[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if depth > 0 {
        return Err("unterminated '['".to_string());
    }
    items.push(&expression[start..]);
    Ok(items)
}

fn expand_item(item: &str, tokens: &mut Vec<String>) -> Result<(), String> {
    if let Some(open) = item.find('[') {
        // split_items guarantees the group is closed and not nested
        let close = open
            + item[open..]
                .find(']')
                .ok_or_else(|| format!("'{}' has an unterminated '['", item))?;
        let prefix = &item[..open];
        let spec = &item[open + 1..close];
        let suffix = &item[close + 1..];

        if suffix.contains('[') {
            return Err(format!("'{}' has more than one bracket group", item));
        }
        if spec.is_empty() {
            return Err(format!("'{}' has an empty bracket group", item));
        }

        let mut produced = 0u64;
        for piece in spec.split(',') {
            let numbers = expand_numeric(piece)
                .ok_or_else(|| format!("'{}' is not a number or range", piece))??;
            produced += numbers.len() as u64;
            if produced > MAX_RANGE {
                return Err(format!("'{}' expands to more than {} devices", item, MAX_RANGE));
            }
            tokens.extend(numbers.into_iter().map(|n| format!("{}{}{}", prefix, n, suffix)));
        }
        return Ok(());
    }

    match expand_numeric(item) {
        Some(numbers) => tokens.extend(numbers?),
        None => tokens.push(item.to_string()),
    }
    Ok(())
}

/// Expand `n` or `lo-hi` made of decimal digits.
///
/// Returns `None` when the piece is not numeric at all, and `Some(Err)` when
/// it is numeric but invalid.
fn expand_numeric(piece: &str) -> Option<Result<Vec<String>, String>> {
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if let Some((lo, hi)) = piece.split_once('-') {
        if !is_digits(lo) || !is_digits(hi) {
            return None;
        }
        return Some(expand_range(lo, hi));
    }

    if is_digits(piece) {
        Some(Ok(vec![piece.to_string()]))
    } else {
        None
    }
}

fn expand_range(lo: &str, hi: &str) -> Result<Vec<String>, String> {
    let start = lo
        .parse::<u64>()
        .map_err(|e| format!("range start '{}' is invalid: {}", lo, e))?;
    let end = hi
        .parse::<u64>()
        .map_err(|e| format!("range end '{}' is invalid: {}", hi, e))?;

    if end < start {
        return Err(format!("range {}-{} is descending", lo, hi));
    }
    if end - start >= MAX_RANGE {
        return Err(format!(
            "range {}-{} expands to more than {} devices",
            lo, hi, MAX_RANGE
        ));
    }

    let width = if lo.len() > 1 && lo.starts_with('0') {
        lo.len()
    } else {
        0
    };

    Ok((start..=end)
        .map(|n| format!("{:0width$}", n, width = width))
        .collect())
}
