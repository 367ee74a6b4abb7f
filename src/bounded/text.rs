//! Bounded text type
//!
//! Text is immutable: every operation produces a new value, so each one
//! pre-checks the prospective result size from its arguments before any
//! new value is materialized. Structurally unsafe operations (raw byte
//! conversion, the formatting entry points) are blocked outright.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::debug;

use crate::bounded::BoundedMap;
use crate::error::{CofferError, Result};
use crate::limits::LimitPolicy;
use crate::value::{Key, Value};

const TOO_LARGE: &str = "this string is too large";
const NOT_ALLOWED: &str = "this method is not allowed";

/// Immutable text value with character-counted size checks.
#[derive(Debug, Clone)]
pub struct BoundedText {
    policy: Rc<LimitPolicy>,
    data: String,
    chars: usize,
}

impl BoundedText {
    pub fn new(policy: Rc<LimitPolicy>, text: impl Into<String>) -> Self {
        let data = text.into();
        let chars = data.chars().count();
        Self {
            policy,
            data,
            chars,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Length in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn derived(&self, data: String) -> BoundedText {
        Self::new(Rc::clone(&self.policy), data)
    }

    fn disallowed(&self, method: &'static str) -> CofferError {
        debug!(method, "disallowed text method");
        CofferError::FeatureDisallowed(NOT_ALLOWED.to_string())
    }

    pub fn center(&self, width: usize, fill: char) -> Result<BoundedText> {
        self.policy.check(width, TOO_LARGE)?;
        if width <= self.chars {
            return Ok(self.clone());
        }
        let marg = width - self.chars;
        // extra fill leans left only at odd target widths
        let left = marg / 2 + (marg & width & 1);
        let mut out = String::with_capacity(width);
        out.extend(std::iter::repeat(fill).take(left));
        out.push_str(&self.data);
        out.extend(std::iter::repeat(fill).take(marg - left));
        Ok(self.derived(out))
    }

    pub fn ljust(&self, width: usize, fill: char) -> Result<BoundedText> {
        self.policy.check(width, TOO_LARGE)?;
        if width <= self.chars {
            return Ok(self.clone());
        }
        let mut out = String::with_capacity(width);
        out.push_str(&self.data);
        out.extend(std::iter::repeat(fill).take(width - self.chars));
        Ok(self.derived(out))
    }

    pub fn rjust(&self, width: usize, fill: char) -> Result<BoundedText> {
        self.policy.check(width, TOO_LARGE)?;
        if width <= self.chars {
            return Ok(self.clone());
        }
        let mut out = String::with_capacity(width);
        out.extend(std::iter::repeat(fill).take(width - self.chars));
        out.push_str(&self.data);
        Ok(self.derived(out))
    }

    /// Zero-pad on the left, keeping a leading sign in place.
    pub fn zfill(&self, width: usize) -> Result<BoundedText> {
        self.policy.check(width, TOO_LARGE)?;
        if width <= self.chars {
            return Ok(self.clone());
        }
        let (sign, rest) = if self.data.starts_with('+') || self.data.starts_with('-') {
            self.data.split_at(1)
        } else {
            ("", self.data.as_str())
        };
        let mut out = String::with_capacity(width);
        out.push_str(sign);
        out.extend(std::iter::repeat('0').take(width - self.chars));
        out.push_str(rest);
        Ok(self.derived(out))
    }

    /// Expand tabs to spaces, advancing to the next tab stop. Newlines
    /// reset the column.
    pub fn expandtabs(&self, tabsize: usize) -> Result<BoundedText> {
        let tabs = self.data.matches('\t').count();
        self.policy.check(tabs.saturating_mul(tabsize), TOO_LARGE)?;
        let mut out = String::with_capacity(self.data.len());
        let mut column = 0usize;
        for ch in self.data.chars() {
            match ch {
                '\t' => {
                    if tabsize > 0 {
                        let fill = tabsize - column % tabsize;
                        out.extend(std::iter::repeat(' ').take(fill));
                        column += fill;
                    }
                }
                '\n' | '\r' => {
                    out.push(ch);
                    column = 0;
                }
                _ => {
                    out.push(ch);
                    column += 1;
                }
            }
        }
        Ok(self.derived(out))
    }

    /// Join pieces with `self` as the separator.
    ///
    /// Prospective cost: piece count times separator length, plus the
    /// summed piece lengths.
    pub fn join(&self, pieces: &[Rc<BoundedText>]) -> Result<BoundedText> {
        let pieces_len: usize = pieces.iter().map(|piece| piece.char_len()).sum();
        let projected = pieces
            .len()
            .saturating_mul(self.chars)
            .saturating_add(pieces_len);
        self.policy.check(projected, TOO_LARGE)?;
        let mut out = String::new();
        for (i, piece) in pieces.iter().enumerate() {
            if i > 0 {
                out.push_str(&self.data);
            }
            out.push_str(piece.as_str());
        }
        Ok(self.derived(out))
    }

    /// Replace occurrences of `old` with `new`, all of them unless `count`
    /// limits it.
    ///
    /// The prospective cost does not model overlapping matches.
    pub fn replace(&self, old: &str, new: &str, count: Option<usize>) -> Result<BoundedText> {
        let occurrences = match count {
            Some(n) if n > 0 => n,
            _ => self.count_matches(old),
        };
        let old_chars = old.chars().count() as i64;
        let new_chars = new.chars().count() as i64;
        let projected = occurrences as i64 * (new_chars - old_chars) + self.chars as i64;
        let projected = usize::try_from(projected).unwrap_or(0);
        self.policy.check(projected, TOO_LARGE)?;
        let out = match count {
            Some(n) => self.data.replacen(old, new, n),
            None => self.data.replace(old, new),
        };
        Ok(self.derived(out))
    }

    fn count_matches(&self, pattern: &str) -> usize {
        if pattern.is_empty() {
            self.chars + 1
        } else {
            self.data.matches(pattern).count()
        }
    }

    /// Substitute characters through a mapping from single-character text
    /// keys: `Text` substitutes, `Null` deletes, anything else keeps the
    /// character.
    ///
    /// Prospective cost: table size times current length, a deliberate
    /// overestimate.
    pub fn translate(&self, table: &BoundedMap) -> Result<BoundedText> {
        let projected = table.approx_len().saturating_mul(self.chars);
        self.policy.check(projected, TOO_LARGE)?;
        let mut out = String::with_capacity(self.data.len());
        for ch in self.data.chars() {
            match table.get(&Key::Text(ch.to_string())) {
                Some(Value::Null) => {}
                Some(Value::Text(replacement)) => out.push_str(replacement.as_str()),
                Some(Value::Int(code)) => {
                    match u32::try_from(code).ok().and_then(char::from_u32) {
                        Some(mapped) => out.push(mapped),
                        None => out.push(ch),
                    }
                }
                _ => out.push(ch),
            }
        }
        Ok(self.derived(out))
    }

    /// Concatenate into a new bounded text.
    pub fn concat(&self, other: &BoundedText) -> Result<BoundedText> {
        let projected = self.chars.saturating_add(other.chars);
        self.policy.check(projected, TOO_LARGE)?;
        let mut out = String::with_capacity(self.data.len() + other.data.len());
        out.push_str(&self.data);
        out.push_str(&other.data);
        Ok(self.derived(out))
    }

    /// Replicate into a new bounded text.
    pub fn repeat(&self, n: usize) -> Result<BoundedText> {
        let projected = self.chars.saturating_mul(n);
        self.policy.check(projected, TOO_LARGE)?;
        Ok(self.derived(self.data.repeat(n)))
    }

    /// Character-indexed substring. Out-of-range bounds clamp.
    pub fn slice(&self, start: usize, end: usize) -> BoundedText {
        let end = end.min(self.chars);
        let start = start.min(end);
        let out: String = self.data.chars().skip(start).take(end - start).collect();
        self.derived(out)
    }

    /// Raw byte conversion is blocked: bytes escape the character-counted
    /// containment this layer enforces.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Err(self.disallowed("encode"))
    }

    /// Formatting is blocked: a format string can reach into attribute
    /// and method resolution on arbitrary host values.
    pub fn format(&self, _args: &[Value]) -> Result<BoundedText> {
        Err(self.disallowed("format"))
    }

    pub fn format_map(&self, _mapping: &BoundedMap) -> Result<BoundedText> {
        Err(self.disallowed("format_map"))
    }
}

impl fmt::Display for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl PartialEq for BoundedText {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for BoundedText {}

impl PartialOrd for BoundedText {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoundedText {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.data.cmp(&other.data)
    }
}

impl Hash for BoundedText {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}
