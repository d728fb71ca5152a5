//! Regex patterns written as `/body/flags`
//!
//! A pattern that is not wrapped in slashes is used whole, without flags.
//! Patterns are compiled with a backtracking engine so lookaround and
//! backreferences work. Patterns that cannot be compiled are reported as
//! `None`; callers decide what a broken pattern means for their operator.

use fancy_regex::Regex;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Flag characters accepted after the closing slash
pub const FLAG_CHARS: &str = "dgimsuy";

/// Distinct patterns a [`PatternCache`] keeps before it stops inserting
pub const PATTERN_CACHE_CAPACITY: usize = 256;

/// A pattern split into body and flag text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSource<'a> {
    pub body: &'a str,
    pub flags: &'a str,
}

impl<'a> PatternSource<'a> {
    /// Split `/body/flags`, or take the whole string as the body
    ///
    /// The body is the shortest prefix after the opening slash that is
    /// followed by a slash and nothing but flag characters. A line break
    /// before such a slash means the string is not delimited.
    pub fn parse(raw: &'a str) -> Self {
        let undelimited = Self {
            body: raw,
            flags: "",
        };
        let Some(rest) = raw.strip_prefix('/') else {
            return undelimited;
        };

        for (i, c) in rest.char_indices() {
            if is_line_terminator(c) {
                return undelimited;
            }
            if c == '/' {
                let flags = &rest[i + 1..];
                if flags.chars().all(|f| FLAG_CHARS.contains(f)) {
                    return Self {
                        body: &rest[..i],
                        flags,
                    };
                }
            }
        }

        undelimited
    }

    /// Compile the pattern; `None` when the flags or the body are invalid
    pub fn compile(&self) -> Option<Regex> {
        let flags = RegexFlags::parse(self.flags)?;
        let inline = flags.inline();

        let regex = Regex::new(&format!("{}{}", inline, self.body)).ok()?;
        if flags.sticky {
            // Checked unanchored first so the wrapper cannot repair a bad body
            return Regex::new(&format!(r"{}\A(?:{})", inline, self.body)).ok();
        }
        Some(regex)
    }
}

/// Parsed flag set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_all: bool,
    pub sticky: bool,
}

impl RegexFlags {
    /// Parse flag text; repeated or unknown flags are invalid
    pub fn parse(flags: &str) -> Option<Self> {
        let mut seen = String::with_capacity(flags.len());
        let mut parsed = Self::default();

        for flag in flags.chars() {
            if !FLAG_CHARS.contains(flag) || seen.contains(flag) {
                return None;
            }
            seen.push(flag);

            match flag {
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_all = true,
                'y' => parsed.sticky = true,
                // d, g and u do not change whether a subject matches
                _ => {}
            }
        }

        Some(parsed)
    }

    /// Inline group carrying the flags that change matching, e.g. `(?im)`
    fn inline(&self) -> String {
        let mut group = String::new();
        if self.case_insensitive {
            group.push('i');
        }
        if self.multi_line {
            group.push('m');
        }
        if self.dot_all {
            group.push('s');
        }

        if group.is_empty() {
            group
        } else {
            format!("(?{})", group)
        }
    }
}

/// Compile a raw `/body/flags` or bare pattern
pub fn compile_pattern(raw: &str) -> Option<Regex> {
    let compiled = PatternSource::parse(raw).compile();
    if compiled.is_none() {
        tracing::warn!("Regex pattern '{}' is malformed; treating as unmatched", raw);
    }
    compiled
}

/// Test a subject; `None` when the engine gives up on it
pub fn test_pattern(regex: &Regex, subject: &str) -> Option<bool> {
    match regex.is_match(subject) {
        Ok(matched) => Some(matched),
        Err(e) => {
            tracing::warn!("Regex '{}' failed on subject: {}", regex.as_str(), e);
            None
        }
    }
}

/// Compiled patterns keyed by their raw text
///
/// Clones share the same entries. Malformed patterns are remembered too so
/// they are reported once.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    compiled: Arc<Mutex<HashMap<String, Option<Arc<Regex>>>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled form of `raw`, compiling it on first use
    pub fn get_or_compile(&self, raw: &str) -> Option<Arc<Regex>> {
        if let Some(hit) = self.compiled.lock().get(raw) {
            return hit.clone();
        }

        let compiled = compile_pattern(raw).map(Arc::new);

        let mut entries = self.compiled.lock();
        if entries.len() < PATTERN_CACHE_CAPACITY {
            entries.insert(raw.to_string(), compiled.clone());
        }
        compiled
    }

    pub fn len(&self) -> usize {
        self.compiled.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}
