//! Route template compiler.
//!
//! Templates use Express-style `:name` parameters, e.g. `/todos/:id` or
//! `/files/:name.:ext`. Each parameter becomes a `([^/]+)` capture group so it
//! never spans a `/`; all other text is matched literally and the whole
//! pattern is anchored at both ends.

use std::sync::Arc;

use regex::Regex;

use super::core::ParamVec;
use crate::error::PatternError;

#[derive(Debug, Clone)]
enum Matcher {
    /// Template without parameters: plain string comparison, no regex on the hot path
    Exact(String),
    Regex(Regex),
}

/// A route template compiled once at registration time.
///
/// Immutable and cheap to share between coroutines.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    matcher: Matcher,
    param_names: Vec<Arc<str>>,
}

fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl CompiledPattern {
    /// Compile a path template into a matcher plus its ordered parameter names.
    ///
    /// A template without a leading `/` is treated as if it had one.
    ///
    /// # Errors
    ///
    /// * [`PatternError::Empty`] for `""`
    /// * [`PatternError::InvalidParameter`] when a `:` is not followed by an identifier
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        if template.is_empty() {
            return Err(PatternError::Empty);
        }
        let template = if template.starts_with('/') {
            template.to_string()
        } else {
            format!("/{template}")
        };

        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            if c != ':' {
                literal.push(c);
                continue;
            }
            let mut name = String::new();
            while let Some(&(_, n)) = chars.peek() {
                if !is_param_char(n) {
                    break;
                }
                name.push(n);
                chars.next();
            }
            if name.is_empty() {
                let segment = template[idx..].split('/').next().unwrap_or(":");
                return Err(PatternError::InvalidParameter {
                    template: template.clone(),
                    segment: segment.to_string(),
                });
            }
            pattern.push_str(&regex::escape(&literal));
            literal.clear();
            pattern.push_str("([^/]+)");
            param_names.push(Arc::from(name.as_str()));
        }

        let matcher = if param_names.is_empty() {
            Matcher::Exact(template.clone())
        } else {
            pattern.push_str(&regex::escape(&literal));
            pattern.push('$');
            Matcher::Regex(Regex::new(&pattern).map_err(|e| PatternError::Compile(e.to_string()))?)
        };

        Ok(Self {
            template,
            matcher,
            param_names,
        })
    }

    /// The normalized template this pattern was compiled from
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in declaration order (duplicates preserved)
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Match a request path (without query string).
    ///
    /// Returns the captured values in declaration order, or `None` when the
    /// path does not match exactly. A repeated parameter name yields two
    /// entries; lookups by name see the later one.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        match &self.matcher {
            Matcher::Exact(literal) => (literal == path).then(ParamVec::new),
            Matcher::Regex(re) => {
                let caps = re.captures(path)?;
                let mut params = ParamVec::new();
                for (i, name) in self.param_names.iter().enumerate() {
                    let value = caps.get(i + 1)?.as_str();
                    params.push((Arc::clone(name), value.to_string()));
                }
                Some(params)
            }
        }
    }
}
