//! Path template compilation.
//!
//! # Responsibilities
//! - Compile `/a/:id/(.*)`-style templates into anchored regexes
//! - Capture named `:param` segments and a trailing `(.*)` wildcard as the
//!   `pathMatch` param
//! - Percent-decode captured values
//!
//! # Design Decisions
//! - Case-insensitive and trailing-slash tolerant by default, matching the
//!   common path-to-regexp configuration; both are overridable per route
//! - Duplicate param names in one template are a development-mode warning,
//!   not an error

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::ConfigError;
use crate::route::config::PathOptions;

/// Param name assigned to a `(.*)` wildcard capture.
pub const PATH_MATCH_PARAM: &str = "pathMatch";

/// A compiled path template.
#[derive(Debug)]
pub struct CompiledPattern {
    regex: Regex,
    params: Vec<String>,
}

impl CompiledPattern {
    /// Compile a full path template.
    pub fn compile(full_path: &str, options: PathOptions) -> Result<CompiledPattern, ConfigError> {
        let mut body = String::new();
        let mut params = Vec::new();

        for segment in full_path.split('/').filter(|s| !s.is_empty()) {
            body.push('/');
            if let Some(name) = segment.strip_prefix(':') {
                params.push(name.to_string());
                body.push_str("([^/]+)");
            } else if segment == "(.*)" {
                params.push(PATH_MATCH_PARAM.to_string());
                body.push_str("(.*)");
            } else {
                body.push_str(&regex::escape(segment));
            }
        }
        if body.is_empty() {
            body.push('/');
        }

        #[cfg(debug_assertions)]
        {
            let mut seen = std::collections::HashSet::new();
            for name in &params {
                if !seen.insert(name) {
                    tracing::warn!(path = full_path, param = %name, "duplicate param name in path template");
                }
            }
        }

        let mut source = String::new();
        if !options.sensitive {
            source.push_str("(?i)");
        }
        source.push('^');
        source.push_str(&body);
        if !options.strict {
            source.push_str("/?");
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| ConfigError::InvalidPathTemplate {
            path: full_path.to_string(),
            message: e.to_string(),
        })?;

        Ok(CompiledPattern { regex, params })
    }

    /// Test a concrete path, returning captured params on a match.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        let mut params = HashMap::new();
        for (i, name) in self.params.iter().enumerate() {
            let raw = captures.get(i + 1).map_or("", |m| m.as_str());
            let mut value = percent_decode_str(raw).decode_utf8_lossy().into_owned();
            if name == PATH_MATCH_PARAM {
                // A greedy wildcard swallows the tolerated trailing slash.
                while value.ends_with('/') {
                    value.pop();
                }
            }
            params.insert(name.clone(), value);
        }
        Some(params)
    }
}
