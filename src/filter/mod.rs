//! Filter condition language
//!
//! A condition is a boolean combination of field checks evaluated against
//! every decoded row.
//!
//! # Syntax
//!
//! ```text
//! condition   := term ( logicOp term )*
//! term        := field fieldOp value | '(' condition ')'
//! fieldOp     := '=' | '!=' | '~' | '!~' | ':'
//! logicOp     := 'and' | 'or'
//! value       := bareToken | quotedString
//! ```
//!
//! - `=` / `!=`  value equals (or not) the field's string form
//! - `~` / `!~`  field's string form contains (or not) the value
//! - `:`         glob check: field and values may use `*`, a value starting
//!   with `!` matches when its glob does not
//!
//! A value may list alternatives separated by `|`; any of them matching is
//! enough. Mixing `and` and `or` at one bracket level is an error, use
//! brackets. Matching ignores case.
//!
//! # Examples
//!
//! ```text
//! level = error
//! level = error|warn and module ~ billing
//! level = error and (module ~ billing or module ~ payments)
//! msg ~ "connection reset"
//! req_* : '*timeout*'
//! level : '!debug'
//! ```

pub mod error;
pub mod glob;
pub mod lexer;
pub mod node;
pub mod parser;

pub use error::SyntaxError;
pub use node::{FilterNode, GlobAlternative};

use crate::row::Row;
use std::sync::Arc;

/// Compiled filter condition, cheap to clone and shareable across threads
#[derive(Debug, Clone)]
pub struct Filter {
    root: Arc<FilterNode>,
    /// Lowercase the row once per evaluation before delegating to `root`
    ignore_case: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl Filter {
    /// Filter that accepts every row
    pub fn all() -> Self {
        Self {
            root: Arc::new(FilterNode::All),
            ignore_case: false,
        }
    }

    /// Compile a condition. An empty condition or `*` matches everything.
    pub fn compile(condition: &str) -> Result<Self, SyntaxError> {
        let cleaned = condition.trim().to_lowercase();
        if cleaned.is_empty() || cleaned == "*" {
            return Ok(Self::all());
        }

        let tokens = lexer::tokenize(&cleaned)?;
        let root = parser::parse(&tokens, cleaned.len())?;
        tracing::debug!(condition = %cleaned, tree = ?root, "compiled filter");

        Ok(Self {
            root: Arc::new(root),
            ignore_case: true,
        })
    }

    pub fn root(&self) -> &FilterNode {
        &self.root
    }

    /// Whether this filter accepts every row without looking at it
    pub fn is_all(&self) -> bool {
        matches!(*self.root, FilterNode::All)
    }

    pub fn matches(&self, row: &Row) -> bool {
        if self.ignore_case {
            self.root.matches(&row.to_lowercase())
        } else {
            self.root.matches(row)
        }
    }
}
