use thiserror::Error;

/// Errors that can occur when compiling a filter condition
///
/// Every variant carries the byte offset of the offending token in the
/// trimmed condition, so callers can point at it with [`SyntaxError::pointer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unclosed string value, started at {offset}")]
    UnterminatedString { offset: usize },

    #[error("unexpected character '{ch}' at {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unexpected end of condition at {offset}, expected {expected}")]
    UnexpectedEnd { offset: usize, expected: &'static str },

    #[error("unexpected token '{lexeme}' at {offset}, expected {expected}")]
    UnexpectedToken {
        lexeme: String,
        offset: usize,
        expected: &'static str,
    },

    #[error("close bracket not found for bracket opened at {offset}")]
    MissingCloseBracket { offset: usize },

    #[error("close bracket without open bracket at {offset}")]
    UnmatchedCloseBracket { offset: usize },

    #[error(
        "mixed logic operators without brackets at {offset} ('{first}' then '{found}'), precedence undefined"
    )]
    MixedLogicOperators {
        first: String,
        found: String,
        offset: usize,
    },

    #[error("more than {limit} logic operators in one group at {offset}")]
    TooManyOperators { limit: usize, offset: usize },

    #[error("brackets nested deeper than {limit} at {offset}")]
    TooDeep { limit: usize, offset: usize },
}

impl SyntaxError {
    pub fn offset(&self) -> usize {
        match self {
            SyntaxError::UnterminatedString { offset }
            | SyntaxError::UnexpectedChar { offset, .. }
            | SyntaxError::UnexpectedEnd { offset, .. }
            | SyntaxError::UnexpectedToken { offset, .. }
            | SyntaxError::MissingCloseBracket { offset }
            | SyntaxError::UnmatchedCloseBracket { offset }
            | SyntaxError::MixedLogicOperators { offset, .. }
            | SyntaxError::TooManyOperators { offset, .. }
            | SyntaxError::TooDeep { offset, .. } => *offset,
        }
    }

    /// Render the condition with a caret under the offending position
    pub fn pointer(&self, condition: &str) -> String {
        let condition = condition.trim();
        let column = condition
            .char_indices()
            .take_while(|(i, _)| *i < self.offset())
            .count();
        format!("{}\n{}^", condition, " ".repeat(column))
    }
}
