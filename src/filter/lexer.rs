use super::error::SyntaxError;

/// Kinds of tokens in a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word or quoted string: field names and values
    String,
    /// `=`, `!=`, `~`, `!~` or `:`
    FieldOp,
    /// `and` / `or`
    LogicOp,
    OpenBracket,
    CloseBracket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// Byte offset of the token start in the condition
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            offset,
        }
    }
}

pub const OP_AND: &str = "and";
pub const OP_OR: &str = "or";

fn is_bare_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '|' | '*')
}

/// Split a trimmed, lowercased condition into tokens
pub fn tokenize(condition: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = condition.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::new(TokenKind::OpenBracket, "(", offset)),
            ')' => tokens.push(Token::new(TokenKind::CloseBracket, ")", offset)),
            '=' | '~' | ':' => tokens.push(Token::new(TokenKind::FieldOp, c, offset)),
            '!' => match chars.peek() {
                Some(&(_, next @ ('=' | '~'))) => {
                    chars.next();
                    tokens.push(Token::new(TokenKind::FieldOp, format!("!{next}"), offset));
                }
                _ => return Err(SyntaxError::UnexpectedChar { ch: '!', offset }),
            },
            '\'' | '"' => {
                let start = offset + c.len_utf8();
                let end = condition[start..]
                    .find(c)
                    .ok_or(SyntaxError::UnterminatedString { offset })?;
                tokens.push(Token::new(
                    TokenKind::String,
                    &condition[start..start + end],
                    offset,
                ));
                // skip the quoted body and the closing quote
                while let Some(&(i, _)) = chars.peek() {
                    if i > start + end {
                        break;
                    }
                    chars.next();
                }
            }
            c if is_bare_char(c) => {
                let mut end = offset + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !is_bare_char(next) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                let word = &condition[offset..end];
                let kind = if word == OP_AND || word == OP_OR {
                    TokenKind::LogicOp
                } else {
                    TokenKind::String
                };
                tokens.push(Token::new(kind, word, offset));
            }
            ch => return Err(SyntaxError::UnexpectedChar { ch, offset }),
        }
    }

    Ok(tokens)
}
