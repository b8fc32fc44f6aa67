use super::error::SyntaxError;
use super::lexer::{OP_AND, Token, TokenKind};
use super::node::FilterNode;

/// Upper bound of logic operators chained inside one bracket level
pub const MAX_CHAINED_OPERATORS: usize = 100;
/// Upper bound of nested bracket levels
pub const MAX_NESTING: usize = 100;

pub const OP_EQUAL: &str = "=";
pub const OP_NOT_EQUAL: &str = "!=";
pub const OP_CONTAINS: &str = "~";
pub const OP_NOT_CONTAINS: &str = "!~";
pub const OP_WILDCARD: &str = ":";

/// Build a filter tree from a token sequence.
///
/// `input_len` is the length of the tokenized condition and is used as the
/// position of "unexpected end" errors.
///
/// ```text
/// condition := term (LOGIC_OP term)*
/// term      := FIELD FIELD_OP VALUE | '(' condition ')'
/// ```
///
/// Mixing `and` with `or` inside one bracket level is rejected: there is no
/// precedence between them.
pub fn parse(tokens: &[Token], input_len: usize) -> Result<FilterNode, SyntaxError> {
    let parser = Parser {
        tokens,
        end: input_len,
    };
    let (node, _) = parser.condition(0, None, 0)?;
    Ok(node)
}

/// Read-only view over the tokens; every step takes a cursor and returns the
/// cursor after what it consumed.
struct Parser<'a> {
    tokens: &'a [Token],
    end: usize,
}

impl<'a> Parser<'a> {
    fn required(&self, pos: usize, expected: &'static str) -> Result<&'a Token, SyntaxError> {
        self.tokens.get(pos).ok_or(SyntaxError::UnexpectedEnd {
            offset: self.end,
            expected,
        })
    }

    /// `open` is the offset of the bracket that started this group, if any
    fn condition(
        &self,
        pos: usize,
        open: Option<usize>,
        depth: usize,
    ) -> Result<(FilterNode, usize), SyntaxError> {
        let (mut root, mut pos) = self.term(pos, depth)?;
        let mut logic: Option<&'a Token> = None;
        let mut operators = 0;

        loop {
            let Some(token) = self.tokens.get(pos) else {
                return match open {
                    Some(offset) => Err(SyntaxError::MissingCloseBracket { offset }),
                    None => Ok((root, pos)),
                };
            };

            match token.kind {
                TokenKind::CloseBracket => {
                    return match open {
                        Some(_) => Ok((root, pos + 1)),
                        None => Err(SyntaxError::UnmatchedCloseBracket {
                            offset: token.offset,
                        }),
                    };
                }
                TokenKind::LogicOp => {
                    if let Some(first) = logic
                        && first.lexeme != token.lexeme
                    {
                        return Err(SyntaxError::MixedLogicOperators {
                            first: first.lexeme.clone(),
                            found: token.lexeme.clone(),
                            offset: token.offset,
                        });
                    }
                    operators += 1;
                    if operators > MAX_CHAINED_OPERATORS {
                        return Err(SyntaxError::TooManyOperators {
                            limit: MAX_CHAINED_OPERATORS,
                            offset: token.offset,
                        });
                    }
                    logic = Some(token);

                    let (node, next) = self.term(pos + 1, depth)?;
                    root = if token.lexeme == OP_AND {
                        FilterNode::and(root, node)
                    } else {
                        FilterNode::or(root, node)
                    };
                    pos = next;
                }
                _ => {
                    return Err(SyntaxError::UnexpectedToken {
                        lexeme: token.lexeme.clone(),
                        offset: token.offset,
                        expected: "logic operator or close bracket",
                    });
                }
            }
        }
    }

    fn term(&self, pos: usize, depth: usize) -> Result<(FilterNode, usize), SyntaxError> {
        let token = self.required(pos, "field name or open bracket")?;
        match token.kind {
            TokenKind::String => self.field_check(pos),
            TokenKind::OpenBracket => {
                if depth >= MAX_NESTING {
                    return Err(SyntaxError::TooDeep {
                        limit: MAX_NESTING,
                        offset: token.offset,
                    });
                }
                self.condition(pos + 1, Some(token.offset), depth + 1)
            }
            _ => Err(SyntaxError::UnexpectedToken {
                lexeme: token.lexeme.clone(),
                offset: token.offset,
                expected: "field name or open bracket",
            }),
        }
    }

    fn field_check(&self, pos: usize) -> Result<(FilterNode, usize), SyntaxError> {
        let field = &self.tokens[pos].lexeme;

        let op = self.required(pos + 1, "field operator")?;
        if op.kind != TokenKind::FieldOp {
            return Err(SyntaxError::UnexpectedToken {
                lexeme: op.lexeme.clone(),
                offset: op.offset,
                expected: "field operator",
            });
        }

        let value = self.required(pos + 2, "field value")?;
        if value.kind != TokenKind::String {
            return Err(SyntaxError::UnexpectedToken {
                lexeme: value.lexeme.clone(),
                offset: value.offset,
                expected: "field value",
            });
        }
        let value = value.lexeme.as_str();

        let node = match op.lexeme.as_str() {
            OP_EQUAL => FilterNode::equal(field, value),
            OP_NOT_EQUAL => FilterNode::not(FilterNode::equal(field, value)),
            OP_CONTAINS => FilterNode::contains(field, value),
            OP_NOT_CONTAINS => FilterNode::not(FilterNode::contains(field, value)),
            OP_WILDCARD => FilterNode::wildcard(field, value),
            _ => {
                return Err(SyntaxError::UnexpectedToken {
                    lexeme: op.lexeme.clone(),
                    offset: op.offset,
                    expected: "field operator",
                });
            }
        };
        Ok((node, pos + 3))
    }
}
