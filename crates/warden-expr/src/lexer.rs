// SPDX-License-Identifier: MIT OR Apache-2.0

use warden_error::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    And,
    Or,
    Not,
    In,
    True,
    False,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Equal,
    NotEqual,
    RegexMatch,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Int(i64),
    Float(f64),
    Str(String),
    /// Identifier with optional dotted attribute path.
    Ident(String, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn err(pos: usize, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Parse {
        position: pos,
        message: message.into(),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        let mut push = |token: Token| tokens.push(Spanned { token, pos });
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '[' | ']' | ',' | '+' | '-' | '*' | '/' | '%' => {
                chars.next();
                push(match ch {
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    '[' => Token::LeftBracket,
                    ']' => Token::RightBracket,
                    ',' => Token::Comma,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    _ => Token::Percent,
                });
            }
            '&' | '|' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some(ch) {
                    chars.next();
                    push(if ch == '&' { Token::And } else { Token::Or });
                } else {
                    return Err(err(pos, format!("single '{ch}' not allowed, use '{ch}{ch}'")));
                }
            }
            '=' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('=') => {
                        chars.next();
                        push(Token::Equal);
                    }
                    Some('~') => {
                        chars.next();
                        push(Token::RegexMatch);
                    }
                    _ => return Err(err(pos, "single '=' not allowed, use '=='")),
                }
            }
            '!' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('=') {
                    chars.next();
                    push(Token::NotEqual);
                } else {
                    push(Token::Not);
                }
            }
            '<' | '>' => {
                chars.next();
                let or_equal = chars.peek().map(|&(_, c)| c) == Some('=');
                if or_equal {
                    chars.next();
                }
                push(match (ch, or_equal) {
                    ('<', false) => Token::LessThan,
                    ('<', true) => Token::LessThanOrEqual,
                    (_, false) => Token::GreaterThan,
                    (_, true) => Token::GreaterThanOrEqual,
                });
            }
            '"' | '\'' => {
                chars.next();
                let quote = ch;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, c)) if c == quote || c == '\\' => value.push(c),
                            // Unknown escapes are kept verbatim so regex classes like `\d` survive.
                            Some((_, c)) => {
                                value.push('\\');
                                value.push(c);
                            }
                            None => return Err(err(pos, "unterminated string literal")),
                        },
                        Some((_, c)) if c == quote => break,
                        Some((_, c)) => value.push(c),
                        None => return Err(err(pos, "unterminated string literal")),
                    }
                }
                push(Token::Str(value));
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                let mut is_float = false;
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        chars.next();
                    } else if c == '.' && !is_float {
                        is_float = true;
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let token = if is_float {
                    text.parse()
                        .map(Token::Float)
                        .map_err(|_| err(pos, format!("invalid number '{text}'")))?
                } else {
                    text.parse()
                        .map(Token::Int)
                        .map_err(|_| err(pos, format!("integer '{text}' out of range")))?
                };
                push(token);
            }
            c if is_ident_start(c) => {
                let mut segments = vec![String::new()];
                while let Some(&(_, c)) = chars.peek() {
                    if is_ident_char(c) {
                        if let Some(last) = segments.last_mut() {
                            last.push(c);
                        }
                        chars.next();
                        continue;
                    }
                    if c == '.' {
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek().is_some_and(|&(_, n)| is_ident_start(n)) {
                            chars.next();
                            segments.push(String::new());
                            continue;
                        }
                    }
                    break;
                }
                let mut segments = segments.into_iter();
                let name = segments.next().unwrap_or_default();
                let path: Vec<String> = segments.collect();
                let token = match (name.as_str(), path.is_empty()) {
                    ("true", true) => Token::True,
                    ("false", true) => Token::False,
                    ("in", true) => Token::In,
                    _ => Token::Ident(name, path),
                };
                push(token);
            }
            other => return Err(err(pos, format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}
