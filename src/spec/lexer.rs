//! Tokenizer for specification text.

use super::error::SpecificationError;
use crate::core::Location;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    Lifetime(String),
    Arrow,
    Star,
    Pipe,
    Plus,
    Amp,
    Eq,
    Comma,
    Semi,
    Colon,
    PathSep,
    Dot,
    Lt,
    Gt,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Newline,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("'{name}'"),
            TokenKind::Lifetime(name) => format!("'{name}"),
            TokenKind::Arrow => "'->'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Pipe => "'|'".into(),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Amp => "'&'".into(),
            TokenKind::Eq => "'='".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Semi => "';'".into(),
            TokenKind::Colon => "':'".into(),
            TokenKind::PathSep => "'::'".into(),
            TokenKind::Dot => "'.'".into(),
            TokenKind::Lt => "'<'".into(),
            TokenKind::Gt => "'>'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::LBrace => "'{'".into(),
            TokenKind::RBrace => "'}'".into(),
            TokenKind::Newline => "end of line".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offsets into the source, so type expressions keep their text.
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub(crate) fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SpecificationError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    let mut line = 1;
    let mut line_start = 0;

    while let Some((start, c)) = chars.next() {
        let column = source[line_start..start].chars().count() + 1;
        let single = move |kind: TokenKind| Token {
            kind,
            start,
            end: start + c.len_utf8(),
            line,
            column,
        };

        match c {
            '\n' => {
                tokens.push(single(TokenKind::Newline));
                line += 1;
                line_start = start + 1;
            }
            c if c.is_whitespace() => {}
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                while matches!(chars.peek(), Some((_, next)) if *next != '\n') {
                    chars.next();
                }
            }
            '-' if matches!(chars.peek(), Some((_, '>'))) => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Arrow,
                    start,
                    end: start + 2,
                    line,
                    column,
                });
            }
            ':' if matches!(chars.peek(), Some((_, ':'))) => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::PathSep,
                    start,
                    end: start + 2,
                    line,
                    column,
                });
            }
            '\'' => {
                let end = take_word(&mut chars, start + 1);
                if end == start + 1 {
                    return Err(SpecificationError::InvalidCharacter {
                        ch: c,
                        location: Location::new(line, column),
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Lifetime(source[start + 1..end].to_string()),
                    start,
                    end,
                    line,
                    column,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = take_word(&mut chars, start + c.len_utf8());
                tokens.push(Token {
                    kind: TokenKind::Ident(source[start..end].to_string()),
                    start,
                    end,
                    line,
                    column,
                });
            }
            c if c.is_ascii_digit() => {
                // Const generic arguments (`Buffer<16>`).
                let end = take_word(&mut chars, start + 1);
                tokens.push(Token {
                    kind: TokenKind::Ident(source[start..end].to_string()),
                    start,
                    end,
                    line,
                    column,
                });
            }
            '*' => tokens.push(single(TokenKind::Star)),
            '|' => tokens.push(single(TokenKind::Pipe)),
            '+' => tokens.push(single(TokenKind::Plus)),
            '&' => tokens.push(single(TokenKind::Amp)),
            '=' => tokens.push(single(TokenKind::Eq)),
            ',' => tokens.push(single(TokenKind::Comma)),
            ';' => tokens.push(single(TokenKind::Semi)),
            ':' => tokens.push(single(TokenKind::Colon)),
            '.' => tokens.push(single(TokenKind::Dot)),
            '<' => tokens.push(single(TokenKind::Lt)),
            '>' => tokens.push(single(TokenKind::Gt)),
            '(' => tokens.push(single(TokenKind::LParen)),
            ')' => tokens.push(single(TokenKind::RParen)),
            '{' => tokens.push(single(TokenKind::LBrace)),
            '}' => tokens.push(single(TokenKind::RBrace)),
            other => {
                return Err(SpecificationError::InvalidCharacter {
                    ch: other,
                    location: Location::new(line, column),
                })
            }
        }
    }

    Ok(tokens)
}

fn take_word(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, mut end: usize) -> usize {
    while let Some((idx, next)) = chars.peek().copied() {
        if next.is_alphanumeric() || next == '_' {
            chars.next();
            end = idx + next.len_utf8();
        } else {
            break;
        }
    }
    end
}
