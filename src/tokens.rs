use crate::types::Location;
use regex::Regex;
use std::fmt;

#[derive(Debug, Eq, PartialEq)]
pub enum TokenKind<'a> {
    OpenRoundBracket,
    CloseRoundBracket,
    Quote,
    Comment(&'a str),
    PlainChars(&'a str),
}

#[derive(Debug, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub loc: Location,
}

#[derive(Debug)]
pub enum TokenizerError {
    NoCapture(Location),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerError::NoCapture(loc) => {
                write!(f, "{}: tokenizer failed: no token found", loc)
            }
        }
    }
}

fn create_token(captured: &str) -> TokenKind {
    match captured.as_bytes()[0] {
        b'(' => TokenKind::OpenRoundBracket,
        b')' => TokenKind::CloseRoundBracket,
        b'\'' => TokenKind::Quote,
        // Comment. Note that ; is ASCII so safe to slice on bytes even if the rest of the string is
        // non ASCII.
        b';' => TokenKind::Comment(&captured[1..]),
        _ => TokenKind::PlainChars(captured),
    }
}

/// The location just past `text`, if `text` starts at `loc`.
fn advance(mut loc: Location, text: &str) -> Location {
    for c in text.chars() {
        if c == '\n' {
            loc.line += 1;
            loc.column = 1;
        } else {
            loc.column += 1;
        }
    }
    loc
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizerError> {
    lazy_static! {
        static ref TOKEN_RE: Regex = Regex::new(
            r#"(?x)                          # ignore whitespace in this patern & allow comments
                ^
                (                            # token capture group
                    [()']                    # single special characters
                    |;.*                     # comments
                    |[^\s()';]+              # one or more plain characters
                )
            "#
        )
        .unwrap();
    }
    let mut input = input;
    let mut loc = Location::new(1, 1);
    let mut tokens = Vec::new();
    loop {
        let trimmed = input.trim_start();
        loc = advance(loc, &input[..input.len() - trimmed.len()]);
        input = trimmed;
        if input.is_empty() {
            break;
        }
        let token = TOKEN_RE
            .captures(input)
            .and_then(|caps| caps.get(1))
            .ok_or(TokenizerError::NoCapture(loc))?;
        tokens.push(Token {
            kind: create_token(token.as_str()),
            loc,
        });
        loc = advance(loc, token.as_str());
        input = &input[token.end()..];
    }
    Ok(tokens)
}
