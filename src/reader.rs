use crate::tokens::{tokenize, Token, TokenKind, TokenizerError};
use crate::types::{LispObject, Location};
use std::fmt;
use std::iter::Peekable;
use std::vec;

type Reader<'a> = Peekable<vec::IntoIter<Token<'a>>>;

#[derive(Debug)]
pub enum Error {
    Tokenizer(TokenizerError),
    NoMoreTokens,
    UnclosedList(Location),
    UnexpectedCloseParen(Location),
    BadInteger(String, Location),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Tokenizer(e) => write!(f, "{}", e),
            Error::NoMoreTokens => write!(f, "no form to read"),
            Error::UnclosedList(loc) => write!(f, "{}: list opened here is never closed", loc),
            Error::UnexpectedCloseParen(loc) => write!(f, "{}: unexpected `)'", loc),
            Error::BadInteger(chars, loc) => {
                write!(f, "{}: `{}' is not a 64-bit integer", loc, chars)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T = LispObject> = std::result::Result<T, Error>;

fn reader_for(input: &str) -> Result<Reader> {
    let tokens = tokenize(input).map_err(Error::Tokenizer)?;
    Ok(tokens
        .into_iter()
        .filter(|token| !matches!(token.kind, TokenKind::Comment(_)))
        .collect::<Vec<_>>()
        .into_iter()
        .peekable())
}

/// Reads the first form in `input`.
pub fn read_str(input: &str) -> Result {
    let mut reader = reader_for(input)?;
    read_form(&mut reader)
}

/// Reads every form in `input`, in order.
pub fn read_all(input: &str) -> Result<Vec<LispObject>> {
    let mut reader = reader_for(input)?;
    let mut forms = Vec::new();
    while reader.peek().is_some() {
        forms.push(read_form(&mut reader)?);
    }
    Ok(forms)
}

fn read_form(reader: &mut Reader) -> Result {
    let token = reader.next().ok_or(Error::NoMoreTokens)?;
    match token.kind {
        TokenKind::OpenRoundBracket => read_list(reader, token.loc),
        TokenKind::CloseRoundBracket => Err(Error::UnexpectedCloseParen(token.loc)),
        TokenKind::Quote => {
            let quoted = read_form(reader)?;
            let end = quoted.loc;
            Ok(LispObject::from_vec(
                vec![LispObject::symbol("quote", token.loc), quoted],
                end,
            ))
        }
        TokenKind::PlainChars(chars) => read_atom(chars, token.loc),
        // Filtered out by reader_for.
        TokenKind::Comment(_) => read_form(reader),
    }
}

fn read_list(reader: &mut Reader, open: Location) -> Result {
    let mut elements = Vec::new();
    loop {
        match reader.peek() {
            Some(Token {
                kind: TokenKind::CloseRoundBracket,
                loc,
            }) => {
                let mut list = LispObject::from_vec(elements, *loc);
                reader.next();
                list.loc = open;
                return Ok(list);
            }
            Some(_) => elements.push(read_form(reader)?),
            None => return Err(Error::UnclosedList(open)),
        }
    }
}

fn read_atom(chars: &str, loc: Location) -> Result {
    let looks_numeric = match chars.as_bytes() {
        [b'0'..=b'9', ..] => true,
        [b'+', b'0'..=b'9', ..] | [b'-', b'0'..=b'9', ..] => true,
        _ => false,
    };
    if looks_numeric {
        return chars
            .parse()
            .map(|value| LispObject::integer(value, loc))
            .or(Err(Error::BadInteger(chars.to_string(), loc)));
    }
    match chars {
        "nil" => Ok(LispObject::nil(loc)),
        "t" => Ok(LispObject::truth(loc)),
        _ => Ok(LispObject::symbol(chars, loc)),
    }
}
