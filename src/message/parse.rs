//! Nom-based IRC line parser.
//!
//! Splits one line into raw tag, prefix, command, and parameter slices.
//! Ownership, tag unescaping, and command typing happen one layer up in
//! [`super::types`].

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

/// Parse IRCv3 message tags (the part after `@` and before the first space).
fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

/// Parse the message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Parse the command name (letters, or digits for numerics).
fn parse_command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric())(input)
}

/// Parse the parameters following the command.
///
/// Space-separated; runs of spaces count as one separator. A parameter
/// starting with `:` consumes the remainder of the line, embedded spaces
/// included.
fn parse_params(input: &str) -> Vec<&str> {
    let mut params: Vec<&str> = Vec::new();
    let mut rest = input;

    while rest.as_bytes().first() == Some(&b' ') {
        while rest.as_bytes().first() == Some(&b' ') {
            rest = &rest[1..];
        }
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// A parsed line with borrowed string slices.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name.
    pub command: &'a str,
    /// Command parameters, trailing folded in as the last element.
    pub params: Vec<&'a str>,
}

impl<'a> ParsedLine<'a> {
    /// Parse one line (already stripped of `\r\n`).
    pub fn parse(input: &'a str) -> Result<ParsedLine<'a>, MessageParseError> {
        if input.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let parse = |input: &'a str| -> IResult<&str, ParsedLine<'a>> {
            let (input, tags) = opt(parse_tags)(input)?;
            let (input, _) = space0(input)?;
            let (input, prefix) = opt(parse_prefix)(input)?;
            let (input, _) = space0(input)?;
            let (input, command) = parse_command(input)?;
            let params = parse_params(input);
            Ok((
                "",
                ParsedLine {
                    tags,
                    prefix,
                    command,
                    params,
                },
            ))
        };

        match parse(input) {
            Ok((_, line)) => Ok(line),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(MessageParseError::ParseContext {
                    position: input.len() - e.input.len(),
                    context: format!("{:?}", e.code),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::InvalidCommand),
        }
    }
}
