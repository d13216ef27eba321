//! Kernel command line reader.
//!
//! Splits `/proc/cmdline` into `key=value` pairs. Double quotes group
//! whitespace and are stripped; a bare word is recorded with the value
//! `"true"`. Everything after a lone `--` belongs to init and is skipped.

use layerinit_common::constants::PROC_CMDLINE;
use layerinit_common::error::{LayerInitError, Result};
use layerinit_common::types::BootParams;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, rest},
    multi::{fold_many1, many0},
    sequence::{delimited, preceded, terminated},
};

/// Value recorded for parameters given without `=`.
const BARE_FLAG_VALUE: &str = "true";

/// Parses a kernel command line into a parameter multimap.
///
/// # Errors
///
/// Returns [`LayerInitError::Decode`] if the line cannot be split into
/// words.
pub fn parse(cmdline: &str) -> Result<BootParams> {
    let (_, words) = all_consuming(words).parse(cmdline).map_err(malformed)?;

    let mut params = BootParams::new();
    for word in words.iter().filter(|word| !word.is_empty()) {
        if word == "--" {
            break;
        }
        match word.split_once('=') {
            Some((key, value)) => params.push(key, value),
            None => params.push(word.as_str(), BARE_FLAG_VALUE),
        }
    }
    Ok(params)
}

fn malformed(err: nom::Err<nom::error::Error<&str>>) -> LayerInitError {
    LayerInitError::decode(PROC_CMDLINE, format!("malformed command line: {err}"))
}

const fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// A quoted run, an unterminated quote running to the end, or a bare run.
fn fragment(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        preceded(char('"'), rest),
        take_while1(|c: char| !is_separator(c) && c != '"'),
    ))
    .parse(input)
}

/// Adjacent fragments form one word with the quotes removed.
fn word(input: &str) -> IResult<&str, String> {
    fold_many1(fragment, String::new, |mut word, part| {
        word.push_str(part);
        word
    })
    .parse(input)
}

fn words(input: &str) -> IResult<&str, Vec<String>> {
    preceded(multispace0, many0(terminated(word, multispace0))).parse(input)
}
