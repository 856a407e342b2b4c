//! DSL verb extraction
//!
//! The DSL is S-expression shaped: `(domain.verb :key value ...)`. The head
//! identifier of every form, nested ones included, is a verb. Extraction
//! goes through the [`VerbExtractor`] trait so the router can be handed a
//! different grammar; [`SExprVerbExtractor`] is the nom-based default.
//!
//! Text that does not parse (an unterminated form, prose mixed with DSL)
//! can still be scanned with [`extract_verbs_lenient`], a regex pass that
//! only recognises `(domain.verb ` prefixes.

use std::sync::LazyLock;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{alpha1, alphanumeric1, anychar, char, multispace1, none_of},
    combinator::{map, opt, recognize, value},
    error::{convert_error, VerboseError},
    multi::many0,
    sequence::{pair, preceded, terminated},
    Finish, IResult,
};
use regex::Regex;
use thiserror::Error;

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// DSL text that could not be parsed
#[derive(Debug, Clone, PartialEq, Error)]
#[error("DSL parse error at offset {offset}: {message}")]
pub struct VerbParseError {
    pub offset: usize,
    pub message: String,
}

/// Pulls verb names out of DSL text
pub trait VerbExtractor: Send + Sync {
    /// All verbs in document order. Fails if `dsl` is not well-formed.
    fn extract_verbs(&self, dsl: &str) -> Result<Vec<String>, VerbParseError>;
}

/// nom parser for the S-expression DSL
#[derive(Debug, Clone, Copy, Default)]
pub struct SExprVerbExtractor;

impl VerbExtractor for SExprVerbExtractor {
    fn extract_verbs(&self, dsl: &str) -> Result<Vec<String>, VerbParseError> {
        let forms = parse_program(dsl)?;
        let mut verbs = Vec::new();
        for form in &forms {
            form.collect_verbs(&mut verbs);
        }
        Ok(verbs)
    }
}

static LENIENT_VERB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([a-z]+\.[a-z][a-z-]*)\s").unwrap());

/// Regex scan for `(domain.verb ` prefixes; tolerates malformed DSL
pub fn extract_verbs_lenient(text: &str) -> Vec<String> {
    LENIENT_VERB_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

// ============================================================================
// PARSER
// ============================================================================

#[derive(Debug)]
struct SExpr<'a> {
    head: Option<&'a str>,
    children: Vec<SExpr<'a>>,
}

impl SExpr<'_> {
    fn collect_verbs(&self, out: &mut Vec<String>) {
        if let Some(head) = self.head {
            out.push(head.to_string());
        }
        for child in &self.children {
            child.collect_verbs(out);
        }
    }
}

fn parse_program(input: &str) -> Result<Vec<SExpr<'_>>, VerbParseError> {
    let result = program_internal(input).finish();
    let (remaining, forms) = result.map_err(|e| VerbParseError {
        offset: e
            .errors
            .first()
            .map(|(rest, _)| input.len() - rest.len())
            .unwrap_or(0),
        message: convert_error(input, e),
    })?;

    if !remaining.is_empty() {
        return Err(VerbParseError {
            offset: input.len() - remaining.len(),
            message: "expected '(' or end of input".to_string(),
        });
    }
    Ok(forms)
}

fn program_internal(input: &str) -> ParseResult<'_, Vec<SExpr<'_>>> {
    let (input, _) = skip_ws(input)?;
    let (input, forms) = many0(terminated(parse_form, skip_ws))(input)?;
    Ok((input, forms))
}

/// Whitespace and `;` line comments
fn skip_ws(input: &str) -> ParseResult<'_, ()> {
    value(
        (),
        many0(alt((
            multispace1,
            recognize(pair(char(';'), opt(is_not("\n")))),
        ))),
    )(input)
}

/// `(head element*)`; the head is optional so `()` and `(:k v)` parse
fn parse_form(input: &str) -> ParseResult<'_, SExpr<'_>> {
    let (input, _) = char('(')(input)?;
    let (input, _) = skip_ws(input)?;
    let (input, head) = opt(parse_identifier)(input)?;
    let (input, nested) = many0(preceded(skip_ws, parse_element))(input)?;
    let (input, _) = skip_ws(input)?;
    let (input, _) = char(')')(input)?;

    Ok((
        input,
        SExpr {
            head,
            children: nested.into_iter().flatten().collect(),
        },
    ))
}

/// Any form argument; yields the forms nested inside it
fn parse_element(input: &str) -> ParseResult<'_, Vec<SExpr<'_>>> {
    alt((
        map(parse_form, |form| vec![form]),
        map(parse_string_literal, |_| Vec::new()),
        parse_list,
        parse_map,
        map(parse_atom, |_| Vec::new()),
    ))(input)
}

fn parse_list(input: &str) -> ParseResult<'_, Vec<SExpr<'_>>> {
    parse_collection(input, '[', ']')
}

fn parse_map(input: &str) -> ParseResult<'_, Vec<SExpr<'_>>> {
    parse_collection(input, '{', '}')
}

/// `[...]` lists and `{...}` maps; only their nested forms matter
fn parse_collection(input: &str, open: char, close: char) -> ParseResult<'_, Vec<SExpr<'_>>> {
    let (input, _) = char(open)(input)?;
    let (input, nested) = many0(preceded(skip_ws, parse_element))(input)?;
    let (input, _) = skip_ws(input)?;
    let (input, _) = char(close)(input)?;
    Ok((input, nested.into_iter().flatten().collect()))
}

fn parse_string_literal(input: &str) -> ParseResult<'_, &str> {
    let (input, _) = char('"')(input)?;
    let (input, content) = recognize(many0(alt((
        recognize(preceded(char('\\'), anychar)),
        recognize(none_of("\\\"")),
    ))))(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content))
}

/// Keywords, numbers, symbols: anything up to a delimiter
fn parse_atom(input: &str) -> ParseResult<'_, &str> {
    take_while1(|c: char| !c.is_whitespace() && !"()[]{}\";".contains(c))(input)
}

/// Verb identifiers: `domain.verb-name`, `kyc.start_check`
fn parse_identifier(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(
        alpha1,
        many0(alt((alphanumeric1, tag("_"), tag("-"), tag(".")))),
    ))(input)
}
