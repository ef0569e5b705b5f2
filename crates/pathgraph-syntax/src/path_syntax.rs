//! Dot/bracket path syntax for requests and route declarations.
//!
//! ```text
//! bar.someValues[2...4].value        exclusive range: 2, 3
//! bar.someValues[2..4].value         inclusive range: 2, 3, 4
//! bar['foobar', fizzbuzz]            list of keys
//! users[{integers:ids}].name         route token (routes only)
//! ```
//!
//! Route tokens are `{integers}`, `{ranges}` and `{keys}`, each optionally
//! followed by `:name`. A token must be the only item of its indexer.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char as pchar, digit1, multispace0},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keyset::{Key, KeySet, PathSet, Range};

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WildcardKind {
    Integers,
    Ranges,
    Keys,
}

impl WildcardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WildcardKind::Integers => "integers",
            WildcardKind::Ranges => "ranges",
            WildcardKind::Keys => "keys",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wildcard {
    pub kind: WildcardKind,
    /// Binding name; unnamed wildcards match but bind nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum RouteElement {
    Literal { keys: KeySet },
    Wildcard(Wildcard),
}

pub type RoutePattern = Vec<RouteElement>;

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("invalid path syntax at offset {offset} in `{text}`")]
    Invalid { text: String, offset: usize },
    #[error("{message} in `{text}`")]
    Unsupported { text: String, message: String },
}

#[derive(Debug, Clone)]
enum Item {
    Key(Key),
    Range(Range),
    Wildcard(Wildcard),
}

/// Parse a request path such as `bar.someValues[2...4].value`.
pub fn parse_path(text: &str) -> Result<PathSet, SyntaxError> {
    parse_route(text)?
        .into_iter()
        .map(|element| match element {
            RouteElement::Literal { keys } => Ok(keys),
            RouteElement::Wildcard(_) => Err(SyntaxError::Unsupported {
                text: text.to_string(),
                message: "route tokens are not allowed in request paths".to_string(),
            }),
        })
        .collect()
}

/// Parse a route declaration such as `users[{integers:ids}].name`.
pub fn parse_route(text: &str) -> Result<RoutePattern, SyntaxError> {
    let (_, segments) = all_consuming(delimited(multispace0, segments, multispace0))(text)
        .map_err(|err| {
            let offset = match err {
                nom::Err::Error(e) | nom::Err::Failure(e) => text.len() - e.input.len(),
                nom::Err::Incomplete(_) => text.len(),
            };
            SyntaxError::Invalid {
                text: text.to_string(),
                offset,
            }
        })?;

    segments
        .into_iter()
        .map(|items| element_from_items(text, items))
        .collect()
}

fn element_from_items(text: &str, mut items: Vec<Item>) -> Result<RouteElement, SyntaxError> {
    if items.len() == 1 {
        return Ok(match items.remove(0) {
            Item::Key(key) => RouteElement::Literal {
                keys: KeySet::Key(key),
            },
            Item::Range(range) => RouteElement::Literal {
                keys: KeySet::Range(range),
            },
            Item::Wildcard(wildcard) => RouteElement::Wildcard(wildcard),
        });
    }

    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Key(key) => keys.push(KeySet::Key(key)),
            Item::Range(range) => keys.push(KeySet::Range(range)),
            Item::Wildcard(_) => {
                return Err(SyntaxError::Unsupported {
                    text: text.to_string(),
                    message: "a route token must be the only item of its indexer".to_string(),
                })
            }
        }
    }
    Ok(RouteElement::Literal {
        keys: KeySet::List(keys),
    })
}

fn segments(input: &str) -> IResult<&str, Vec<Vec<Item>>> {
    let (input, first) = alt((indexer, map(word, |key| vec![Item::Key(key)])))(input)?;
    let (input, rest) = many0(alt((dotted, indexer)))(input)?;
    let mut out = Vec::with_capacity(rest.len() + 1);
    out.push(first);
    out.extend(rest);
    Ok((input, out))
}

fn dotted(input: &str) -> IResult<&str, Vec<Item>> {
    preceded(
        pchar('.'),
        alt((
            map(wildcard, |w| vec![Item::Wildcard(w)]),
            map(word, |key| vec![Item::Key(key)]),
        )),
    )(input)
}

fn indexer(input: &str) -> IResult<&str, Vec<Item>> {
    delimited(
        pair(pchar('['), multispace0),
        separated_list1(delimited(multispace0, pchar(','), multispace0), item),
        pair(multispace0, pchar(']')),
    )(input)
}

fn item(input: &str) -> IResult<&str, Item> {
    alt((
        map(wildcard, Item::Wildcard),
        map(range, Item::Range),
        map(quoted, |s| Item::Key(Key::String(s))),
        map(word, Item::Key),
    ))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')(input)
}

/// Bare word; canonical integers (`12`, `-3`, not `007`) become integer keys.
fn word(input: &str) -> IResult<&str, Key> {
    map(identifier, |w: &str| match w.parse::<i64>() {
        Ok(n) if n.to_string() == w => Key::Integer(n),
        _ => Key::String(w.to_string()),
    })(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(pchar('-')), digit1)), str::parse::<i64>)(input)
}

fn range(input: &str) -> IResult<&str, Range> {
    map_opt(
        tuple((integer, alt((tag("..."), tag(".."))), integer)),
        |(from, op, to): (i64, &str, i64)| {
            let to = if op == "..." { to.checked_sub(1)? } else { to };
            Some(Range::new(from, to))
        },
    )(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    alt((
        delimited(pchar('"'), quoted_body("\\\""), pchar('"')),
        delimited(pchar('\''), quoted_body("\\'"), pchar('\'')),
    ))(input)
}

fn quoted_body<'a>(stop: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    map(
        opt(escaped_transform(
            is_not(stop),
            '\\',
            alt((
                value("\\", tag("\\")),
                value("\"", tag("\"")),
                value("'", tag("'")),
            )),
        )),
        Option::unwrap_or_default,
    )
}

fn wildcard(input: &str) -> IResult<&str, Wildcard> {
    map(
        delimited(
            pchar('{'),
            pair(
                alt((
                    value(WildcardKind::Integers, tag("integers")),
                    value(WildcardKind::Ranges, tag("ranges")),
                    value(WildcardKind::Keys, tag("keys")),
                )),
                opt(preceded(pchar(':'), identifier)),
            ),
            pchar('}'),
        ),
        |(kind, name)| Wildcard {
            kind,
            name: name.map(str::to_string),
        },
    )(input)
}
