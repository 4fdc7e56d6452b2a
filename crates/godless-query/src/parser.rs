use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit0, multispace0, none_of, one_of, satisfy};
use nom::combinator::{map, opt, recognize, value};
use nom::multi::{many0, many1, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

use godless_core::{EntryName, PointText, RowName, TableName};

use crate::ast::{
    OpCode, PredicateOpCode, Query, QueryBody, QueryJoin, QueryPredicate, QueryRowJoin,
    QuerySelect, QueryValue, QueryWhere,
};
use crate::error::QueryError;

/// Parse and validate a query. Whitespace around tokens is insignificant.
pub fn parse_query(input: &str) -> Result<Query, QueryError> {
    let (rest, parsed) = terminated(ws(query), multispace0)(input)
        .map_err(|e| QueryError::Parse(format!("{e:?}")))?;

    if !rest.is_empty() {
        return Err(QueryError::Parse(format!(
            "unexpected trailing input: '{rest}'"
        )));
    }

    validate(parsed)
}

/// The raw parse tree, before the limit-present/nonempty-row checks that
/// turn it into a `Query`.
enum ParsedQuery {
    Select {
        table: String,
        where_tree: Option<QueryWhere>,
        limit: Option<u32>,
    },
    Join {
        table: String,
        rows: Vec<ParsedRow>,
    },
}

struct ParsedRow {
    row_key: String,
    entries: Vec<(String, String)>,
}

fn validate(parsed: ParsedQuery) -> Result<Query, QueryError> {
    match parsed {
        ParsedQuery::Select {
            table,
            where_tree,
            limit,
        } => {
            let limit = limit.ok_or_else(|| QueryError::Invalid("select is missing a limit".into()))?;
            if limit == 0 {
                return Err(QueryError::Invalid("select limit must be nonzero".into()));
            }

            Ok(Query {
                op_code: OpCode::Select,
                table_key: TableName::new(table),
                public_keys: Vec::new(),
                body: QueryBody::Select(QuerySelect { where_tree, limit }),
            })
        }
        ParsedQuery::Join { table, rows } => {
            let mut compiled_rows = Vec::with_capacity(rows.len());
            for row in rows {
                if row.entries.is_empty() {
                    return Err(QueryError::Invalid(format!(
                        "join row '{}' has no values",
                        row.row_key
                    )));
                }

                let entries = row
                    .entries
                    .into_iter()
                    .map(|(key, value)| (EntryName::new(key), PointText::new(value)))
                    .collect();

                compiled_rows.push(QueryRowJoin {
                    row_key: RowName::new(row.row_key),
                    entries,
                });
            }

            Ok(Query {
                op_code: OpCode::Join,
                table_key: TableName::new(table),
                public_keys: Vec::new(),
                body: QueryBody::Join(QueryJoin {
                    rows: compiled_rows,
                }),
            })
        }
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn translate_escape(c: char) -> char {
    match c {
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0C}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{0B}',
        // '\'', '"', '?', '\\' pass through unchanged.
        other => other,
    }
}

fn escape_char(input: &str) -> IResult<&str, char> {
    map(preceded(char('\\'), one_of("'\"?\\abfnrtv")), translate_escape)(input)
}

fn key_char(input: &str) -> IResult<&str, char> {
    alt((escape_char, satisfy(|c: char| c.is_alphanumeric())))(input)
}

/// `KEY := (alpha|digit|escape)+`
fn key(input: &str) -> IResult<&str, String> {
    map(many1(key_char), |chars| chars.into_iter().collect())(input)
}

fn literal_char(input: &str) -> IResult<&str, char> {
    alt((escape_char, none_of("'")))(input)
}

/// `literal := (escape | non-quote)*`, single-quoted.
fn quoted_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('\''), many0(literal_char), char('\'')),
        |chars| chars.into_iter().collect(),
    )(input)
}

/// `INT := [1-9][0-9]*`
fn integer(input: &str) -> IResult<&str, u32> {
    map(recognize(pair(one_of("123456789"), digit0)), |digits: &str| {
        digits.parse().expect("digit-only text parses as u32")
    })(input)
}

/// `pval := "'" literal "'" | "@key" | KEY`
fn pval(input: &str) -> IResult<&str, QueryValue> {
    alt((
        map(quoted_literal, QueryValue::Literal),
        value(QueryValue::RowKey, tag("@key")),
        map(key, |k| QueryValue::Key(EntryName::new(k))),
    ))(input)
}

fn parenthesized_list<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<O>>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), inner),
        ws(char(')')),
    )
}

/// `predicate := ("str_eq"|"str_neq") "(" pval ("," pval)* ")"`
fn predicate(input: &str) -> IResult<&str, QueryWhere> {
    let (input, op_code) = alt((
        value(PredicateOpCode::StrEq, tag("str_eq")),
        value(PredicateOpCode::StrNeq, tag("str_neq")),
    ))(input)?;
    let (input, values) = parenthesized_list(ws(pval))(input)?;
    Ok((input, QueryWhere::Predicate(QueryPredicate { op_code, values })))
}

/// `where := "and" "(" where ("," where)* ")" | "or" "(" ... ")" | predicate`
fn where_expr(input: &str) -> IResult<&str, QueryWhere> {
    alt((
        map(
            preceded(ws(tag("and")), parenthesized_list(ws(where_expr))),
            QueryWhere::And,
        ),
        map(
            preceded(ws(tag("or")), parenthesized_list(ws(where_expr))),
            QueryWhere::Or,
        ),
        predicate,
    ))(input)
}

/// `row := "(" "@key" "=" KEY ("," KEY "=" "'" literal "'")* ")"`
fn row(input: &str) -> IResult<&str, ParsedRow> {
    delimited(
        ws(char('(')),
        map(
            tuple((
                preceded(ws(tag("@key")), preceded(ws(char('=')), ws(key))),
                many0(preceded(
                    ws(char(',')),
                    tuple((ws(key), preceded(ws(char('=')), ws(quoted_literal)))),
                )),
            )),
            |(row_key, entries)| ParsedRow { row_key, entries },
        ),
        ws(char(')')),
    )(input)
}

/// `select := "select" KEY [ "where" where ] [ "limit" INT ]`
fn select_query(input: &str) -> IResult<&str, ParsedQuery> {
    map(
        tuple((
            preceded(ws(tag("select")), ws(key)),
            opt(preceded(ws(tag("where")), ws(where_expr))),
            opt(preceded(ws(tag("limit")), ws(integer))),
        )),
        |(table, where_tree, limit)| ParsedQuery::Select {
            table,
            where_tree,
            limit,
        },
    )(input)
}

/// `join := "join" KEY "rows" row+`
fn join_query(input: &str) -> IResult<&str, ParsedQuery> {
    map(
        tuple((
            preceded(ws(tag("join")), ws(key)),
            preceded(ws(tag("rows")), many1(ws(row))),
        )),
        |(table, rows)| ParsedQuery::Join { table, rows },
    )(input)
}

/// `query := select | join`
fn query(input: &str) -> IResult<&str, ParsedQuery> {
    alt((select_query, join_query))(input)
}
