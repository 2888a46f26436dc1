//! Clause-extraction parser for DSQL.
//!
//! The parser is a pragmatic top-level clause extractor: it tokenizes the
//! whole statement, segments `SELECT … FROM name [WHERE …] [GROUP BY …]
//! [HAVING …] [ORDER BY …] [LIMIT n] [OFFSET n]` at paren depth 0, then
//! sub-parses each clause.
//!
//! Logical operators bind by first occurrence, not SQL precedence: the split
//! point of a condition is the leftmost top-level `AND` or `OR`, so
//! `A OR B AND C` parses as `(A) OR (B AND C)` while `A AND B OR C` parses
//! as `(A) AND (B OR C)`. Parenthesize to override.

use objql_ir::{
    AggregateFunction, CompareOp, Condition, NullsOrder, OrderSpec, Query, SelectItem,
    SortDirection, Value,
};

use crate::error::ParseError;
use crate::lexer::{tokenize, SpannedToken, Token};
use crate::span::Span;

/// Parse a DSQL statement into a query tree.
///
/// Parsing has no side effects; relationship joins are materialized later by
/// the engine's catalog-aware resolution step.
pub fn parse(source: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::new("empty query", Span::default()));
    }
    parse_query(&tokens)
}

/// Which clause a top-level keyword introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
}

struct Marker {
    kind: ClauseKind,
    keyword_start: usize,
    content_start: usize,
}

/// Parse a full `SELECT` statement from a token slice (also used for
/// subqueries).
fn parse_query(tokens: &[SpannedToken]) -> Result<Query, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("empty query", Span::default()));
    }
    if tokens[0].token != Token::Select {
        return Err(ParseError::new("expected SELECT", tokens[0].span));
    }

    let markers = segment_clauses(tokens)?;
    let from_idx = markers
        .iter()
        .position(|m| m.kind == ClauseKind::From)
        .ok_or_else(|| ParseError::new("expected FROM clause", last_span(tokens)))?;
    if from_idx != 0 {
        return Err(ParseError::new(
            "FROM must precede all other clauses",
            tokens[markers[0].keyword_start].span,
        ));
    }

    let clause_slice = |i: usize| -> &[SpannedToken] {
        let start = markers[i].content_start;
        let end = markers
            .get(i + 1)
            .map(|m| m.keyword_start)
            .unwrap_or(tokens.len());
        &tokens[start..end]
    };

    let select = parse_select_list(&tokens[1..markers[0].keyword_start])?;

    let from_tokens = clause_slice(0);
    let from_object = match from_tokens {
        [t] => ident_text(t)
            .ok_or_else(|| ParseError::new("expected object name after FROM", t.span))?,
        [] => {
            return Err(ParseError::new(
                "expected object name after FROM",
                last_span(tokens),
            ))
        }
        _ => {
            return Err(ParseError::new(
                "expected a single object name after FROM",
                from_tokens[1].span,
            ))
        }
    };

    let mut filter = None;
    let mut group_by = Vec::new();
    let mut having = None;
    let mut order_by = Vec::new();
    let mut limit = None;
    let mut offset = None;

    for (i, marker) in markers.iter().enumerate().skip(1) {
        let slice = clause_slice(i);
        let keyword_span = tokens[marker.keyword_start].span;
        match marker.kind {
            ClauseKind::From => {
                return Err(ParseError::new("duplicate FROM clause", keyword_span))
            }
            ClauseKind::Where => {
                check_unset(filter.is_none(), "WHERE", keyword_span)?;
                filter = Some(parse_condition(slice)?);
            }
            ClauseKind::GroupBy => {
                check_unset(group_by.is_empty(), "GROUP BY", keyword_span)?;
                group_by = parse_field_list(slice)?;
            }
            ClauseKind::Having => {
                check_unset(having.is_none(), "HAVING", keyword_span)?;
                having = Some(parse_condition(slice)?);
            }
            ClauseKind::OrderBy => {
                check_unset(order_by.is_empty(), "ORDER BY", keyword_span)?;
                order_by = parse_order_by(slice)?;
            }
            ClauseKind::Limit => {
                check_unset(limit.is_none(), "LIMIT", keyword_span)?;
                limit = Some(parse_count(slice, "LIMIT", keyword_span)?);
            }
            ClauseKind::Offset => {
                check_unset(offset.is_none(), "OFFSET", keyword_span)?;
                offset = Some(parse_count(slice, "OFFSET", keyword_span)?);
            }
        }
    }

    let query = Query {
        from_object,
        select,
        filter,
        order_by,
        group_by,
        having,
        limit,
        offset,
        joins: Vec::new(),
    };

    if query.having.is_some() && query.group_by.is_empty() && !query.is_aggregate() {
        return Err(ParseError::new(
            "HAVING requires GROUP BY or an aggregate in the select list",
            last_span(tokens),
        ));
    }

    Ok(query)
}

fn check_unset(unset: bool, clause: &str, span: Span) -> Result<(), ParseError> {
    if unset {
        Ok(())
    } else {
        Err(ParseError::new(format!("duplicate {} clause", clause), span))
    }
}

/// Locate every clause keyword at paren depth 0 and verify balance.
fn segment_clauses(tokens: &[SpannedToken]) -> Result<Vec<Marker>, ParseError> {
    let mut markers = Vec::new();
    let mut depth: i32 = 0;
    let mut i = 1; // skip leading SELECT
    while i < tokens.len() {
        let t = &tokens[i];
        match &t.token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::new("unbalanced ')'", t.span));
                }
            }
            Token::From if depth == 0 => markers.push(Marker {
                kind: ClauseKind::From,
                keyword_start: i,
                content_start: i + 1,
            }),
            Token::Where if depth == 0 => markers.push(Marker {
                kind: ClauseKind::Where,
                keyword_start: i,
                content_start: i + 1,
            }),
            Token::Having if depth == 0 => markers.push(Marker {
                kind: ClauseKind::Having,
                keyword_start: i,
                content_start: i + 1,
            }),
            Token::Limit if depth == 0 => markers.push(Marker {
                kind: ClauseKind::Limit,
                keyword_start: i,
                content_start: i + 1,
            }),
            Token::Offset if depth == 0 => markers.push(Marker {
                kind: ClauseKind::Offset,
                keyword_start: i,
                content_start: i + 1,
            }),
            Token::Group if depth == 0 => {
                expect_by(tokens, i, "GROUP")?;
                markers.push(Marker {
                    kind: ClauseKind::GroupBy,
                    keyword_start: i,
                    content_start: i + 2,
                });
                i += 1;
            }
            Token::Order if depth == 0 => {
                expect_by(tokens, i, "ORDER")?;
                markers.push(Marker {
                    kind: ClauseKind::OrderBy,
                    keyword_start: i,
                    content_start: i + 2,
                });
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return Err(ParseError::new("unbalanced '('", last_span(tokens)));
    }
    Ok(markers)
}

fn expect_by(tokens: &[SpannedToken], i: usize, keyword: &str) -> Result<(), ParseError> {
    match tokens.get(i + 1) {
        Some(t) if t.token == Token::By => Ok(()),
        _ => Err(ParseError::new(
            format!("expected BY after {}", keyword),
            tokens[i].span,
        )),
    }
}

// ---------------------------------------------------------------------------
// SELECT list
// ---------------------------------------------------------------------------

fn parse_select_list(tokens: &[SpannedToken]) -> Result<Vec<SelectItem>, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("empty select list", Span::default()));
    }
    split_top_level_commas(tokens)
        .into_iter()
        .map(parse_select_item)
        .collect()
}

fn parse_select_item(item: &[SpannedToken]) -> Result<SelectItem, ParseError> {
    let first = item
        .first()
        .ok_or_else(|| ParseError::new("empty select item", Span::default()))?;

    // Nested subquery: ( SELECT … ) [alias]
    if first.token == Token::LParen {
        let close = matching_paren(item, 0)?;
        if item.get(1).map(|t| &t.token) == Some(&Token::Select) {
            let query = parse_query(&item[1..close])?;
            let alias = parse_alias(&item[close + 1..])?;
            return Ok(SelectItem::Subquery {
                query: Box::new(query),
                alias,
            });
        }
        return Err(ParseError::new(
            "expected SELECT inside parenthesized select item",
            first.span,
        ));
    }

    // Aggregate call: FN ( arg ) [alias]
    if let Token::Ident(name) = &first.token {
        if let Some(function) = AggregateFunction::from_name(name) {
            if item.get(1).map(|t| &t.token) == Some(&Token::LParen) {
                let close = matching_paren(item, 1)?;
                let (function, field) =
                    parse_aggregate_argument(function, &item[2..close], first.span)?;
                let alias = parse_alias(&item[close + 1..])?;
                return Ok(SelectItem::Aggregate {
                    function,
                    field,
                    alias,
                });
            }
        }
    }

    // Plain or dotted field reference [alias]
    let (name, consumed) = parse_field_path(item)?;
    let alias = parse_alias(&item[consumed..])?;
    Ok(SelectItem::Field { name, alias })
}

fn parse_aggregate_argument(
    function: AggregateFunction,
    inner: &[SpannedToken],
    call_span: Span,
) -> Result<(AggregateFunction, Option<String>), ParseError> {
    match inner {
        [] => Err(ParseError::new("expected aggregate argument", call_span)),
        [t] if t.token == Token::Star => Ok((function, None)),
        _ if function == AggregateFunction::Count
            && inner[0].token == Token::Distinct =>
        {
            let (field, consumed) = parse_field_path(&inner[1..])?;
            expect_consumed(&inner[1..], consumed)?;
            Ok((AggregateFunction::CountDistinct, Some(field)))
        }
        _ => {
            let (field, consumed) = parse_field_path(inner)?;
            expect_consumed(inner, consumed)?;
            Ok((function, Some(field)))
        }
    }
}

fn parse_alias(rest: &[SpannedToken]) -> Result<Option<String>, ParseError> {
    match rest {
        [] => Ok(None),
        [t] => ident_text(t)
            .map(Some)
            .ok_or_else(|| ParseError::new("expected alias", t.span)),
        [a, t] if a.token == Token::As => ident_text(t)
            .map(Some)
            .ok_or_else(|| ParseError::new("expected alias after AS", t.span)),
        _ => Err(ParseError::new(
            "unexpected tokens after select item",
            rest[0].span,
        )),
    }
}

// ---------------------------------------------------------------------------
// Conditions (WHERE / HAVING)
// ---------------------------------------------------------------------------

/// Parse a condition tree from a token slice.
///
/// The split operator is the leftmost `AND`/`OR` at paren depth 0, giving
/// left-to-right precedence (see module docs).
fn parse_condition(tokens: &[SpannedToken]) -> Result<Condition, ParseError> {
    let tokens = strip_outer_parens(tokens)?;
    if tokens.is_empty() {
        return Err(ParseError::new("empty condition", Span::default()));
    }

    let mut depth: i32 = 0;
    for (i, t) in tokens.iter().enumerate() {
        match t.token {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            Token::And | Token::Or if depth == 0 && i > 0 => {
                let op = if t.token == Token::And {
                    objql_ir::LogicalOp::And
                } else {
                    objql_ir::LogicalOp::Or
                };
                let left = parse_condition(&tokens[..i])?;
                let right = parse_condition(&tokens[i + 1..])?;
                return Ok(Condition::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
            _ => {}
        }
    }

    parse_predicate(tokens)
}

/// Strip fully-covering balanced paren pairs.
fn strip_outer_parens(mut tokens: &[SpannedToken]) -> Result<&[SpannedToken], ParseError> {
    while tokens.len() >= 2 && tokens[0].token == Token::LParen {
        let close = matching_paren(tokens, 0)?;
        if close != tokens.len() - 1 {
            break;
        }
        tokens = &tokens[1..close];
    }
    Ok(tokens)
}

fn parse_predicate(tokens: &[SpannedToken]) -> Result<Condition, ParseError> {
    let (field, i) = parse_predicate_field(tokens)?;
    let op_token = tokens.get(i).ok_or_else(|| {
        ParseError::new("expected operator after field", last_span(tokens))
    })?;

    match &op_token.token {
        Token::Not => {
            match tokens.get(i + 1).map(|t| &t.token) {
                Some(Token::In) => parse_in_group(field, &tokens[i + 2..], true, op_token.span),
                _ => Err(ParseError::new("expected IN after NOT", op_token.span)),
            }
        }
        Token::In => parse_in_group(field, &tokens[i + 1..], false, op_token.span),
        Token::Is => {
            let (negated, null_idx) = match tokens.get(i + 1).map(|t| &t.token) {
                Some(Token::Not) => (true, i + 2),
                _ => (false, i + 1),
            };
            match tokens.get(null_idx).map(|t| &t.token) {
                Some(Token::Null) => {
                    expect_consumed(tokens, null_idx + 1)?;
                    Ok(Condition::Null { field, negated })
                }
                _ => Err(ParseError::new("expected NULL after IS", op_token.span)),
            }
        }
        Token::Like => {
            let value_token = tokens.get(i + 1).ok_or_else(|| {
                ParseError::new("expected pattern after LIKE", op_token.span)
            })?;
            expect_consumed(tokens, i + 2)?;
            let pattern = match &value_token.token {
                Token::QuotedString(s) => s.clone(),
                _ => {
                    return Err(ParseError::new(
                        "LIKE requires a string pattern",
                        value_token.span,
                    ))
                }
            };
            let (op, value) = classify_like_pattern(pattern);
            Ok(Condition::Compare {
                field,
                op,
                value: Value::String(value),
            })
        }
        Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
            let op = match op_token.token {
                Token::Eq => CompareOp::Eq,
                Token::Ne => CompareOp::Ne,
                Token::Lt => CompareOp::Lt,
                Token::Le => CompareOp::Le,
                Token::Gt => CompareOp::Gt,
                Token::Ge => CompareOp::Ge,
                _ => unreachable!(),
            };
            let value_token = tokens.get(i + 1).ok_or_else(|| {
                ParseError::new("expected value after operator", op_token.span)
            })?;
            expect_consumed(tokens, i + 2)?;
            let value = parse_literal(value_token)?;
            Ok(Condition::Compare { field, op, value })
        }
        _ => Err(ParseError::new(
            format!("unknown operator {:?}", op_token.token),
            op_token.span,
        )),
    }
}

/// Parse the field of a predicate: a dotted path, or an aggregate call
/// (HAVING predicates compare aggregate results).
fn parse_predicate_field(tokens: &[SpannedToken]) -> Result<(String, usize), ParseError> {
    if let Token::Ident(name) = &tokens[0].token {
        if let Some(function) = AggregateFunction::from_name(name) {
            if tokens.get(1).map(|t| &t.token) == Some(&Token::LParen) {
                let close = matching_paren(tokens, 1)?;
                let (function, field) =
                    parse_aggregate_argument(function, &tokens[2..close], tokens[0].span)?;
                let rendered = match (&function, &field) {
                    (AggregateFunction::CountDistinct, Some(f)) => {
                        format!("COUNT(DISTINCT {})", f)
                    }
                    (f, Some(arg)) => format!("{}({})", f.sql_name(), arg),
                    (f, None) => format!("{}(*)", f.sql_name()),
                };
                return Ok((rendered, close + 1));
            }
        }
    }
    parse_field_path(tokens)
}

fn parse_in_group(
    field: String,
    rest: &[SpannedToken],
    negated: bool,
    at: Span,
) -> Result<Condition, ParseError> {
    if rest.first().map(|t| &t.token) != Some(&Token::LParen) {
        return Err(ParseError::new("expected '(' after IN", at));
    }
    let close = matching_paren(rest, 0)?;
    expect_consumed(rest, close + 1)?;
    let inner = &rest[1..close];

    if inner.first().map(|t| &t.token) == Some(&Token::Select) {
        let query = parse_query(inner)?;
        return Ok(Condition::InSubquery {
            field,
            query: Box::new(query),
            negated,
        });
    }

    let mut values = Vec::new();
    if !inner.is_empty() {
        for group in split_top_level_commas(inner) {
            match group {
                [t] => values.push(parse_literal(t)?),
                [] => return Err(ParseError::new("empty value in IN list", at)),
                _ => {
                    return Err(ParseError::new(
                        "expected a single literal in IN list",
                        group[1].span,
                    ))
                }
            }
        }
    }
    Ok(Condition::InList {
        field,
        values,
        negated,
    })
}

/// Classify a LIKE pattern by `%` placement.
fn classify_like_pattern(pattern: String) -> (CompareOp, String) {
    let starts = pattern.starts_with('%');
    let ends = pattern.ends_with('%');
    if starts && ends && pattern.len() >= 2 {
        (
            CompareOp::Contains,
            pattern[1..pattern.len() - 1].to_string(),
        )
    } else if ends {
        (
            CompareOp::StartsWith,
            pattern[..pattern.len() - 1].to_string(),
        )
    } else if starts {
        (CompareOp::EndsWith, pattern[1..].to_string())
    } else {
        (CompareOp::Like, pattern)
    }
}

// ---------------------------------------------------------------------------
// ORDER BY / GROUP BY / paging
// ---------------------------------------------------------------------------

fn parse_order_by(tokens: &[SpannedToken]) -> Result<Vec<OrderSpec>, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("empty ORDER BY clause", Span::default()));
    }
    split_top_level_commas(tokens)
        .into_iter()
        .map(parse_order_item)
        .collect()
}

fn parse_order_item(item: &[SpannedToken]) -> Result<OrderSpec, ParseError> {
    let (field, mut i) = parse_field_path(item)?;
    let mut direction = SortDirection::Asc;
    let mut nulls = NullsOrder::Last;

    while i < item.len() {
        match &item[i].token {
            Token::Asc => direction = SortDirection::Asc,
            Token::Desc => direction = SortDirection::Desc,
            Token::Nulls => {
                i += 1;
                match item.get(i).map(|t| &t.token) {
                    Some(Token::First) => nulls = NullsOrder::First,
                    Some(Token::Last) => nulls = NullsOrder::Last,
                    _ => {
                        return Err(ParseError::new(
                            "expected FIRST or LAST after NULLS",
                            item[i - 1].span,
                        ))
                    }
                }
            }
            _ => {
                return Err(ParseError::new(
                    "unexpected token in ORDER BY item",
                    item[i].span,
                ))
            }
        }
        i += 1;
    }

    Ok(OrderSpec {
        field,
        direction,
        nulls,
    })
}

fn parse_field_list(tokens: &[SpannedToken]) -> Result<Vec<String>, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("empty field list", Span::default()));
    }
    split_top_level_commas(tokens)
        .into_iter()
        .map(|group| {
            let (field, consumed) = parse_field_path(group)?;
            expect_consumed(group, consumed)?;
            Ok(field)
        })
        .collect()
}

fn parse_count(tokens: &[SpannedToken], clause: &str, at: Span) -> Result<u64, ParseError> {
    match tokens {
        [t] => match t.token {
            Token::Int(n) if n >= 0 => Ok(n as u64),
            _ => Err(ParseError::new(
                format!("{} requires a non-negative integer", clause),
                t.span,
            )),
        },
        _ => Err(ParseError::new(
            format!("{} requires a single integer", clause),
            at,
        )),
    }
}

// ---------------------------------------------------------------------------
// Token utilities
// ---------------------------------------------------------------------------

/// Parse a plain or dotted field path, returning the joined name and the
/// number of tokens consumed.
fn parse_field_path(tokens: &[SpannedToken]) -> Result<(String, usize), ParseError> {
    let first = tokens
        .first()
        .ok_or_else(|| ParseError::new("expected field name", Span::default()))?;
    let mut name = ident_text(first)
        .ok_or_else(|| ParseError::new("expected field name", first.span))?;

    let mut i = 1;
    while tokens.get(i).map(|t| &t.token) == Some(&Token::Dot) {
        let seg = tokens.get(i + 1).ok_or_else(|| {
            ParseError::new("expected field name after '.'", tokens[i].span)
        })?;
        let seg_text = ident_text(seg)
            .ok_or_else(|| ParseError::new("expected field name after '.'", seg.span))?;
        name.push('.');
        name.push_str(&seg_text);
        i += 2;
    }
    Ok((name, i))
}

fn ident_text(token: &SpannedToken) -> Option<String> {
    match &token.token {
        Token::Ident(s) => Some(s.clone()),
        _ => None,
    }
}

fn parse_literal(token: &SpannedToken) -> Result<Value, ParseError> {
    match &token.token {
        Token::QuotedString(s) => Ok(Value::String(s.clone())),
        Token::Int(i) => Ok(Value::Int(*i)),
        Token::Float(f) => Ok(Value::Float(*f)),
        Token::Date(d) => Ok(Value::Date(*d)),
        Token::True => Ok(Value::Bool(true)),
        Token::False => Ok(Value::Bool(false)),
        Token::Null => Ok(Value::Null),
        Token::Ident(s) => Ok(Value::String(s.clone())),
        _ => Err(ParseError::new("expected literal value", token.span)),
    }
}

/// Find the index of the `)` matching the `(` at `open`.
fn matching_paren(tokens: &[SpannedToken], open: usize) -> Result<usize, ParseError> {
    let mut depth = 0;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        match t.token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::new("unbalanced '('", tokens[open].span))
}

/// Split a token slice on commas at paren depth 0.
fn split_top_level_commas(tokens: &[SpannedToken]) -> Vec<&[SpannedToken]> {
    let mut groups = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, t) in tokens.iter().enumerate() {
        match t.token {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            Token::Comma if depth == 0 => {
                groups.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&tokens[start..]);
    groups
}

fn expect_consumed(tokens: &[SpannedToken], consumed: usize) -> Result<(), ParseError> {
    if consumed < tokens.len() {
        Err(ParseError::new(
            "unexpected trailing tokens",
            tokens[consumed].span,
        ))
    } else {
        Ok(())
    }
}

fn last_span(tokens: &[SpannedToken]) -> Span {
    tokens.last().map(|t| t.span).unwrap_or_default()
}
