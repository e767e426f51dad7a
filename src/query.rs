//! Row filter expressions.
//!
//! A small boolean language over column names, in the spirit of a
//! dataframe `query` string:
//!
//! ```text
//! Prix > 20
//! Catégorie == 'Loisirs' and not (Prix < 5 or Prix >= 100)
//! `Libellé` in ['Pain', 'Lait'] & Date >= '2024-01-01'
//! 10 < Prix * 2 <= 50
//! ```
//!
//! Column names are resolved against the table when the expression is
//! compiled, so an unknown column fails even on an empty table.

use chrono::NaiveDate;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{DepensesError, Result};
use crate::models::Value;
use crate::table::Table;

#[derive(Parser)]
#[grammar = "query.pest"]
struct QueryParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl CmpOp {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Column(usize),
    Literal(Value),
    Bool(bool),
    List(Vec<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c` holds when every adjacent pair holds.
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

/// Result of evaluating a sub-expression on one row.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Val(Value),
    Bool(bool),
    List(Vec<Operand>),
}

impl Operand {
    fn kind(&self) -> &'static str {
        match self {
            Operand::Val(v) => v.kind(),
            Operand::Bool(_) => "boolean",
            Operand::List(_) => "list",
        }
    }
}

/// A filter expression compiled against a table's columns.
#[derive(Debug, Clone)]
pub struct Query {
    expr: Expr,
}

impl Query {
    pub fn compile(source: &str, table: &Table) -> Result<Query> {
        let mut pairs = QueryParser::parse(Rule::query, source)
            .map_err(|e| DepensesError::Filter(e.to_string()))?;
        let query = pairs
            .next()
            .ok_or_else(|| DepensesError::Filter("empty expression".into()))?;
        let root = query
            .into_inner()
            .next()
            .ok_or_else(|| DepensesError::Filter("empty expression".into()))?;
        Ok(Query {
            expr: build(root, table)?,
        })
    }

    pub fn matches(&self, row: &[Value]) -> Result<bool> {
        match eval(&self.expr, row)? {
            Operand::Bool(b) => Ok(b),
            other => Err(DepensesError::Filter(format!(
                "expression evaluates to a {}, not a boolean",
                other.kind()
            ))),
        }
    }
}

/// Rows of `table` matching `expression`.
pub fn filter_table(table: &Table, expression: &str) -> Result<Table> {
    let query = Query::compile(expression, table)?;
    table.try_retain(|row| query.matches(row))
}

// ---------------------------------------------------------------------------
// Parse tree -> Expr
// ---------------------------------------------------------------------------

fn build(pair: Pair<'_>, table: &Table) -> Result<Expr> {
    match pair.as_rule() {
        Rule::or_expr => {
            let items = pair
                .into_inner()
                .filter(|p| p.as_rule() != Rule::or_op)
                .map(|p| build(p, table))
                .collect::<Result<Vec<_>>>()?;
            Ok(collapse(items, Expr::Or))
        }
        Rule::and_expr => {
            let items = pair
                .into_inner()
                .filter(|p| p.as_rule() != Rule::and_op)
                .map(|p| build(p, table))
                .collect::<Result<Vec<_>>>()?;
            Ok(collapse(items, Expr::And))
        }
        Rule::not_expr => {
            let mut nots = 0;
            let mut inner = None;
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::not_op => nots += 1,
                    _ => inner = Some(build(p, table)?),
                }
            }
            let mut expr = inner.ok_or_else(|| DepensesError::Filter("dangling 'not'".into()))?;
            for _ in 0..nots {
                expr = Expr::Not(Box::new(expr));
            }
            Ok(expr)
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let first = next_operand(&mut inner, table)?;
            let mut rest = Vec::new();
            while let Some(op) = inner.next() {
                let op = cmp_op(op)?;
                rest.push((op, next_operand(&mut inner, table)?));
            }
            if rest.is_empty() {
                Ok(first)
            } else {
                Ok(Expr::Compare(Box::new(first), rest))
            }
        }
        Rule::sum | Rule::product => {
            let mut inner = pair.into_inner();
            let mut acc = next_operand(&mut inner, table)?;
            while let Some(op) = inner.next() {
                let op = arith_op(op)?;
                let rhs = next_operand(&mut inner, table)?;
                acc = Expr::Arith(op, Box::new(acc), Box::new(rhs));
            }
            Ok(acc)
        }
        Rule::unary => {
            let mut negs = 0;
            let mut inner = None;
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::neg => negs += 1,
                    _ => inner = Some(build(p, table)?),
                }
            }
            let mut expr = inner.ok_or_else(|| DepensesError::Filter("dangling '-'".into()))?;
            for _ in 0..negs {
                expr = Expr::Neg(Box::new(expr));
            }
            Ok(expr)
        }
        Rule::list => Ok(Expr::List(
            pair.into_inner()
                .map(|p| build(p, table))
                .collect::<Result<Vec<_>>>()?,
        )),
        Rule::number => pair
            .as_str()
            .parse::<f64>()
            .map(|n| Expr::Literal(Value::Number(n)))
            .map_err(|e| DepensesError::Filter(format!("bad number '{}': {e}", pair.as_str()))),
        Rule::string => {
            let text = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Expr::Literal(Value::Text(text.to_string())))
        }
        Rule::boolean => Ok(Expr::Bool(pair.as_str().eq_ignore_ascii_case("true"))),
        Rule::column => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| DepensesError::Filter("empty column name".into()))?;
            let name = match inner.as_rule() {
                Rule::backticked => inner.into_inner().next().map(|p| p.as_str()).unwrap_or(""),
                _ => inner.as_str(),
            };
            table
                .column_position(name)
                .map(Expr::Column)
                .ok_or_else(|| DepensesError::Filter(format!("name '{name}' is not defined")))
        }
        other => Err(DepensesError::Filter(format!("unexpected {other:?}"))),
    }
}

fn next_operand(inner: &mut pest::iterators::Pairs<'_, Rule>, table: &Table) -> Result<Expr> {
    let p = inner
        .next()
        .ok_or_else(|| DepensesError::Filter("missing operand".into()))?;
    build(p, table)
}

fn collapse(mut items: Vec<Expr>, wrap: fn(Vec<Expr>) -> Expr) -> Expr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

fn cmp_op(pair: Pair<'_>) -> Result<CmpOp> {
    let rule = pair.into_inner().next().map(|p| p.as_rule());
    match rule {
        Some(Rule::eq) => Ok(CmpOp::Eq),
        Some(Rule::ne) => Ok(CmpOp::Ne),
        Some(Rule::lt) => Ok(CmpOp::Lt),
        Some(Rule::le) => Ok(CmpOp::Le),
        Some(Rule::gt) => Ok(CmpOp::Gt),
        Some(Rule::ge) => Ok(CmpOp::Ge),
        Some(Rule::in_op) => Ok(CmpOp::In),
        Some(Rule::not_in) => Ok(CmpOp::NotIn),
        other => Err(DepensesError::Filter(format!("unknown comparison {other:?}"))),
    }
}

fn arith_op(pair: Pair<'_>) -> Result<ArithOp> {
    let rule = pair.into_inner().next().map(|p| p.as_rule());
    match rule {
        Some(Rule::plus) => Ok(ArithOp::Add),
        Some(Rule::minus) => Ok(ArithOp::Sub),
        Some(Rule::times) => Ok(ArithOp::Mul),
        Some(Rule::divide) => Ok(ArithOp::Div),
        Some(Rule::modulo) => Ok(ArithOp::Rem),
        other => Err(DepensesError::Filter(format!("unknown operator {other:?}"))),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn eval(expr: &Expr, row: &[Value]) -> Result<Operand> {
    match expr {
        Expr::Column(i) => Ok(Operand::Val(row.get(*i).cloned().unwrap_or(Value::Empty))),
        Expr::Literal(v) => Ok(Operand::Val(v.clone())),
        Expr::Bool(b) => Ok(Operand::Bool(*b)),
        Expr::List(items) => Ok(Operand::List(
            items.iter().map(|e| eval(e, row)).collect::<Result<Vec<_>>>()?,
        )),
        Expr::Neg(inner) => match eval(inner, row)? {
            Operand::Val(Value::Number(n)) => Ok(Operand::Val(Value::Number(-n))),
            Operand::Val(Value::Empty) => Ok(Operand::Val(Value::Empty)),
            other => Err(type_error("unary -", &other, None)),
        },
        Expr::Not(inner) => Ok(Operand::Bool(!as_bool(eval(inner, row)?)?)),
        Expr::Arith(op, lhs, rhs) => arith(*op, eval(lhs, row)?, eval(rhs, row)?),
        Expr::Compare(first, rest) => {
            let mut lhs = eval(first, row)?;
            let mut all = true;
            for (op, rhs) in rest {
                let rhs = eval(rhs, row)?;
                all &= compare(*op, &lhs, &rhs)?;
                lhs = rhs;
            }
            Ok(Operand::Bool(all))
        }
        // both sides are always evaluated so type errors surface on every row
        Expr::And(items) => {
            let mut all = true;
            for e in items {
                all &= as_bool(eval(e, row)?)?;
            }
            Ok(Operand::Bool(all))
        }
        Expr::Or(items) => {
            let mut any = false;
            for e in items {
                any |= as_bool(eval(e, row)?)?;
            }
            Ok(Operand::Bool(any))
        }
    }
}

fn type_error(op: &str, lhs: &Operand, rhs: Option<&Operand>) -> DepensesError {
    match rhs {
        Some(rhs) => DepensesError::Filter(format!(
            "'{op}' not supported between {} and {}",
            lhs.kind(),
            rhs.kind()
        )),
        None => DepensesError::Filter(format!("'{op}' not supported for {}", lhs.kind())),
    }
}

fn as_bool(op: Operand) -> Result<bool> {
    match op {
        Operand::Bool(b) => Ok(b),
        other => Err(DepensesError::Filter(format!(
            "expected a boolean, found {}",
            other.kind()
        ))),
    }
}

fn arith(op: ArithOp, lhs: Operand, rhs: Operand) -> Result<Operand> {
    let symbol = match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
        ArithOp::Rem => "%",
    };
    match (&lhs, &rhs) {
        (Operand::Val(Value::Number(a)), Operand::Val(Value::Number(b))) => {
            let n = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Rem => a % b,
            };
            Ok(Operand::Val(Value::Number(n)))
        }
        (Operand::Val(Value::Text(a)), Operand::Val(Value::Text(b))) if op == ArithOp::Add => {
            Ok(Operand::Val(Value::Text(format!("{a}{b}"))))
        }
        (Operand::Val(Value::Empty), Operand::Val(Value::Number(_) | Value::Empty))
        | (Operand::Val(Value::Number(_)), Operand::Val(Value::Empty)) => {
            Ok(Operand::Val(Value::Empty))
        }
        _ => Err(type_error(symbol, &lhs, Some(&rhs))),
    }
}

/// Dates compare against text in `DD/MM/YYYY` or `YYYY-MM-DD`; months
/// against `MM/YYYY` or `YYYY-MM`.
fn coerce_text(text: &str, like: &Value) -> Option<Value> {
    let text = text.trim();
    match like {
        Value::Date(_) => ["%d/%m/%Y", "%Y-%m-%d"]
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
            .map(Value::Date),
        Value::Month(_) => ["%d/%m/%Y", "%Y-%m-%d"]
            .iter()
            .zip([format!("01/{text}"), format!("{text}-01")])
            .find_map(|(f, t)| NaiveDate::parse_from_str(&t, f).ok())
            .map(Value::Month),
        _ => None,
    }
}

/// Orders two values of compatible kinds; `None` when either side is empty.
fn order(op: CmpOp, a: &Value, b: &Value) -> Result<Option<std::cmp::Ordering>> {
    let mismatch = || {
        DepensesError::Filter(format!(
            "'{}' not supported between {} and {}",
            op.symbol(),
            a.kind(),
            b.kind()
        ))
    };
    match (a, b) {
        (Value::Empty, _) | (_, Value::Empty) => Ok(None),
        (Value::Number(_), Value::Number(_))
        | (Value::Text(_), Value::Text(_))
        | (Value::Date(_), Value::Date(_))
        | (Value::Month(_), Value::Month(_)) => Ok(Some(a.cmp(b))),
        (Value::Text(t), other @ (Value::Date(_) | Value::Month(_))) => {
            let t = coerce_text(t, other).ok_or_else(mismatch)?;
            Ok(Some(t.cmp(other)))
        }
        (other @ (Value::Date(_) | Value::Month(_)), Value::Text(t)) => {
            let t = coerce_text(t, other).ok_or_else(mismatch)?;
            Ok(Some(other.cmp(&t)))
        }
        _ => Err(mismatch()),
    }
}

fn equals(a: &Operand, b: &Operand) -> bool {
    match (a, b) {
        (Operand::Val(x), Operand::Val(y)) => match order(CmpOp::Eq, x, y) {
            Ok(Some(o)) => o.is_eq(),
            _ => false,
        },
        (Operand::Bool(x), Operand::Bool(y)) => x == y,
        (Operand::List(x), Operand::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| equals(a, b))
        }
        _ => false,
    }
}

fn compare(op: CmpOp, lhs: &Operand, rhs: &Operand) -> Result<bool> {
    match op {
        CmpOp::Eq => Ok(equals(lhs, rhs)),
        CmpOp::Ne => Ok(!equals(lhs, rhs)),
        CmpOp::In | CmpOp::NotIn => {
            let found = match rhs {
                Operand::List(items) => items.iter().any(|item| equals(lhs, item)),
                single => equals(lhs, single),
            };
            Ok(found == (op == CmpOp::In))
        }
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let (Operand::Val(a), Operand::Val(b)) = (lhs, rhs) else {
                return Err(type_error(op.symbol(), lhs, Some(rhs)));
            };
            Ok(match order(op, a, b)? {
                None => false,
                Some(o) => match op {
                    CmpOp::Lt => o.is_lt(),
                    CmpOp::Le => o.is_le(),
                    CmpOp::Gt => o.is_gt(),
                    _ => o.is_ge(),
                },
            })
        }
    }
}
