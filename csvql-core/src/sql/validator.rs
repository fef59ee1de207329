//! The SQL validator (spec §4.6): parses with `sqlparser` under
//! `MySqlDialect` — the Rust analogue of the original's
//! `sqlglot.parse_one(sql, read="mysql")` — then walks the accepted AST
//! shape and produces a `PlanDescriptor`.

use sqlparser::ast::{
    BinaryOperator, Expr, GroupByExpr, Ident, Query, Select, SelectItem, SetExpr, Statement,
    TableFactor, UnaryOperator, Value,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use crate::catalog::TableSchema;
use crate::error::EngineError;
use crate::sql::predicate::{CompareMode, CompareOp, CompiledPredicate};
use crate::types::{convert, TypeFamily};

/// The projection half of a validated query: either the bare wildcard or an
/// explicit, schema-checked column list (spec §4.6's `table.*` desugars to
/// the same wildcard case).
#[derive(Debug, Clone)]
pub enum Projection {
    Wildcard,
    Columns(Vec<String>),
}

/// The parsed-and-validated shape of one query (spec §4.6 "Returned plan
/// descriptor").
#[derive(Debug, Clone)]
pub struct PlanDescriptor {
    pub table: String,
    pub projection: Projection,
    pub predicate: Option<CompiledPredicate>,
}

fn validation(msg: impl Into<String>) -> EngineError {
    EngineError::validation(msg.into())
}

/// Parses `sql`, validates it against `db`/`schema`, and returns the plan
/// descriptor. `table_name` is the name the caller resolved `schema` under
/// (used to check the `FROM` clause's table identifier matches).
pub fn parse_and_validate(
    sql: &str,
    db: &str,
    table_name: &str,
    schema: &TableSchema,
) -> Result<PlanDescriptor, EngineError> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql).map_err(|_| validation("syntax"))?;
    let statement = match statements.as_slice() {
        [one] => one,
        _ => return Err(validation("exactly one statement is required")),
    };

    let query = match statement {
        Statement::Query(q) => q.as_ref(),
        _ => return Err(validation("only SELECT is supported")),
    };
    validate_query_shape(query)?;

    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select.as_ref(),
        _ => return Err(validation("only a single SELECT is supported")),
    };

    validate_from(select, db, table_name)?;
    validate_select_extras(select)?;
    let projection = validate_projection(select, db, table_name, schema)?;
    let predicate = match &select.selection {
        None => None,
        Some(expr) => match compile(expr, schema, db, table_name)? {
            ExprResult::Bool(true) => None,
            ExprResult::Bool(false) => Some(CompiledPredicate::Const(false)),
            ExprResult::Pred(p) => Some(p),
        },
    };

    Ok(PlanDescriptor {
        table: table_name.to_string(),
        projection,
        predicate,
    })
}

/// Parses just far enough to read the `FROM` clause's table identifier,
/// without a schema in hand yet — the engine facade needs the table name to
/// look up the schema before running full validation.
pub fn extract_table_name(sql: &str, db: &str) -> Result<String, EngineError> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql).map_err(|_| validation("syntax"))?;
    let statement = match statements.as_slice() {
        [one] => one,
        _ => return Err(validation("exactly one statement is required")),
    };
    let query = match statement {
        Statement::Query(q) => q.as_ref(),
        _ => return Err(validation("only SELECT is supported")),
    };
    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select.as_ref(),
        _ => return Err(validation("only a single SELECT is supported")),
    };
    let [table] = select.from.as_slice() else {
        return Err(validation("exactly one table in FROM is required"));
    };
    match &table.relation {
        TableFactor::Table { name, .. } => {
            let parts: Vec<&str> = name.0.iter().map(ident_value).collect();
            match parts.as_slice() {
                [t] => Ok((*t).to_string()),
                [d, t] => {
                    if !d.eq_ignore_ascii_case(db) {
                        return Err(validation("unknown database qualifier"));
                    }
                    Ok((*t).to_string())
                }
                _ => Err(validation("invalid table reference")),
            }
        }
        _ => Err(validation("FROM must name a single table")),
    }
}

fn validate_query_shape(query: &Query) -> Result<(), EngineError> {
    if query.order_by.is_some() {
        return Err(validation("ORDER BY is not supported"));
    }
    if query.limit.is_some() {
        return Err(validation("LIMIT is not supported"));
    }
    Ok(())
}

fn validate_from(select: &Select, db: &str, table_name: &str) -> Result<(), EngineError> {
    let [table] = select.from.as_slice() else {
        return Err(validation("exactly one table in FROM is required"));
    };
    if !table.joins.is_empty() {
        return Err(validation("joins are not supported"));
    }
    match &table.relation {
        TableFactor::Table { name, alias, .. } => {
            if alias.is_some() {
                return Err(validation("table aliases are not supported"));
            }
            let parts: Vec<&str> = name.0.iter().map(ident_value).collect();
            match parts.as_slice() {
                [t] => {
                    if !t.eq_ignore_ascii_case(table_name) {
                        return Err(validation("unknown table"));
                    }
                }
                [d, t] => {
                    if !d.eq_ignore_ascii_case(db) || !t.eq_ignore_ascii_case(table_name) {
                        return Err(validation("unknown table"));
                    }
                }
                _ => return Err(validation("invalid table reference")),
            }
            Ok(())
        }
        _ => Err(validation("FROM must name a single table")),
    }
}

/// Rejects the aggregate-query shape the Non-goals explicitly exclude:
/// `GROUP BY`, `HAVING`, `DISTINCT` (spec §1 Non-goals, §4.6's accepted
/// grammar never mentions any of the three).
fn validate_select_extras(select: &Select) -> Result<(), EngineError> {
    if select.distinct.is_some() {
        return Err(validation("DISTINCT is not supported"));
    }
    match &select.group_by {
        GroupByExpr::Expressions(exprs, ..) if !exprs.is_empty() => {
            return Err(validation("GROUP BY is not supported"))
        }
        GroupByExpr::All(..) => return Err(validation("GROUP BY is not supported")),
        _ => {}
    }
    if select.having.is_some() {
        return Err(validation("HAVING is not supported"));
    }
    Ok(())
}

fn ident_value(id: &Ident) -> &str {
    id.value.as_str()
}

fn validate_projection(
    select: &Select,
    db: &str,
    table_name: &str,
    schema: &TableSchema,
) -> Result<Projection, EngineError> {
    let items = &select.projection;
    if items.is_empty() {
        return Err(validation("empty projection"));
    }

    let has_wildcard = items.iter().any(|item| {
        matches!(item, SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..))
    });
    if has_wildcard {
        if items.len() != 1 {
            return Err(validation("wildcard cannot be combined with other columns"));
        }
        if let SelectItem::QualifiedWildcard(name, _) = &items[0] {
            let parts: Vec<String> = name.0.iter().map(|i| ident_value(i).to_string()).collect();
            check_prefix(&parts, db, table_name)?;
        }
        return Ok(Projection::Wildcard);
    }

    let mut columns = Vec::with_capacity(items.len());
    for item in items {
        let expr = match item {
            SelectItem::UnnamedExpr(expr) => expr,
            SelectItem::ExprWithAlias { .. } => {
                return Err(validation("column aliases are not supported"))
            }
            _ => return Err(validation("unsupported projection item")),
        };
        let name = match expr {
            Expr::Identifier(id) => ident_value(id).to_string(),
            Expr::CompoundIdentifier(parts) => {
                let raw: Vec<&str> = parts.iter().map(ident_value).collect();
                resolve_qualified_column(&raw, db, table_name)?
            }
            _ => return Err(validation("projections must be plain column references")),
        };
        if schema.index_of(&name).is_none() {
            return Err(validation(format!("unknown column: {name}")));
        }
        columns.push(name);
    }

    Ok(Projection::Columns(columns))
}


fn check_prefix(parts: &[String], db: &str, table_name: &str) -> Result<(), EngineError> {
    let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
    resolve_qualified_column(&refs, db, table_name).map(|_| ())
}

/// Resolves a (possibly) `db.table.col`/`table.col`/`col` reference down to
/// the bare column name, checking any given prefix against `db`/`table_name`.
fn resolve_qualified_column(parts: &[&str], db: &str, table_name: &str) -> Result<String, EngineError> {
    match parts {
        [] => Err(validation("empty column reference")),
        [col] => Ok((*col).to_string()),
        [t, col] => {
            if !t.eq_ignore_ascii_case(table_name) {
                return Err(validation("unknown table qualifier"));
            }
            Ok((*col).to_string())
        }
        [d, t, col] => {
            if !d.eq_ignore_ascii_case(db) || !t.eq_ignore_ascii_case(table_name) {
                return Err(validation("unknown table/database qualifier"));
            }
            Ok((*col).to_string())
        }
        _ => Err(validation("invalid column reference")),
    }
}

enum ExprResult {
    Bool(bool),
    Pred(CompiledPredicate),
}

fn to_pred(r: ExprResult) -> CompiledPredicate {
    match r {
        ExprResult::Bool(b) => CompiledPredicate::Const(b),
        ExprResult::Pred(p) => p,
    }
}

fn compile(expr: &Expr, schema: &TableSchema, db: &str, table_name: &str) -> Result<ExprResult, EngineError> {
    match expr {
        Expr::Nested(inner) => compile(inner, schema, db, table_name),
        Expr::Value(v) if matches!(v, Value::Boolean(_)) => {
            let Value::Boolean(b) = v else { unreachable!() };
            Ok(ExprResult::Bool(*b))
        }
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And | BinaryOperator::Or => {
                let l = compile(left, schema, db, table_name)?;
                let r = compile(right, schema, db, table_name)?;
                Ok(fold_logical(*op == BinaryOperator::And, l, r))
            }
            _ => {
                let cmp_op = map_compare_op(op).ok_or_else(|| validation("unsupported operator"))?;
                let left_operand = operand_of(left, schema, db, table_name)?;
                let right_operand = operand_of(right, schema, db, table_name)?;
                build_comparison(left_operand, cmp_op, right_operand)
            }
        },
        _ => Err(validation("unsupported WHERE expression")),
    }
}

fn fold_logical(is_and: bool, l: ExprResult, r: ExprResult) -> ExprResult {
    match (l, r) {
        (ExprResult::Bool(lb), ExprResult::Bool(rb)) => {
            ExprResult::Bool(if is_and { lb && rb } else { lb || rb })
        }
        (ExprResult::Bool(b), other) | (other, ExprResult::Bool(b)) => {
            if is_and {
                if b {
                    other
                } else {
                    ExprResult::Bool(false)
                }
            } else if b {
                ExprResult::Bool(true)
            } else {
                other
            }
        }
        (l, r) => {
            let (lp, rp) = (Box::new(to_pred(l)), Box::new(to_pred(r)));
            ExprResult::Pred(if is_and {
                CompiledPredicate::And(lp, rp)
            } else {
                CompiledPredicate::Or(lp, rp)
            })
        }
    }
}

fn map_compare_op(op: &BinaryOperator) -> Option<CompareOp> {
    match op {
        BinaryOperator::Eq => Some(CompareOp::Eq),
        BinaryOperator::NotEq => Some(CompareOp::Ne),
        BinaryOperator::Lt => Some(CompareOp::Lt),
        BinaryOperator::LtEq => Some(CompareOp::Le),
        BinaryOperator::Gt => Some(CompareOp::Gt),
        BinaryOperator::GtEq => Some(CompareOp::Ge),
        _ => None,
    }
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Eq => CompareOp::Eq,
        CompareOp::Ne => CompareOp::Ne,
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
    }
}

#[derive(Debug)]
enum Operand {
    Column { index: usize, family: TypeFamily, declared_type: String },
    Number(f64),
    Str(String),
    Bool(bool),
}

fn operand_of(expr: &Expr, schema: &TableSchema, db: &str, table_name: &str) -> Result<Operand, EngineError> {
    match expr {
        Expr::Identifier(id) => column_operand(ident_value(id), schema),
        Expr::CompoundIdentifier(parts) => {
            let raw: Vec<&str> = parts.iter().map(ident_value).collect();
            let name = resolve_qualified_column(&raw, db, table_name)?;
            column_operand(&name, schema)
        }
        Expr::Value(Value::Number(s, _)) => s
            .parse::<f64>()
            .map(Operand::Number)
            .map_err(|_| validation(format!("invalid number literal: {s}"))),
        Expr::Value(Value::SingleQuotedString(s)) => Ok(Operand::Str(s.clone())),
        Expr::Value(Value::Boolean(b)) => Ok(Operand::Bool(*b)),
        Expr::UnaryOp { op: UnaryOperator::Minus, expr } => match operand_of(expr, schema, db, table_name)? {
            Operand::Number(n) => Ok(Operand::Number(-n)),
            _ => Err(validation("unary minus only applies to number literals")),
        },
        Expr::Nested(inner) => operand_of(inner, schema, db, table_name),
        _ => Err(validation("unsupported operand in WHERE")),
    }
}

fn column_operand(name: &str, schema: &TableSchema) -> Result<Operand, EngineError> {
    let index = schema
        .index_of(name)
        .ok_or_else(|| validation(format!("unknown column: {name}")))?;
    let declared_type = schema.columns[index].declared_type.clone();
    let family = TypeFamily::normalize(&declared_type)
        .ok_or_else(|| EngineError::data_access(format!("unknown column type: {declared_type}")))?;
    Ok(Operand::Column { index, family, declared_type })
}

fn is_column(o: &Operand) -> bool {
    matches!(o, Operand::Column { .. })
}

fn build_comparison(left: Operand, op: CompareOp, right: Operand) -> Result<ExprResult, EngineError> {
    match (is_column(&left), is_column(&right)) {
        (true, true) => column_vs_column(left, op, right),
        (true, false) => column_vs_literal(col_parts(left)?, op, right),
        (false, true) => column_vs_literal(col_parts(right)?, flip(op), left),
        (false, false) => literal_vs_literal(left, op, right),
    }
}

fn col_parts(o: Operand) -> Result<(usize, TypeFamily, String), EngineError> {
    match o {
        Operand::Column { index, family, declared_type } => Ok((index, family, declared_type)),
        _ => Err(validation("expected a column operand")),
    }
}

fn column_vs_column(left: Operand, op: CompareOp, right: Operand) -> Result<ExprResult, EngineError> {
    let (l_idx, l_fam, _) = col_parts(left)?;
    let (r_idx, r_fam, _) = col_parts(right)?;
    let mode = if l_fam.comparability_class() == crate::types::ComparabilityClass::Numeric
        && r_fam.comparability_class() == crate::types::ComparabilityClass::Numeric
    {
        CompareMode::Numeric
    } else if l_fam.is_stringlike() && r_fam.is_stringlike() {
        CompareMode::Natural
    } else {
        return Err(validation("type mismatch comparing columns"));
    };
    Ok(ExprResult::Pred(CompiledPredicate::CmpColCol {
        left: l_idx,
        right: r_idx,
        op,
        mode,
    }))
}

fn column_vs_literal(col: (usize, TypeFamily, String), op: CompareOp, literal: Operand) -> Result<ExprResult, EngineError> {
    let (index, family, declared_type) = col;
    use crate::types::ComparabilityClass::*;
    match (family.comparability_class(), literal) {
        (Numeric, Operand::Number(n)) => Ok(ExprResult::Pred(CompiledPredicate::CmpColLit {
            col: index,
            op,
            mode: CompareMode::Numeric,
            literal: crate::types::CellValue::Float(n),
        })),
        (Numeric, Operand::Bool(b)) => Ok(ExprResult::Pred(CompiledPredicate::CmpColLit {
            col: index,
            op,
            mode: CompareMode::Numeric,
            literal: crate::types::CellValue::Boolean(b),
        })),
        (Numeric, Operand::Str(_)) => Err(validation("type mismatch: numeric column vs string literal")),
        (Quoted, Operand::Str(s)) => {
            let converted = convert(&s, &declared_type).map_err(|e| validation(e.message().to_string()))?;
            Ok(ExprResult::Pred(CompiledPredicate::CmpColLit {
                col: index,
                op,
                mode: CompareMode::Natural,
                literal: converted,
            }))
        }
        (Quoted, Operand::Number(_)) => Err(validation("type mismatch: quoted column vs numeric literal")),
        (Quoted, Operand::Bool(_)) => Err(validation("type mismatch: quoted column vs boolean literal")),
        (_, Operand::Column { .. }) => unreachable!("column operand handled by column_vs_column"),
    }
}

fn literal_vs_literal(left: Operand, op: CompareOp, right: Operand) -> Result<ExprResult, EngineError> {
    let result = match (left, right) {
        (Operand::Number(a), Operand::Number(b)) => apply(op, a.partial_cmp(&b)),
        (Operand::Bool(a), Operand::Bool(b)) => apply(op, numeric(a).partial_cmp(&numeric(b))),
        (Operand::Bool(a), Operand::Number(b)) => apply(op, numeric(a).partial_cmp(&b)),
        (Operand::Number(a), Operand::Bool(b)) => apply(op, a.partial_cmp(&numeric(b))),
        (Operand::Str(a), Operand::Str(b)) => apply(op, Some(a.cmp(&b))),
        _ => return Err(validation("type mismatch comparing literals")),
    };
    Ok(ExprResult::Bool(result))
}

fn numeric(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn apply(op: CompareOp, ord: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match ord {
        Some(Equal) => matches!(op, CompareOp::Eq | CompareOp::Le | CompareOp::Ge),
        Some(Less) => matches!(op, CompareOp::Ne | CompareOp::Lt | CompareOp::Le),
        Some(Greater) => matches!(op, CompareOp::Ne | CompareOp::Gt | CompareOp::Ge),
        None => false,
    }
}
