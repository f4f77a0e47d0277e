//! Predicate expression tree.
//!
//! Expressions refer to entity properties rather than columns. Property
//! references are resolved and quoted when a statement is built, and every
//! value is bound as a parameter; only [`Expr::raw`] fragments reach the SQL
//! text verbatim.

use oxide_entity_core::dialect::Dialect;
use oxide_entity_core::value::{SqlValue, ToSqlValue};

use crate::error::Result;

/// Creates a property reference: `"alias.path"`, or `"path"` on the root
/// entity of a select.
#[must_use]
pub fn prop(path: &str) -> Expr {
    Expr::Property(String::from(path))
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl BinaryOp {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// A predicate or operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Property reference.
    Property(String),
    /// Bound value.
    Value(SqlValue),
    /// Verbatim SQL.
    Raw(String),
    /// Binary operation.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `IS NULL` / `IS NOT NULL`.
    IsNull {
        /// Operand.
        expr: Box<Expr>,
        /// `IS NOT NULL` when set.
        negated: bool,
    },
    /// `[NOT] BETWEEN low AND high`.
    Between {
        /// Operand.
        expr: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
        /// `NOT BETWEEN` when set.
        negated: bool,
    },
    /// `[NOT] IN (...)`.
    InList {
        /// Operand.
        expr: Box<Expr>,
        /// Candidates.
        list: Vec<Expr>,
        /// `NOT IN` when set.
        negated: bool,
    },
    /// `NOT expr`.
    Not(Box<Expr>),
    /// `(expr)`.
    Paren(Box<Expr>),
}

impl Expr {
    /// A bound value.
    #[must_use]
    pub fn value<T: ToSqlValue>(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }

    /// Raw SQL passed through verbatim.
    ///
    /// **Warning**: never build raw fragments from user input.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    fn binary(self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// `self = value`
    #[must_use]
    pub fn eq<T: ToSqlValue>(self, value: T) -> Self {
        self.binary(BinaryOp::Eq, Self::value(value))
    }

    /// `self <> value`
    #[must_use]
    pub fn not_eq<T: ToSqlValue>(self, value: T) -> Self {
        self.binary(BinaryOp::NotEq, Self::value(value))
    }

    /// `self < value`
    #[must_use]
    pub fn lt<T: ToSqlValue>(self, value: T) -> Self {
        self.binary(BinaryOp::Lt, Self::value(value))
    }

    /// `self <= value`
    #[must_use]
    pub fn lt_eq<T: ToSqlValue>(self, value: T) -> Self {
        self.binary(BinaryOp::LtEq, Self::value(value))
    }

    /// `self > value`
    #[must_use]
    pub fn gt<T: ToSqlValue>(self, value: T) -> Self {
        self.binary(BinaryOp::Gt, Self::value(value))
    }

    /// `self >= value`
    #[must_use]
    pub fn gt_eq<T: ToSqlValue>(self, value: T) -> Self {
        self.binary(BinaryOp::GtEq, Self::value(value))
    }

    /// `self LIKE pattern`
    #[must_use]
    pub fn like<T: ToSqlValue>(self, pattern: T) -> Self {
        self.binary(BinaryOp::Like, Self::value(pattern))
    }

    /// `self NOT LIKE pattern`
    #[must_use]
    pub fn not_like<T: ToSqlValue>(self, pattern: T) -> Self {
        self.binary(BinaryOp::NotLike, Self::value(pattern))
    }

    /// Compares two expressions with `=` (e.g. two properties).
    #[must_use]
    pub fn eq_expr(self, other: Self) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// `self IS NULL`
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// `self IS NOT NULL`
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// `self BETWEEN low AND high`
    #[must_use]
    pub fn between<T: ToSqlValue, U: ToSqlValue>(self, low: T, high: U) -> Self {
        Self::Between {
            expr: Box::new(self),
            low: Box::new(Self::value(low)),
            high: Box::new(Self::value(high)),
            negated: false,
        }
    }

    /// `self IN (values)`
    #[must_use]
    pub fn in_list<T: ToSqlValue>(self, values: Vec<T>) -> Self {
        Self::InList {
            expr: Box::new(self),
            list: values.into_iter().map(Self::value).collect(),
            negated: false,
        }
    }

    /// `self NOT IN (values)`
    #[must_use]
    pub fn not_in_list<T: ToSqlValue>(self, values: Vec<T>) -> Self {
        Self::InList {
            expr: Box::new(self),
            list: values.into_iter().map(Self::value).collect(),
            negated: true,
        }
    }

    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// `NOT self`
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `(self)`
    #[must_use]
    pub fn paren(self) -> Self {
        Self::Paren(Box::new(self))
    }

    /// Renders the expression, resolving properties through `resolver` and
    /// binding values into `writer`.
    pub fn render(&self, writer: &mut SqlWriter<'_>, resolver: &dyn PropertyResolver) -> Result<String> {
        Ok(match self {
            Self::Property(path) => resolver.resolve(path)?,
            Self::Value(value) => writer.bind(value.clone()),
            Self::Raw(sql) => sql.clone(),
            Self::Binary { left, op, right } => {
                let left = left.render_operand(writer, resolver, Some(*op))?;
                let right = right.render_operand(writer, resolver, Some(*op))?;
                format!("{left} {} {right}", op.as_sql())
            }
            Self::IsNull { expr, negated } => {
                let expr = expr.render(writer, resolver)?;
                if *negated {
                    format!("{expr} IS NOT NULL")
                } else {
                    format!("{expr} IS NULL")
                }
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let expr = expr.render(writer, resolver)?;
                let low = low.render(writer, resolver)?;
                let high = high.render(writer, resolver)?;
                let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{expr} {keyword} {low} AND {high}")
            }
            Self::InList { expr, list, negated } => {
                let expr = expr.render(writer, resolver)?;
                let keyword = if *negated { "NOT IN" } else { "IN" };
                if list.is_empty() {
                    // `IN ()` is not valid SQL
                    return Ok(String::from(if *negated { "1 = 1" } else { "1 = 0" }));
                }
                let items = list
                    .iter()
                    .map(|e| e.render(writer, resolver))
                    .collect::<Result<Vec<_>>>()?;
                format!("{expr} {keyword} ({})", items.join(", "))
            }
            Self::Not(expr) => format!("NOT {}", expr.render_operand(writer, resolver, None)?),
            Self::Paren(expr) => format!("({})", expr.render(writer, resolver)?),
        })
    }

    /// Renders an operand of `parent` (`None` for `NOT`), grouping a logical
    /// operand whose connective differs from its parent's.
    fn render_operand(
        &self,
        writer: &mut SqlWriter<'_>,
        resolver: &dyn PropertyResolver,
        parent: Option<BinaryOp>,
    ) -> Result<String> {
        let sql = self.render(writer, resolver)?;
        let grouped = match self {
            Self::Binary { op, .. } if op.is_logical() => parent != Some(*op),
            Self::Binary { .. } | Self::Between { .. } | Self::InList { .. } | Self::IsNull { .. } => {
                parent.is_none()
            }
            Self::Not(_) => parent.is_some_and(|op| !op.is_logical()),
            _ => false,
        };
        Ok(if grouped { format!("({sql})") } else { sql })
    }
}

/// Resolves property references to quoted, qualified column SQL.
pub trait PropertyResolver {
    /// Resolves `path`.
    fn resolve(&self, path: &str) -> Result<String>;
}

/// Accumulates bound parameters and numbers placeholders in text order.
#[derive(Debug)]
pub struct SqlWriter<'d> {
    dialect: &'d dyn Dialect,
    params: Vec<SqlValue>,
}

impl<'d> SqlWriter<'d> {
    /// Creates a writer for `dialect`.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Dialect the statement is written for.
    #[must_use]
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Binds `value` and returns its placeholder.
    pub fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    /// Number of parameters bound so far.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    /// Quotes an identifier.
    #[must_use]
    pub fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    /// Finishes the statement.
    #[must_use]
    pub fn finish(self, sql: String) -> CompiledQuery {
        CompiledQuery {
            sql,
            parameters: self.params,
        }
    }
}

/// SQL text with its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub parameters: Vec<SqlValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use oxide_entity_core::dialect::{dialect_for, DialectKind};

    struct Plain;

    impl PropertyResolver for Plain {
        fn resolve(&self, path: &str) -> Result<String> {
            if path == "missing" {
                return Err(QueryError::UnknownAlias(path.to_string()));
            }
            Ok(format!("\"{path}\""))
        }
    }

    fn render(expr: &Expr, kind: DialectKind) -> (String, Vec<SqlValue>) {
        let mut writer = SqlWriter::new(dialect_for(kind));
        let sql = expr.render(&mut writer, &Plain).unwrap();
        let compiled = writer.finish(sql);
        (compiled.sql, compiled.parameters)
    }

    #[test]
    fn values_are_bound_in_order() {
        let expr = prop("age").gt(18).and(prop("name").like("A%"));
        let (sql, params) = render(&expr, DialectKind::Postgres);
        assert_eq!(sql, "\"age\" > $1 AND \"name\" LIKE $2");

        // mixed connectives keep the grouping of the tree
        let expr = prop("a").eq(1).or(prop("b").eq(2)).and(prop("c").eq(3));
        let (sql, params) = render(&expr, DialectKind::Sqlite);
        assert_eq!(sql, "(\"a\" = ? OR \"b\" = ?) AND \"c\" = ?");
        assert_eq!(params, vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]);

        let expr = prop("a").eq(1).and(prop("b").eq(2).or(prop("c").eq(3)));
        let (sql, _) = render(&expr, DialectKind::Sqlite);
        assert_eq!(sql, "\"a\" = ? AND (\"b\" = ? OR \"c\" = ?)");
        assert_eq!(params, vec![SqlValue::Int(18), SqlValue::Text("A%".into())]);
    }

    #[test]
    fn injection_stays_in_parameters() {
        let input = "'; DROP TABLE users; --";
        let (sql, params) = render(&prop("name").eq(input), DialectKind::Sqlite);
        assert_eq!(sql, "\"name\" = ?");
        assert_eq!(params, vec![SqlValue::Text(input.into())]);
    }

    #[test]
    fn in_list_between_and_null() {
        let expr = prop("id")
            .in_list(vec![1, 2])
            .and(prop("age").between(1, 9))
            .or(prop("deleted").is_not_null().paren().not());
        let (sql, params) = render(&expr, DialectKind::Mssql);
        assert_eq!(
            sql,
            "(\"id\" IN (@p1, @p2) AND \"age\" BETWEEN @p3 AND @p4) OR NOT (\"deleted\" IS NOT NULL)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn not_groups_its_operand() {
        let expr = prop("a").eq(1).and(prop("b").eq(2)).not();
        let (sql, _) = render(&expr, DialectKind::Sqlite);
        assert_eq!(sql, "NOT (\"a\" = ? AND \"b\" = ?)");

        let (sql, _) = render(&prop("a").is_null().not(), DialectKind::Sqlite);
        assert_eq!(sql, "NOT (\"a\" IS NULL)");
    }

    #[test]
    fn empty_in_list_is_false() {
        let (sql, params) = render(&prop("id").in_list(Vec::<i64>::new()), DialectKind::Sqlite);
        assert_eq!(sql, "1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn raw_fragments_pass_through() {
        let (sql, params) = render(&prop("n").eq_expr(Expr::raw("LOWER('X')")), DialectKind::Sqlite);
        assert_eq!(sql, "\"n\" = LOWER('X')");
        assert!(params.is_empty());
    }

    #[test]
    fn resolver_errors_propagate() {
        let mut writer = SqlWriter::new(dialect_for(DialectKind::Sqlite));
        let err = prop("missing").eq(1).render(&mut writer, &Plain).unwrap_err();
        assert_eq!(err, QueryError::UnknownAlias("missing".into()));
    }
}
