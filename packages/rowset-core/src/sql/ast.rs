//! Parsed statement trees.

use crate::store::ColumnDef;
use crate::value::Value;

/// A parsed statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
    Insert {
        table: String,
        /// Explicit column list, or `None` for declaration order
        columns: Option<Vec<String>>,
        values: Vec<Vec<Expression>>,
    },
    Update {
        table: String,
        set: Vec<(ColumnRef, Expression)>,
        filter: Vec<Comparison>,
    },
    Delete {
        table: String,
        filter: Vec<Comparison>,
    },
    Select {
        table: String,
        /// Projected columns, or `None` for `*`
        columns: Option<Vec<ColumnRef>>,
        filter: Vec<Comparison>,
        order_by: Vec<(ColumnRef, Direction)>,
    },
}

impl Statement {
    /// Returns whether executing the statement yields rows.
    pub fn is_query(&self) -> bool {
        matches!(self, Statement::Select { .. })
    }

    /// Number of `?` placeholders in the statement.
    pub fn parameter_count(&self) -> usize {
        let in_filter = |filter: &[Comparison]| {
            filter
                .iter()
                .filter(|c| matches!(c.value, Expression::Parameter(_)))
                .count()
        };
        match self {
            Statement::CreateTable { .. } | Statement::DropTable { .. } => 0,
            Statement::Insert { values, .. } => values
                .iter()
                .flatten()
                .filter(|e| matches!(e, Expression::Parameter(_)))
                .count(),
            Statement::Update { set, filter, .. } => {
                set.iter()
                    .filter(|(_, e)| matches!(e, Expression::Parameter(_)))
                    .count()
                    + in_filter(filter)
            }
            Statement::Delete { filter, .. } | Statement::Select { filter, .. } => in_filter(filter),
        }
    }
}

/// A column reference, optionally qualified by its table name.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A value position: literal or positional parameter (0-based).
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Literal(Value),
    Parameter(usize),
}

/// Comparison operators usable in WHERE clauses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl Operator {
    /// Evaluates the operator against an ordering of left versus right.
    pub fn matches(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Operator::Equal => ordering == Equal,
            Operator::NotEqual => ordering != Equal,
            Operator::LessThan => ordering == Less,
            Operator::LessOrEqual => ordering != Greater,
            Operator::GreaterThan => ordering == Greater,
            Operator::GreaterOrEqual => ordering != Less,
        }
    }
}

/// `column <op> value`. Conjunctions are represented as a list.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub column: ColumnRef,
    pub operator: Operator,
    pub value: Expression,
}

/// Sort direction for ORDER BY.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}
