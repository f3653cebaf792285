//! This module defines abstract syntax tree (AST) types for the supported
//! SQL subset.

use enum_as_inner::EnumAsInner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColName {
    pub name: String,
}

impl std::fmt::Display for ColName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum SelItem {
    ColName(ColName),
    Star,
    CountStar,
}

impl std::fmt::Display for SelItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelItem::ColName(x) => x.fmt(f),
            SelItem::Star => "*".fmt(f),
            SelItem::CountStar => "COUNT(*)".fmt(f),
        }
    }
}

/// One side of an equality condition: a column reference or a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    ColName(ColName),
    Text(String),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub lhs: Operand,
    pub rhs: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    pub items: Vec<SelItem>,
    pub tablename: String,
    /// Conjunction of equality conditions from the WHERE clause.
    pub conditions: Vec<Comparison>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableStatement {
    pub tablename: String,
    pub colnames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexStatement {
    pub indexname: String,
    pub tablename: String,
    /// The indexed column; for a composite index, the last listed column.
    pub column: String,
}
