//! `ir` defines types for an intermediate representation (IR) of SELECT
//! statements.
//!
//! The AST and IR are separate: the IR represents the querying procedure
//! (scan vs key lookup) and depends on the availability of indexes, so it is
//! built against the schema of an open database.  For example,
//! `select * from t where a = 1` plans as:
//! ```text
//! Project(
//!     Filter(
//!         Eq(Col(0), Int(1)),
//!         Scan("t"),
//!     )
//! )
//! ```
//! but when a relevant index exists (`create index t_a on t (a)`), the scan
//! is replaced by a key lookup:
//! ```text
//! Project(
//!     Filter(
//!         Eq(Col(0), Int(1)),
//!         IndexSeekEq("t", "t_a", 1),
//!     )
//! )
//! ```

use crate::pager::PageNum;

/// `Block` represents any of the IR blocks that can be chained together.
/// A block takes rows from its input block (or from storage, for the two
/// source blocks) and emits rows to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Scan(Scan),
    IndexSeekEq(IndexSeekEq),
    Filter(Filter),
    Project(Project),
    Count(Count),
}

/// `Scan` represents a one-pass scan over all the rows of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    pub tablename: String,
    pub root_page: PageNum,
}

/// A literal key an index is probed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Int(i64),
    Text(String),
}

/// One index probe: the index btree to search and the key to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seek {
    pub indexname: String,
    pub index_root: PageNum,
    pub key: Key,
}

/// `IndexSeekEq` produces the rows whose indexed column equals a key, by
/// collecting rowids from each index and looking the rows up in the table
/// btree.  Multiple seeks intersect by rowid; the first seek drives the
/// output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSeekEq {
    pub tablename: String,
    pub table_root: PageNum,
    pub seeks: Vec<Seek>,
}

/// One side of a resolved equality condition: a column's position in the
/// table's column order, or a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(usize),
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub lhs: Operand,
    pub rhs: Operand,
}

/// `Filter` drops rows that fail any of a conjunction of equality
/// conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub input: Box<Block>,
}

/// `Project` emits the listed column positions of each input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub columns: Vec<usize>,
    pub input: Box<Block>,
}

/// `Count` emits the number of rows its input produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Count {
    pub input: Box<Block>,
}
