//! Executes the SQL intermediate representation (IR) against an open
//! database, producing either a row count or a lazy stream of rows.

use anyhow::{anyhow, bail, Result};
use log::debug;
use streaming_iterator::StreamingIterator;

use crate::btree::cell::TableLeafCell;
use crate::btree::index::{self, IndexKey};
use crate::btree::table;
use crate::dbheader::TextEncoding;
use crate::ir;
use crate::overflow;
use crate::pager::Pager;
use crate::record::{self, Field};
use crate::serial_type;

/// The outcome of one query: a count, or a stream of projected rows.
pub enum QueryResult<'p> {
    Count(u64),
    Rows(RowStream<'p>),
}

/// The candidate rows a query considers: the whole table, or the cells the
/// index seeks produced.
enum CellSource<'p> {
    Scan(table::Iterator<'p>),
    Fixed(std::vec::IntoIter<TableLeafCell<'p>>),
}

impl<'p> CellSource<'p> {
    fn next(&mut self) -> Option<Result<TableLeafCell<'p>, crate::btree::Error>> {
        match self {
            CellSource::Scan(it) => it.next(),
            CellSource::Fixed(it) => it.next().map(Ok),
        }
    }
}

fn build_source<'p>(pager: &'p Pager, block: &ir::Block) -> Result<CellSource<'p>> {
    match block {
        ir::Block::Scan(s) => {
            debug!("full scan of table {} from page {}", s.tablename, s.root_page);
            Ok(CellSource::Scan(table::Iterator::new(s.root_page, pager)))
        }
        ir::Block::IndexSeekEq(seek) => {
            let mut groups: Vec<Vec<TableLeafCell<'p>>> = vec![];
            for s in &seek.seeks {
                let key = match &s.key {
                    ir::Key::Int(i) => IndexKey::Int(*i),
                    ir::Key::Text(t) => IndexKey::Text(pager.encoding().encode(t)),
                };
                let rowids = index::rowids_for_value(pager, s.index_root, &key)?;
                debug!(
                    "index {} produced {} candidate rowids for {}",
                    s.indexname,
                    rowids.len(),
                    seek.tablename
                );
                let mut cells = vec![];
                for rowid in rowids {
                    if let Some(cell) = table::find_by_rowid(pager, seek.table_root, rowid)? {
                        cells.push(cell);
                    }
                }
                groups.push(cells);
            }
            // Intersect by rowid; the first (driving) seek fixes the order.
            let mut groups = groups.into_iter();
            let mut result = groups.next().expect("IndexSeekEq has at least one seek");
            for group in groups {
                let rowids: std::collections::HashSet<i64> =
                    group.iter().map(|c| c.rowid).collect();
                result.retain(|c| rowids.contains(&c.rowid));
            }
            Ok(CellSource::Fixed(result.into_iter()))
        }
        _ => bail!("Row source must be a Scan or IndexSeekEq block."),
    }
}

/// Splits a Filter off the front of an input chain, leaving the source.
fn peel_filter(block: &ir::Block) -> (Vec<ir::Condition>, &ir::Block) {
    match block {
        ir::Block::Filter(f) => (f.conditions.clone(), f.input.as_ref()),
        other => (vec![], other),
    }
}

fn assemble<'c>(
    pager: &'c Pager,
    cell: &TableLeafCell<'c>,
) -> Result<std::borrow::Cow<'c, [u8]>> {
    Ok(overflow::assemble_payload(
        pager,
        cell.initial_payload,
        cell.overflow_page,
        cell.payload_size,
    )?)
}

/// Evaluates one equality condition against a row's fields.
///
/// Integer comparisons are numeric over whatever width the file stored;
/// text comparisons are byte-wise against the literal re-encoded in the
/// database text encoding.  A column position beyond the record's fields
/// holds NULL, which equals nothing.
fn condition_holds(
    cond: &ir::Condition,
    fields: &[Field],
    encoding: TextEncoding,
) -> Result<bool> {
    use ir::Operand;
    let held = match (&cond.lhs, &cond.rhs) {
        (Operand::Column(i), Operand::Column(j)) => match (fields.get(*i), fields.get(*j)) {
            (Some(a), Some(b)) => a.serial_type == b.serial_type && a.data == b.data,
            _ => false,
        },
        (Operand::Column(i), Operand::Int(k)) | (Operand::Int(k), Operand::Column(i)) => {
            match fields.get(*i) {
                Some(f) if serial_type::is_integer(f.serial_type) => {
                    serial_type::value_to_i64(f.serial_type, f.data)? == *k
                }
                _ => false,
            }
        }
        (Operand::Column(i), Operand::Text(s)) | (Operand::Text(s), Operand::Column(i)) => {
            match fields.get(*i) {
                Some(f) if serial_type::is_text(f.serial_type) => {
                    f.data == encoding.encode(s).as_slice()
                }
                _ => false,
            }
        }
        (Operand::Int(a), Operand::Int(b)) => a == b,
        (Operand::Text(a), Operand::Text(b)) => a == b,
        (Operand::Int(_), Operand::Text(_)) | (Operand::Text(_), Operand::Int(_)) => false,
    };
    Ok(held)
}

fn row_matches(
    pager: &Pager,
    cell: &TableLeafCell,
    conditions: &[ir::Condition],
    encoding: TextEncoding,
) -> Result<bool> {
    if conditions.is_empty() {
        return Ok(true);
    }
    let payload = assemble(pager, cell)?;
    let fields = record::parse_record(&payload)?;
    for cond in conditions {
        if !condition_holds(cond, &fields, encoding)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Lazy stream of projected rows.  Pull-based: nothing past the current row
/// has been read from the file's pages.  Iteration ends at the first error.
pub struct RowStream<'p> {
    pager: &'p Pager,
    encoding: TextEncoding,
    source: CellSource<'p>,
    conditions: Vec<ir::Condition>,
    columns: Vec<usize>,
    item: Option<Result<Vec<String>>>,
    failed: bool,
}

impl<'p> RowStream<'p> {
    fn materialize(&self, cell: &TableLeafCell<'p>) -> Result<Option<Vec<String>>> {
        let payload = assemble(self.pager, cell)?;
        let fields = record::parse_record(&payload)?;
        for cond in &self.conditions {
            if !condition_holds(cond, &fields, self.encoding)? {
                return Ok(None);
            }
        }
        let mut row = Vec::with_capacity(self.columns.len());
        for &i in &self.columns {
            match fields.get(i) {
                // An integer primary key aliases the rowid: the record
                // stores NULL in column 0 and the key lives in the cell.
                Some(f) if i == 0 && serial_type::is_null(f.serial_type) => {
                    row.push(cell.rowid.to_string());
                }
                Some(f) => {
                    row.push(serial_type::value_to_string(
                        f.serial_type,
                        f.data,
                        self.encoding,
                    )?);
                }
                // Rows older than a column addition simply lack the field.
                None => row.push(String::new()),
            }
        }
        Ok(Some(row))
    }
}

impl<'p> StreamingIterator for RowStream<'p> {
    type Item = Result<Vec<String>>;

    fn advance(&mut self) {
        if self.failed {
            self.item = None;
            return;
        }
        loop {
            match self.source.next() {
                None => {
                    self.item = None;
                    return;
                }
                Some(Err(e)) => {
                    self.failed = true;
                    self.item = Some(Err(anyhow!(e)));
                    return;
                }
                Some(Ok(cell)) => match self.materialize(&cell) {
                    Ok(Some(row)) => {
                        self.item = Some(Ok(row));
                        return;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        self.failed = true;
                        self.item = Some(Err(e));
                        return;
                    }
                },
            }
        }
    }

    fn get(&self) -> Option<&Self::Item> {
        self.item.as_ref()
    }
}

/// Runs an IR tree, returning a count or a lazy row stream.
pub(crate) fn run_ir<'p>(pager: &'p Pager, block: &ir::Block) -> Result<QueryResult<'p>> {
    let encoding = pager.encoding();
    match block {
        ir::Block::Count(c) => {
            let (conditions, source_block) = peel_filter(c.input.as_ref());
            let mut source = build_source(pager, source_block)?;
            let mut n: u64 = 0;
            while let Some(cell) = source.next() {
                let cell = cell?;
                if row_matches(pager, &cell, &conditions, encoding)? {
                    n += 1;
                }
            }
            Ok(QueryResult::Count(n))
        }
        ir::Block::Project(p) => {
            let (conditions, source_block) = peel_filter(p.input.as_ref());
            let source = build_source(pager, source_block)?;
            Ok(QueryResult::Rows(RowStream {
                pager,
                encoding,
                source,
                conditions,
                columns: p.columns.clone(),
                item: None,
                failed: false,
            }))
        }
        _ => bail!("IR root must be a Count or Project block."),
    }
}
