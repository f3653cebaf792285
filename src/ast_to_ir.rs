//! `ast_to_ir` converts a SELECT statement AST into an intermediate
//! representation (IR), resolving names against the schema of an open
//! database and choosing between a table scan and index lookups.

use anyhow::{bail, Result};
use log::debug;

use crate::ast;
use crate::ir;
use crate::pager::Pager;
use crate::pt_to_ast;
use crate::schema;

/// Table schema detail the planner needs: ordered column names plus any
/// single-column indexes, keyed by the column they index.
struct ResolvedTable {
    root_page: crate::pager::PageNum,
    colnames: Vec<String>,
    // (indexed column name, index name, index root page)
    indexes: Vec<(String, String, crate::pager::PageNum)>,
}

fn resolve_table(pager: &Pager, tablename: &str) -> Result<ResolvedTable> {
    if tablename == schema::SCHEMA_TABLE_NAME {
        let create = pt_to_ast::parse_create_table_statement(schema::SCHEMA_SCHEMA_SQL)?;
        return Ok(ResolvedTable {
            root_page: schema::SCHEMA_BTREE_ROOT_PAGENUM,
            colnames: create.colnames,
            indexes: vec![],
        });
    }

    let objects = schema::schema_objects(pager)?;
    let table = match objects
        .iter()
        .find(|o| o.is_table() && o.tbl_name == tablename)
    {
        Some(t) => t,
        None => bail!("Table {} not found in the database.", tablename),
    };
    let create_sql = match &table.sql {
        Some(sql) => sql,
        None => bail!("Table {} has no creation SQL in the schema.", tablename),
    };
    let create = pt_to_ast::parse_create_table_statement(create_sql)?;

    let mut indexes = vec![];
    for o in objects.iter().filter(|o| o.is_index() && o.tbl_name == tablename) {
        // Internal auto-indexes carry no SQL; they cannot be planned with.
        if let Some(sql) = &o.sql {
            let idx = pt_to_ast::parse_create_index_statement(sql)?;
            indexes.push((idx.column, idx.indexname, o.root_page));
        }
    }

    Ok(ResolvedTable {
        root_page: table.root_page,
        colnames: create.colnames,
        indexes,
    })
}

fn resolve_column(colnames: &[String], name: &str) -> Result<usize> {
    match colnames
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
    {
        Some(i) => Ok(i),
        None => bail!("Column {} does not exist.", name),
    }
}

fn resolve_operand(colnames: &[String], op: &ast::Operand) -> Result<ir::Operand> {
    Ok(match op {
        ast::Operand::ColName(c) => ir::Operand::Column(resolve_column(colnames, &c.name)?),
        ast::Operand::Int(i) => ir::Operand::Int(*i),
        ast::Operand::Text(s) => ir::Operand::Text(s.clone()),
    })
}

/// A condition can use an index when exactly one side is a column and the
/// other a literal; canonicalized to (column name, key literal).
fn indexable_condition(c: &ast::Comparison) -> Option<(&str, ir::Key)> {
    let (col, lit) = match (&c.lhs, &c.rhs) {
        (ast::Operand::ColName(col), lit @ (ast::Operand::Int(_) | ast::Operand::Text(_))) => {
            (col, lit)
        }
        (lit @ (ast::Operand::Int(_) | ast::Operand::Text(_)), ast::Operand::ColName(col)) => {
            (col, lit)
        }
        _ => return None,
    };
    let key = match lit {
        ast::Operand::Int(i) => ir::Key::Int(*i),
        ast::Operand::Text(s) => ir::Key::Text(s.clone()),
        ast::Operand::ColName(_) => unreachable!("matched as literal above"),
    };
    Some((col.name.as_str(), key))
}

pub fn ast_select_statement_to_ir(
    pager: &Pager,
    ss: &ast::SelectStatement,
) -> Result<ir::Block> {
    let table = resolve_table(pager, &ss.tablename)?;

    // Choose the source: every indexable condition with a matching index
    // becomes a seek; otherwise fall back to scanning the whole table.
    let mut seeks = vec![];
    for cond in &ss.conditions {
        if let Some((colname, key)) = indexable_condition(cond) {
            if let Some((_, indexname, index_root)) = table
                .indexes
                .iter()
                .find(|(indexed_col, _, _)| indexed_col.eq_ignore_ascii_case(colname))
            {
                debug!("using index {indexname} for column {colname}");
                seeks.push(ir::Seek {
                    indexname: indexname.clone(),
                    index_root: *index_root,
                    key,
                });
            }
        }
    }
    let source = if seeks.is_empty() {
        ir::Block::Scan(ir::Scan {
            tablename: ss.tablename.clone(),
            root_page: table.root_page,
        })
    } else {
        ir::Block::IndexSeekEq(ir::IndexSeekEq {
            tablename: ss.tablename.clone(),
            table_root: table.root_page,
            seeks,
        })
    };

    // Every condition is applied as a post-filter, including the ones a
    // seek already narrowed by: a seek satisfies only its own condition.
    let mut conditions = vec![];
    for c in &ss.conditions {
        conditions.push(ir::Condition {
            lhs: resolve_operand(&table.colnames, &c.lhs)?,
            rhs: resolve_operand(&table.colnames, &c.rhs)?,
        });
    }
    let filtered = if conditions.is_empty() {
        source
    } else {
        ir::Block::Filter(ir::Filter {
            conditions,
            input: Box::new(source),
        })
    };

    if ss.items.len() == 1 && ss.items[0].is_count_star() {
        return Ok(ir::Block::Count(ir::Count {
            input: Box::new(filtered),
        }));
    }

    let mut columns = vec![];
    for item in &ss.items {
        match item {
            ast::SelItem::Star => columns.extend(0..table.colnames.len()),
            ast::SelItem::ColName(c) => columns.push(resolve_column(&table.colnames, &c.name)?),
            ast::SelItem::CountStar => {
                bail!("COUNT(*) cannot be combined with other select items.")
            }
        }
    }
    Ok(ir::Block::Project(ir::Project {
        columns,
        input: Box::new(filtered),
    }))
}
