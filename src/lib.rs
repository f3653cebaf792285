//! litequery is a read-only query engine over SQLite 3 database files.
//!
//! System layers, modeled on SQLite's architecture
//! (https://www.sqlite.org/arch.html):
//! "pager" opens the database file and lends out its pages; "btree" walks
//! table and index btrees spanning those pages; "record" and "serial_type"
//! decode row payloads; "schema" reads the catalog on page 1; the SQL
//! layers ("parser"/"pt_to_ast" -> "ast_to_ir" -> "ir_interpreter") turn a
//! query string into an executed plan.

mod ast;
mod ast_to_ir;
pub mod btree;
pub mod bytes;
pub mod dbheader;
mod ir;
mod ir_interpreter;
pub mod overflow;
pub mod pager;
pub mod parser;
mod pt_to_ast;
pub mod record;
pub mod schema;
pub mod serial_type;

extern crate pest;
#[macro_use]
extern crate pest_derive;

use anyhow::Result;

pub use ir_interpreter::{QueryResult, RowStream};

/// Runs a SELECT statement against an open database.
///
/// The result is either a count or a lazy row stream borrowing the pager.
pub fn run_query<'p>(pager: &'p pager::Pager, query: &str) -> Result<QueryResult<'p>> {
    // Convert parse tree to AST.
    let ss: ast::SelectStatement = pt_to_ast::pt_select_statement_to_ast(query)?;
    // Convert the AST to IR, resolving names and choosing access paths.
    let ir: ir::Block = ast_to_ir::ast_select_statement_to_ir(pager, &ss)?;
    // Execute the IR.
    ir_interpreter::run_ir(pager, &ir)
}

/// Names of the user tables in the database, sorted ascending.
pub fn user_table_names(pager: &pager::Pager) -> Result<Vec<String>> {
    let mut names: Vec<String> = schema::schema_objects(pager)?
        .iter()
        .filter(|o| o.is_user_table())
        .map(|o| o.name.clone())
        .collect();
    names.sort();
    Ok(names)
}
