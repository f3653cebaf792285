//! `pt_to_ast` has routines for converting parse trees to ASTs for SQL.
//! A Pest parse tree has one enum for all possible terminals and
//! non-terminals.  The AST has enums for groups of terminals that are used
//! in the same production, and discards lexical detail like case, quoting
//! and position in the input.

use anyhow::{bail, Result};
use itertools::Itertools;
use pest::iterators::Pair;

use crate::ast;
use crate::parser::Rule;
use crate::parser::SQLParser;
use crate::pest::Parser;

/// Bare leading words that mark a table-level constraint rather than a
/// column definition inside CREATE TABLE parentheses.
const TABLE_CONSTRAINT_KEYWORDS: [&str; 5] =
    ["PRIMARY", "UNIQUE", "CHECK", "FOREIGN", "CONSTRAINT"];

/// Returns an identifier's text and whether it was double-quoted.
/// Quoted identifiers keep their exact inner text; quotes are stripped.
fn identifier_text(pair: Pair<Rule>) -> (String, bool) {
    match pair.as_rule() {
        Rule::identifier => identifier_text(pair.into_inner().next().expect("identifier inner")),
        Rule::quoted_identifier => {
            let inner = pair.into_inner().next().expect("quoted identifier inner");
            (String::from(inner.as_str()), true)
        }
        Rule::bare_identifier => (String::from(pair.as_str()), false),
        r => unreachable!("identifier_text called on {:?}", r),
    }
}

fn column_name_text(pair: Pair<Rule>) -> String {
    identifier_text(pair.into_inner().next().expect("column name inner")).0
}

fn remove_single_quoting(s: &str) -> String {
    s.replace("''", "'")
}

fn parse_operand(pair: Pair<Rule>) -> Result<ast::Operand> {
    let inner = pair.into_inner().next().expect("operand inner");
    match inner.as_rule() {
        Rule::column_name => Ok(ast::Operand::ColName(ast::ColName {
            name: column_name_text(inner),
        })),
        Rule::literal => {
            let lit = inner.into_inner().next().expect("literal inner");
            match lit.as_rule() {
                Rule::single_quoted_string => {
                    let body = lit.into_inner().next().expect("string inner");
                    Ok(ast::Operand::Text(remove_single_quoting(body.as_str())))
                }
                Rule::integer_literal => Ok(ast::Operand::Int(str::parse::<i64>(lit.as_str())?)),
                r => bail!("Unexpected literal form: {:?}", r),
            }
        }
        r => bail!("Unexpected operand form: {:?}", r),
    }
}

fn parse_comparison(pair: Pair<Rule>) -> Result<ast::Comparison> {
    let (lhs, rhs) = pair
        .into_inner()
        .collect_tuple()
        .ok_or_else(|| anyhow::anyhow!("Comparison must have exactly two operands."))?;
    Ok(ast::Comparison {
        lhs: parse_operand(lhs)?,
        rhs: parse_operand(rhs)?,
    })
}

pub fn pt_select_statement_to_ast(query: &str) -> Result<ast::SelectStatement> {
    let select_stmt = SQLParser::parse(Rule::select_stmt, query)?
        .next()
        .expect("parse returns one select_stmt");

    let mut items: Vec<ast::SelItem> = vec![];
    let mut tablename: Option<String> = None;
    let mut conditions: Vec<ast::Comparison> = vec![];

    for s in select_stmt.into_inner() {
        match s.as_rule() {
            Rule::select_items => {
                for t in s.into_inner() {
                    match t.as_rule() {
                        Rule::star => items.push(ast::SelItem::Star),
                        Rule::count_star => items.push(ast::SelItem::CountStar),
                        Rule::select_item => {
                            let cn = t.into_inner().next().expect("select item inner");
                            items.push(ast::SelItem::ColName(ast::ColName {
                                name: column_name_text(cn),
                            }));
                        }
                        r => bail!("Parse error in select item: {:?}", r),
                    }
                }
            }
            Rule::table_identifier => {
                tablename = Some(identifier_text(s.into_inner().next().expect("table name")).0);
            }
            Rule::where_clause => {
                for c in s.into_inner() {
                    if c.as_rule() == Rule::comparison {
                        conditions.push(parse_comparison(c)?);
                    }
                }
            }
            Rule::kw_select | Rule::kw_from | Rule::EOI => (),
            r => bail!("Unable to parse select statement at {:?}", r),
        }
    }

    Ok(ast::SelectStatement {
        items,
        tablename: tablename.expect("grammar requires a FROM table"),
        conditions,
    })
}

/// Parses a stored `CREATE TABLE` statement for its ordered column names.
/// Type names and constraints are not interpreted; table-level constraint
/// entries are skipped.
pub fn parse_create_table_statement(sql: &str) -> Result<ast::CreateTableStatement> {
    let create_stmt = SQLParser::parse(Rule::create_table_stmt, sql)?
        .next()
        .expect("parse returns one create_table_stmt");

    let mut tablename = String::new();
    let mut colnames: Vec<String> = vec![];
    for c in create_stmt.into_inner() {
        match c.as_rule() {
            Rule::table_identifier => {
                tablename = identifier_text(c.into_inner().next().expect("table name")).0;
            }
            Rule::column_defs => {
                for column_def in c.into_inner() {
                    match column_def.as_rule() {
                        Rule::column_def => {
                            let ident =
                                column_def.into_inner().next().expect("column def identifier");
                            let (name, quoted) = identifier_text(ident);
                            let is_constraint = !quoted
                                && TABLE_CONSTRAINT_KEYWORDS
                                    .iter()
                                    .any(|kw| name.eq_ignore_ascii_case(kw));
                            if !is_constraint {
                                colnames.push(name);
                            }
                        }
                        r => bail!("Parse error in column definitions: {:?}", r),
                    }
                }
            }
            Rule::kw_create | Rule::kw_table | Rule::EOI => (),
            r => bail!("Unable to parse create table statement at {:?}", r),
        }
    }

    Ok(ast::CreateTableStatement { tablename, colnames })
}

/// Parses a stored `CREATE INDEX` statement.  The indexed column is the
/// last identifier of the parenthesized column list.
pub fn parse_create_index_statement(sql: &str) -> Result<ast::CreateIndexStatement> {
    let create_stmt = SQLParser::parse(Rule::create_index_stmt, sql)?
        .next()
        .expect("parse returns one create_index_stmt");

    let mut indexname = String::new();
    let mut tablename = String::new();
    let mut column: Option<String> = None;
    for c in create_stmt.into_inner() {
        match c.as_rule() {
            Rule::identifier => indexname = identifier_text(c).0,
            Rule::table_identifier => {
                tablename = identifier_text(c.into_inner().next().expect("table name")).0;
            }
            Rule::indexed_columns => {
                column = c.into_inner().map(column_name_text).last();
            }
            Rule::kw_create | Rule::kw_unique | Rule::kw_index | Rule::kw_on | Rule::EOI => (),
            r => bail!("Unable to parse create index statement at {:?}", r),
        }
    }

    Ok(ast::CreateIndexStatement {
        indexname,
        tablename,
        column: column.expect("grammar requires at least one indexed column"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ColName, Comparison, Operand, SelItem};
    use pretty_assertions::assert_eq;

    fn col(name: &str) -> Operand {
        Operand::ColName(ColName {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_pt_select_statement_to_ast() {
        let cases = vec![
            (
                "SELECT * FROM apples",
                ast::SelectStatement {
                    items: vec![SelItem::Star],
                    tablename: "apples".to_string(),
                    conditions: vec![],
                },
            ),
            (
                "select name, color fRoM apples",
                ast::SelectStatement {
                    items: vec![
                        SelItem::ColName(ColName { name: "name".to_string() }),
                        SelItem::ColName(ColName { name: "color".to_string() }),
                    ],
                    tablename: "apples".to_string(),
                    conditions: vec![],
                },
            ),
            (
                "SELECT COUNT(*) FROM apples;",
                ast::SelectStatement {
                    items: vec![SelItem::CountStar],
                    tablename: "apples".to_string(),
                    conditions: vec![],
                },
            ),
            (
                "SELECT name FROM apples WHERE color = 'Yellow'",
                ast::SelectStatement {
                    items: vec![SelItem::ColName(ColName { name: "name".to_string() })],
                    tablename: "apples".to_string(),
                    conditions: vec![Comparison {
                        lhs: col("color"),
                        rhs: Operand::Text("Yellow".to_string()),
                    }],
                },
            ),
            (
                "SELECT id FROM t WHERE 'a''b' = name AND n = -12",
                ast::SelectStatement {
                    items: vec![SelItem::ColName(ColName { name: "id".to_string() })],
                    tablename: "t".to_string(),
                    conditions: vec![
                        Comparison {
                            lhs: Operand::Text("a'b".to_string()),
                            rhs: col("name"),
                        },
                        Comparison {
                            lhs: col("n"),
                            rhs: Operand::Int(-12),
                        },
                    ],
                },
            ),
        ];
        for (input, expected) in cases {
            let actual = pt_select_statement_to_ast(input).unwrap();
            assert_eq!(actual, expected, "input: {input}");
        }
    }

    #[test]
    fn test_parse_create_table_statement() {
        let cases = vec![
            ("CREATE TABLE t (a int)", "t", vec!["a"]),
            (
                "CREATE TABLE apples (id integer primary key autoincrement, name text, color text)",
                "apples",
                vec!["id", "name", "color"],
            ),
            (
                "CREATE TABLE \"superheroes\" (id integer primary key autoincrement, name text not null, eye_color text)",
                "superheroes",
                vec!["id", "name", "eye_color"],
            ),
            // Reserved words are fine as column names, bare or quoted.
            (
                "CREATE TABLE companies (id integer primary key, name text, domain text, \"size range\" text)",
                "companies",
                vec!["id", "name", "domain", "size range"],
            ),
            (
                "create table t (\n  a varchar(10), -- comment, with comma\n  b decimal(8, 2) default 'x,y'\n)",
                "t",
                vec!["a", "b"],
            ),
            // Table-level constraints are not columns.
            (
                "CREATE TABLE t (a int, b int, PRIMARY KEY (a, b), UNIQUE (b))",
                "t",
                vec!["a", "b"],
            ),
        ];
        for (input, tablename, colnames) in cases {
            let actual = parse_create_table_statement(input).unwrap();
            assert_eq!(actual.tablename, tablename, "input: {input}");
            assert_eq!(
                actual.colnames,
                colnames.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_parse_create_index_statement() {
        let cases = vec![
            (
                "CREATE INDEX idx_companies_country on companies (country)",
                ("idx_companies_country", "companies", "country"),
            ),
            // Composite index: the engine keys on the last listed column.
            (
                "CREATE UNIQUE INDEX i ON t (a, b)",
                ("i", "t", "b"),
            ),
        ];
        for (input, (indexname, tablename, column)) in cases {
            let actual = parse_create_index_statement(input).unwrap();
            assert_eq!(actual.indexname, indexname);
            assert_eq!(actual.tablename, tablename);
            assert_eq!(actual.column, column);
        }
    }

    #[test]
    fn test_unsupported_sql_is_rejected() {
        assert!(pt_select_statement_to_ast("DELETE FROM t").is_err());
        assert!(pt_select_statement_to_ast("SELECT a FROM t WHERE a < 3").is_err());
        assert!(parse_create_table_statement("CREATE VIEW v AS SELECT 1").is_err());
    }
}
