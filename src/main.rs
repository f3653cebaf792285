use anyhow::{bail, Result};
use env_logger::Env;
use streaming_iterator::StreamingIterator;

use litequery::pager::Pager;
use litequery::{run_query, user_table_names, QueryResult};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    // Parse arguments
    let args = std::env::args().collect::<Vec<_>>();
    match args.len() {
        0 | 1 => bail!("Missing <database path> and <command>"),
        2 => bail!("Missing <command>"),
        _ => {}
    }

    let pager = Pager::open(&args[1])?;
    let command = &args[2];

    match command.as_str() {
        ".dbinfo" => {
            println!("database page size: {}", pager.get_page_size());
            println!("number of tables: {}", user_table_names(&pager)?.len());
        }
        ".tables" => {
            println!("{}", user_table_names(&pager)?.join(" "));
        }
        c if c.starts_with('.') => bail!("Invalid command: {command}"),
        sql => match run_query(&pager, sql)? {
            QueryResult::Count(n) => println!("{n}"),
            QueryResult::Rows(mut rows) => {
                while let Some(row) = rows.next() {
                    match row {
                        Ok(fields) => println!("{}", fields.join("|")),
                        Err(e) => bail!("Error while reading rows: {e}"),
                    }
                }
            }
        },
    }

    Ok(())
}
