use pest::Parser;

#[derive(Parser)]
#[grammar = "sql.pest"]
pub struct SQLParser;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_accepts_select_statements() {
        let cases = vec![
            "SELECT * FROM apples",
            "select name, color from apples",
            "SELECT COUNT(*) FROM apples",
            "select count ( * ) from apples;",
            "SELECT name FROM apples WHERE color = 'Yellow'",
            "SELECT id, name FROM superheroes WHERE eye_color = 'Pink Eyes' AND hair_color = 'No Hair'",
            "select a from t where 1 = 1",
            "select a from t where a = b",
            "select \"odd name\" from \"odd table\"",
            "select a from t -- trailing comment\n",
        ];
        for case in cases {
            assert!(
                SQLParser::parse(Rule::select_stmt, case).is_ok(),
                "should parse: {case}"
            );
        }
    }

    #[test]
    fn test_grammar_rejects_bad_select_statements() {
        let cases = vec![
            "",
            "SELEC * FROM t",
            "SELECT FROM t",
            "SELECT * FROM",
            "SELECT * FROM t WHERE",
            "SELECT * FROM t WHERE a < 1",
            "INSERT INTO t VALUES (1)",
            "selection a from t",
        ];
        for case in cases {
            assert!(
                SQLParser::parse(Rule::select_stmt, case).is_err(),
                "should not parse: {case}"
            );
        }
    }

    #[test]
    fn test_grammar_accepts_create_statements() {
        let cases = vec![
            "CREATE TABLE t (a int)",
            "CREATE TABLE apples (id integer primary key autoincrement, name text, color text)",
            "CREATE TABLE \"superheroes\" (id integer primary key, name text not null)",
            "create table t (\n  a varchar(10),\n  b decimal(8, 2) default 'x,y'\n)",
            "CREATE TABLE companies (id integer primary key, domain text)",
            "CREATE TABLE t (a int, -- per-column comment\n b text);",
        ];
        for case in cases {
            assert!(
                SQLParser::parse(Rule::create_table_stmt, case).is_ok(),
                "should parse: {case}"
            );
        }
    }

    #[test]
    fn test_grammar_accepts_create_index_statements() {
        let cases = vec![
            "CREATE INDEX idx_companies_country on companies (country)",
            "CREATE UNIQUE INDEX i ON t (a, b);",
            "create index \"quoted index\" on t(c)",
        ];
        for case in cases {
            assert!(
                SQLParser::parse(Rule::create_index_stmt, case).is_ok(),
                "should parse: {case}"
            );
        }
    }
}
