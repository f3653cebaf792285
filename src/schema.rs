//! schema enumerates the objects in the `sqlite_schema` catalog table.
//!
//! Page 1 (the first page) is always a btree page, and it is the root page
//! of the schema table.  Its rows name every other object in the database
//! and hold the root pages of their btrees.

use crate::btree;
use crate::overflow;
use crate::pager::{PageNum, Pager};
use crate::record;
use crate::serial_type;

pub const SCHEMA_TABLE_NAME: &str = "sqlite_schema";
pub const SCHEMA_BTREE_ROOT_PAGENUM: PageNum = 1;
pub const SCHEMA_SCHEMA_SQL: &str =
    "CREATE TABLE sqlite_schema (type text, name text, tbl_name text, rootpage integer, sql text)";

const SCHEMA_ROW_FIELDS: usize = 5;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Schema row is corrupt: {0}")]
    SchemaCorrupt(&'static str),
    #[error("Schema row has unknown object type {0:?}.")]
    UnknownObjectType(String),
    #[error(transparent)]
    Btree(#[from] btree::Error),
    #[error(transparent)]
    Overflow(#[from] overflow::Error),
    #[error(transparent)]
    Record(#[from] record::Error),
    #[error(transparent)]
    SerialType(#[from] serial_type::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Table,
    Index,
    View,
    Trigger,
}

/// One row of `sqlite_schema`.
///
/// `sql` is None for objects the file stores no SQL for (internal
/// auto-indexes); such indexes are never chosen by the query planner.
#[derive(Debug, Clone)]
pub struct SchemaObject {
    pub object_type: ObjectType,
    pub name: String,
    pub tbl_name: String,
    pub root_page: PageNum,
    pub sql: Option<String>,
}

impl SchemaObject {
    pub fn is_table(&self) -> bool {
        self.object_type == ObjectType::Table
    }

    pub fn is_index(&self) -> bool {
        self.object_type == ObjectType::Index
    }

    /// A user table: listed by `.tables` and counted by `.dbinfo`.
    pub fn is_user_table(&self) -> bool {
        self.is_table() && !self.name.starts_with("sqlite_")
    }
}

/// Reads every row of the schema table rooted at page 1.
pub fn schema_objects(pager: &Pager) -> Result<Vec<SchemaObject>, Error> {
    let encoding = pager.encoding();
    let mut objects = vec![];
    for leaf_cell in btree::table::Iterator::new(SCHEMA_BTREE_ROOT_PAGENUM, pager) {
        let cell = leaf_cell?;
        let payload = overflow::assemble_payload(
            pager,
            cell.initial_payload,
            cell.overflow_page,
            cell.payload_size,
        )?;
        let fields = record::parse_record(&payload)?;
        if fields.len() != SCHEMA_ROW_FIELDS {
            return Err(Error::SchemaCorrupt("expected five fields"));
        }

        let type_text = match encoding.decode(fields[0].data) {
            Some(s) if serial_type::is_text(fields[0].serial_type) => s,
            _ => return Err(Error::SchemaCorrupt("type is not text")),
        };
        let object_type = match type_text.as_str() {
            "table" => ObjectType::Table,
            "index" => ObjectType::Index,
            "view" => ObjectType::View,
            "trigger" => ObjectType::Trigger,
            _ => return Err(Error::UnknownObjectType(type_text)),
        };

        let name = match encoding.decode(fields[1].data) {
            Some(s) if serial_type::is_text(fields[1].serial_type) => s,
            _ => return Err(Error::SchemaCorrupt("name is not text")),
        };
        let tbl_name = match encoding.decode(fields[2].data) {
            Some(s) if serial_type::is_text(fields[2].serial_type) => s,
            _ => return Err(Error::SchemaCorrupt("tbl_name is not text")),
        };
        if !serial_type::is_integer(fields[3].serial_type) {
            return Err(Error::SchemaCorrupt("root_page is not an integer"));
        }
        let root_page = serial_type::value_to_i64(fields[3].serial_type, fields[3].data)?;
        let sql = if serial_type::is_null(fields[4].serial_type) {
            None
        } else if serial_type::is_text(fields[4].serial_type) {
            Some(
                encoding
                    .decode(fields[4].data)
                    .ok_or(Error::SchemaCorrupt("sql is not decodable text"))?,
            )
        } else {
            return Err(Error::SchemaCorrupt("sql is neither text nor NULL"));
        };

        objects.push(SchemaObject {
            object_type,
            name,
            tbl_name,
            root_page: root_page as PageNum,
            sql,
        });
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(object_type: ObjectType, name: &str) -> SchemaObject {
        SchemaObject {
            object_type,
            name: name.to_string(),
            tbl_name: name.to_string(),
            root_page: 2,
            sql: None,
        }
    }

    #[test]
    fn test_is_user_table_excludes_internal_names() {
        assert!(object(ObjectType::Table, "apples").is_user_table());
        // Internal bookkeeping tables carry the sqlite_ prefix.
        assert!(!object(ObjectType::Table, "sqlite_sequence").is_user_table());
        assert!(!object(ObjectType::Table, "sqlite_stat1").is_user_table());
        assert!(!object(ObjectType::Index, "idx_apples_color").is_user_table());
        assert!(!object(ObjectType::View, "v").is_user_table());
    }

    /// One text field of up to 57 bytes, keeping its serial type a 1-byte
    /// varint.
    fn text(s: &str) -> (u8, Vec<u8>) {
        assert!(s.len() <= 57);
        ((13 + 2 * s.len()) as u8, s.as_bytes().to_vec())
    }

    fn int8(v: u8) -> (u8, Vec<u8>) {
        (1, vec![v])
    }

    fn small_record(fields: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let hdr_len = fields.len() + 1;
        let mut payload = vec![hdr_len as u8];
        for (serial, _) in fields {
            payload.push(*serial);
        }
        for (_, data) in fields {
            payload.extend_from_slice(data);
        }
        payload
    }

    /// Writes a one-page database whose schema table holds a single cell
    /// with the given record payload.
    fn schema_db(name: &str, payload: &[u8]) -> String {
        assert!(payload.len() < 128);
        let mut page = vec![0_u8; 512];
        page[0..16].copy_from_slice(b"SQLite format 3\0");
        page[16..18].copy_from_slice(&512_u16.to_be_bytes());
        page[56..60].copy_from_slice(&1_u32.to_be_bytes());

        let mut cell = vec![payload.len() as u8, 1]; // payload size, rowid
        cell.extend_from_slice(payload);
        let off = 512 - cell.len();
        page[off..].copy_from_slice(&cell);

        page[100] = 0x0d;
        page[103..105].copy_from_slice(&1_u16.to_be_bytes());
        page[105..107].copy_from_slice(&(off as u16).to_be_bytes());
        page[108..110].copy_from_slice(&(off as u16).to_be_bytes());

        let path = std::env::temp_dir().join(format!(
            "litequery_schema_{}_{}.db",
            name,
            std::process::id()
        ));
        std::fs::write(&path, page).expect("Should have written fixture db");
        path.to_str().expect("temp path is valid UTF-8").to_string()
    }

    #[test]
    fn test_schema_objects_reads_a_row() {
        let payload = small_record(&[
            text("table"),
            text("t"),
            text("t"),
            int8(2),
            text("CREATE TABLE t (a int)"),
        ]);
        let pager = Pager::open(&schema_db("ok", &payload)).unwrap();
        let objects = schema_objects(&pager).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].object_type, ObjectType::Table);
        assert_eq!(objects[0].name, "t");
        assert_eq!(objects[0].root_page, 2);
        assert_eq!(objects[0].sql.as_deref(), Some("CREATE TABLE t (a int)"));
    }

    #[test]
    fn test_schema_row_with_wrong_field_count_is_corrupt() {
        let payload = small_record(&[text("table")]);
        let pager = Pager::open(&schema_db("shape", &payload)).unwrap();
        assert!(matches!(
            schema_objects(&pager),
            Err(Error::SchemaCorrupt("expected five fields"))
        ));
    }

    #[test]
    fn test_schema_row_with_unknown_type_is_rejected() {
        let payload = small_record(&[
            text("gadget"),
            text("g"),
            text("g"),
            int8(2),
            text("CREATE GADGET g"),
        ]);
        let pager = Pager::open(&schema_db("otype", &payload)).unwrap();
        match schema_objects(&pager) {
            Err(Error::UnknownObjectType(t)) => assert_eq!(t, "gadget"),
            other => panic!("expected UnknownObjectType, got {other:?}"),
        }
    }

    #[test]
    fn test_schema_row_with_text_root_page_is_corrupt() {
        let payload = small_record(&[
            text("table"),
            text("t"),
            text("t"),
            text("two"),
            text("CREATE TABLE t (a int)"),
        ]);
        let pager = Pager::open(&schema_db("root", &payload)).unwrap();
        assert!(matches!(
            schema_objects(&pager),
            Err(Error::SchemaCorrupt("root_page is not an integer"))
        ));
    }

    #[test]
    fn test_schema_row_with_integer_sql_is_corrupt() {
        let payload = small_record(&[
            text("table"),
            text("t"),
            text("t"),
            int8(2),
            int8(7),
        ]);
        let pager = Pager::open(&schema_db("sql", &payload)).unwrap();
        assert!(matches!(
            schema_objects(&pager),
            Err(Error::SchemaCorrupt("sql is neither text nor NULL"))
        ));
    }
}
