//! index provides equality search over Index type btrees.
//!
//! An index btree is keyed by column value; every entry is a two-field
//! record of (key value, rowid).  Interior cells carry real entries too, so
//! an equality search must visit a separator's left subtree, the separator
//! itself, and keep going while duplicates continue in later subtrees.

use std::cmp::Ordering;

use log::debug;

use super::cell::{self, IndexInteriorCell, IndexLeafCell};
use super::{header, Error, PageType, RowId};
use crate::overflow;
use crate::pager::{PageNum, Pager};
use crate::record::{self, Field};
use crate::serial_type;

/// A lookup key, already converted to the database's stored representation:
/// text is encoded in the database text encoding, integers compare
/// numerically against whatever width the file stored.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    Int(i64),
    Text(Vec<u8>),
}

/// Value-class rank used when a stored key and the lookup key have
/// different storage classes: NULL < numbers < text < blob.
fn class_rank(serial_type: i64) -> u8 {
    if serial_type::is_null(serial_type) {
        0
    } else if serial_type::is_integer(serial_type) || serial_type == 7 {
        1
    } else if serial_type::is_text(serial_type) {
        2
    } else {
        3
    }
}

/// Orders a stored key field against the lookup key.
///
/// Integer fields compare numerically, which matches a byte-wise comparison
/// of the lookup value re-encoded at the stored field's width.  Text fields
/// compare byte-wise lexicographically in the stored encoding.
fn compare_field(field: &Field, key: &IndexKey) -> Result<Ordering, Error> {
    match key {
        IndexKey::Int(k) => {
            if serial_type::is_integer(field.serial_type) {
                Ok(serial_type::value_to_i64(field.serial_type, field.data)?.cmp(k))
            } else {
                Ok(class_rank(field.serial_type).cmp(&1))
            }
        }
        IndexKey::Text(k) => {
            if serial_type::is_text(field.serial_type) {
                Ok(field.data.cmp(k.as_slice()))
            } else {
                Ok(class_rank(field.serial_type).cmp(&2))
            }
        }
    }
}

/// Pulls (key, rowid) out of one index entry's payload.
fn entry_rowid(fields: &[Field]) -> Result<RowId, Error> {
    if fields.len() < 2 {
        return Err(Error::MalformedIndexEntry);
    }
    Ok(serial_type::value_to_i64(
        fields[1].serial_type,
        fields[1].data,
    )?)
}

/// Collects the rowids of every index entry whose key equals `key`, in index
/// order, from the index btree rooted at `pgnum`.
pub fn rowids_for_value(
    pager: &Pager,
    pgnum: PageNum,
    key: &IndexKey,
) -> Result<Vec<RowId>, Error> {
    let mut rowids = vec![];
    search_page(pager, pgnum, key, &mut rowids)?;
    debug!("index search at page {pgnum} matched {} rowids", rowids.len());
    Ok(rowids)
}

fn search_page(
    pager: &Pager,
    pgnum: PageNum,
    key: &IndexKey,
    rowids: &mut Vec<RowId>,
) -> Result<(), Error> {
    let page = pager.get_page_ro(pgnum)?;
    let hdr = header::check_header(page, pgnum)?;
    match hdr.btree_page_type {
        PageType::IndexLeaf => {
            for slot in cell::Iterator::new(page, pgnum)? {
                let c = IndexLeafCell::parse(slot)?;
                let payload = overflow::assemble_payload(
                    pager,
                    c.initial_payload,
                    c.overflow_page,
                    c.payload_size,
                )?;
                let fields = record::parse_record(&payload)?;
                if fields.is_empty() {
                    return Err(Error::MalformedIndexEntry);
                }
                match compare_field(&fields[0], key)? {
                    Ordering::Equal => rowids.push(entry_rowid(&fields)?),
                    // Leaf keys ascend; past the key, nothing more matches.
                    Ordering::Greater => break,
                    Ordering::Less => {}
                }
            }
            Ok(())
        }
        PageType::IndexInterior => {
            for slot in cell::Iterator::new(page, pgnum)? {
                let c = IndexInteriorCell::parse(slot)?;
                let payload = overflow::assemble_payload(
                    pager,
                    c.initial_payload,
                    c.overflow_page,
                    c.payload_size,
                )?;
                let fields = record::parse_record(&payload)?;
                if fields.is_empty() {
                    return Err(Error::MalformedIndexEntry);
                }
                match compare_field(&fields[0], key)? {
                    // The separator is itself a matching entry; duplicates
                    // may continue both in its left subtree and beyond it.
                    Ordering::Equal => {
                        search_page(pager, c.left_pointer, key, rowids)?;
                        rowids.push(entry_rowid(&fields)?);
                    }
                    // Everything at and beyond this separator is greater;
                    // the left subtree holds the last candidates.
                    Ordering::Greater => {
                        return search_page(pager, c.left_pointer, key, rowids);
                    }
                    Ordering::Less => {}
                }
            }
            let rmp = hdr
                .rightmost_pointer
                .expect("Interior pages always have a rightmost pointer.")
                as PageNum;
            search_page(pager, rmp, key, rowids)
        }
        found => Err(Error::UnexpectedPageType {
            page: pgnum,
            found,
            expected: "index btree",
        }),
    }
}
