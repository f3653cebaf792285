//! cell::Iterator walks the cell pointer array of a btree page and hands out
//! raw cell slots; the four typed cell decoders interpret them.
//!
//! Cell Formats from https://www.sqlite.org/fileformat.html#b_tree_pages
//!
//! Table B-Tree Leaf Cell (header 0x0d):
//!   payload-size varint | rowid varint | initial payload | optional 4-byte
//!   first overflow page number.
//!
//! Table B-Tree Interior Cell (header 0x05):
//!   4-byte left child page number | integer-key varint.
//!
//! Index B-Tree Leaf Cell (header 0x0a):
//!   payload-size varint | initial payload | optional overflow page number.
//!
//! Index B-Tree Interior Cell (header 0x02):
//!   4-byte left child page number | payload-size varint | initial payload |
//!   optional overflow page number.

use byteorder::{BigEndian, ByteOrder};

use super::{header, Error, RowId};
use crate::bytes;
use crate::pager::PageNum;

/// Iterator over the cells of one page, without interpreting cell contents.
///
/// Cells are yielded in cell-pointer-array order, which is key order.  Each
/// cell's byte range is computed against the ascending-sorted pointer
/// offsets: a cell ends where the next-higher cell starts, and the
/// highest-addressed cell ends at the page end.
pub struct Iterator<'a> {
    page: &'a [u8],
    cell_idx: usize,
    cell_offsets: Vec<usize>,
    cell_ends: Vec<usize>,
}

impl<'a> Iterator<'a> {
    pub fn new(page: &'a [u8], pgnum: PageNum) -> Result<Iterator<'a>, Error> {
        let hdr = header::check_header(page, pgnum)?;
        let ptr_array_start = super::btree_start_offset(pgnum) + hdr.size();
        let num_cells = hdr.num_cells as usize;

        let ptr_array = bytes::slice(page, ptr_array_start, num_cells * 2)
            .map_err(|_| Error::TruncatedPage(pgnum))?;
        let mut cell_offsets = Vec::with_capacity(num_cells);
        for i in 0..num_cells {
            let off = BigEndian::read_u16(&ptr_array[i * 2..]) as usize;
            if off >= page.len() {
                return Err(Error::CorruptCell("cell pointer past end of page"));
            }
            cell_offsets.push(off);
        }

        let mut sorted = cell_offsets.clone();
        sorted.sort_unstable();
        let cell_ends = cell_offsets
            .iter()
            .map(|off| match sorted.iter().find(|&&o| o > *off) {
                Some(&next) => next,
                None => page.len(),
            })
            .collect();

        Ok(Iterator {
            page,
            cell_idx: 0,
            cell_offsets,
            cell_ends,
        })
    }
}

impl<'a> core::iter::Iterator for Iterator<'a> {
    // The format of the data in the cell depends on the page type.
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.cell_idx >= self.cell_offsets.len() {
            return None;
        }
        let b = self.cell_offsets[self.cell_idx];
        let e = self.cell_ends[self.cell_idx];
        self.cell_idx += 1;
        Some(&self.page[b..e])
    }
}

/// Splits a cell slot into the locally stored payload and, when the declared
/// size does not fit, the first overflow page number.
///
/// The rule: if the bytes remaining in the slot after `data_start` cover the
/// declared size, the payload is entirely local; otherwise the slot's final
/// 4 bytes point at the overflow chain and the middle region is the initial
/// payload.
fn split_payload(
    cell: &[u8],
    data_start: usize,
    payload_size: usize,
) -> Result<(&[u8], Option<PageNum>), Error> {
    let local = cell.len().saturating_sub(data_start);
    if local >= payload_size {
        let initial = bytes::slice(cell, data_start, payload_size)?;
        Ok((initial, None))
    } else {
        if local < 4 {
            return Err(Error::CorruptCell("overflowing cell too small for pointer"));
        }
        let initial = &cell[data_start..cell.len() - 4];
        let overflow = BigEndian::read_u32(&cell[cell.len() - 4..]) as PageNum;
        if overflow == 0 {
            return Err(Error::CorruptCell("overflow page number is zero"));
        }
        Ok((initial, Some(overflow)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLeafCell<'a> {
    pub payload_size: usize,
    pub rowid: RowId,
    pub initial_payload: &'a [u8],
    pub overflow_page: Option<PageNum>,
}

impl<'a> TableLeafCell<'a> {
    pub fn parse(cell: &'a [u8]) -> Result<TableLeafCell<'a>, Error> {
        let (payload_size, mut offset) = bytes::read_varint(cell)?;
        let (rowid, rowid_len) = bytes::read_varint(&cell[offset..])?;
        offset += rowid_len;
        let (initial_payload, overflow_page) =
            split_payload(cell, offset, payload_size as usize)?;
        Ok(TableLeafCell {
            payload_size: payload_size as usize,
            rowid: rowid as RowId,
            initial_payload,
            overflow_page,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInteriorCell {
    pub left_pointer: PageNum,
    pub integer_key: RowId,
}

impl TableInteriorCell {
    pub fn parse(cell: &[u8]) -> Result<TableInteriorCell, Error> {
        if cell.len() < 4 {
            return Err(Error::CorruptCell("interior cell too small for pointer"));
        }
        let left_pointer = BigEndian::read_u32(&cell[..4]) as PageNum;
        let (integer_key, _) = bytes::read_varint(&cell[4..])?;
        Ok(TableInteriorCell {
            left_pointer,
            integer_key: integer_key as RowId,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLeafCell<'a> {
    pub payload_size: usize,
    pub initial_payload: &'a [u8],
    pub overflow_page: Option<PageNum>,
}

impl<'a> IndexLeafCell<'a> {
    pub fn parse(cell: &'a [u8]) -> Result<IndexLeafCell<'a>, Error> {
        let (payload_size, offset) = bytes::read_varint(cell)?;
        let (initial_payload, overflow_page) =
            split_payload(cell, offset, payload_size as usize)?;
        Ok(IndexLeafCell {
            payload_size: payload_size as usize,
            initial_payload,
            overflow_page,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexInteriorCell<'a> {
    pub left_pointer: PageNum,
    pub payload_size: usize,
    pub initial_payload: &'a [u8],
    pub overflow_page: Option<PageNum>,
}

impl<'a> IndexInteriorCell<'a> {
    pub fn parse(cell: &'a [u8]) -> Result<IndexInteriorCell<'a>, Error> {
        if cell.len() < 4 {
            return Err(Error::CorruptCell("interior cell too small for pointer"));
        }
        let left_pointer = BigEndian::read_u32(&cell[..4]) as PageNum;
        let (payload_size, size_len) = bytes::read_varint(&cell[4..])?;
        let (initial_payload, overflow_page) =
            split_payload(cell, 4 + size_len, payload_size as usize)?;
        Ok(IndexInteriorCell {
            left_pointer,
            payload_size: payload_size as usize,
            initial_payload,
            overflow_page,
        })
    }
}

// From command: xxd resources/test/multipage-512B-page.db
#[cfg(test)]
const TEST_PAGE: &str = "0d00 0000 0a01 ce00 01fb 01f6 01f1 01ec
01e7 01e2 01dd 01d8 01d3 01ce 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 0000
0000 0000 0000 0000 0000 0000 0000 030a
020f 4a03 0902 0f49 0308 020f 4803 0702
0f47 0306 020f 4603 0502 0f45 0304 020f
4403 0302 0f43 0302 020f 4203 0102 0f41";

#[cfg(test)]
mod tests {
    use super::*;
    use hex::FromHex;
    use pretty_assertions::assert_eq;

    fn test_page() -> Vec<u8> {
        Vec::from_hex(super::TEST_PAGE.replace([' ', '\n'], "")).expect("Invalid Hex String")
    }

    #[test]
    fn test_cell_iterator_yields_key_order() {
        let p = test_page();
        assert_eq!(p.len(), 512);
        let mut ci = Iterator::new(&p, 2).unwrap();
        // Pointer-array order is rowid order even though the cells sit at
        // descending offsets.
        for rowid in 1..=10u8 {
            let cell = ci.next().unwrap();
            assert_eq!(cell, [0x03, rowid, 0x02, 0x0f, 0x40 + rowid]);
        }
        assert_eq!(ci.next(), None);
    }

    #[test]
    fn test_table_leaf_cell_parse() {
        let p = test_page();
        let cell = Iterator::new(&p, 2).unwrap().next().unwrap();
        let c = TableLeafCell::parse(cell).unwrap();
        assert_eq!(c.payload_size, 3);
        assert_eq!(c.rowid, 1);
        assert_eq!(c.initial_payload, &[0x02, 0x0f, 0x41]);
        assert_eq!(c.overflow_page, None);
    }

    #[test]
    fn test_table_interior_cell_parse() {
        let cell = [0x00, 0x00, 0x00, 0x04, 0x81, 0x2c];
        let c = TableInteriorCell::parse(&cell).unwrap();
        assert_eq!(c.left_pointer, 4);
        assert_eq!(c.integer_key, 172);
    }

    #[test]
    fn test_split_exact_fit_stays_local() {
        // Slot holds exactly the declared payload: no overflow page.
        let cell = [0x05, 0x01, 0xaa, 0xbb, 0xcc, 0xdd, 0xee];
        let c = TableLeafCell::parse(&cell).unwrap();
        assert_eq!(c.initial_payload, &[0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
        assert_eq!(c.overflow_page, None);
    }

    #[test]
    fn test_split_one_byte_short_overflows() {
        // Declared 6 bytes but the slot holds 5 after the varints; the
        // final 4 bytes become the overflow page number.
        let cell = [0x06, 0x01, 0xaa, 0x00, 0x00, 0x00, 0x09];
        let c = TableLeafCell::parse(&cell).unwrap();
        assert_eq!(c.payload_size, 6);
        assert_eq!(c.initial_payload, &[0xaa]);
        assert_eq!(c.overflow_page, Some(9));
    }

    #[test]
    fn test_index_interior_cell_parse() {
        // left pointer 3, payload size 4, local payload.
        let cell = [0x00, 0x00, 0x00, 0x03, 0x04, 0x02, 0x17, 0x52, 0x65];
        let c = IndexInteriorCell::parse(&cell).unwrap();
        assert_eq!(c.left_pointer, 3);
        assert_eq!(c.payload_size, 4);
        assert_eq!(c.initial_payload, &[0x02, 0x17, 0x52, 0x65]);
        assert_eq!(c.overflow_page, None);
    }
}
