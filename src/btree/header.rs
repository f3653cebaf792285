//! header reads the header of a btree page.
//! A b-tree page is divided into regions in the following order
//! 1. The 100-byte database file header (found on page 1 only)
//! 2. The 8 or 12 byte b-tree page header
//! 3. The cell pointer array
//! 4. Unallocated space
//! 5. The cell content area

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Seek, SeekFrom};

use super::{Error, PageType};
use crate::pager::PageNum;

#[derive(Debug, Clone)]
pub struct Header {
    pub btree_page_type: PageType,
    pub freeblock_start: u32,
    pub num_cells: u32,
    pub cell_content_start: u32,
    pub rightmost_pointer: Option<u32>,
}

impl Header {
    /// Size in bytes of the btree page header itself.
    pub fn size(&self) -> usize {
        match self.rightmost_pointer {
            Some(_) => 12,
            None => 8,
        }
    }
}

pub fn check_header(page: &[u8], pgnum: PageNum) -> Result<Header, Error> {
    let non_btree_header_bytes = super::btree_start_offset(pgnum);
    let mut c = Cursor::new(page);
    // The first page has a file header in front, which is not btree content
    // but which cell pointers are relative to.
    c.seek(SeekFrom::Start(non_btree_header_bytes as u64))
        .map_err(|_| Error::TruncatedPage(pgnum))?;

    // Offset	Size	Description
    // 0	1	The one-byte flag at offset 0 indicating the b-tree page type.
    let btree_page_type = match c.read_u8().map_err(|_| Error::TruncatedPage(pgnum))? {
        0x02 => PageType::IndexInterior,
        0x05 => PageType::TableInterior,
        0x0a => PageType::IndexLeaf,
        0x0d => PageType::TableLeaf,
        b => return Err(Error::InvalidPageType(b, pgnum)),
    };

    // 1	2	The start of the first freeblock on the page, or zero if there are no freeblocks.
    let freeblock_start: u32 = c
        .read_u16::<BigEndian>()
        .map_err(|_| Error::TruncatedPage(pgnum))? as u32;
    // 3	2	The number of cells on the page.
    let num_cells: u32 = c
        .read_u16::<BigEndian>()
        .map_err(|_| Error::TruncatedPage(pgnum))? as u32;
    // 5	2	The start of the cell content area. A zero value is interpreted as 65536.
    let cell_content_start: u32 = match c
        .read_u16::<BigEndian>()
        .map_err(|_| Error::TruncatedPage(pgnum))?
    {
        0 => 65536,
        x => x as u32,
    };
    // 7	1	The number of fragmented free bytes within the cell content area.
    let _ = c.read_u8().map_err(|_| Error::TruncatedPage(pgnum))?;
    // 8	4	The right-most pointer. This value appears in the header of interior
    //          b-tree pages only and is omitted from all other pages.
    let rightmost_pointer = match btree_page_type {
        PageType::IndexInterior | PageType::TableInterior => Some(
            c.read_u32::<BigEndian>()
                .map_err(|_| Error::TruncatedPage(pgnum))?,
        ),
        PageType::IndexLeaf | PageType::TableLeaf => None,
    };

    Ok(Header {
        btree_page_type,
        freeblock_start,
        num_cells,
        cell_content_start,
        rightmost_pointer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_header_leaf() {
        let mut page = vec![0_u8; 512];
        page[0] = 0x0d;
        page[1..3].copy_from_slice(&0x0010_u16.to_be_bytes()); // first freeblock
        page[3..5].copy_from_slice(&3_u16.to_be_bytes()); // num cells
        page[5..7].copy_from_slice(&0x01c0_u16.to_be_bytes()); // content start
        let hdr = check_header(&page, 2).unwrap();
        assert_eq!(hdr.btree_page_type, PageType::TableLeaf);
        assert_eq!(hdr.freeblock_start, 0x10);
        assert_eq!(hdr.num_cells, 3);
        assert_eq!(hdr.cell_content_start, 0x1c0);
        assert_eq!(hdr.rightmost_pointer, None);
        assert_eq!(hdr.size(), 8);
    }

    #[test]
    fn test_check_header_interior_with_rightmost() {
        let mut page = vec![0_u8; 512];
        page[0] = 0x05;
        page[3..5].copy_from_slice(&1_u16.to_be_bytes());
        page[8..12].copy_from_slice(&9_u32.to_be_bytes()); // rightmost pointer
        let hdr = check_header(&page, 2).unwrap();
        assert_eq!(hdr.btree_page_type, PageType::TableInterior);
        assert_eq!(hdr.rightmost_pointer, Some(9));
        assert_eq!(hdr.size(), 12);
    }

    #[test]
    fn test_check_header_zero_content_start_means_65536() {
        let mut page = vec![0_u8; 512];
        page[0] = 0x0a;
        let hdr = check_header(&page, 2).unwrap();
        assert_eq!(hdr.cell_content_start, 65536);
    }

    #[test]
    fn test_check_header_rejects_bad_type() {
        let mut page = vec![0_u8; 512];
        page[0] = 0x03;
        assert!(matches!(
            check_header(&page, 2),
            Err(Error::InvalidPageType(0x03, 2))
        ));
    }
}
