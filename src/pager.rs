//! Manages pages of a sqlite3 file as defined at https://www.sqlite.org/fileformat.html
//!
//! A Pager owns the open database file and the page data, and lends pages
//! out as byte slices.  Page numbers are 1-based, to match how SQLite
//! numbers pages.  All pages have the same size.
//!
//! The file is opened read-only and no other process is assumed to write to
//! it, so pages are immutable once loaded and shared borrows of them stay
//! valid for the life of the Pager.

use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom};

use crate::dbheader;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Page number {0} is out of range; the file has {1} pages.")]
    InvalidPageNumber(PageNum, usize),
    #[error("Pager: error accessing database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pager: error in database header: {0}")]
    DbHdr(#[from] dbheader::Error),
}

pub type PageNum = usize;

/// A Pager holds one open database file and its pages.
///
/// Every page is read in at open time.  The spec does not require a cache,
/// but reading once up front keeps page access infallible-after-open and
/// lets every decoder below borrow `&[u8]` instead of copying.
pub struct Pager {
    f: RefCell<std::fs::File>,
    pages: Vec<Vec<u8>>,
    page_size: u32,
    encoding: dbheader::TextEncoding,
}

impl Pager {
    /// Opens a database file, verifies its header, and loads its pages.
    pub fn open(path: &str) -> Result<Self, Error> {
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(false)
            .create(false)
            .open(path)?;
        let h = dbheader::get_header(&mut file)?;
        let file_len = file.metadata()?.len();
        // A trailing partial page would not be a valid btree page; ignore it.
        let num_pages = (file_len / h.pagesize as u64) as usize;

        let mut pager = Pager {
            f: RefCell::new(file),
            pages: Vec::with_capacity(num_pages),
            page_size: h.pagesize,
            encoding: h.encoding,
        };
        for pn in 1..=num_pages {
            let page = pager.read_page_from_file(pn)?;
            pager.pages.push(page);
        }
        Ok(pager)
    }

    fn read_page_from_file(&self, pn: PageNum) -> Result<Vec<u8>, Error> {
        let mut v = vec![0_u8; self.page_size as usize];
        let mut f = self.f.borrow_mut();
        f.seek(SeekFrom::Start((pn - 1) as u64 * self.page_size as u64))?;
        f.read_exact(&mut v[..])?;
        Ok(v)
    }

    /// Returns the raw bytes of page `pn`, for `pn` in `[1, num_pages]`.
    pub fn get_page_ro(&self, pn: PageNum) -> Result<&[u8], Error> {
        if pn == 0 || pn > self.pages.len() {
            return Err(Error::InvalidPageNumber(pn, self.pages.len()));
        }
        Ok(self.pages[pn - 1].as_slice())
    }

    pub fn get_page_size(&self) -> u32 {
        self.page_size
    }

    pub fn encoding(&self) -> dbheader::TextEncoding {
        self.encoding
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }
}
