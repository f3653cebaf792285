//! leaf provides an iterator over the typed cells of one table leaf page.

use super::{cell, Error};
use crate::pager::PageNum;

pub struct Iterator<'a> {
    ci: cell::Iterator<'a>,
    failed: bool,
}

impl<'a> Iterator<'a> {
    /// Creates an iterator over the cells of a single TableLeaf page.
    pub fn new(page: &'a [u8], pgnum: PageNum) -> Result<Iterator<'a>, Error> {
        Ok(Iterator {
            ci: cell::Iterator::new(page, pgnum)?,
            failed: false,
        })
    }
}

impl<'a> core::iter::Iterator for Iterator<'a> {
    type Item = Result<cell::TableLeafCell<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let slot = self.ci.next()?;
        let item = cell::TableLeafCell::parse(slot);
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}
