//! interior provides an iterator over the child pointers of one table
//! interior page, for use in full scans.

use super::{cell, Error};
use crate::pager::PageNum;

/// Iterator over the child page numbers of a btree interior page.
///
/// Produces each cell's left child pointer in cell order, then the page's
/// right-most pointer last; only this order visits rows in ascending rowid
/// order.
pub struct ScanIterator<'a> {
    ci: cell::Iterator<'a>,
    returned_rightmost: bool,
    rightmost_pointer: PageNum,
    failed: bool,
}

impl<'a> ScanIterator<'a> {
    /// # Arguments
    ///
    /// * `ci` - A cell iterator for the page. Borrowed for the lifetime of the iterator.
    /// * `rmp` - The rightmost pointer for this page.
    pub fn new(ci: cell::Iterator<'a>, rmp: PageNum) -> ScanIterator<'a> {
        ScanIterator {
            ci,
            returned_rightmost: false,
            rightmost_pointer: rmp,
            failed: false,
        }
    }
}

impl<'a> core::iter::Iterator for ScanIterator<'a> {
    type Item = Result<PageNum, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.returned_rightmost {
            return None;
        }
        match self.ci.next() {
            None => {
                self.returned_rightmost = true;
                Some(Ok(self.rightmost_pointer))
            }
            Some(slot) => match cell::TableInteriorCell::parse(slot) {
                Ok(c) => Some(Ok(c.left_pointer)),
                Err(e) => {
                    self.failed = true;
                    Some(Err(e))
                }
            },
        }
    }
}
