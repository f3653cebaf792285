//! table provides traversal over Table type btrees.
//! It hides the fact that btrees span several pages.

use log::debug;

use super::cell::{self, TableInteriorCell, TableLeafCell};
use super::{header, interior, leaf, Error, PageType, RowId};
use crate::pager::{PageNum, Pager};

enum EitherIter<'p> {
    Leaf(leaf::Iterator<'p>),
    Interior(interior::ScanIterator<'p>),
}

/// Iterator over every leaf cell of a Table btree, in ascending rowid order.
///
/// The traversal holds a stack of per-page iterators: descending an interior
/// cell pushes a frame, exhausting a page pops one.  The stack bounds the
/// recursion that a directly recursive walk would put on the call stack.
pub struct Iterator<'p> {
    root_page: PageNum,
    pager: &'p Pager,
    stack: Vec<EitherIter<'p>>,
    started: bool,
    failed: bool,
}

impl<'p> Iterator<'p> {
    /// Creates an iterator over the records of a Table-typed btree.
    ///
    /// # Arguments
    ///
    /// * `root_page` - The root page of the btree.
    /// * `pager`     - A pager for the file that holds this btree.
    pub fn new(root_page: PageNum, pager: &'p Pager) -> Iterator<'p> {
        Iterator {
            root_page,
            pager,
            stack: vec![],
            started: false,
            failed: false,
        }
    }

    /// Pushes iterator frames from `starting_page` down to its leftmost leaf.
    fn seek_leftmost_leaf(&mut self, starting_page: PageNum) -> Result<(), Error> {
        let mut next_page = starting_page;
        loop {
            let page = self.pager.get_page_ro(next_page)?;
            let hdr = header::check_header(page, next_page)?;
            match hdr.btree_page_type {
                PageType::TableLeaf => {
                    self.stack
                        .push(EitherIter::Leaf(leaf::Iterator::new(page, next_page)?));
                    return Ok(());
                }
                PageType::TableInterior => {
                    let rmp = hdr
                        .rightmost_pointer
                        .expect("Interior pages always have a rightmost pointer.")
                        as PageNum;
                    debug!("descending interior page {next_page} ({} cells)", hdr.num_cells);
                    self.stack.push(EitherIter::Interior(interior::ScanIterator::new(
                        cell::Iterator::new(page, next_page)?,
                        rmp,
                    )));
                    let top = match self.stack.last_mut() {
                        Some(EitherIter::Interior(i)) => i,
                        _ => unreachable!("frame was just pushed"),
                    };
                    next_page = top
                        .next()
                        .expect("Interior page always has at least one child.")?;
                }
                found @ (PageType::IndexInterior | PageType::IndexLeaf) => {
                    return Err(Error::UnexpectedPageType {
                        page: next_page,
                        found,
                        expected: "table btree",
                    });
                }
            }
        }
    }
}

impl<'p> core::iter::Iterator for Iterator<'p> {
    type Item = Result<TableLeafCell<'p>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if !self.started {
            self.started = true;
            if let Err(e) = self.seek_leftmost_leaf(self.root_page) {
                self.failed = true;
                return Some(Err(e));
            }
        }
        while let Some(top) = self.stack.last_mut() {
            match top {
                EitherIter::Leaf(l) => match l.next() {
                    // Keep returning items from the current leaf.
                    Some(Ok(c)) => return Some(Ok(c)),
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    // Leaf exhausted: pop back up to its parent.
                    None => {
                        self.stack.pop();
                    }
                },
                EitherIter::Interior(i) => match i.next() {
                    // Explore down the next child pointer to a leaf.
                    Some(Ok(child)) => {
                        if let Err(e) = self.seek_leftmost_leaf(child) {
                            self.failed = true;
                            return Some(Err(e));
                        }
                    }
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    // Interior exhausted (rightmost child already visited).
                    None => {
                        self.stack.pop();
                    }
                },
            }
        }
        None
    }
}

/// Looks up the leaf cell with the given rowid, or None if the table has no
/// such row.
///
/// Interior descent follows the first cell whose integer key is >= `rowid`
/// (the key of an interior cell is the greatest rowid in its left subtree),
/// falling through to the rightmost pointer.
pub fn find_by_rowid<'p>(
    pager: &'p Pager,
    pgnum: PageNum,
    rowid: RowId,
) -> Result<Option<TableLeafCell<'p>>, Error> {
    let page = pager.get_page_ro(pgnum)?;
    let hdr = header::check_header(page, pgnum)?;
    match hdr.btree_page_type {
        PageType::TableLeaf => {
            for slot in cell::Iterator::new(page, pgnum)? {
                let c = TableLeafCell::parse(slot)?;
                if c.rowid == rowid {
                    return Ok(Some(c));
                }
            }
            Ok(None)
        }
        PageType::TableInterior => {
            for slot in cell::Iterator::new(page, pgnum)? {
                let c = TableInteriorCell::parse(slot)?;
                if rowid <= c.integer_key {
                    return find_by_rowid(pager, c.left_pointer, rowid);
                }
            }
            let rmp = hdr
                .rightmost_pointer
                .expect("Interior pages always have a rightmost pointer.")
                as PageNum;
            find_by_rowid(pager, rmp, rowid)
        }
        found => Err(Error::UnexpectedPageType {
            page: pgnum,
            found,
            expected: "table btree",
        }),
    }
}
