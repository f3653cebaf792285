//! Overflow pages hold the tail of a payload too large for its cell slot.
//!
//! Each overflow page begins with a 4-byte big-endian pointer to the next
//! page in the chain (0 terminates), followed by payload bytes.

use std::borrow::Cow;

use byteorder::{BigEndian, ByteOrder};

use crate::pager::{self, PageNum, Pager};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Overflow page is too small to hold its next-page pointer.")]
    TruncatedOverflowPage,
    #[error("Overflow chain ended after {got} bytes of a declared {expected}-byte payload.")]
    CorruptPayload { expected: usize, got: usize },
    #[error("Overflow chain is longer than the database has pages.")]
    OverflowChainLoop,
    #[error("Pager error while following overflow chain: {0}")]
    Pager(#[from] pager::Error),
}

pub struct OverflowPage<'p> {
    pub next_overflow_page: Option<PageNum>,
    pub overflow_data: &'p [u8],
}

impl<'p> OverflowPage<'p> {
    pub fn parse(page: &'p [u8]) -> Result<OverflowPage<'p>, Error> {
        if page.len() < 4 {
            return Err(Error::TruncatedOverflowPage);
        }
        let next = BigEndian::read_u32(&page[..4]) as PageNum;
        Ok(OverflowPage {
            next_overflow_page: if next == 0 { None } else { Some(next) },
            overflow_data: &page[4..],
        })
    }
}

/// Reassembles a cell's full payload from its local portion plus, when
/// present, its overflow chain.
///
/// A chain that terminates before `payload_size` bytes have been gathered is
/// a corruption error, as is a local payload of the wrong length.
pub fn assemble_payload<'p>(
    pager: &'p Pager,
    initial_payload: &'p [u8],
    first_overflow_page: Option<PageNum>,
    payload_size: usize,
) -> Result<Cow<'p, [u8]>, Error> {
    if first_overflow_page.is_none() {
        if initial_payload.len() != payload_size {
            return Err(Error::CorruptPayload {
                expected: payload_size,
                got: initial_payload.len(),
            });
        }
        return Ok(Cow::Borrowed(initial_payload));
    }

    let mut full_payload = Vec::with_capacity(payload_size);
    full_payload.extend_from_slice(initial_payload);
    let mut next_page = first_overflow_page;
    let mut pages_followed = 0;

    while full_payload.len() < payload_size {
        let pn = match next_page {
            Some(pn) => pn,
            None => break,
        };
        pages_followed += 1;
        if pages_followed > pager.num_pages() {
            return Err(Error::OverflowChainLoop);
        }
        let page = OverflowPage::parse(pager.get_page_ro(pn)?)?;
        let remaining = payload_size - full_payload.len();
        let chunk = &page.overflow_data[..remaining.min(page.overflow_data.len())];
        full_payload.extend_from_slice(chunk);
        next_page = page.next_overflow_page;
    }

    if full_payload.len() != payload_size {
        return Err(Error::CorruptPayload {
            expected: payload_size,
            got: full_payload.len(),
        });
    }
    Ok(Cow::Owned(full_payload))
}
