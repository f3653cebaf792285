//! Btree cells hold records, which contain SQL rows.
//!
//! A record is a header and a body, in that order.  The header begins with a
//! single varint giving the total header length, followed by one serial-type
//! varint per field; the body is the concatenated field contents.
//! See: https://www.sqlite.org/fileformat.html#record_format

use crate::bytes;
use crate::serial_type;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Record header length {hdr_len} exceeds payload length {payload_len}.")]
    MalformedRecord { hdr_len: usize, payload_len: usize },
    #[error("Record field extends past the end of the record body.")]
    FieldOutOfBounds,
    #[error("Malformed varint in record header: {0}")]
    Bytes(#[from] bytes::Error),
    #[error("Bad serial type in record header: {0}")]
    SerialType(#[from] serial_type::Error),
}

/// One decoded record field: its serial type code and the raw bytes of its
/// content, borrowed from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub serial_type: i64,
    pub data: &'a [u8],
}

/// Iterator over the fields of one record payload.
///
/// Yields `(serial_type, content)` pairs in field order.  The first error
/// ends the iteration.
pub struct ValueIterator<'a> {
    payload: &'a [u8],
    hdr_offset: usize,
    hdr_len: usize,
    body_offset: usize,
    failed: bool,
}

impl<'a> ValueIterator<'a> {
    pub fn new(payload: &'a [u8]) -> Result<ValueIterator<'a>, Error> {
        let (hdr_len, hdr_len_len) = bytes::read_varint(payload)?;
        let hdr_len = hdr_len as usize;
        if hdr_len > payload.len() || hdr_len < hdr_len_len {
            return Err(Error::MalformedRecord {
                hdr_len,
                payload_len: payload.len(),
            });
        }
        Ok(ValueIterator {
            payload,
            hdr_offset: hdr_len_len,
            hdr_len,
            body_offset: hdr_len,
            failed: false,
        })
    }

    fn next_field(&mut self) -> Result<Field<'a>, Error> {
        let (serial_type, consumed) = bytes::read_varint(&self.payload[self.hdr_offset..])?;
        let serial_type = serial_type as i64;
        self.hdr_offset += consumed;
        let size = serial_type::content_size(serial_type)?;
        let data = bytes::slice(self.payload, self.body_offset, size)
            .map_err(|_| Error::FieldOutOfBounds)?;
        self.body_offset += size;
        Ok(Field { serial_type, data })
    }
}

impl<'a> Iterator for ValueIterator<'a> {
    type Item = Result<Field<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.hdr_offset >= self.hdr_len {
            return None;
        }
        let item = self.next_field();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

/// Decodes a full payload into its ordered list of fields.
pub fn parse_record(payload: &[u8]) -> Result<Vec<Field<'_>>, Error> {
    ValueIterator::new(payload)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_record_literal_one() {
        // 2 byte record header, field type is literal 1, body has zero bytes.
        let fields = parse_record(&[0x02, 0x09]).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0], Field { serial_type: 9, data: &[] });
    }

    #[test]
    fn test_parse_record_five_one_byte_ints() {
        let payload: &[u8] = &[0x06, 0x01, 0x01, 0x01, 0x01, 0x01, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e];
        let fields = parse_record(payload).unwrap();
        assert_eq!(fields.len(), 5);
        for (i, f) in fields.iter().enumerate() {
            assert_eq!(f.serial_type, 1);
            assert_eq!(f.data, &[0x0a + i as u8]);
        }
    }

    #[test]
    fn test_parse_record_various_types() {
        // literal 0 | literal 1 | float 3.1415 | "Ten" | NULL
        let payload: &[u8] = &[
            0x06, 0x08, 0x09, 0x07, 0x13, 0x00, 0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f,
            0x54, 0x65, 0x6e,
        ];
        let fields = parse_record(payload).unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], Field { serial_type: 8, data: &[] });
        assert_eq!(fields[1], Field { serial_type: 9, data: &[] });
        assert_eq!(
            fields[2],
            Field {
                serial_type: 7,
                data: &[0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f]
            }
        );
        assert_eq!(fields[3], Field { serial_type: 0x13, data: b"Ten" });
        assert_eq!(fields[4], Field { serial_type: 0, data: &[] });
    }

    #[test]
    fn test_parse_record_rejects_reserved_serial_type() {
        // Header declares serial type 10, which is reserved.
        let res = parse_record(&[0x02, 0x0a]);
        assert!(matches!(
            res,
            Err(Error::SerialType(
                serial_type::Error::UnsupportedSerialType(10)
            ))
        ));
    }

    #[test]
    fn test_parse_record_rejects_truncated_body() {
        // Declares a 3-byte text field but the body holds only 2 bytes.
        let res = parse_record(&[0x02, 0x13, 0x54, 0x65]);
        assert_eq!(res, Err(Error::FieldOutOfBounds));
    }

    #[test]
    fn test_parse_record_rejects_header_past_end() {
        let res = parse_record(&[0x10, 0x01]);
        assert!(matches!(res, Err(Error::MalformedRecord { .. })));
    }
}
