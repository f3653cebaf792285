//! Serial types are how SQLite stores values in records.
//!
//! A serial type code identifies the on-disk type and width of one record
//! field.  Codes are kept as raw `i64` values here, with helpers to size and
//! convert them, since the record header stores them as varints.

use crate::dbheader::TextEncoding;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Serial type code {0} is reserved or invalid.")]
    UnsupportedSerialType(i64),
    #[error("Bytes are not valid text in the database encoding.")]
    InvalidStringEncoding,
    #[error("Serial type code {0} does not hold an integer.")]
    NotAnInteger(i64),
}

/// Content size in bytes of a field with the given serial type code.
///
/// Reserved codes 10 and 11 never appear in a well-formed database file and
/// are rejected.
pub fn content_size(serial_type: i64) -> Result<usize, Error> {
    match serial_type {
        // Serial Type	Content Size	Meaning
        // 0	        0	            Value is a NULL.
        0 => Ok(0),
        // 1..6	        1,2,3,4,6,8	    Big-endian twos-complement integer.
        1 => Ok(1),
        2 => Ok(2),
        3 => Ok(3),
        4 => Ok(4),
        5 => Ok(6),
        6 => Ok(8),
        // 7	        8	            Big-endian IEEE 754-2008 64-bit float.
        7 => Ok(8),
        // 8,9	        0	            The integers 0 and 1.
        8 | 9 => Ok(0),
        // N>=12 even	(N-12)/2	    BLOB.
        // N>=13 odd	(N-13)/2	    Text in the database encoding.
        x if x >= 12 => Ok((x as usize - 12 - (x % 2) as usize) / 2),
        x => Err(Error::UnsupportedSerialType(x)),
    }
}

pub fn is_null(serial_type: i64) -> bool {
    serial_type == 0
}

pub fn is_integer(serial_type: i64) -> bool {
    matches!(serial_type, 1..=6 | 8 | 9)
}

pub fn is_text(serial_type: i64) -> bool {
    serial_type >= 13 && serial_type % 2 == 1
}

pub fn is_blob(serial_type: i64) -> bool {
    serial_type >= 12 && serial_type % 2 == 0
}

/// Reads an integer-typed field as an `i64`, sign-extending the stored
/// big-endian twos-complement bytes.
pub fn value_to_i64(serial_type: i64, data: &[u8]) -> Result<i64, Error> {
    match serial_type {
        8 => Ok(0),
        9 => Ok(1),
        1..=6 => {
            let size = content_size(serial_type)?;
            if data.len() < size {
                return Err(Error::NotAnInteger(serial_type));
            }
            let mut v: i64 = if data[0] & 0x80 != 0 { -1 } else { 0 };
            for &b in &data[..size] {
                v = (v << 8) | b as i64;
            }
            Ok(v)
        }
        x => Err(Error::NotAnInteger(x)),
    }
}

/// Renders a field as the text the query layer prints.
///
/// Text decodes in the database encoding; integers and floats print in
/// decimal; NULL prints as the empty string; blobs print hex-encoded.
pub fn value_to_string(
    serial_type: i64,
    data: &[u8],
    encoding: TextEncoding,
) -> Result<String, Error> {
    match serial_type {
        0 => Ok(String::new()),
        1..=6 | 8 | 9 => Ok(value_to_i64(serial_type, data)?.to_string()),
        7 => {
            if data.len() < 8 {
                return Err(Error::UnsupportedSerialType(serial_type));
            }
            let bits = u64::from_be_bytes(data[..8].try_into().expect("checked length"));
            Ok(f64::from_bits(bits).to_string())
        }
        x if is_text(x) => encoding.decode(data).ok_or(Error::InvalidStringEncoding),
        x if is_blob(x) => Ok(hex::encode(data)),
        x => Err(Error::UnsupportedSerialType(x)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_content_size() {
        let cases = vec![
            (0, 0),
            (1, 1),
            (2, 2),
            (3, 3),
            (4, 4),
            (5, 6),
            (6, 8),
            (7, 8),
            (8, 0),
            (9, 0),
            (12, 0),
            (13, 0),
            (19, 3),  // text of length (19-13)/2 = 3
            (18, 3),  // blob of length (18-12)/2 = 3
        ];
        for (code, size) in cases {
            assert_eq!(content_size(code).unwrap(), size, "code {code}");
        }
        assert!(content_size(10).is_err());
        assert!(content_size(11).is_err());
        assert!(content_size(-1).is_err());
    }

    #[test]
    fn test_value_to_i64() {
        assert_eq!(value_to_i64(1, &[0x7f]).unwrap(), 127);
        assert_eq!(value_to_i64(1, &[0x80]).unwrap(), -128);
        assert_eq!(value_to_i64(2, &[0x01, 0x00]).unwrap(), 256);
        assert_eq!(value_to_i64(3, &[0xff, 0xff, 0xff]).unwrap(), -1);
        assert_eq!(value_to_i64(4, &[0x00, 0x01, 0x00, 0x00]).unwrap(), 65536);
        assert_eq!(
            value_to_i64(6, &[0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            i64::MAX
        );
        assert_eq!(value_to_i64(8, &[]).unwrap(), 0);
        assert_eq!(value_to_i64(9, &[]).unwrap(), 1);
        assert!(value_to_i64(0, &[]).is_err());
        assert!(value_to_i64(13, b"x").is_err());
    }

    #[test]
    fn test_value_to_string() {
        let enc = TextEncoding::Utf8;
        assert_eq!(value_to_string(0, &[], enc).unwrap(), "");
        assert_eq!(value_to_string(1, &[0x0a], enc).unwrap(), "10");
        assert_eq!(
            value_to_string(7, &[0x40, 0x09, 0x21, 0xca, 0xc0, 0x83, 0x12, 0x6f], enc).unwrap(),
            "3.1415"
        );
        assert_eq!(value_to_string(19, b"Ten", enc).unwrap(), "Ten");
        assert_eq!(value_to_string(18, &[0xde, 0xad, 0xbe], enc).unwrap(), "deadbe");
    }
}
