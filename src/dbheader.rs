//! dbheader reads the 100-byte header at the start of a database file.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("The magic bytes for this file are wrong; not a SQLite database.")]
    WrongMagic,
    #[error("The file is too short to hold a database header.")]
    Truncated,
    #[error("The pagesize {0} is not a supported SQLite page size.")]
    UnsupportedPagesize(u32),
    #[error("The text encoding code {0} is not a valid SQLite encoding.")]
    UnsupportedEncoding(u32),
    #[error("Error reading file.")]
    ReadFailed,
}

pub const SQLITE_DB_HEADER_BYTES: usize = 100;
const SQLITE3_MAGIC_STRING: &[u8] = b"SQLite format 3\0";

const TEXT_ENCODING_OFFSET: u64 = 56;

/// How text fields in record bodies are stored, per header offset 56.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Decodes stored text bytes into a host string.
    pub fn decode(&self, data: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(data.to_vec()).ok(),
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
                if data.len() % 2 != 0 {
                    return None;
                }
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|pair| match self {
                        TextEncoding::Utf16Le => u16::from_le_bytes([pair[0], pair[1]]),
                        _ => u16::from_be_bytes([pair[0], pair[1]]),
                    })
                    .collect();
                String::from_utf16(&units).ok()
            }
        }
    }

    /// Encodes a host string the way the database stores text, for comparing
    /// SQL literals against stored field bytes.
    pub fn encode(&self, s: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => s.as_bytes().to_vec(),
            TextEncoding::Utf16Le => s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect(),
            TextEncoding::Utf16Be => s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect(),
        }
    }
}

/// The database file header fields the engine interprets.  The remaining
/// header fields are present in the file but not consumed.
#[derive(Debug, Clone)]
pub struct DbfileHeader {
    pub pagesize: u32,
    pub encoding: TextEncoding,
}

pub fn get_header<R: Read + Seek>(f: &mut R) -> Result<DbfileHeader, Error> {
    f.seek(SeekFrom::Start(0)).map_err(|_| Error::ReadFailed)?;

    // Offset	Size	Description
    // 0        16	    The header string: "SQLite format 3\000"
    let mut fileid_buffer = [0; 16];
    f.read_exact(&mut fileid_buffer)
        .map_err(|_| Error::Truncated)?;
    if fileid_buffer != SQLITE3_MAGIC_STRING {
        return Err(Error::WrongMagic);
    }

    // Offset	Size	Description
    // 16	    2	    The database page size in bytes. Must be a power of two between
    //                  512 and 32768 inclusive, or the value 1 representing a page size of 65536.
    let raw_pagesize = f.read_u16::<BigEndian>().map_err(|_| Error::Truncated)?;
    let pagesize: u32 = match raw_pagesize {
        1 => 65536,
        x if (512..=32768).contains(&x) && x.is_power_of_two() => x as u32,
        x => return Err(Error::UnsupportedPagesize(x as u32)),
    };

    // Offset	Size	Description
    // 56	    4	    The database text encoding. A value of 1 means UTF-8.
    //                  A value of 2 means UTF-16le. A value of 3 means UTF-16be.
    f.seek(SeekFrom::Start(TEXT_ENCODING_OFFSET))
        .map_err(|_| Error::ReadFailed)?;
    let encoding = match f.read_u32::<BigEndian>().map_err(|_| Error::Truncated)? {
        1 => TextEncoding::Utf8,
        2 => TextEncoding::Utf16Le,
        3 => TextEncoding::Utf16Be,
        x => return Err(Error::UnsupportedEncoding(x)),
    };

    f.seek(SeekFrom::Start(0)).map_err(|_| Error::ReadFailed)?;
    Ok(DbfileHeader { pagesize, encoding })
}
