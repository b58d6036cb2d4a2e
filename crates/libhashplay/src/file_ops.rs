use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use libhashplay_core::{Error, Result, lengths::{BlockInfo, Lengths}};

/// A buffer big enough for any block of the file.
pub(crate) fn block_buffer(lengths: &Lengths) -> Vec<u8> {
    let len = std::cmp::min(lengths.default_block_length(), lengths.total_length());
    vec![0u8; len as usize]
}

/// Seeks to the block and reads exactly its length into the front of `buf`.
///
/// A short read is an error. The bytes read before it are kept in
/// [`Error::ReadBlock`].
pub(crate) fn read_block<'a, F: Read + Seek>(
    file: &mut F,
    info: &BlockInfo,
    buf: &'a mut [u8],
) -> Result<&'a [u8]> {
    let index = info.index.get();
    file.seek(SeekFrom::Start(info.offset))
        .map_err(|source| Error::Seek {
            index,
            offset: info.offset,
            source,
        })?;

    let buf = &mut buf[..info.len as usize];
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::ReadBlock {
                    index,
                    partial: Bytes::copy_from_slice(&buf[..filled]),
                    source: std::io::ErrorKind::UnexpectedEof.into(),
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(Error::ReadBlock {
                    index,
                    partial: Bytes::copy_from_slice(&buf[..filled]),
                    source,
                });
            }
        }
    }
    Ok(buf)
}
