use std::io::Read;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::constants::{constant, encoding};
use crate::errors::{RdbError, RdbOk, RdbResult};

/// Read a length prefix. The boolean is true when the byte carried a special
/// string encoding instead of a length; the returned value is then the
/// encoding selector (see `encoding`).
pub fn read_length_with_encoding<R: Read>(input: &mut R) -> RdbResult<(u64, bool)> {
    let enc_type = input.read_u8()?;

    match (enc_type & 0xC0) >> 6 {
        constant::RDB_ENCVAL => Ok(((enc_type & 0x3F) as u64, true)),
        constant::RDB_6BITLEN => Ok(((enc_type & 0x3F) as u64, false)),
        constant::RDB_14BITLEN => {
            let next_byte = input.read_u8()?;
            Ok(((((enc_type & 0x3F) as u64) << 8) | next_byte as u64, false))
        }
        _ => match enc_type {
            constant::RDB_32BITLEN => Ok((input.read_u32::<BigEndian>()? as u64, false)),
            constant::RDB_64BITLEN => Ok((input.read_u64::<BigEndian>()?, false)),
            _ => Err(RdbError::BadLengthPrefix(enc_type)),
        },
    }
}

pub fn read_length<R: Read>(input: &mut R) -> RdbResult<u64> {
    let (length, _) = read_length_with_encoding(input)?;
    Ok(length)
}

pub fn verify_magic<R: Read>(input: &mut R) -> RdbOk {
    let mut magic = [0; 5];
    input.read_exact(&mut magic)?;

    if magic == constant::RDB_MAGIC.as_bytes() {
        Ok(())
    } else {
        Err(RdbError::MagicMismatch("missing REDIS magic"))
    }
}

/// Read the four ASCII digits following the magic and return them as a
/// number, e.g. "0012" -> 12.
pub fn read_version<R: Read>(input: &mut R) -> RdbResult<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;

    let mut version = 0u32;
    for &byte in &buf {
        if !byte.is_ascii_digit() {
            return Err(RdbError::MagicMismatch("version is not four ASCII digits"));
        }
        version = version * 10 + (byte - b'0') as u32;
    }

    Ok(version)
}

/// Read one string-encoded value: a literal run of bytes, an integer
/// rendered as decimal ASCII, or an LZF envelope. Strings above the size
/// ceiling are consumed but not allocated; the caller gets
/// `SizeCeilingExceeded` with the cursor already past the value.
pub fn read_blob<R: Read>(input: &mut R) -> RdbResult<Vec<u8>> {
    let (length, is_encoded) = read_length_with_encoding(input)?;

    if is_encoded {
        return match length as u32 {
            encoding::INT8 => Ok(int_to_vec(i64::from(input.read_i8()?))),
            encoding::INT16 => Ok(int_to_vec(i64::from(input.read_i16::<LittleEndian>()?))),
            encoding::INT32 => Ok(int_to_vec(i64::from(input.read_i32::<LittleEndian>()?))),
            encoding::LZF => {
                let compressed_length = read_length(input)?;
                let real_length = read_length(input)?;

                if real_length > constant::MAX_STRING_LENGTH
                    || compressed_length > constant::MAX_STRING_LENGTH
                {
                    skip(input, compressed_length)?;
                    return Err(RdbError::SizeCeilingExceeded(
                        real_length.max(compressed_length),
                    ));
                }

                let data = read_exact(input, compressed_length as usize)?;
                lzf::decompress(&data, real_length as usize)
                    .map_err(|e| RdbError::BadLzf(format!("{:?}", e)))
            }
            other => Err(RdbError::BadEncoding {
                context: "string",
                message: format!("unknown special encoding {}", other),
            }),
        };
    }

    if length > constant::MAX_STRING_LENGTH {
        skip(input, length)?;
        return Err(RdbError::SizeCeilingExceeded(length));
    }

    read_exact(input, length as usize)
}

/// `read_blob`, but an over-ceiling string becomes a placeholder instead of
/// an error. Used wherever a single oversized element must not lose the
/// rest of the value.
pub fn read_blob_lossy<R: Read>(input: &mut R) -> RdbResult<Vec<u8>> {
    match read_blob(input) {
        Err(RdbError::SizeCeilingExceeded(n)) => {
            log::warn!("string of {} bytes exceeds the size ceiling, emitting placeholder", n);
            Ok(format!("<skipped: {} bytes>", n).into_bytes())
        }
        other => other,
    }
}

pub fn int_to_vec(number: i64) -> Vec<u8> {
    number.to_string().into_bytes()
}

pub fn read_exact<T: Read>(reader: &mut T, len: usize) -> RdbResult<Vec<u8>> {
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf)?;

    Ok(buf)
}

/// Discard exactly `n` bytes without buffering them all at once.
pub fn skip<R: Read>(input: &mut R, mut n: u64) -> RdbOk {
    let mut buf = [0u8; 4096];
    while n > 0 {
        let want = n.min(buf.len() as u64) as usize;
        let got = input.read(&mut buf[..want])?;
        if got == 0 {
            return Err(RdbError::UnexpectedEof("skipped bytes"));
        }
        n -= got as u64;
    }
    Ok(())
}

/// Read a length prefix, then that many values produced by `transform`.
pub fn read_sequence<R: Read, T, F>(input: &mut R, mut transform: F) -> RdbResult<Vec<T>>
where
    F: FnMut(&mut R) -> RdbResult<T>,
{
    let mut len = read_length(input)?;
    let mut values = Vec::new();

    while len > 0 {
        values.push(transform(input)?);
        len -= 1;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::io::Cursor;

    #[rstest]
    #[case(&[0x0], (0, false), 1)]
    #[case(&[0x3f], (63, false), 1)]
    #[case(&[0x7f, 0xff], (16383, false), 2)]
    #[case(&[0x80, 0xff, 0xff, 0xff, 0xff], (4294967295, false), 5)]
    #[case(&[0x81, 0, 0, 0, 1, 0, 0, 0, 0], (4294967296, false), 9)]
    #[case(&[0xC0], (0, true), 1)]
    #[case(&[0xC3], (3, true), 1)]
    fn test_read_length(
        #[case] input: &[u8],
        #[case] expected: (u64, bool),
        #[case] expected_position: u64,
    ) {
        let mut cursor = Cursor::new(Vec::from(input));
        assert_eq!(expected, read_length_with_encoding(&mut cursor).unwrap());
        assert_eq!(expected_position, cursor.position());
    }

    #[rstest]
    #[case(0x82)]
    #[case(0x9a)]
    #[case(0xbf)]
    fn test_reserved_length_prefix_is_rejected(#[case] lead: u8) {
        let result = read_length_with_encoding(&mut Cursor::new(vec![lead, 0, 0, 0, 0]));
        assert!(matches!(result, Err(RdbError::BadLengthPrefix(b)) if b == lead));
    }

    #[test]
    fn test_read_blob() {
        assert_eq!(
            vec![0x61, 0x62, 0x63, 0x64],
            read_blob(&mut Cursor::new(vec![4, 0x61, 0x62, 0x63, 0x64])).unwrap()
        );
    }

    #[rstest]
    #[case(&[0xC0, 0x2A], b"42")]
    #[case(&[0xC0, 0xD6], b"-42")]
    #[case(&[0xC1, 0x39, 0x30], b"12345")]
    #[case(&[0xC2, 0x87, 0xD6, 0x12, 0x00], b"1234567")]
    fn test_read_blob_integer_encodings(#[case] input: &[u8], #[case] expected: &[u8]) {
        assert_eq!(
            expected.to_vec(),
            read_blob(&mut Cursor::new(Vec::from(input))).unwrap()
        );
    }

    #[test]
    fn test_read_blob_lzf_round_trip() {
        let original = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaabbbbbbbbcc".to_vec();
        let compressed = lzf::compress(&original).unwrap();

        let mut blob = vec![0xC3];
        blob.push(compressed.len() as u8);
        blob.push(original.len() as u8);
        blob.extend_from_slice(&compressed);

        assert_eq!(original, read_blob(&mut Cursor::new(blob)).unwrap());
    }

    #[test]
    fn test_read_blob_bad_lzf() {
        // declared sizes fine, compressed payload is garbage
        let blob = vec![0xC3, 2, 60, 0xE0, 0xFF];
        assert!(matches!(
            read_blob(&mut Cursor::new(blob)),
            Err(RdbError::BadLzf(_))
        ));
    }

    #[test]
    fn test_verify_magic() {
        assert!(verify_magic(&mut Cursor::new(vec![0x52, 0x45, 0x44, 0x49, 0x53])).is_ok());

        match verify_magic(&mut Cursor::new(vec![0x51, 0x0, 0x0, 0x0, 0x0])) {
            Err(RdbError::MagicMismatch(_)) => {}
            other => panic!("expected magic mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_read_version() {
        assert_eq!(
            12,
            read_version(&mut Cursor::new(vec![0x30, 0x30, 0x31, 0x32])).unwrap()
        );

        let result = read_version(&mut Cursor::new(vec![0x30, 0x30, 0x30, 0x3a]));
        assert!(matches!(result, Err(RdbError::MagicMismatch(_))));
    }
}
