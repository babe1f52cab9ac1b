use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use super::common::utils::{read_blob, read_length};
use crate::constants::module_op;
use crate::errors::{RdbError, RdbResult};
use crate::types::RdbValue;

/// Module values are not reconstructed. The payload is framed by module
/// opcodes, so it can be walked and discarded; a placeholder value stands in
/// for the key.
pub fn skip_module<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    read_length(input)?; // module id

    loop {
        let opcode = read_length(input)?;
        match opcode {
            module_op::EOF => break,
            module_op::SINT | module_op::UINT => {
                read_length(input)?;
            }
            module_op::FLOAT => {
                input.read_f32::<LittleEndian>()?;
            }
            module_op::DOUBLE => {
                input.read_f64::<LittleEndian>()?;
            }
            module_op::STRING => {
                read_blob(input)?;
            }
            other => {
                return Err(RdbError::BadEncoding {
                    context: "module",
                    message: format!("unknown module opcode {}", other),
                })
            }
        }
    }

    Ok(RdbValue::String(b"<module skipped>".to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_walks_to_module_eof() {
        let mut bytes = Vec::new();
        bytes.push(0x05); // module id
        bytes.push(0x05); // string opcode
        bytes.extend_from_slice(&[0x03, b'a', b'b', b'c']);
        bytes.push(0x01); // sint opcode
        bytes.push(0x2A);
        bytes.push(0x04); // double opcode
        bytes.extend_from_slice(&1.5f64.to_le_bytes());
        bytes.push(0x00); // module eof

        let mut cursor = Cursor::new(bytes.clone());
        let value = skip_module(&mut cursor).unwrap();

        assert_eq!(bytes.len() as u64, cursor.position());
        assert_eq!(RdbValue::String(b"<module skipped>".to_vec()), value);
    }

    #[test]
    fn test_unknown_module_opcode() {
        let bytes = vec![0x05, 0x09];
        assert!(matches!(
            skip_module(&mut Cursor::new(bytes)),
            Err(RdbError::BadEncoding { context: "module", .. })
        ));
    }
}
