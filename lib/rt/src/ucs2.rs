//! Fixed-size UCS-2 buffers used by the engine's structs.

use crate::error::{Error, Result};
use widestring::{U16Str, U16String};

/// Copies `text` into `dest` and terminates it with a NUL.
///
/// Returns the number of code units written, terminator excluded.
pub fn copy_to_ucs2(text: &str, dest: &mut [u16]) -> Result<usize> {
    let units = U16String::from_str(text);
    let units = units.as_slice();
    if units.len() >= dest.len() {
        return Err(Error::StringTooLong {
            len: units.len(),
            capacity: dest.len(),
        });
    }
    dest[..units.len()].copy_from_slice(units);
    dest[units.len()] = 0;
    Ok(units.len())
}

/// Reads a string back, stopping at the first NUL or the end of `buffer`.
pub fn from_ucs2(buffer: &[u16]) -> String {
    let end = buffer.iter().position(|&unit| unit == 0).unwrap_or(buffer.len());
    U16Str::from_slice(&buffer[..end]).to_string_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip() -> anyhow::Result<()> {
        let mut buffer = [0xffffu16; 16];
        let written = copy_to_ucs2("Résumé.docx", &mut buffer)?;
        assert_eq!(written, 11);
        assert_eq!(buffer[written], 0);
        assert_eq!(from_ucs2(&buffer), "Résumé.docx");
        Ok(())
    }

    #[test]
    fn terminator_must_fit() {
        let mut buffer = [0u16; 4];
        assert!(copy_to_ucs2("abc", &mut buffer).is_ok());
        assert!(matches!(
            copy_to_ucs2("abcd", &mut buffer),
            Err(Error::StringTooLong {
                len: 4,
                capacity: 4
            })
        ));
    }

    #[test]
    fn unterminated_buffer() {
        let buffer = [b'o' as u16, b'k' as u16];
        assert_eq!(from_ucs2(&buffer), "ok");
        assert_eq!(from_ucs2(&[]), "");
    }
}
