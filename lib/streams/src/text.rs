//! Text in the engine's code-page encodings.
//!
//! UTF-16 and UTF-32 output is produced in host order first, then each
//! code unit is byte-swapped if the requested wire order differs, just
//! before the bytes are handed over.

use crate::error::BridgeError;
use crate::stream::BridgeStream;
use byteorder::{ByteOrder, NativeEndian};
use std::fmt;
use std::io::{self, Write};
use widestring::{U16Str, U16String, U32Str, U32String};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireOrder {
    Little,
    Big,
}

impl WireOrder {
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;

    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16(WireOrder),
    Utf32(WireOrder),
}

impl TextEncoding {
    pub const UTF8_CODE_PAGE: u32 = 65001;
    pub const UTF16LE_CODE_PAGE: u32 = 1200;
    pub const UTF16BE_CODE_PAGE: u32 = 1201;
    pub const UTF32LE_CODE_PAGE: u32 = 12000;
    pub const UTF32BE_CODE_PAGE: u32 = 12001;

    /// Maps a Windows code page; anything unrecognized falls back to UTF-8.
    pub fn from_code_page(code_page: u32) -> Self {
        match code_page {
            Self::UTF16LE_CODE_PAGE => Self::Utf16(WireOrder::Little),
            Self::UTF16BE_CODE_PAGE => Self::Utf16(WireOrder::Big),
            Self::UTF32LE_CODE_PAGE => Self::Utf32(WireOrder::Little),
            Self::UTF32BE_CODE_PAGE => Self::Utf32(WireOrder::Big),
            _ => Self::Utf8,
        }
    }

    pub fn code_page(self) -> u32 {
        match self {
            Self::Utf8 => Self::UTF8_CODE_PAGE,
            Self::Utf16(WireOrder::Little) => Self::UTF16LE_CODE_PAGE,
            Self::Utf16(WireOrder::Big) => Self::UTF16BE_CODE_PAGE,
            Self::Utf32(WireOrder::Little) => Self::UTF32LE_CODE_PAGE,
            Self::Utf32(WireOrder::Big) => Self::UTF32BE_CODE_PAGE,
        }
    }

    /// Bytes per code unit.
    pub fn unit_width(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16(_) => 2,
            Self::Utf32(_) => 4,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16(WireOrder::Little) => "UTF-16LE",
            Self::Utf16(WireOrder::Big) => "UTF-16BE",
            Self::Utf32(WireOrder::Little) => "UTF-32LE",
            Self::Utf32(WireOrder::Big) => "UTF-32BE",
        };
        f.write_str(name)
    }
}

fn swap_units16(units: &mut [u16], order: WireOrder) {
    if !order.is_native() {
        units.iter_mut().for_each(|unit| *unit = unit.swap_bytes());
    }
}

fn swap_units32(units: &mut [u32], order: WireOrder) {
    if !order.is_native() {
        units.iter_mut().for_each(|unit| *unit = unit.swap_bytes());
    }
}

pub fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf16(order) => {
            let mut units = U16String::from_str(text).into_vec();
            swap_units16(&mut units, order);
            let mut bytes = vec![0; units.len() * 2];
            NativeEndian::write_u16_into(&units, &mut bytes);
            bytes
        }
        TextEncoding::Utf32(order) => {
            let mut units = U32String::from_str(text).into_vec();
            swap_units32(&mut units, order);
            let mut bytes = vec![0; units.len() * 4];
            NativeEndian::write_u32_into(&units, &mut bytes);
            bytes
        }
    }
}

pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String, BridgeError> {
    let width = encoding.unit_width();
    if bytes.len() % width != 0 {
        return Err(BridgeError::PartialCodeUnit {
            len: bytes.len(),
            width,
        });
    }
    let invalid = || BridgeError::InvalidText(encoding);
    match encoding {
        TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| invalid()),
        TextEncoding::Utf16(order) => {
            let mut units = vec![0u16; bytes.len() / 2];
            NativeEndian::read_u16_into(bytes, &mut units);
            swap_units16(&mut units, order);
            U16Str::from_slice(&units).to_string().map_err(|_| invalid())
        }
        TextEncoding::Utf32(order) => {
            let mut units = vec![0u32; bytes.len() / 4];
            NativeEndian::read_u32_into(bytes, &mut units);
            swap_units32(&mut units, order);
            U32Str::from_slice(&units).to_string().map_err(|_| invalid())
        }
    }
}

/// Writes `text` to a bridged stream in one call.
///
/// The byte count is returned as the stream reported it, short or not.
pub fn write_text<S: BridgeStream + ?Sized>(
    stream: &mut S,
    text: &str,
    encoding: TextEncoding,
) -> io::Result<usize> {
    stream.write(&encode_text(text, encoding))
}

/// Writes all of `text` to any [`Write`] implementation.
pub fn write_text_all<W: Write + ?Sized>(
    writer: &mut W,
    text: &str,
    encoding: TextEncoding,
) -> io::Result<()> {
    writer.write_all(&encode_text(text, encoding))
}
