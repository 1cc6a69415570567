//! Bounds-checked integer reads over an in-memory buffer.
//!
//! Mach-O images mix two byte orders: the header and load commands are read
//! little-endian while everything inside the code signature is big-endian.
//! Every read takes an explicit [`Endian`] so the convention is visible at
//! the call site, and fixed-layout records go through the single
//! [`ByteReader::read_struct`] routine.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::{Error, Result};

/// Byte order of a multi-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// A record made of consecutive 32-bit words.
///
/// Implemented by the Mach-O and code signature headers so they can be read
/// with [`ByteReader::read_struct`].
pub trait WordStruct: Sized {
    /// Number of 32-bit words in the record.
    const WORDS: usize;

    /// Build the record from its words, in declaration order.
    fn from_words(words: &[u32]) -> Self;

    /// Size of the record in bytes.
    fn size() -> usize {
        Self::WORDS * 4
    }
}

/// Read-only cursor-free view over a byte buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(Error::Truncated {
                offset: offset as u64,
                len: len as u64,
                available: self.data.len(),
            })
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    pub fn read_u32(&self, offset: usize, endian: Endian) -> Result<u32> {
        let bytes = self.bytes(offset, 4)?;
        Ok(match endian {
            Endian::Big => BigEndian::read_u32(bytes),
            Endian::Little => LittleEndian::read_u32(bytes),
        })
    }

    pub fn read_u64(&self, offset: usize, endian: Endian) -> Result<u64> {
        let bytes = self.bytes(offset, 8)?;
        Ok(match endian {
            Endian::Big => BigEndian::read_u64(bytes),
            Endian::Little => LittleEndian::read_u64(bytes),
        })
    }

    /// Big-endian unsigned integer of arbitrary width.
    ///
    /// Each byte is shifted in from the right; widths above 8 bytes keep
    /// the low 64 bits.
    pub fn read_uint_be(&self, offset: usize, width: usize) -> Result<u64> {
        Ok(fold_be(self.bytes(offset, width)?))
    }

    /// Read a [`WordStruct`] whose words all use `endian`.
    pub fn read_struct<T: WordStruct>(&self, offset: usize, endian: Endian) -> Result<T> {
        // Check the whole record up front so a short read never builds a partial one.
        self.bytes(offset, T::size())?;
        let mut words = Vec::with_capacity(T::WORDS);
        for i in 0..T::WORDS {
            words.push(self.read_u32(offset + i * 4, endian)?);
        }
        Ok(T::from_words(&words))
    }
}

/// Big-endian byte fold: `acc = (acc << 8) | byte`.
pub fn fold_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: u32,
        b: u32,
    }

    impl WordStruct for Pair {
        const WORDS: usize = 2;

        fn from_words(words: &[u32]) -> Self {
            Self {
                a: words[0],
                b: words[1],
            }
        }
    }

    #[test]
    fn test_read_u32_both_orders() {
        let data = [0xfa, 0xde, 0x0c, 0xc0];
        let reader = ByteReader::new(&data);
        assert_eq!(reader.read_u32(0, Endian::Big).unwrap(), 0xfade0cc0);
        assert_eq!(reader.read_u32(0, Endian::Little).unwrap(), 0xc00cdefa);
    }

    #[test]
    fn test_read_u64_big_endian() {
        let data = [0, 0, 0, 0, 0, 0, 0x01, 0x02];
        let reader = ByteReader::new(&data);
        assert_eq!(reader.read_u64(0, Endian::Big).unwrap(), 0x0102);
    }

    #[test]
    fn test_read_uint_be_widths() {
        let data = [0x01, 0x02, 0x03];
        let reader = ByteReader::new(&data);
        assert_eq!(reader.read_uint_be(0, 1).unwrap(), 0x01);
        assert_eq!(reader.read_uint_be(0, 3).unwrap(), 0x010203);
        assert_eq!(reader.read_uint_be(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_fold_be_keeps_low_bits() {
        let mut bytes = vec![0xff; 8];
        bytes.push(0x2a);
        assert_eq!(fold_be(&bytes), 0xffff_ffff_ffff_ff2a);
    }

    #[test]
    fn test_read_struct_endianness() {
        let data = [1, 0, 0, 0, 0, 0, 0, 2];
        let reader = ByteReader::new(&data);

        let little: Pair = reader.read_struct(0, Endian::Little).unwrap();
        assert_eq!((little.a, little.b), (1, 0x0200_0000));

        let big: Pair = reader.read_struct(0, Endian::Big).unwrap();
        assert_eq!((big.a, big.b), (0x0100_0000, 2));
    }

    #[test]
    fn test_out_of_bounds() {
        let data = [0u8; 6];
        let reader = ByteReader::new(&data);
        assert!(matches!(
            reader.read_u32(4, Endian::Big),
            Err(Error::Truncated { offset: 4, len: 4, available: 6 })
        ));
        assert!(reader.read_struct::<Pair>(0, Endian::Big).is_err());
        assert!(reader.bytes(usize::MAX, 2).is_err());
    }
}
