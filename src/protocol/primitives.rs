//! Kafka primitive encodings used by the sticky member metadata.
//!
//! The blob predates flexible protocol versions, so only the classic forms
//! appear here: fixed-width integers in network byte order, STRING, and
//! ARRAY of INT32. Compact and varint encodings never occur in it.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_types>

use std::io::{Read, Write};

use super::{
    traits::{CodecError, ReadType, WriteType},
    vec_builder::VecBuilder,
};

/// INT16 and INT32: big-endian, two and four bytes wide.
macro_rules! int_codec {
    ($int:ty) => {
        impl<R> ReadType<R> for $int
        where
            R: Read,
        {
            fn read(reader: &mut R) -> Result<Self, CodecError> {
                let mut buf = [0u8; std::mem::size_of::<$int>()];
                reader.read_exact(&mut buf)?;
                Ok(<$int>::from_be_bytes(buf))
            }
        }

        impl<W> WriteType<W> for $int
        where
            W: Write,
        {
            fn write(&self, writer: &mut W) -> Result<(), CodecError> {
                writer.write_all(&self.to_be_bytes())?;
                Ok(())
            }
        }
    };
}

int_codec!(i16);
int_codec!(i32);

/// STRING: an INT16 byte length followed by that many bytes of UTF-8.
///
/// The length may not be negative; NULLABLE_STRING does not occur in the
/// sticky blob.
impl<R> ReadType<R> for String
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, CodecError> {
        let len = i16::read(reader)?;
        if len < 0 {
            return Err(CodecError::Malformed(
                format!("negative STRING length: {len}").into(),
            ));
        }

        let bytes = VecBuilder::new(len as usize).read_exact(reader)?;
        String::from_utf8(bytes.into()).map_err(|err| CodecError::Malformed(Box::new(err)))
    }
}

impl<W> WriteType<W> for String
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), CodecError> {
        self.as_str().write(writer)
    }
}

/// Borrowed strings encode the same way, sparing callers an owned copy.
impl<W> WriteType<W> for &str
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), CodecError> {
        i16::try_from(self.len())?.write(writer)?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

/// ARRAY of INT32: an INT32 element count, then the elements.
///
/// A count of -1 is the null array and reads back as empty.
impl<R> ReadType<R> for Vec<i32>
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, CodecError> {
        let len = i32::read(reader)?;
        if len == -1 {
            return Ok(vec![]);
        }

        let mut elements = VecBuilder::new(usize::try_from(len)?);
        for _ in 0..len {
            elements.push(i32::read(reader)?);
        }
        Ok(elements.into())
    }
}

impl<W> WriteType<W> for Vec<i32>
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), CodecError> {
        i32::try_from(self.len())?.write(writer)?;
        for element in self {
            element.write(writer)?;
        }
        Ok(())
    }
}
