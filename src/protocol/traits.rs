use std::io::{Read, Write};

use thiserror::Error;

/// What can go wrong moving sticky wire structures in or out of bytes.
///
/// The codec here has a single surface, the member user-data blob, and its
/// failure modes do not differ by direction, so reads and writes share one
/// error.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    #[error("reading or writing bytes failed: {0}")]
    IO(#[from] std::io::Error),

    #[error("length does not fit the wire type: {0}")]
    Overflow(#[from] std::num::TryFromIntError),

    #[error("malformed data: {0}")]
    Malformed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub trait ReadType<R>: Sized
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, CodecError>;
}

pub trait WriteType<W>: Sized
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), CodecError>;
}
