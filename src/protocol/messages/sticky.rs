//! User-data blobs exchanged by members of the sticky balance strategy.
//!
//! Every member ships its previous assignment inside the opaque `UserData`
//! field of its join metadata so the next group leader can reconstruct the
//! prior plan. Two shapes exist: v0 carries the assignment only, v1 appends
//! the group generation it was handed out in (KIP-341). The version is not
//! part of the blob; it travels out of band with the member metadata.

use std::io::{Read, Write};

use crate::protocol::traits::{CodecError, ReadType, WriteType};
use crate::protocol::vec_builder::VecBuilder;

/// One `(topic, partitions)` block of a member's previous assignment.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, proptest_derive::Arbitrary))]
pub struct TopicAssignment {
    pub topic: String,
    pub partitions: Vec<i32>,
}

impl<R> ReadType<R> for TopicAssignment
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, CodecError> {
        let topic = String::read(reader)?;
        let partitions = Vec::<i32>::read(reader)?;

        Ok(Self { topic, partitions })
    }
}

impl<W> WriteType<W> for TopicAssignment
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), CodecError> {
        self.topic.write(writer)?;
        self.partitions.write(writer)?;

        Ok(())
    }
}

fn read_assignments<R>(reader: &mut R) -> Result<Vec<TopicAssignment>, CodecError>
where
    R: Read,
{
    let len = i32::read(reader)?;
    if len == -1 {
        return Ok(vec![]);
    }

    let len = usize::try_from(len)?;
    let mut assignments = VecBuilder::new(len);
    for _ in 0..len {
        assignments.push(TopicAssignment::read(reader)?);
    }

    Ok(assignments.into())
}

fn write_assignments<W>(
    assignments: &[TopicAssignment],
    writer: &mut W,
) -> Result<(), CodecError>
where
    W: Write,
{
    let len = i32::try_from(assignments.len())?;
    len.write(writer)?;

    for assignment in assignments {
        assignment.write(writer)?;
    }

    Ok(())
}

/// Sticky strategy user data, first shape: the previous assignment alone.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, proptest_derive::Arbitrary))]
pub struct StickyMemberMetadataV0 {
    pub current_assignment: Vec<TopicAssignment>,
}

impl<R> ReadType<R> for StickyMemberMetadataV0
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, CodecError> {
        let current_assignment = read_assignments(reader)?;

        Ok(Self { current_assignment })
    }
}

impl<W> WriteType<W> for StickyMemberMetadataV0
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), CodecError> {
        write_assignments(&self.current_assignment, writer)
    }
}

/// Sticky strategy user data, second shape: v0 plus the generation the
/// assignment was handed out in, so stale rejoining members lose conflicts.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, proptest_derive::Arbitrary))]
pub struct StickyMemberMetadataV1 {
    pub current_assignment: Vec<TopicAssignment>,
    pub generation: i32,
}

impl<R> ReadType<R> for StickyMemberMetadataV1
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, CodecError> {
        let current_assignment = read_assignments(reader)?;
        let generation = i32::read(reader)?;

        Ok(Self {
            current_assignment,
            generation,
        })
    }
}

impl<W> WriteType<W> for StickyMemberMetadataV1
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), CodecError> {
        write_assignments(&self.current_assignment, writer)?;
        self.generation.write(writer)?;

        Ok(())
    }
}
