//! Wire structures the sticky balance strategy reads and writes.

mod sticky;

pub use sticky::{StickyMemberMetadataV0, StickyMemberMetadataV1, TopicAssignment};
