//! Shapes: structured inputs and outputs of service operations.
//!
//! A shape declares its member placement through [`Shape::MEMBERS`] and
//! moves its fields on and off the wire one member at a time through a
//! [`MemberWriter`] / [`MemberReader`]. There is no reflection: every
//! field is written and read explicitly by the shape itself.
//!
//! ```
//! use cirrus_core::shape::{
//!     DecodableShape, EncodableShape, MemberEncoding, MemberReader, MemberWriter, Shape,
//!     ShapeRole,
//! };
//! use cirrus_core::CirrusError;
//!
//! struct GetObjectInput {
//!     bucket: String,
//!     range: Option<String>,
//! }
//!
//! impl Shape for GetObjectInput {
//!     const NAME: &'static str = "GetObjectInput";
//!     const ROLE: ShapeRole = ShapeRole::Request;
//!     const MEMBERS: &'static [MemberEncoding] = &[
//!         MemberEncoding::uri("Bucket", "Bucket"),
//!         MemberEncoding::header("Range", "Range"),
//!     ];
//! }
//!
//! impl EncodableShape for GetObjectInput {
//!     fn encode_members(&self, w: &mut MemberWriter<'_>) -> Result<(), CirrusError> {
//!         w.member("Bucket", self.bucket.as_str())?;
//!         w.optional("Range", self.range.as_deref())
//!     }
//! }
//! ```

pub mod codec;
pub mod encoding;
pub mod registry;

pub use codec::{EncodedParts, JsonCodec, MemberReader, MemberValue, MemberWriter, ShapeCodec};
pub use encoding::{
    Location, MemberEncoding, MemberKind, Placement, PlacementRef, ShapeDirectives, ShapeEncoding,
    ShapeRole,
};
pub use registry::ShapeRegistry;

use crate::error::CirrusError;

/// Static description of a shape type.
pub trait Shape: 'static {
    /// Shape name used in diagnostics.
    const NAME: &'static str;

    /// Whether the shape is sent or received.
    const ROLE: ShapeRole;

    /// Members that need non-default placement, in declaration order.
    const MEMBERS: &'static [MemberEncoding] = &[];
}

/// A shape that can be turned into request fragments.
pub trait EncodableShape: Shape {
    /// Write every present member through `writer`.
    fn encode_members(&self, writer: &mut MemberWriter<'_>) -> Result<(), CirrusError>;
}

/// A shape that can be rebuilt from a response.
pub trait DecodableShape: Shape + Sized {
    /// Read every member through `reader`.
    fn decode_members(reader: &MemberReader<'_>) -> Result<Self, CirrusError>;
}

/// Input shape with nothing to send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

impl Shape for Empty {
    const NAME: &'static str = "Empty";
    const ROLE: ShapeRole = ShapeRole::Request;
}

impl EncodableShape for Empty {
    fn encode_members(&self, _writer: &mut MemberWriter<'_>) -> Result<(), CirrusError> {
        Ok(())
    }
}
