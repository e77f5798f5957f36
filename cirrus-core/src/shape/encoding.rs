//! Member encoding directives.
//!
//! A directive states where one member of a shape lives on the wire.
//! Members without a directive are encoded in the structured body under
//! their own label.
//!
//! ```text
//!  Location      request side            response side
//!  ─────────     ─────────────────────   ─────────────────────
//!  Uri           {Name} in path          (not read)
//!  QueryString   ?name=value             (not read)
//!  Header        name: value             name: value
//!  StatusCode    (not written)           status line code
//!  Body          {"name": value}         {"name": value}
//!  Blob          raw body                raw body
//! ```

use std::collections::HashSet;

use crate::error::ShapeError;

// ── Location ─────────────────────────────────────────────────────

/// Where a member is placed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Substituted into the request path for `{name}` / `{name+}`.
    Uri(&'static str),
    /// Appended to the query string as `name=value`.
    QueryString(&'static str),
    /// Carried in the header `name`.
    Header(&'static str),
    /// Read from the response status line. Response shapes only.
    StatusCode,
    /// Placed in the structured body under `name`.
    Body(&'static str),
}

/// How a member's value is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeEncoding {
    /// Regular structured encoding.
    #[default]
    Default,
    /// The member is the entire raw body payload.
    Blob,
}

/// The value kind of a member, as far as placement rules care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemberKind {
    Integer,
    #[default]
    Other,
}

/// Whether a shape is sent to or received from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeRole {
    Request,
    Response,
}

// ── MemberEncoding ───────────────────────────────────────────────

/// Placement directive for a single shape member.
///
/// Directives are `const`-constructible so shapes can declare them as
/// associated constants:
///
/// ```
/// use cirrus_core::shape::MemberEncoding;
///
/// const MEMBERS: &[MemberEncoding] = &[
///     MemberEncoding::header("ContentType", "Content-Type"),
///     MemberEncoding::uri("Bucket", "Bucket"),
///     MemberEncoding::blob("Body"),
/// ];
/// assert_eq!(MEMBERS.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberEncoding {
    /// Wire name of the member.
    pub label: &'static str,
    /// Explicit location; `None` means body under `label`.
    pub location: Option<Location>,
    /// Structured or raw payload.
    pub encoding: ShapeEncoding,
    /// Value kind of the member.
    pub kind: MemberKind,
}

/// Resolved placement of a member, defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Uri(&'static str),
    QueryString(&'static str),
    Header(&'static str),
    StatusCode,
    Body(&'static str),
    Payload,
}

impl MemberEncoding {
    /// A directive with no explicit location and default encoding.
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            location: None,
            encoding: ShapeEncoding::Default,
            kind: MemberKind::Other,
        }
    }

    pub const fn uri(label: &'static str, name: &'static str) -> Self {
        Self::new(label).at(Location::Uri(name))
    }

    pub const fn query(label: &'static str, name: &'static str) -> Self {
        Self::new(label).at(Location::QueryString(name))
    }

    pub const fn header(label: &'static str, name: &'static str) -> Self {
        Self::new(label).at(Location::Header(name))
    }

    pub const fn body(label: &'static str, name: &'static str) -> Self {
        Self::new(label).at(Location::Body(name))
    }

    /// Status code member. Implies an integer kind.
    pub const fn status_code(label: &'static str) -> Self {
        Self::new(label).at(Location::StatusCode).integer()
    }

    /// Raw payload member.
    pub const fn blob(label: &'static str) -> Self {
        Self {
            encoding: ShapeEncoding::Blob,
            ..Self::new(label)
        }
    }

    /// Set an explicit location.
    pub const fn at(self, location: Location) -> Self {
        Self {
            location: Some(location),
            ..self
        }
    }

    /// Mark the member as integer-valued.
    pub const fn integer(self) -> Self {
        Self {
            kind: MemberKind::Integer,
            ..self
        }
    }

    pub fn is_blob(&self) -> bool {
        self.encoding == ShapeEncoding::Blob
    }

    /// Resolve where this member goes, applying defaults.
    pub fn placement(&self) -> Placement {
        if self.is_blob() {
            return Placement::Payload;
        }
        match self.location {
            Some(Location::Uri(name)) => Placement::Uri(name),
            Some(Location::QueryString(name)) => Placement::QueryString(name),
            Some(Location::Header(name)) => Placement::Header(name),
            Some(Location::StatusCode) => Placement::StatusCode,
            Some(Location::Body(name)) => Placement::Body(name),
            None => Placement::Body(self.label),
        }
    }

    fn location_name(&self) -> Option<&'static str> {
        match self.location {
            Some(Location::Uri(n))
            | Some(Location::QueryString(n))
            | Some(Location::Header(n))
            | Some(Location::Body(n)) => Some(n),
            Some(Location::StatusCode) | None => None,
        }
    }
}

// ── ShapeDirectives ──────────────────────────────────────────────

/// A validated, ordered directive list for one shape.
///
/// The only way to obtain one is [`ShapeDirectives::new`], so holding a
/// value means the placement rules already passed.
#[derive(Debug, Clone, Copy)]
pub struct ShapeDirectives {
    shape: &'static str,
    role: ShapeRole,
    members: &'static [MemberEncoding],
}

impl ShapeDirectives {
    /// Validate `members` for a shape and wrap them.
    pub fn new(
        shape: &'static str,
        role: ShapeRole,
        members: &'static [MemberEncoding],
    ) -> Result<Self, ShapeError> {
        let mut labels = HashSet::with_capacity(members.len());
        let mut blob: Option<&'static str> = None;

        for member in members {
            if member.label.is_empty() || member.location_name() == Some("") {
                return Err(ShapeError::EmptyName { shape });
            }
            if !labels.insert(member.label) {
                return Err(ShapeError::DuplicateLabel {
                    shape,
                    label: member.label,
                });
            }
            if member.is_blob() {
                if let Some(first) = blob {
                    return Err(ShapeError::MultipleBlobs {
                        shape,
                        first,
                        second: member.label,
                    });
                }
                blob = Some(member.label);
            }
            if member.location == Some(Location::StatusCode) {
                if role != ShapeRole::Response {
                    return Err(ShapeError::StatusCodeOnRequest {
                        shape,
                        label: member.label,
                    });
                }
                if member.kind != MemberKind::Integer {
                    return Err(ShapeError::StatusCodeNotInteger {
                        shape,
                        label: member.label,
                    });
                }
            }
        }

        if let Some(blob) = blob {
            let body = members
                .iter()
                .find(|m| matches!(m.placement(), Placement::Body(_)));
            if let Some(body) = body {
                return Err(ShapeError::BodyWithBlob {
                    shape,
                    body: body.label,
                    blob,
                });
            }
        }

        Ok(Self {
            shape,
            role,
            members,
        })
    }

    pub fn shape(&self) -> &'static str {
        self.shape
    }

    pub fn role(&self) -> ShapeRole {
        self.role
    }

    /// Directives in declaration order.
    pub fn members(&self) -> &'static [MemberEncoding] {
        self.members
    }

    /// Look up the directive for `label`.
    pub fn get(&self, label: &str) -> Option<&'static MemberEncoding> {
        self.members.iter().find(|m| m.label == label)
    }

    /// Placement for `label`; undeclared members go to the body.
    pub fn placement<'a>(&self, label: &'a str) -> PlacementRef<'a> {
        match self.get(label) {
            Some(member) => PlacementRef::Declared(member.placement()),
            None => PlacementRef::DefaultBody(label),
        }
    }

    /// The raw payload member, if the shape has one.
    pub fn payload(&self) -> Option<&'static MemberEncoding> {
        self.members.iter().find(|m| m.is_blob())
    }
}

/// Placement lookup result that may borrow an undeclared label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementRef<'a> {
    Declared(Placement),
    DefaultBody(&'a str),
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn check(role: ShapeRole, members: &'static [MemberEncoding]) -> Result<ShapeDirectives, ShapeError> {
        ShapeDirectives::new("TestShape", role, members)
    }

    #[test]
    fn accepts_mixed_locations() {
        static MEMBERS: &[MemberEncoding] = &[
            MemberEncoding::uri("Bucket", "Bucket"),
            MemberEncoding::query("MaxKeys", "max-keys"),
            MemberEncoding::header("RequestId", "x-request-id"),
            MemberEncoding::body("Name", "name"),
        ];
        let d = check(ShapeRole::Request, MEMBERS).unwrap();
        assert_eq!(d.members().len(), 4);
        assert_eq!(d.get("MaxKeys").unwrap().placement(), Placement::QueryString("max-keys"));
    }

    #[test]
    fn rejects_duplicate_labels() {
        static MEMBERS: &[MemberEncoding] = &[
            MemberEncoding::header("Token", "x-token"),
            MemberEncoding::query("Token", "token"),
        ];
        let err = check(ShapeRole::Request, MEMBERS).unwrap_err();
        assert_eq!(
            err,
            ShapeError::DuplicateLabel {
                shape: "TestShape",
                label: "Token"
            }
        );
    }

    #[test]
    fn rejects_two_blobs() {
        static MEMBERS: &[MemberEncoding] =
            &[MemberEncoding::blob("First"), MemberEncoding::blob("Second")];
        assert!(matches!(
            check(ShapeRole::Request, MEMBERS),
            Err(ShapeError::MultipleBlobs { .. })
        ));
    }

    #[test]
    fn rejects_body_next_to_blob() {
        static MEMBERS: &[MemberEncoding] = &[
            MemberEncoding::blob("Payload"),
            MemberEncoding::body("Extra", "extra"),
        ];
        assert!(matches!(
            check(ShapeRole::Request, MEMBERS),
            Err(ShapeError::BodyWithBlob { .. })
        ));
    }

    #[test]
    fn rejects_implicit_body_next_to_blob() {
        static MEMBERS: &[MemberEncoding] =
            &[MemberEncoding::blob("Payload"), MemberEncoding::new("Extra")];
        assert!(matches!(
            check(ShapeRole::Request, MEMBERS),
            Err(ShapeError::BodyWithBlob { .. })
        ));
    }

    #[test]
    fn blob_with_headers_is_fine() {
        static MEMBERS: &[MemberEncoding] = &[
            MemberEncoding::blob("Payload"),
            MemberEncoding::header("ContentType", "Content-Type"),
        ];
        let d = check(ShapeRole::Response, MEMBERS).unwrap();
        assert_eq!(d.payload().unwrap().label, "Payload");
    }

    #[test]
    fn status_code_only_on_response() {
        static MEMBERS: &[MemberEncoding] = &[MemberEncoding::status_code("Status")];
        assert!(check(ShapeRole::Response, MEMBERS).is_ok());
        assert!(matches!(
            check(ShapeRole::Request, MEMBERS),
            Err(ShapeError::StatusCodeOnRequest { .. })
        ));
    }

    #[test]
    fn status_code_must_be_integer() {
        static MEMBERS: &[MemberEncoding] = &[MemberEncoding::new("Status").at(Location::StatusCode)];
        assert!(matches!(
            check(ShapeRole::Response, MEMBERS),
            Err(ShapeError::StatusCodeNotInteger { .. })
        ));
    }

    #[test]
    fn rejects_empty_names() {
        static EMPTY_LABEL: &[MemberEncoding] = &[MemberEncoding::header("", "x-a")];
        static EMPTY_LOCATION: &[MemberEncoding] = &[MemberEncoding::header("A", "")];
        assert!(check(ShapeRole::Request, EMPTY_LABEL).is_err());
        assert!(check(ShapeRole::Request, EMPTY_LOCATION).is_err());
    }

    #[test]
    fn undeclared_members_default_to_body() {
        static MEMBERS: &[MemberEncoding] = &[MemberEncoding::header("A", "x-a")];
        let d = check(ShapeRole::Request, MEMBERS).unwrap();
        assert_eq!(d.placement("pageSize"), PlacementRef::DefaultBody("pageSize"));
        assert_eq!(
            d.placement("A"),
            PlacementRef::Declared(Placement::Header("x-a"))
        );
    }
}
