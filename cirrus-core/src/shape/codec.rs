//! Shape codec: moves shape members on and off the wire.
//!
//! The transport never sees shapes. A [`ShapeCodec`] turns an input
//! shape into [`EncodedParts`] (headers, query, path substitutions and
//! body) and rebuilds an output shape from a [`Response`].
//!
//! Routing is explicit: a shape writes each member through a
//! [`MemberWriter`], which looks up the member's directive and sends the
//! value to the matching destination. Absent optional members are
//! omitted entirely.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CirrusError;
use crate::request::{expand_path, Method, Request};
use crate::response::Response;
use crate::shape::encoding::{Placement, PlacementRef, ShapeDirectives};
use crate::shape::{DecodableShape, EncodableShape};

// ── MemberValue ──────────────────────────────────────────────────

/// A single member value on its way to the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Blob(Bytes),
    Json(Value),
}

impl MemberValue {
    /// Text form used in headers, query strings and paths.
    fn to_text(&self, label: &str) -> Result<String, CirrusError> {
        match self {
            MemberValue::String(s) => Ok(s.clone()),
            MemberValue::Integer(i) => Ok(i.to_string()),
            MemberValue::Boolean(b) => Ok(b.to_string()),
            MemberValue::Json(Value::String(s)) => Ok(s.clone()),
            MemberValue::Json(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            MemberValue::Blob(_) | MemberValue::Json(_) => Err(CirrusError::Encoding(format!(
                "member `{label}` cannot be written as text"
            ))),
        }
    }

    fn into_json(self, label: &str) -> Result<Value, CirrusError> {
        match self {
            MemberValue::String(s) => Ok(Value::String(s)),
            MemberValue::Integer(i) => Ok(Value::from(i)),
            MemberValue::Boolean(b) => Ok(Value::Bool(b)),
            MemberValue::Json(v) => Ok(v),
            MemberValue::Blob(_) => Err(CirrusError::Encoding(format!(
                "blob member `{label}` must be the raw payload"
            ))),
        }
    }

    fn into_payload(self, label: &str) -> Result<Bytes, CirrusError> {
        match self {
            MemberValue::Blob(b) => Ok(b),
            MemberValue::String(s) => Ok(Bytes::from(s)),
            _ => Err(CirrusError::Encoding(format!(
                "payload member `{label}` must be bytes or text"
            ))),
        }
    }
}

impl From<String> for MemberValue {
    fn from(v: String) -> Self {
        MemberValue::String(v)
    }
}

impl From<&str> for MemberValue {
    fn from(v: &str) -> Self {
        MemberValue::String(v.to_string())
    }
}

impl From<i64> for MemberValue {
    fn from(v: i64) -> Self {
        MemberValue::Integer(v)
    }
}

impl From<i32> for MemberValue {
    fn from(v: i32) -> Self {
        MemberValue::Integer(v.into())
    }
}

impl From<u32> for MemberValue {
    fn from(v: u32) -> Self {
        MemberValue::Integer(v.into())
    }
}

impl From<bool> for MemberValue {
    fn from(v: bool) -> Self {
        MemberValue::Boolean(v)
    }
}

impl From<Bytes> for MemberValue {
    fn from(v: Bytes) -> Self {
        MemberValue::Blob(v)
    }
}

impl From<Vec<u8>> for MemberValue {
    fn from(v: Vec<u8>) -> Self {
        MemberValue::Blob(Bytes::from(v))
    }
}

impl From<Value> for MemberValue {
    fn from(v: Value) -> Self {
        MemberValue::Json(v)
    }
}

// ── EncodedParts ─────────────────────────────────────────────────

/// Wire fragments produced from an input shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedParts {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub uri: Vec<(String, String)>,
    pub body: Bytes,
}

impl EncodedParts {
    /// Assemble a request for `path_template`, substituting uri members.
    pub fn into_request(self, method: Method, path_template: &str) -> Result<Request, CirrusError> {
        let path = expand_path(path_template, &self.uri)?;
        let mut request = Request::new(method, path).with_body(self.body);
        for (name, value) in self.headers {
            request = request.with_header(name, value);
        }
        for (name, value) in self.query {
            request = request.with_query(name, value);
        }
        Ok(request)
    }
}

// ── MemberWriter ─────────────────────────────────────────────────

/// Routes member values to their wire location.
#[derive(Debug)]
pub struct MemberWriter<'a> {
    directives: &'a ShapeDirectives,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    uri: Vec<(String, String)>,
    fields: Map<String, Value>,
    payload: Option<Bytes>,
}

impl<'a> MemberWriter<'a> {
    pub fn new(directives: &'a ShapeDirectives) -> Self {
        Self {
            directives,
            headers: Vec::new(),
            query: Vec::new(),
            uri: Vec::new(),
            fields: Map::new(),
            payload: None,
        }
    }

    /// Write a present member.
    pub fn member(&mut self, label: &str, value: impl Into<MemberValue>) -> Result<(), CirrusError> {
        let value = value.into();
        match self.directives.placement(label) {
            PlacementRef::Declared(Placement::Header(name)) => {
                self.headers.push((name.to_string(), value.to_text(label)?));
            }
            PlacementRef::Declared(Placement::QueryString(name)) => {
                self.query.push((name.to_string(), value.to_text(label)?));
            }
            PlacementRef::Declared(Placement::Uri(name)) => {
                self.uri.push((name.to_string(), value.to_text(label)?));
            }
            PlacementRef::Declared(Placement::Body(name)) => {
                self.body_allowed(label)?;
                self.fields.insert(name.to_string(), value.into_json(label)?);
            }
            PlacementRef::DefaultBody(name) => {
                self.body_allowed(label)?;
                self.fields.insert(name.to_string(), value.into_json(label)?);
            }
            PlacementRef::Declared(Placement::Payload) => {
                self.payload = Some(value.into_payload(label)?);
            }
            // Status codes only exist on responses.
            PlacementRef::Declared(Placement::StatusCode) => {}
        }
        Ok(())
    }

    /// Write an optional member; `None` writes nothing.
    pub fn optional<V: Into<MemberValue>>(
        &mut self,
        label: &str,
        value: Option<V>,
    ) -> Result<(), CirrusError> {
        match value {
            Some(v) => self.member(label, v),
            None => Ok(()),
        }
    }

    /// Write a structured value through serde.
    pub fn serialize<T: Serialize + ?Sized>(&mut self, label: &str, value: &T) -> Result<(), CirrusError> {
        let value = serde_json::to_value(value).map_err(|e| CirrusError::Encoding(e.to_string()))?;
        self.member(label, value)
    }

    /// A shape with a raw payload has no structured body to write into.
    fn body_allowed(&self, label: &str) -> Result<(), CirrusError> {
        match self.directives.payload() {
            Some(payload) => Err(CirrusError::Encoding(format!(
                "{}: member `{label}` targets the body, which is taken by blob member `{}`",
                self.directives.shape(),
                payload.label
            ))),
            None => Ok(()),
        }
    }
}

// ── MemberReader ─────────────────────────────────────────────────

/// Reads member values from a response according to their directives.
#[derive(Debug)]
pub struct MemberReader<'a> {
    directives: &'a ShapeDirectives,
    response: &'a Response,
    fields: Map<String, Value>,
}

enum Raw<'a> {
    Text(&'a str),
    Status(u16),
    Payload(&'a Bytes),
    Json(&'a Value),
    Absent,
}

impl<'a> MemberReader<'a> {
    /// Prepare a reader; structured body fields are parsed up front
    /// unless the shape reads its body as a raw payload.
    pub fn new(directives: &'a ShapeDirectives, response: &'a Response) -> Result<Self, CirrusError> {
        let fields = if directives.payload().is_some() || response.body().is_empty() {
            Map::new()
        } else {
            match serde_json::from_slice::<Value>(response.body())? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                other => {
                    return Err(CirrusError::Decoding(format!(
                        "{}: expected a json object body, got {other}",
                        directives.shape()
                    )))
                }
            }
        };
        Ok(Self {
            directives,
            response,
            fields,
        })
    }

    fn raw(&self, label: &str) -> Result<Raw<'_>, CirrusError> {
        let found = match self.directives.placement(label) {
            PlacementRef::Declared(Placement::Header(name)) => self.response.header(name).map(Raw::Text),
            PlacementRef::Declared(Placement::StatusCode) => Some(Raw::Status(self.response.status())),
            PlacementRef::Declared(Placement::Payload) => Some(Raw::Payload(self.response.body())),
            PlacementRef::Declared(Placement::Body(name)) => {
                self.body_allowed(label)?;
                self.fields.get(name).map(Raw::Json)
            }
            PlacementRef::DefaultBody(name) => {
                self.body_allowed(label)?;
                self.fields.get(name).map(Raw::Json)
            }
            PlacementRef::Declared(Placement::Uri(_) | Placement::QueryString(_)) => None,
        };
        Ok(match found {
            Some(Raw::Json(Value::Null)) | None => Raw::Absent,
            Some(raw) => raw,
        })
    }

    fn body_allowed(&self, label: &str) -> Result<(), CirrusError> {
        match self.directives.payload() {
            Some(payload) => Err(CirrusError::Decoding(format!(
                "{}: member `{label}` reads the body, which is taken by blob member `{}`",
                self.directives.shape(),
                payload.label
            ))),
            None => Ok(()),
        }
    }

    /// Read a text member.
    pub fn string(&self, label: &str) -> Result<Option<String>, CirrusError> {
        match self.raw(label)? {
            Raw::Absent => Ok(None),
            Raw::Text(s) => Ok(Some(s.to_string())),
            Raw::Status(code) => Ok(Some(code.to_string())),
            Raw::Payload(b) => String::from_utf8(b.to_vec())
                .map(Some)
                .map_err(|e| CirrusError::Decoding(format!("member `{label}`: {e}"))),
            Raw::Json(Value::String(s)) => Ok(Some(s.clone())),
            Raw::Json(other) => Err(self.mismatch(label, "string", other)),
        }
    }

    /// Read an integer member.
    pub fn integer(&self, label: &str) -> Result<Option<i64>, CirrusError> {
        match self.raw(label)? {
            Raw::Absent => Ok(None),
            Raw::Status(code) => Ok(Some(code.into())),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| CirrusError::Decoding(format!("member `{label}`: `{s}` is not an integer"))),
            Raw::Json(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| CirrusError::Decoding(format!("member `{label}`: {n} is not an integer"))),
            Raw::Json(other) => Err(self.mismatch(label, "integer", other)),
            Raw::Payload(_) => Err(CirrusError::Decoding(format!(
                "member `{label}`: payload is not an integer"
            ))),
        }
    }

    /// Read a raw payload member.
    pub fn blob(&self, label: &str) -> Result<Option<Bytes>, CirrusError> {
        match self.raw(label)? {
            Raw::Absent => Ok(None),
            Raw::Payload(b) => Ok(Some(b.clone())),
            Raw::Text(s) => Ok(Some(Bytes::copy_from_slice(s.as_bytes()))),
            Raw::Json(Value::String(s)) => Ok(Some(Bytes::copy_from_slice(s.as_bytes()))),
            Raw::Json(other) => Err(self.mismatch(label, "blob", other)),
            Raw::Status(_) => Err(CirrusError::Decoding(format!(
                "member `{label}`: status code is not a blob"
            ))),
        }
    }

    /// Read a structured body member through serde.
    pub fn deserialize<T: DeserializeOwned>(&self, label: &str) -> Result<Option<T>, CirrusError> {
        match self.raw(label)? {
            Raw::Absent => Ok(None),
            Raw::Json(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|e| CirrusError::Decoding(format!("member `{label}`: {e}"))),
            Raw::Text(s) => serde_json::from_value(Value::String(s.to_string()))
                .map(Some)
                .map_err(|e| CirrusError::Decoding(format!("member `{label}`: {e}"))),
            Raw::Status(code) => serde_json::from_value(Value::from(code))
                .map(Some)
                .map_err(|e| CirrusError::Decoding(format!("member `{label}`: {e}"))),
            Raw::Payload(b) => serde_json::from_slice(b)
                .map(Some)
                .map_err(|e| CirrusError::Decoding(format!("member `{label}`: {e}"))),
        }
    }

    /// Turn a missing required member into a decoding error.
    pub fn require<T>(&self, label: &str, value: Option<T>) -> Result<T, CirrusError> {
        value.ok_or_else(|| {
            CirrusError::Decoding(format!(
                "{}: missing required member `{label}`",
                self.directives.shape()
            ))
        })
    }

    pub fn response(&self) -> &Response {
        self.response
    }

    fn mismatch(&self, label: &str, expected: &str, got: &Value) -> CirrusError {
        CirrusError::Decoding(format!(
            "{}: member `{label}` expected {expected}, got {got}",
            self.directives.shape()
        ))
    }
}

// ── ShapeCodec ───────────────────────────────────────────────────

/// Contract between shapes and the transport.
pub trait ShapeCodec: Send + Sync + 'static {
    /// Turn `shape` into wire fragments.
    fn encode<S: EncodableShape>(
        &self,
        shape: &S,
        directives: &ShapeDirectives,
    ) -> Result<EncodedParts, CirrusError>;

    /// Rebuild an output shape from `response`.
    fn decode<S: DecodableShape>(
        &self,
        response: &Response,
        directives: &ShapeDirectives,
    ) -> Result<S, CirrusError>;
}

/// JSON body codec.
///
/// Structured body members become one JSON object; a blob member is
/// sent as the raw body instead.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    content_type: Option<String>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the content type sent with structured bodies.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl ShapeCodec for JsonCodec {
    fn encode<S: EncodableShape>(
        &self,
        shape: &S,
        directives: &ShapeDirectives,
    ) -> Result<EncodedParts, CirrusError> {
        let mut writer = MemberWriter::new(directives);
        shape.encode_members(&mut writer)?;

        let MemberWriter {
            mut headers,
            query,
            uri,
            fields,
            payload,
            ..
        } = writer;

        let body = match payload {
            Some(payload) => payload,
            None if fields.is_empty() => Bytes::new(),
            None => {
                let content_type = self.content_type.as_deref().unwrap_or("application/json");
                if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                    headers.push(("Content-Type".to_string(), content_type.to_string()));
                }
                let bytes = serde_json::to_vec(&Value::Object(fields))
                    .map_err(|e| CirrusError::Encoding(e.to_string()))?;
                Bytes::from(bytes)
            }
        };

        Ok(EncodedParts {
            headers,
            query,
            uri,
            body,
        })
    }

    fn decode<S: DecodableShape>(
        &self,
        response: &Response,
        directives: &ShapeDirectives,
    ) -> Result<S, CirrusError> {
        let reader = MemberReader::new(directives, response)?;
        S::decode_members(&reader)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Headers;
    use crate::response::ResponseHead;
    use crate::shape::{MemberEncoding, Shape, ShapeRole};

    struct PutObject {
        bucket: String,
        key: String,
        content_type: Option<String>,
        version: Option<i64>,
        data: Bytes,
    }

    impl Shape for PutObject {
        const NAME: &'static str = "PutObject";
        const ROLE: ShapeRole = ShapeRole::Request;
        const MEMBERS: &'static [MemberEncoding] = &[
            MemberEncoding::uri("Bucket", "Bucket"),
            MemberEncoding::uri("Key", "Key"),
            MemberEncoding::header("ContentType", "Content-Type"),
            MemberEncoding::query("VersionId", "versionId").integer(),
            MemberEncoding::blob("Body"),
        ];
    }

    impl EncodableShape for PutObject {
        fn encode_members(&self, w: &mut MemberWriter<'_>) -> Result<(), CirrusError> {
            w.member("Bucket", self.bucket.as_str())?;
            w.member("Key", self.key.as_str())?;
            w.optional("ContentType", self.content_type.as_deref())?;
            w.optional("VersionId", self.version)?;
            w.member("Body", self.data.clone())
        }
    }

    #[derive(Debug, PartialEq)]
    struct ListOutput {
        status: i64,
        request_id: Option<String>,
        items: Vec<u32>,
        next_token: Option<String>,
    }

    impl Shape for ListOutput {
        const NAME: &'static str = "ListOutput";
        const ROLE: ShapeRole = ShapeRole::Response;
        const MEMBERS: &'static [MemberEncoding] = &[
            MemberEncoding::status_code("Status"),
            MemberEncoding::header("RequestId", "x-amzn-requestid"),
            MemberEncoding::body("NextToken", "nextToken"),
        ];
    }

    impl DecodableShape for ListOutput {
        fn decode_members(r: &MemberReader<'_>) -> Result<Self, CirrusError> {
            Ok(Self {
                status: r.require("Status", r.integer("Status")?)?,
                request_id: r.string("RequestId")?,
                items: r.deserialize("items")?.unwrap_or_default(),
                next_token: r.string("NextToken")?,
            })
        }
    }

    fn directives<S: Shape>() -> ShapeDirectives {
        ShapeDirectives::new(S::NAME, S::ROLE, S::MEMBERS).unwrap()
    }

    fn response(status: u16, headers: &[(&str, &str)], body: &'static [u8]) -> Response {
        let headers: Headers = headers.iter().copied().collect();
        Response::new(ResponseHead::new(status, headers), Bytes::from_static(body))
    }

    #[test]
    fn encodes_every_location() {
        let shape = PutObject {
            bucket: "photos".into(),
            key: "2020/beach.jpg".into(),
            content_type: Some("image/jpeg".into()),
            version: Some(3),
            data: Bytes::from_static(b"raw-bytes"),
        };
        let parts = JsonCodec::new().encode(&shape, &directives::<PutObject>()).unwrap();
        assert_eq!(parts.headers, vec![("Content-Type".into(), "image/jpeg".into())]);
        assert_eq!(parts.query, vec![("versionId".into(), "3".into())]);
        assert_eq!(parts.body, Bytes::from_static(b"raw-bytes"));

        let req = parts.into_request(Method::Put, "/{Bucket}/{Key+}").unwrap();
        assert_eq!(req.target(), "/photos/2020/beach.jpg?versionId=3");
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let shape = PutObject {
            bucket: "b".into(),
            key: "k".into(),
            content_type: None,
            version: None,
            data: Bytes::new(),
        };
        let parts = JsonCodec::new().encode(&shape, &directives::<PutObject>()).unwrap();
        assert!(parts.headers.is_empty());
        assert!(parts.query.is_empty());
    }

    #[test]
    fn structured_body_is_json_object() {
        struct Counter {
            token: Option<i64>,
            page_size: i64,
        }
        impl Shape for Counter {
            const NAME: &'static str = "Counter";
            const ROLE: ShapeRole = ShapeRole::Request;
        }
        impl EncodableShape for Counter {
            fn encode_members(&self, w: &mut MemberWriter<'_>) -> Result<(), CirrusError> {
                w.optional("inputToken", self.token)?;
                w.member("pageSize", self.page_size)
            }
        }

        let d = directives::<Counter>();
        let parts = JsonCodec::new()
            .encode(&Counter { token: None, page_size: 4 }, &d)
            .unwrap();
        let body: Value = serde_json::from_slice(&parts.body).unwrap();
        assert_eq!(body, serde_json::json!({ "pageSize": 4 }));
        assert_eq!(parts.headers, vec![("Content-Type".into(), "application/json".into())]);
    }

    #[test]
    fn decodes_status_header_and_body() {
        let res = response(
            200,
            &[("X-Amzn-RequestId", "req-1")],
            br#"{"items":[1,2,3],"nextToken":"abc"}"#,
        );
        let out: ListOutput = JsonCodec::new().decode(&res, &directives::<ListOutput>()).unwrap();
        assert_eq!(
            out,
            ListOutput {
                status: 200,
                request_id: Some("req-1".into()),
                items: vec![1, 2, 3],
                next_token: Some("abc".into()),
            }
        );
    }

    #[test]
    fn null_and_missing_members_are_absent() {
        let res = response(200, &[], br#"{"nextToken":null}"#);
        let out: ListOutput = JsonCodec::new().decode(&res, &directives::<ListOutput>()).unwrap();
        assert_eq!(out.next_token, None);
        assert!(out.items.is_empty());
    }

    #[test]
    fn blob_response_skips_json_parsing() {
        struct Download {
            payload: Bytes,
        }
        impl Shape for Download {
            const NAME: &'static str = "Download";
            const ROLE: ShapeRole = ShapeRole::Response;
            const MEMBERS: &'static [MemberEncoding] = &[MemberEncoding::blob("payload")];
        }
        impl DecodableShape for Download {
            fn decode_members(r: &MemberReader<'_>) -> Result<Self, CirrusError> {
                Ok(Self {
                    payload: r.require("payload", r.blob("payload")?)?,
                })
            }
        }

        let res = response(200, &[], b"not json at all");
        let out: Download = JsonCodec::new().decode(&res, &directives::<Download>()).unwrap();
        assert_eq!(out.payload, Bytes::from_static(b"not json at all"));
    }

    struct Upload {
        data: Bytes,
    }

    impl Shape for Upload {
        const NAME: &'static str = "Upload";
        const ROLE: ShapeRole = ShapeRole::Request;
        const MEMBERS: &'static [MemberEncoding] = &[MemberEncoding::blob("Data")];
    }

    impl EncodableShape for Upload {
        fn encode_members(&self, w: &mut MemberWriter<'_>) -> Result<(), CirrusError> {
            w.member("Data", self.data.clone())?;
            w.member("Extra", "lost")
        }
    }

    #[test]
    fn blob_shape_rejects_undeclared_body_member() {
        let shape = Upload {
            data: Bytes::from_static(b"raw"),
        };
        let err = JsonCodec::new().encode(&shape, &directives::<Upload>()).unwrap_err();
        assert!(matches!(err, CirrusError::Encoding(ref msg) if msg.contains("Extra")));
    }

    #[test]
    fn blob_shape_rejects_body_reads() {
        let d = directives::<Upload>();
        let res = response(200, &[], b"raw");
        let reader = MemberReader::new(&d, &res).unwrap();
        assert_eq!(reader.blob("Data").unwrap(), Some(Bytes::from_static(b"raw")));
        assert!(matches!(reader.string("Extra"), Err(CirrusError::Decoding(_))));
    }

    #[test]
    fn type_mismatch_is_decoding_error() {
        let res = response(200, &[], br#"{"nextToken":42}"#);
        let err = JsonCodec::new()
            .decode::<ListOutput>(&res, &directives::<ListOutput>())
            .unwrap_err();
        assert!(matches!(err, CirrusError::Decoding(_)));
    }
}
