//! Response parsing state machine.
//!
//! Every inbound [`ResponseEvent`] is fed through [`ResponseState::on_event`],
//! which either advances the state, completes a [`Response`], or reports a
//! protocol desync. Transitions never panic.

use bytes::BytesMut;

use crate::error::CirrusError;
use crate::response::{Response, ResponseHead};
use crate::transport::codec::ResponseEvent;

// ── ResponseState ────────────────────────────────────────────────

/// Where the parser is within one response.
///
/// ```text
///            head                     end
///  Ready ───────────► ParsingBody ───────────► Ready  (response delivered)
///    ▲                  │     ▲
///    │   head (error)   │     │ body chunk
///    └──────────────────┘     └──────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseState {
    /// Expecting a head. Initial and terminal state.
    #[default]
    Ready,

    /// Head received; accumulating body bytes in arrival order.
    ParsingBody { head: ResponseHead, body: BytesMut },
}

impl std::fmt::Display for ResponseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::ParsingBody { .. } => write!(f, "ParsingBody"),
        }
    }
}

impl ResponseState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Bytes accumulated so far, if a body is being parsed.
    pub fn buffered(&self) -> Option<usize> {
        match self {
            Self::ParsingBody { body, .. } => Some(body.len()),
            Self::Ready => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Apply one event.
    ///
    /// Returns the finished response on `End`. On error the state is
    /// `Ready` again.
    pub fn on_event(&mut self, event: ResponseEvent) -> Result<Option<Response>, CirrusError> {
        match event {
            ResponseEvent::Head(head) => self.on_head(head).map(|()| None),
            ResponseEvent::Body(chunk) => self.on_body(&chunk).map(|()| None),
            ResponseEvent::End => self.on_end().map(Some),
        }
    }

    /// Valid from: `Ready`. A second head resets to `Ready`.
    fn on_head(&mut self, head: ResponseHead) -> Result<(), CirrusError> {
        match self {
            Self::Ready => {
                *self = Self::ParsingBody {
                    head,
                    body: BytesMut::new(),
                };
                Ok(())
            }
            Self::ParsingBody { .. } => {
                *self = Self::Ready;
                Err(CirrusError::MalformedHead)
            }
        }
    }

    /// Valid from: `ParsingBody`.
    fn on_body(&mut self, chunk: &[u8]) -> Result<(), CirrusError> {
        match self {
            Self::ParsingBody { body, .. } => {
                body.extend_from_slice(chunk);
                Ok(())
            }
            Self::Ready => Err(CirrusError::MalformedBody),
        }
    }

    /// Valid from: `ParsingBody`. Always leaves the state `Ready`.
    fn on_end(&mut self) -> Result<Response, CirrusError> {
        match std::mem::take(self) {
            Self::ParsingBody { head, body } => Ok(Response::new(head, body.freeze())),
            Self::Ready => Err(CirrusError::MalformedHead),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
