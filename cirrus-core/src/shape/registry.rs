//! Per-client registry of validated shape directives.
//!
//! A shape type is validated the first time it is registered. Later
//! lookups hit the cache and never re-run validation.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ShapeError;
use crate::shape::{Shape, ShapeDirectives};

#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: Mutex<HashMap<TypeId, ShapeDirectives>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `S`, returning its validated directives.
    ///
    /// Validation runs once per shape type; a rejected shape is not
    /// cached, so every later attempt reports the same error.
    pub fn register<S: Shape>(&self) -> Result<ShapeDirectives, ShapeError> {
        let id = TypeId::of::<S>();
        let mut shapes = self.shapes.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(directives) = shapes.get(&id) {
            return Ok(*directives);
        }

        let directives = ShapeDirectives::new(S::NAME, S::ROLE, S::MEMBERS)?;
        tracing::debug!(shape = S::NAME, members = S::MEMBERS.len(), "registered shape");
        shapes.insert(id, directives);
        Ok(directives)
    }

    /// Returns `true` if `S` has been registered successfully.
    pub fn contains<S: Shape>(&self) -> bool {
        let shapes = self.shapes.lock().unwrap_or_else(|e| e.into_inner());
        shapes.contains_key(&TypeId::of::<S>())
    }

    /// Number of registered shapes.
    pub fn len(&self) -> usize {
        let shapes = self.shapes.lock().unwrap_or_else(|e| e.into_inner());
        shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
