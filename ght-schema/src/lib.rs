/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/
//! # Schema
//! Describes the typed, named dimensions of the points held in a tree. A
//! schema is built once (usually from an external XML description, out of
//! scope here) and then shared by reference among every tree that stores
//! points conforming to it.
pub mod errors;

pub use errors::{SchemaError, SchemaResult};

use std::fmt;
use std::sync::Arc;

/// The primitive numeric types a [`Dimension`] can be packed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarType {
    /// Size in bytes of this scalar's packed representation.
    pub fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    /// Lowercase name, used for schema round-tripping through text formats.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::I8 => "i8",
            ScalarType::U8 => "u8",
            ScalarType::I16 => "i16",
            ScalarType::U16 => "u16",
            ScalarType::I32 => "i32",
            ScalarType::U32 => "u32",
            ScalarType::I64 => "i64",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        }
    }

    /// Parses one of the names `name()` produces.
    pub fn from_name(name: &str) -> Option<ScalarType> {
        Some(match name {
            "i8" => ScalarType::I8,
            "u8" => ScalarType::U8,
            "i16" => ScalarType::I16,
            "u16" => ScalarType::U16,
            "i32" => ScalarType::I32,
            "u32" => ScalarType::U32,
            "i64" => ScalarType::I64,
            "u64" => ScalarType::U64,
            "f32" => ScalarType::F32,
            "f64" => ScalarType::F64,
            _ => return None,
        })
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

const EPSILON: f64 = 1e-8;

/// A single named, typed, scaled column of a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    position: u8,
    name: String,
    description: String,
    kind: ScalarType,
    scale: f64,
    offset: f64,
}

impl Dimension {
    /// Creates a dimension with `scale = 1.0`, `offset = 0.0`. Use
    /// [`Dimension::with_scale_offset`] to override either.
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ScalarType) -> Dimension {
        Dimension {
            position: 0,
            name: name.into(),
            description: description.into(),
            kind,
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Builder-style override of scale and offset.
    pub fn with_scale_offset(mut self, scale: f64, offset: f64) -> Dimension {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ScalarType {
        self.kind
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// `(position, name, type)` match and scale/offset agree within epsilon.
    pub fn is_same_as(&self, other: &Dimension) -> bool {
        self.position == other.position
            && self.name.eq_ignore_ascii_case(&other.name)
            && self.kind == other.kind
            && (self.scale - other.scale).abs() < EPSILON
            && (self.offset - other.offset).abs() < EPSILON
    }
}

/// An ordered, immutable-after-construction list of [`Dimension`]s.
///
/// Dimension names are unique (case-insensitively) and a dimension's
/// `position` always equals its index in the schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    dimensions: Vec<Arc<Dimension>>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Schema {
        Schema { dimensions: Vec::new() }
    }

    /// Appends a dimension, assigning it `position = self.len()`.
    ///
    /// Errors if a dimension with the same name (case-insensitively)
    /// already exists.
    pub fn push(&mut self, mut dim: Dimension) -> SchemaResult<()> {
        if self
            .dimensions
            .iter()
            .any(|d| d.name.eq_ignore_ascii_case(&dim.name))
        {
            log::warn!("rejecting duplicate dimension name {:?}", dim.name);
            return Err(SchemaError::DuplicateDimensionName(dim.name));
        }
        dim.position = self.dimensions.len() as u8;
        log::debug!("schema dimension {:?} assigned position {}", dim.name, dim.position);
        self.dimensions.push(Arc::new(dim));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn dimensions(&self) -> &[Arc<Dimension>] {
        &self.dimensions
    }

    /// Looks up a dimension by its 0-based position. The returned `Arc` is
    /// cloned from the one slot backing this position, so `Arc::ptr_eq`
    /// between two dimensions obtained this way is a valid identity check.
    pub fn dimension_at(&self, position: usize) -> SchemaResult<Arc<Dimension>> {
        self.dimensions
            .get(position)
            .cloned()
            .ok_or(SchemaError::PositionOutOfRange(position))
    }

    /// Looks up a dimension by case-insensitive name.
    pub fn dimension(&self, name: &str) -> SchemaResult<Arc<Dimension>> {
        self.dimensions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| SchemaError::NameNotInSchema(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Dimension>> {
        self.dimensions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_position() {
        let mut schema = Schema::new();
        schema.push(Dimension::new("X", "longitude", ScalarType::F64)).unwrap();
        schema.push(Dimension::new("Y", "latitude", ScalarType::F64)).unwrap();
        schema
            .push(Dimension::new("Z", "elevation", ScalarType::F32).with_scale_offset(0.01, 0.0))
            .unwrap();
        assert_eq!(schema.dimension_at(0).unwrap().position(), 0);
        assert_eq!(schema.dimension_at(2).unwrap().name(), "Z");
        assert_eq!(schema.dimension("z").unwrap().position(), 2);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut schema = Schema::new();
        schema.push(Dimension::new("Intensity", "", ScalarType::U16)).unwrap();
        let err = schema
            .push(Dimension::new("intensity", "duplicate", ScalarType::U8))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateDimensionName(_)));
    }

    #[test]
    fn lookup_missing_name_errors() {
        let schema = Schema::new();
        assert!(matches!(
            schema.dimension("Missing"),
            Err(SchemaError::NameNotInSchema(_))
        ));
    }

    #[test]
    fn lookup_out_of_range_position_errors() {
        let schema = Schema::new();
        assert!(matches!(
            schema.dimension_at(3),
            Err(SchemaError::PositionOutOfRange(3))
        ));
    }

    #[test]
    fn scalar_type_size_and_name_round_trip() {
        for &kind in &[
            ScalarType::I8,
            ScalarType::U8,
            ScalarType::I16,
            ScalarType::U16,
            ScalarType::I32,
            ScalarType::U32,
            ScalarType::I64,
            ScalarType::U64,
            ScalarType::F32,
            ScalarType::F64,
        ] {
            assert_eq!(ScalarType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScalarType::F64.size(), 8);
        assert_eq!(ScalarType::I8.size(), 1);
    }

    #[test]
    fn is_same_as_respects_epsilon() {
        let a = Dimension::new("Z", "", ScalarType::F32).with_scale_offset(0.01, 0.0);
        let mut b = a.clone();
        b.scale = 0.01 + 1e-9;
        assert!(a.is_same_as(&b));
        b.scale = 0.0101;
        assert!(!a.is_same_as(&b));
    }
}
