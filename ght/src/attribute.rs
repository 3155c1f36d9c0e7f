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

//! A node's attribute chain: one scalar value per dimension, packed against
//! that dimension's scale/offset, linked singly in insertion order.

use crate::errors::{GhtError, GhtResult};
use crate::io::{Reader, Writer};
use ght_schema::{Dimension, ScalarType, Schema};
use std::sync::Arc;

/// One packed scalar value, tagged by the dimension it belongs to.
///
/// `raw` holds the packed integer or float reinterpreted as bytes in the
/// dimension's own `ScalarType`, little-endian, left-justified in the
/// 8-byte array (only the first `dim.kind().size()` bytes are meaningful).
pub struct Attribute {
    dim: Arc<Dimension>,
    raw: [u8; 8],
    next: Option<Box<Attribute>>,
}

impl Attribute {
    /// Packs `value` against `dim`'s scale/offset and type.
    ///
    /// `packed = round((value - offset) / scale)`, cast (with wraparound,
    /// same as a truncating numeric cast) into `dim.kind()`.
    pub fn new_from_real(dim: Arc<Dimension>, value: f64) -> Attribute {
        let packed = ((value - dim.offset()) / dim.scale()).round();
        let raw = pack(dim.kind(), packed);
        Attribute {
            dim,
            raw,
            next: None,
        }
    }

    /// Reassembles the real value this attribute represents.
    pub fn get_real(&self) -> f64 {
        unpack(self.dim.kind(), &self.raw) * self.dim.scale() + self.dim.offset()
    }

    pub fn dim(&self) -> &Arc<Dimension> {
        &self.dim
    }

    pub fn raw(&self) -> &[u8; 8] {
        &self.raw
    }

    fn next(&self) -> Option<&Attribute> {
        self.next.as_deref()
    }

    /// Same dimension identity (same `Arc` allocation), not merely same name.
    pub fn is_for(&self, dim: &Arc<Dimension>) -> bool {
        Arc::ptr_eq(&self.dim, dim)
    }

    /// `u8 dim_position` followed by the packed value's bytes, sized to
    /// the dimension's own scalar type.
    pub(crate) fn write(&self, w: &mut Writer) -> GhtResult<()> {
        w.write_u8(self.dim.position())?;
        w.write_bytes(&self.raw[..self.dim.kind().size()])?;
        Ok(())
    }

    pub(crate) fn read(schema: &Schema, r: &mut Reader) -> GhtResult<Attribute> {
        let position = r.read_u8()?;
        let dim = schema
            .dimension_at(position as usize)
            .map_err(|_| GhtError::DimensionPositionOutOfRange(position))?;
        let size = dim.kind().size();
        let bytes = r.read_bytes(size)?;
        let mut raw = [0u8; 8];
        raw[..size].copy_from_slice(&bytes);
        Ok(Attribute {
            dim,
            raw,
            next: None,
        })
    }
}

fn pack(kind: ScalarType, value: f64) -> [u8; 8] {
    let mut raw = [0u8; 8];
    match kind {
        ScalarType::I8 => raw[..1].copy_from_slice(&(value as i64 as i8).to_le_bytes()),
        ScalarType::U8 => raw[..1].copy_from_slice(&(value as i64 as u8).to_le_bytes()),
        ScalarType::I16 => raw[..2].copy_from_slice(&(value as i64 as i16).to_le_bytes()),
        ScalarType::U16 => raw[..2].copy_from_slice(&(value as i64 as u16).to_le_bytes()),
        ScalarType::I32 => raw[..4].copy_from_slice(&(value as i64 as i32).to_le_bytes()),
        ScalarType::U32 => raw[..4].copy_from_slice(&(value as i64 as u32).to_le_bytes()),
        ScalarType::I64 => raw[..8].copy_from_slice(&(value as i64).to_le_bytes()),
        ScalarType::U64 => raw[..8].copy_from_slice(&(value as i64 as u64).to_le_bytes()),
        ScalarType::F32 => raw[..4].copy_from_slice(&(value as f32).to_le_bytes()),
        ScalarType::F64 => raw[..8].copy_from_slice(&value.to_le_bytes()),
    }
    raw
}

fn unpack(kind: ScalarType, raw: &[u8; 8]) -> f64 {
    match kind {
        ScalarType::I8 => raw[0] as i8 as f64,
        ScalarType::U8 => raw[0] as f64,
        ScalarType::I16 => i16::from_le_bytes(raw[..2].try_into().unwrap()) as f64,
        ScalarType::U16 => u16::from_le_bytes(raw[..2].try_into().unwrap()) as f64,
        ScalarType::I32 => i32::from_le_bytes(raw[..4].try_into().unwrap()) as f64,
        ScalarType::U32 => u32::from_le_bytes(raw[..4].try_into().unwrap()) as f64,
        ScalarType::I64 => i64::from_le_bytes(raw[..8].try_into().unwrap()) as f64,
        ScalarType::U64 => u64::from_le_bytes(raw[..8].try_into().unwrap()) as f64,
        ScalarType::F32 => f32::from_le_bytes(raw[..4].try_into().unwrap()) as f64,
        ScalarType::F64 => f64::from_le_bytes(*raw),
    }
}

/// A singly linked chain of [`Attribute`]s, ordered by insertion.
#[derive(Default)]
pub struct AttrList {
    head: Option<Box<Attribute>>,
}

impl AttrList {
    pub fn new() -> AttrList {
        AttrList { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends `attr` to the tail of the chain. O(n) in chain length, which
    /// is expected to stay small (a handful of dimensions per point).
    pub fn append(&mut self, attr: Attribute) {
        let mut cursor = &mut self.head;
        while let Some(node) = cursor {
            cursor = &mut node.next;
        }
        *cursor = Some(Box::new(attr));
    }

    /// Finds the attribute carrying `dim`, if present, by dimension identity.
    pub fn get(&self, dim: &Arc<Dimension>) -> Option<&Attribute> {
        let mut cursor = self.head.as_deref();
        while let Some(attr) = cursor {
            if attr.is_for(dim) {
                return Some(attr);
            }
            cursor = attr.next();
        }
        None
    }

    /// Removes and returns the attribute carrying `dim`, if present.
    pub fn remove(&mut self, dim: &Arc<Dimension>) -> Option<Attribute> {
        let mut cursor = &mut self.head;
        loop {
            match cursor {
                None => return None,
                Some(node) => {
                    if node.is_for(dim) {
                        let mut removed = cursor.take().unwrap();
                        *cursor = removed.next.take();
                        return Some(*removed);
                    }
                    cursor = &mut cursor.as_mut().unwrap().next;
                }
            }
        }
    }

    pub fn iter(&self) -> AttrListIter<'_> {
        AttrListIter {
            cursor: self.head.as_deref(),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// `u8 attr_count` followed by each attribute in chain order.
    pub(crate) fn write(&self, w: &mut Writer) -> GhtResult<()> {
        w.write_u8(self.len() as u8)?;
        for attr in self.iter() {
            attr.write(w)?;
        }
        Ok(())
    }

    pub(crate) fn read(schema: &Schema, r: &mut Reader) -> GhtResult<AttrList> {
        let count = r.read_u8()?;
        let mut list = AttrList::new();
        for _ in 0..count {
            list.append(Attribute::read(schema, r)?);
        }
        Ok(list)
    }

    /// Deep-clones `self`'s chain, then appends a deep-cloned copy of every
    /// attribute in `other` whose dimension isn't already present in `self`.
    pub fn union(&self, other: &AttrList) -> AttrList {
        let mut merged = self.clone_chain();
        for attr in other.iter() {
            if merged.get(&attr.dim).is_none() {
                merged.append(attr.deep_clone_one());
            }
        }
        merged
    }

    /// Deep-clones the whole chain (fresh `Box` links, `Arc`-shared dims).
    pub fn clone_chain(&self) -> AttrList {
        let mut cloned = AttrList::new();
        for attr in self.iter() {
            cloned.append(attr.deep_clone_one());
        }
        cloned
    }
}

impl Attribute {
    fn deep_clone_one(&self) -> Attribute {
        Attribute {
            dim: self.dim.clone(),
            raw: self.raw,
            next: None,
        }
    }
}

pub struct AttrListIter<'a> {
    cursor: Option<&'a Attribute>,
}

impl<'a> Iterator for AttrListIter<'a> {
    type Item = &'a Attribute;

    fn next(&mut self) -> Option<&'a Attribute> {
        let current = self.cursor?;
        self.cursor = current.next();
        Some(current)
    }
}
