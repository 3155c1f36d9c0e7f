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

//! A geohash-prefix trie node: a hash suffix, a list of children, and the
//! chain of attributes attached directly at this node (as opposed to
//! inherited from an ancestor's promoted attribute).

use crate::attribute::{AttrList, Attribute};
use crate::errors::{GhtError, GhtResult};
use crate::filter::Filter;
use crate::io::{Reader, Writer};
use ght_geohash::{leaf_parts, MatchKind};
use ght_schema::{Dimension, Schema};
use std::io;
use std::sync::Arc;

/// Dynamic array of owning child nodes, in insertion order.
#[derive(Default)]
pub struct NodeList(Vec<Node>);

impl NodeList {
    pub fn new() -> NodeList {
        NodeList(Vec::with_capacity(8))
    }

    pub fn push(&mut self, node: Node) {
        self.0.push(node);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.0.iter_mut()
    }

    pub fn into_vec(self) -> Vec<Node> {
        self.0
    }
}

/// The outcome of a recursive insert attempt. `NotHere` hands the node back
/// unchanged so the caller can offer it to the next sibling (or, failing
/// that, attach it as a brand new child) rather than overloading the error
/// channel for ordinary "try elsewhere" control flow.
pub enum InsertOutcome {
    Placed,
    NotHere(Node),
}

/// A trie node.
///
/// `hash = None` marks a "duplicate-bearing leaf": a node that exists only
/// as a child of another node sharing the exact same full hash, carrying
/// one duplicate occurrence's attributes.
///
/// A node created purely as a SPLIT's common-prefix routing parent carries
/// no attributes of its own (they moved to the sibling that took over its
/// identity) and, unlike a duplicate-bearing leaf, its children always
/// carry a real (non-empty) hash of their own. `to_nodelist` and `extent`
/// use exactly that distinction — no separate "is this a real point" bit is
/// stored, matching the wire format, which doesn't carry one either.
pub struct Node {
    hash: Option<String>,
    children: Option<NodeList>,
    attributes: AttrList,
}

impl Node {
    /// A new leaf representing one inserted point.
    pub fn new_leaf(hash: impl Into<Option<String>>) -> Node {
        Node {
            hash: hash.into(),
            children: None,
            attributes: AttrList::new(),
        }
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn children(&self) -> Option<&NodeList> {
        self.children.as_ref()
    }

    pub fn children_mut(&mut self) -> Option<&mut NodeList> {
        self.children.as_mut()
    }

    pub fn attributes(&self) -> &AttrList {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttrList {
        &mut self.attributes
    }

    pub fn is_leaf(&self) -> bool {
        self.children.as_ref().map_or(true, |c| c.is_empty())
    }

    /// True if every child (if any) is a hash-less duplicate leaf. A node
    /// satisfying this still represents a real point: either it's a true
    /// leaf (no children at all), or its only children are duplicates of
    /// its own coordinate. A routing node created by SPLIT always has at
    /// least one child carrying a real, non-empty hash, so it never
    /// satisfies this check.
    fn represents_a_point(&self) -> bool {
        self.children
            .as_ref()
            .map_or(true, |c| c.iter().all(|child| child.hash.is_none()))
    }

    /// Appends `child`, lazily allocating the child list.
    pub fn add_child(&mut self, child: Node) {
        self.children.get_or_insert_with(NodeList::new).push(child);
    }

    /// Moves `from`'s attribute chain onto `self`. Errors if `self` already
    /// carries attributes of its own.
    pub fn transfer_attributes(&mut self, from: &mut Node) -> GhtResult<()> {
        if !self.attributes.is_empty() {
            return Err(GhtError::AttributesAlreadyPresent);
        }
        self.attributes = std::mem::take(&mut from.attributes);
        Ok(())
    }

    /// Inserts `new_node` (which must carry a full-length hash) under
    /// `self`, per the GLOBAL/SAME/CHILD/SPLIT match table. `max_hash_length`
    /// bounds how many characters of the hash participate in matching.
    pub fn insert(
        &mut self,
        new_node: Node,
        allow_duplicates: bool,
        max_hash_length: u8,
    ) -> GhtResult<InsertOutcome> {
        if self.hash.is_none() {
            // A duplicate-bearing leaf has no children and cannot accept one.
            return Ok(InsertOutcome::NotHere(new_node));
        }
        let root_hash = self.hash.clone().unwrap_or_default();
        let new_hash = new_node.hash.clone().unwrap_or_default();
        let maxlen = max_hash_length as usize;

        let (kind, root_leaf, new_leaf) = match leaf_parts(&root_hash, &new_hash, maxlen) {
            Ok((kind, root_leaf, new_leaf)) => (kind, root_leaf.to_string(), new_leaf.to_string()),
            Err(_) => return Ok(InsertOutcome::NotHere(new_node)),
        };

        match kind {
            MatchKind::Global | MatchKind::Child => {
                let mut candidate = new_node;
                candidate.hash = Some(new_leaf);
                if let Some(children) = self.children.as_mut() {
                    for child in children.iter_mut() {
                        match child.insert(candidate, allow_duplicates, max_hash_length)? {
                            InsertOutcome::Placed => return Ok(InsertOutcome::Placed),
                            InsertOutcome::NotHere(returned) => candidate = returned,
                        }
                    }
                }
                self.add_child(candidate);
                Ok(InsertOutcome::Placed)
            }
            MatchKind::Same => {
                if allow_duplicates {
                    let mut dup = new_node;
                    dup.hash = None;
                    self.add_child(dup);
                }
                // else: non-duplicate mode silently drops `new_node`; see
                // the design notes on the unimplemented average/median TODO.
                Ok(InsertOutcome::Placed)
            }
            MatchKind::Split => {
                let split_at = root_hash.len() - root_leaf.len();
                let common_prefix = root_hash[..split_at].to_string();

                let mut sibling = Node::new_leaf(root_leaf);
                sibling.transfer_attributes(self)?;
                sibling.children = self.children.take();

                self.hash = Some(common_prefix);

                let mut leaf_node = new_node;
                leaf_node.hash = Some(new_leaf);

                self.add_child(sibling);
                self.add_child(leaf_node);
                Ok(InsertOutcome::Placed)
            }
        }
    }

    /// Recursively promotes an attribute to the lowest common ancestor whose
    /// children all agree on it within `delta`. Returns the value this node
    /// now carries for `dim` (either its own, or the newly-promoted one),
    /// if any.
    pub fn compact_attribute_with_delta(&mut self, dim: &Arc<Dimension>, delta: f64) -> Option<f64> {
        if self.is_leaf() {
            return self.attributes.get(dim).map(|a| a.get_real());
        }

        let children = self.children.as_mut().unwrap();
        let mut values = Vec::with_capacity(children.len());
        for child in children.iter_mut() {
            match child.compact_attribute_with_delta(dim, delta) {
                Some(value) => values.push(value),
                None => return None,
            }
        }

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max - min >= delta {
            return None;
        }

        let promoted = (max + min) / 2.0;
        for child in children.iter_mut() {
            child.attributes.remove(dim);
        }
        self.attributes.append(Attribute::new_from_real(dim.clone(), promoted));
        Some(promoted)
    }

    /// Depth-first flattening into full-length-hash, fully-attributed
    /// leaves: the inverse of repeated insertion, modulo compaction.
    pub fn to_nodelist(&self, prefix: &str, inherited: &AttrList, out: &mut NodeList) {
        let full_hash = format!("{}{}", prefix, self.hash.as_deref().unwrap_or(""));
        let merged = self.attributes.union(inherited);

        if self.represents_a_point() {
            let mut leaf = Node::new_leaf(full_hash.clone());
            leaf.attributes = merged.clone_chain();
            out.push(leaf);
        }

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.to_nodelist(&full_hash, &merged, out);
            }
        }
    }

    /// Depth-first min/max reduction of every point's decoded coordinate.
    pub fn extent(&self, prefix: &str, area: &mut Option<ght_geohash::Area>) -> GhtResult<()> {
        let full_hash = format!("{}{}", prefix, self.hash.as_deref().unwrap_or(""));
        if self.represents_a_point() && !full_hash.is_empty() {
            let point = ght_geohash::decode(&full_hash)?;
            *area = Some(match area.take() {
                None => point,
                Some(acc) => ght_geohash::Area {
                    x: ght_geohash::Range {
                        min: acc.x.min.min(point.x.min),
                        max: acc.x.max.max(point.x.max),
                    },
                    y: ght_geohash::Range {
                        min: acc.y.min.min(point.y.min),
                        max: acc.y.max.max(point.y.max),
                    },
                },
            });
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.extent(&full_hash, area)?;
            }
        }
        Ok(())
    }

    /// Clones this node's own hash and attributes, dropping children —
    /// the seed for [`Node::filter`]'s result before children are reattached.
    fn clone_shallow(&self) -> Node {
        Node {
            hash: self.hash.clone(),
            children: None,
            attributes: self.attributes.clone_chain(),
        }
    }

    /// Produces a pruned clone keeping only subtrees whose attributes (own
    /// or inherited-via-compaction) satisfy `filter`. Returns `None` if this
    /// entire subtree is pruned away.
    pub fn filter(&self, filter: &Filter) -> Option<Node> {
        if let Some(attr) = self.attributes.get(filter.dim()) {
            if !filter.matches(attr.get_real()) {
                return None;
            }
        }

        match &self.children {
            None => Some(self.clone_shallow()),
            Some(children) if children.is_empty() => Some(self.clone_shallow()),
            Some(children) => {
                let mut kept = NodeList::new();
                for child in children.iter() {
                    if let Some(filtered) = child.filter(filter) {
                        kept.push(filtered);
                    }
                }
                if kept.is_empty() {
                    None
                } else {
                    let mut clone = self.clone_shallow();
                    clone.children = Some(kept);
                    Some(clone)
                }
            }
        }
    }

    /// `u8 hash_length` + hash bytes (no terminator), then the attribute
    /// chain, then `u8 child_count` + each child, recursively.
    pub(crate) fn write(&self, w: &mut Writer) -> GhtResult<()> {
        match &self.hash {
            Some(hash) => {
                w.write_u8(hash.len() as u8)?;
                w.write_bytes(hash.as_bytes())?;
            }
            None => w.write_u8(0)?,
        }
        self.attributes.write(w)?;
        match &self.children {
            Some(children) => {
                w.write_u8(children.len() as u8)?;
                for child in children.iter() {
                    child.write(w)?;
                }
            }
            None => w.write_u8(0)?,
        }
        Ok(())
    }

    pub(crate) fn read(schema: &Schema, r: &mut Reader) -> GhtResult<Node> {
        let hash_len = r.read_u8()?;
        let hash = if hash_len == 0 {
            None
        } else {
            let bytes = r.read_bytes(hash_len as usize)?;
            Some(String::from_utf8(bytes).map_err(|e| {
                GhtError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
            })?)
        };
        let attributes = AttrList::read(schema, r)?;
        let child_count = r.read_u8()?;
        let children = if child_count == 0 {
            None
        } else {
            let mut list = NodeList::new();
            for _ in 0..child_count {
                list.push(Node::read(schema, r)?);
            }
            Some(list)
        };
        Ok(Node {
            hash,
            children,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;
    use assert_approx_eq::assert_approx_eq;
    use ght_schema::ScalarType;

    fn leaf(hash: &str) -> Node {
        Node::new_leaf(hash.to_string())
    }

    #[test]
    fn split_creates_two_children_in_insertion_order() {
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        let outcome = root
            .insert(leaf("c0v2hdm1gcuekpf9y1"), true, 18)
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::Placed));
        assert_eq!(root.hash(), Some("c0v2hdm1"));
        assert!(root.attributes().is_empty());
        let children = root.children().unwrap();
        assert_eq!(children.len(), 2);
        let mut iter = children.iter();
        assert_eq!(iter.next().unwrap().hash(), Some("wpzpy4vtv4"));
        assert_eq!(iter.next().unwrap().hash(), Some("gcuekpf9y1"));
    }

    #[test]
    fn duplicate_insertion_adds_hashless_children() {
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        root.insert(leaf("c0v2hdm1gcuekpf9y1"), true, 18).unwrap();
        root.insert(leaf("c0v2hdm1wpzpy4vtv4"), true, 18).unwrap();
        root.insert(leaf("c0v2hdm1wpzpy4vtv4"), true, 18).unwrap();

        let first_child = root.children().unwrap().iter().next().unwrap();
        assert_eq!(first_child.hash(), Some("wpzpy4vtv4"));
        let dup_children = first_child.children().unwrap();
        assert_eq!(dup_children.len(), 2);
        for dup in dup_children.iter() {
            assert_eq!(dup.hash(), None);
            assert!(dup.represents_a_point());
        }
    }

    #[test]
    fn duplicate_leaf_refuses_to_adopt_a_later_descendant() {
        // A hash-less duplicate-bearing leaf has no children (node.rs doc
        // comment on `Node`) and must not be offered a node to adopt just
        // because it sits in the child list a later, deeper insert happens
        // to walk through.
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        root.insert(leaf("c0v2hdm1wpzpy4vtv4"), true, 18).unwrap();
        root.insert(leaf("c0v2hdm1wpzpy4vtv4xyz"), true, 18)
            .unwrap();

        let dup = root
            .children()
            .unwrap()
            .iter()
            .find(|c| c.hash().is_none())
            .expect("duplicate leaf should still be a direct child of root");
        assert!(dup.children().is_none());

        let mut out = NodeList::new();
        root.to_nodelist("", &AttrList::new(), &mut out);
        let hashes: Vec<_> = out.iter().map(|n| n.hash().unwrap().to_string()).collect();
        assert!(
            hashes.contains(&"c0v2hdm1wpzpy4vtv4".to_string()),
            "duplicate leaf's point must still be emitted, got {:?}",
            hashes
        );
        assert!(hashes.contains(&"c0v2hdm1wpzpy4vtv4xyz".to_string()));
    }

    #[test]
    fn no_overlap_hash_is_not_here() {
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        let outcome = root.insert(leaf("zzzzzzzzzzzzzzzzzz"), true, 18).unwrap();
        assert!(matches!(outcome, InsertOutcome::NotHere(_)));
    }

    #[test]
    fn to_nodelist_round_trips_full_hash() {
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        root.insert(leaf("c0v2hdm1gcuekpf9y1"), true, 18).unwrap();
        let mut out = NodeList::new();
        root.to_nodelist("", &AttrList::new(), &mut out);
        let hashes: Vec<_> = out.iter().map(|n| n.hash().unwrap().to_string()).collect();
        assert_eq!(hashes.len(), 2);
        assert!(hashes.contains(&"c0v2hdm1wpzpy4vtv4".to_string()));
        assert!(hashes.contains(&"c0v2hdm1gcuekpf9y1".to_string()));
    }

    #[test]
    fn to_nodelist_emits_one_row_per_duplicate() {
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        root.insert(leaf("c0v2hdm1wpzpy4vtv4"), true, 18).unwrap();
        root.insert(leaf("c0v2hdm1wpzpy4vtv4"), true, 18).unwrap();
        let mut out = NodeList::new();
        root.to_nodelist("", &AttrList::new(), &mut out);
        assert_eq!(out.len(), 3);
        for n in out.iter() {
            assert_eq!(n.hash(), Some("c0v2hdm1wpzpy4vtv4"));
        }
    }

    #[test]
    fn compaction_promotes_common_value_to_parent() {
        let dim = Arc::new(Dimension::new("Intensity", "", ScalarType::U8));
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        root.insert(leaf("c0v2hdm1gcuekpf9y1"), true, 18).unwrap();

        for child in root.children.as_mut().unwrap().iter_mut() {
            child
                .attributes_mut()
                .append(Attribute::new_from_real(dim.clone(), 5.0));
        }

        let promoted = root.compact_attribute_with_delta(&dim, 1e-8);
        assert_approx_eq!(promoted.unwrap(), 5.0);
        assert_approx_eq!(root.attributes().get(&dim).unwrap().get_real(), 5.0);
        for child in root.children().unwrap().iter() {
            assert!(child.attributes().get(&dim).is_none());
        }
    }

    #[test]
    fn filter_prunes_non_matching_subtree() {
        let dim = Arc::new(Dimension::new("Intensity", "", ScalarType::U8));
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        root.insert(leaf("c0v2hdm1gcuekpf9y1"), true, 18).unwrap();
        {
            let mut children = root.children.as_mut().unwrap().iter_mut();
            children
                .next()
                .unwrap()
                .attributes_mut()
                .append(Attribute::new_from_real(dim.clone(), 9.0));
            children
                .next()
                .unwrap()
                .attributes_mut()
                .append(Attribute::new_from_real(dim.clone(), 1.0));
        }

        let f = Filter::new(dim, FilterMode::GreaterThan, 5.0, 0.0);
        let filtered = root.filter(&f).unwrap();
        assert_eq!(filtered.children().unwrap().len(), 1);
        assert_eq!(
            filtered.children().unwrap().iter().next().unwrap().hash(),
            Some("wpzpy4vtv4")
        );
    }

    fn schema_with_dims() -> (ght_schema::Schema, Arc<Dimension>) {
        let mut schema = ght_schema::Schema::new();
        for i in 0..3 {
            schema
                .push(Dimension::new(format!("dim{}", i), "", ScalarType::U8))
                .unwrap();
        }
        schema
            .push(Dimension::new("dim3", "", ScalarType::U16))
            .unwrap();
        let dim = schema.dimension_at(3).unwrap();
        (schema, dim)
    }

    #[test]
    fn serializes_exact_byte_pattern() {
        // dim 3, value 88.0, u16 scale 1.0 offset 0.0 -> packed 0x0058.
        let (_schema, dim) = schema_with_dims();
        let mut child = leaf("ctd4ccx9yb");
        child
            .attributes_mut()
            .append(Attribute::new_from_real(dim, 88.0));
        let mut root = leaf("wpzpy4vtv4");
        root.add_child(child);

        let mut w = Writer::memory();
        root.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let expected: Vec<u8> = vec![
            0x0A, 0x77, 0x70, 0x7A, 0x70, 0x79, 0x34, 0x76, 0x74, 0x76, 0x34, 0x00, 0x01, 0x0A,
            0x63, 0x74, 0x64, 0x34, 0x63, 0x63, 0x78, 0x39, 0x79, 0x62, 0x01, 0x03, 0x58, 0x00,
            0x00,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn write_read_round_trip() {
        let (schema, dim) = schema_with_dims();
        let mut root = leaf("c0v2hdm1wpzpy4vtv4");
        root.insert(leaf("c0v2hdm1gcuekpf9y1"), true, 18).unwrap();
        for child in root.children.as_mut().unwrap().iter_mut() {
            child
                .attributes_mut()
                .append(Attribute::new_from_real(dim.clone(), 42.0));
        }

        let mut w = Writer::memory();
        root.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut r = Reader::memory(&bytes);
        let read_back = Node::read(&schema, &mut r).unwrap();
        assert_eq!(read_back.hash(), Some("c0v2hdm1"));
        assert_eq!(read_back.children().unwrap().len(), 2);
        for child in read_back.children().unwrap().iter() {
            assert_approx_eq!(child.attributes().get(&dim).unwrap().get_real(), 42.0);
        }
    }

    #[test]
    fn read_rejects_out_of_range_dimension_position() {
        let schema = ght_schema::Schema::new();
        let bytes: Vec<u8> = vec![0, 1, 9, 0];
        let mut r = Reader::memory(&bytes);
        assert!(matches!(
            Node::read(&schema, &mut r),
            Err(GhtError::DimensionPositionOutOfRange(9))
        ));
    }
}
