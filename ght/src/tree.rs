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

//! A whole geohash-prefix trie: a root node, the schema its attributes are
//! packed against, and the knobs that governed how it was built.

use crate::attribute::AttrList;
use crate::errors::{GhtError, GhtResult};
use crate::filter::Filter;
use crate::io::{Reader, Writer};
use crate::node::{InsertOutcome, Node, NodeList};
use ght_geohash::Area;
use ght_schema::Schema;
use std::sync::Arc;

/// Upper bound on a tree's own `max_hash_length`, independent of
/// `ght_geohash::MAX_RESOLUTION` (which bounds a single geohash character
/// string, not how deep this crate lets a trie route on one).
pub const MAX_TREE_HASH_LENGTH: u8 = 18;

const CURRENT_FORMAT_VERSION: u8 = 1;

/// The only endian flag this crate ever writes or accepts: attribute and
/// header values are always packed little-endian, independent of the host's
/// native byte order (see REDESIGN FLAGS).
const LITTLE_ENDIAN_FLAG: u8 = 1;

/// Build/serialization knobs for a [`Tree`].
///
/// Defaults mirror `ght_tree_new`: duplicates allowed, hash length capped
/// at the tree-wide ceiling.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub allow_duplicates: bool,
    pub max_hash_length: u8,
    pub format_version: u8,
    pub endian: u8,
}

impl Config {
    pub fn new(max_hash_length: u8) -> GhtResult<Config> {
        if max_hash_length > MAX_TREE_HASH_LENGTH {
            return Err(GhtError::MaxHashLengthTooLarge(max_hash_length));
        }
        Ok(Config {
            allow_duplicates: true,
            max_hash_length,
            format_version: CURRENT_FORMAT_VERSION,
            endian: LITTLE_ENDIAN_FLAG,
        })
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            allow_duplicates: true,
            max_hash_length: MAX_TREE_HASH_LENGTH,
            format_version: CURRENT_FORMAT_VERSION,
            endian: LITTLE_ENDIAN_FLAG,
        }
    }
}

/// A geohash-prefix trie of points, each carrying attributes packed against
/// a shared [`Schema`].
pub struct Tree {
    root: Option<Node>,
    schema: Arc<Schema>,
    num_nodes: u32,
    config: Config,
}

impl Tree {
    /// An empty tree over `schema`.
    pub fn new(schema: Arc<Schema>, config: Config) -> Tree {
        Tree {
            root: None,
            schema,
            num_nodes: 0,
            config,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_numpoints(&self) -> u32 {
        self.num_nodes
    }

    /// The root's own hash, if the tree is non-empty and the root carries one.
    pub fn get_hash(&self) -> Option<&str> {
        self.root.as_ref().and_then(|r| r.hash())
    }

    /// Adopts `node` as the root if the tree is empty; otherwise delegates
    /// to [`Node::insert`]. A top-level `NotHere` (no usable shared prefix
    /// with the root at all) surfaces as [`GhtError::NoMatch`].
    pub fn insert_node(&mut self, node: Node) -> GhtResult<()> {
        match self.root.as_mut() {
            None => {
                self.root = Some(node);
            }
            Some(root) => {
                match root.insert(node, self.config.allow_duplicates, self.config.max_hash_length)? {
                    InsertOutcome::Placed => {}
                    InsertOutcome::NotHere(_) => return Err(GhtError::NoMatch),
                }
            }
        }
        self.num_nodes += 1;
        Ok(())
    }

    /// Builds a tree by adopting `list[0]` as root and inserting the rest.
    /// Rust's ownership model gives the "deep-free on partial failure"
    /// behavior the original needs manual code for: on error, `tree` (and
    /// whatever remains of `list`) is simply dropped by the caller.
    pub fn from_nodelist(schema: Arc<Schema>, list: Vec<Node>, config: Config) -> GhtResult<Tree> {
        let mut iter = list.into_iter();
        let mut tree = Tree::new(schema, config);
        if let Some(first) = iter.next() {
            tree.insert_node(first)?;
        }
        for node in iter {
            tree.insert_node(node)?;
        }
        Ok(tree)
    }

    /// Flattens the tree back into full-length-hash, fully-attributed leaves
    /// (the inverse of repeated insertion, modulo compaction).
    pub fn to_nodelist(&self) -> Vec<Node> {
        let mut out = NodeList::new();
        if let Some(root) = &self.root {
            root.to_nodelist("", &AttrList::new(), &mut out);
        }
        out.into_vec()
    }

    /// Depth-first min/max reduction of every point's decoded coordinate.
    /// `None` for an empty tree.
    pub fn extent(&self) -> GhtResult<Option<Area>> {
        let mut area = None;
        if let Some(root) = &self.root {
            root.extent("", &mut area)?;
        }
        Ok(area)
    }

    /// Promotes common attribute values toward the root for every dimension
    /// of position ≥ 2 (x/y occupy 0/1 and live in the hash, not an
    /// attribute chain).
    pub fn compact_attributes(&mut self) {
        let root = match self.root.as_mut() {
            Some(root) => root,
            None => return,
        };
        for dim in self.schema.dimensions() {
            if dim.position() < 2 {
                continue;
            }
            root.compact_attribute_with_delta(dim, 1e-8);
        }
    }

    /// Prunes the tree down to the subtrees whose attribute values (own or
    /// inherited via compaction) satisfy `filter`. `None` if nothing in the
    /// tree survives (including an already-empty tree).
    pub fn filter(&self, filter: &Filter) -> Option<Tree> {
        let root = self.root.as_ref()?.filter(filter)?;
        Some(Tree {
            root: Some(root),
            schema: self.schema.clone(),
            num_nodes: self.num_nodes,
            config: self.config,
        })
    }

    pub fn filter_greater_than(&self, dim_name: &str, min: f64) -> GhtResult<Option<Tree>> {
        let dim = self.schema.dimension(dim_name)?;
        Ok(self.filter(&Filter::greater_than(dim, min)))
    }

    pub fn filter_less_than(&self, dim_name: &str, max: f64) -> GhtResult<Option<Tree>> {
        let dim = self.schema.dimension(dim_name)?;
        Ok(self.filter(&Filter::less_than(dim, max)))
    }

    pub fn filter_between(&self, dim_name: &str, min: f64, max: f64) -> GhtResult<Option<Tree>> {
        let dim = self.schema.dimension(dim_name)?;
        Ok(self.filter(&Filter::between(dim, min, max)))
    }

    pub fn filter_equal(&self, dim_name: &str, value: f64) -> GhtResult<Option<Tree>> {
        let dim = self.schema.dimension(dim_name)?;
        Ok(self.filter(&Filter::equal(dim, value)))
    }

    /// `endian` / `format_version` / `max_hash_length` header, then the
    /// root node recursively. An empty tree writes a zero-length-hash,
    /// childless root placeholder.
    pub fn write(&self, w: &mut Writer) -> GhtResult<()> {
        w.write_u8(self.config.endian)?;
        w.write_u8(self.config.format_version)?;
        w.write_u8(self.config.max_hash_length)?;
        match &self.root {
            Some(root) => root.write(w)?,
            None => Node::new_leaf(None).write(w)?,
        }
        Ok(())
    }

    /// Reads back a tree written by [`Tree::write`], validating the header
    /// against what this crate knows how to read.
    pub fn read(schema: Arc<Schema>, r: &mut Reader) -> GhtResult<Tree> {
        let endian = r.read_u8()?;
        if endian != LITTLE_ENDIAN_FLAG {
            return Err(GhtError::UnsupportedEndian(endian));
        }
        let format_version = r.read_u8()?;
        if format_version != CURRENT_FORMAT_VERSION {
            return Err(GhtError::UnsupportedFormatVersion(format_version));
        }
        let max_hash_length = r.read_u8()?;
        if max_hash_length > MAX_TREE_HASH_LENGTH {
            return Err(GhtError::MaxHashLengthTooLarge(max_hash_length));
        }
        let root = Node::read(&schema, r)?;
        let mut out = NodeList::new();
        root.to_nodelist("", &AttrList::new(), &mut out);
        let num_nodes = out.len() as u32;
        Ok(Tree {
            root: Some(root),
            schema,
            num_nodes,
            config: Config {
                allow_duplicates: true,
                max_hash_length,
                format_version,
                endian,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use assert_approx_eq::assert_approx_eq;
    use ght_schema::{Dimension, ScalarType};

    fn schema_xyz() -> Arc<Schema> {
        let mut schema = Schema::new();
        schema.push(Dimension::new("X", "", ScalarType::F64)).unwrap();
        schema.push(Dimension::new("Y", "", ScalarType::F64)).unwrap();
        schema
            .push(Dimension::new("Intensity", "", ScalarType::U8))
            .unwrap();
        Arc::new(schema)
    }

    fn leaf(hash: &str) -> Node {
        Node::new_leaf(hash.to_string())
    }

    #[test]
    fn insert_node_builds_split_tree() {
        let config = Config::new(18).unwrap();
        let mut tree = Tree::new(schema_xyz(), config);
        tree.insert_node(leaf("c0v2hdm1wpzpy4vtv4")).unwrap();
        tree.insert_node(leaf("c0v2hdm1gcuekpf9y1")).unwrap();
        assert_eq!(tree.get_numpoints(), 2);
        assert_eq!(tree.get_hash(), Some("c0v2hdm1"));
    }

    #[test]
    fn insert_node_with_no_shared_prefix_errors() {
        let config = Config::new(18).unwrap();
        let mut tree = Tree::new(schema_xyz(), config);
        tree.insert_node(leaf("c0v2hdm1wpzpy4vtv4")).unwrap();
        let err = tree.insert_node(leaf("zzzzzzzzzzzzzzzzzz"));
        assert!(matches!(err, Err(GhtError::NoMatch)));
    }

    #[test]
    fn duplicates_tracked_via_from_nodelist() {
        let config = Config::new(18).unwrap();
        let tree = Tree::from_nodelist(
            schema_xyz(),
            vec![
                leaf("c0v2hdm1wpzpy4vtv4"),
                leaf("c0v2hdm1wpzpy4vtv4"),
                leaf("c0v2hdm1gcuekpf9y1"),
            ],
            config,
        )
        .unwrap();
        assert_eq!(tree.get_numpoints(), 3);
        let list = tree.to_nodelist();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn compact_attributes_promotes_common_intensity() {
        let schema = schema_xyz();
        let dim = schema.dimension("Intensity").unwrap();
        let config = Config::new(18).unwrap();
        let mut tree = Tree::new(schema, config);
        tree.insert_node(leaf("c0v2hdm1wpzpy4vtv4")).unwrap();
        tree.insert_node(leaf("c0v2hdm1gcuekpf9y1")).unwrap();

        if let Some(root) = tree.root.as_mut() {
            for child in root.children_mut().unwrap().iter_mut() {
                child
                    .attributes_mut()
                    .append(Attribute::new_from_real(dim.clone(), 7.0));
            }
        }
        tree.compact_attributes();

        let root = tree.root.as_ref().unwrap();
        assert_approx_eq!(root.attributes().get(&dim).unwrap().get_real(), 7.0);
    }

    #[test]
    fn extent_reduces_over_all_points() {
        let config = Config::new(18).unwrap();
        let mut tree = Tree::new(schema_xyz(), config);
        tree.insert_node(leaf("c0v2hdm1wpzpy4vtv4")).unwrap();
        tree.insert_node(leaf("c0v2hdm1gcuekpf9y1")).unwrap();
        let area = tree.extent().unwrap();
        assert!(area.is_some());
    }

    #[test]
    fn filter_greater_than_prunes_tree() {
        let schema = schema_xyz();
        let dim = schema.dimension("Intensity").unwrap();
        let config = Config::new(18).unwrap();
        let mut tree = Tree::new(schema, config);
        tree.insert_node(leaf("c0v2hdm1wpzpy4vtv4")).unwrap();
        tree.insert_node(leaf("c0v2hdm1gcuekpf9y1")).unwrap();
        if let Some(root) = tree.root.as_mut() {
            let mut children = root.children_mut().unwrap().iter_mut();
            children
                .next()
                .unwrap()
                .attributes_mut()
                .append(Attribute::new_from_real(dim.clone(), 9.0));
            children
                .next()
                .unwrap()
                .attributes_mut()
                .append(Attribute::new_from_real(dim, 1.0));
        }

        let filtered = tree.filter_greater_than("Intensity", 5.0).unwrap().unwrap();
        assert_eq!(filtered.to_nodelist().len(), 1);
    }

    #[test]
    fn write_read_round_trip_preserves_structure() {
        let schema = schema_xyz();
        let config = Config::new(18).unwrap();
        let mut tree = Tree::new(schema.clone(), config);
        tree.insert_node(leaf("c0v2hdm1wpzpy4vtv4")).unwrap();
        tree.insert_node(leaf("c0v2hdm1gcuekpf9y1")).unwrap();

        let mut w = Writer::memory();
        tree.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();

        let mut r = Reader::memory(&bytes);
        let read_back = Tree::read(schema, &mut r).unwrap();
        assert_eq!(read_back.get_hash(), Some("c0v2hdm1"));
        assert_eq!(read_back.to_nodelist().len(), 2);
        assert_eq!(read_back.config().format_version, 1);
    }

    #[test]
    fn read_rejects_unsupported_format_version() {
        let schema = schema_xyz();
        let bytes: Vec<u8> = vec![1, 99, 18, 0, 0, 0];
        let mut r = Reader::memory(&bytes);
        assert!(matches!(
            Tree::read(schema, &mut r),
            Err(GhtError::UnsupportedFormatVersion(99))
        ));
    }

    #[test]
    fn config_rejects_max_hash_length_over_cap() {
        assert!(matches!(
            Config::new(19),
            Err(GhtError::MaxHashLengthTooLarge(19))
        ));
    }
}
