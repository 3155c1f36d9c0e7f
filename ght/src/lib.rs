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

//! # ght
//! A geohash-prefix trie point cloud container: points are addressed by
//! their geohash, stored in a prefix trie that factors out shared hash
//! prefixes into routing nodes, and carry typed attributes packed against a
//! [`ght_schema::Schema`].
//!
//! The trie, its attribute chains, and its byte-stream serialization are
//! all single-threaded and own their state directly — see [`tree::Tree`]
//! for the entry point.

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

pub mod attribute;
pub mod errors;
pub mod filter;
pub mod io;
pub mod node;
pub mod tree;

pub use attribute::{AttrList, Attribute};
pub use errors::{GhtError, GhtResult};
pub use filter::{Filter, FilterMode};
pub use io::{Reader, Writer};
pub use node::{InsertOutcome, Node, NodeList};
pub use tree::{Config, Tree, MAX_TREE_HASH_LENGTH};

pub use ght_geohash::{Area, Coordinate, Range};
pub use ght_schema::{Dimension, ScalarType, Schema};
