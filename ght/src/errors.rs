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

//! The errors that can occur building, reading or writing a tree.
//! Most errors are floated up from `ght-geohash` or `ght-schema`, the two
//! layers underneath this crate.

use ght_geohash::GeohashError;
use ght_schema::SchemaError;
use std::error::Error;
use std::fmt;
use std::io;

/// Helper type for a call that could go wrong.
pub type GhtResult<T> = Result<T, GhtError>;

/// Error type for this crate. Mostly a wrapper around the two layers
/// underneath: the geohash codec and the schema model.
#[derive(Debug)]
pub enum GhtError {
    /// A geohash could not be encoded or decoded.
    Geohash(GeohashError),
    /// A schema dimension lookup or construction failed.
    Schema(SchemaError),
    /// A read or write against a byte stream failed.
    Io(io::Error),
    /// `insert_node` was asked to insert a node whose hash shares no usable
    /// prefix with the tree it's being inserted into (`MatchKind::NONE` in
    /// the match table).
    NoMatch,
    /// `transfer_attributes` was asked to move a chain onto a node that
    /// already carries attributes.
    AttributesAlreadyPresent,
    /// The byte stream's `format_version` byte doesn't match what this
    /// crate knows how to read.
    UnsupportedFormatVersion(u8),
    /// The byte stream's `endian` byte isn't the little-endian flag this
    /// crate always writes; cross-endian files are rejected rather than
    /// silently misread.
    UnsupportedEndian(u8),
    /// A node's serialized `dim_position` has no corresponding dimension in
    /// the schema supplied to the reader.
    DimensionPositionOutOfRange(u8),
    /// `Tree::insert_node` or `Tree::from_nodelist` was given a config whose
    /// `max_hash_length` exceeds the crate-wide tree cap of 18.
    MaxHashLengthTooLarge(u8),
}

impl fmt::Display for GhtError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GhtError::Geohash(e) => write!(f, "{}", e),
            GhtError::Schema(e) => write!(f, "{}", e),
            GhtError::Io(e) => write!(f, "{}", e),
            GhtError::NoMatch => write!(
                f,
                "hash shares no usable prefix with the node it is being inserted into"
            ),
            GhtError::AttributesAlreadyPresent => write!(
                f,
                "cannot transfer attributes onto a node that already carries some"
            ),
            GhtError::UnsupportedFormatVersion(v) => {
                write!(f, "unsupported format_version {} in stream header", v)
            }
            GhtError::UnsupportedEndian(b) => write!(
                f,
                "stream header declares endian byte {}, but only little-endian (1) streams are readable",
                b
            ),
            GhtError::DimensionPositionOutOfRange(p) => write!(
                f,
                "attribute references dimension position {}, which is not in the supplied schema",
                p
            ),
            GhtError::MaxHashLengthTooLarge(n) => {
                write!(f, "max_hash_length {} exceeds the tree cap of 18", n)
            }
        }
    }
}

impl Error for GhtError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GhtError::Geohash(e) => Some(e),
            GhtError::Schema(e) => Some(e),
            GhtError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeohashError> for GhtError {
    fn from(err: GeohashError) -> Self {
        GhtError::Geohash(err)
    }
}

impl From<SchemaError> for GhtError {
    fn from(err: SchemaError) -> Self {
        GhtError::Schema(err)
    }
}

impl From<io::Error> for GhtError {
    fn from(err: io::Error) -> Self {
        GhtError::Io(err)
    }
}
