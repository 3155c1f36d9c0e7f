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

//! The errors that can occur building or querying a schema.
use std::error::Error;
use std::fmt;

/// Helper type for a call that could go wrong.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Error type for [`crate::Schema`] and [`crate::Dimension`] operations.
#[derive(Debug)]
pub enum SchemaError {
    /// Lookup by name found nothing.
    NameNotInSchema(String),
    /// Lookup by index was out of range.
    PositionOutOfRange(usize),
    /// A dimension with this name (case-insensitively) already exists.
    DuplicateDimensionName(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaError::NameNotInSchema(name) => {
                write!(f, "no dimension named '{}' in this schema", name)
            }
            SchemaError::PositionOutOfRange(pos) => {
                write!(f, "dimension position {} is out of range", pos)
            }
            SchemaError::DuplicateDimensionName(name) => write!(
                f,
                "a dimension named '{}' already exists in this schema",
                name
            ),
        }
    }
}

impl Error for SchemaError {}
