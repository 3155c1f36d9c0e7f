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

//! An attribute predicate used to prune a tree down to a structurally
//! valid subtree (see [`crate::tree::Tree::filter`]).

use ght_schema::Dimension;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    GreaterThan,
    LessThan,
    Between,
    Equal,
}

/// A single-dimension predicate. `Between` uses `[min, max]`; `GreaterThan`
/// and `Equal` use `min`; `LessThan` uses `max`.
pub struct Filter {
    dim: Arc<Dimension>,
    mode: FilterMode,
    min: f64,
    max: f64,
}

impl Filter {
    pub fn new(dim: Arc<Dimension>, mode: FilterMode, min: f64, max: f64) -> Filter {
        Filter { dim, mode, min, max }
    }

    pub fn greater_than(dim: Arc<Dimension>, min: f64) -> Filter {
        Filter::new(dim, FilterMode::GreaterThan, min, 0.0)
    }

    pub fn less_than(dim: Arc<Dimension>, max: f64) -> Filter {
        Filter::new(dim, FilterMode::LessThan, 0.0, max)
    }

    pub fn between(dim: Arc<Dimension>, min: f64, max: f64) -> Filter {
        Filter::new(dim, FilterMode::Between, min, max)
    }

    pub fn equal(dim: Arc<Dimension>, value: f64) -> Filter {
        Filter::new(dim, FilterMode::Equal, value, 0.0)
    }

    pub fn dim(&self) -> &Arc<Dimension> {
        &self.dim
    }

    pub fn matches(&self, value: f64) -> bool {
        match self.mode {
            FilterMode::GreaterThan => value > self.min,
            FilterMode::LessThan => value < self.max,
            FilterMode::Between => value >= self.min && value <= self.max,
            FilterMode::Equal => (value - self.min).abs() < 1e-8,
        }
    }
}
