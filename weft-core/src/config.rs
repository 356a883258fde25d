// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

/// Configuration for a [`Weft`](crate::Weft) engine.
///
/// Built through the builder methods on `Weft` and borrowed by every
/// `WriteContext`/`ReadContext` created from it.
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether shared references and cycles are tracked.
    /// When disabled, every occurrence of a shared instance is written in
    /// full and an instance that contains itself fails with a reference
    /// cycle error.
    pub track_ref: bool,
    /// Maximum nesting depth of composite values on both pipelines.
    pub max_depth: u32,
    /// Depth from which new tracked class instances are written after the
    /// root value instead of in place, so long chains of shared instances do
    /// not nest.
    pub defer_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            track_ref: true,
            max_depth: 256,
            defer_depth: 64,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn is_track_ref(&self) -> bool {
        self.track_ref
    }

    #[inline(always)]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[inline(always)]
    pub fn defer_depth(&self) -> u32 {
        self.defer_depth
    }
}
