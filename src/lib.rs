// Copyright 2025-2026 The tinyssa Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! # tinyssa
//!
//! A compact compiler middle-end: an in-memory, SSA-style intermediate
//! representation for integer computations, together with the classical
//! analyses and local optimizations that operate on it.
//!
//! # Architecture
//!
//! The library is organized into three layers that build on each other:
//!
//! - **IR Layer**: typed SSA instructions with explicit use-def and def-use
//!   edges, basic blocks with an intrusive instruction chain, and the
//!   arena-backed [`ir::Graph`] that owns everything
//! - **Analysis Layer**: postorder traversals, dominator-tree construction
//!   and natural-loop detection with a loop tree, all behind small graph
//!   traits so they work on any block graph
//! - **Optimizer Layer**: constant folding and peephole simplification,
//!   both rewriting the use-def graph in place, plus the combined pipeline
//!
//! ## Key Components
//!
//! - [`ir::Graph`] - Function body construction and debug dumping
//! - [`ir::verify_graph`] - Structural invariant checking
//! - [`analysis::DominatorTree`] - Immediate dominators and dominance queries
//! - [`analysis::LoopAnalysis`] - Natural loops, latches and the loop tree
//! - [`opt::optimize`] - Constant folding + peephole pipeline
//! - [`Error`] and [`Result`] - Error handling
//! - [`prelude`] - Convenient re-exports of commonly used types
//!
//! # Usage Examples
//!
//! ## Building and optimizing a graph
//!
//! ```rust,no_run
//! use tinyssa::prelude::*;
//!
//! // ret (x - x) + 10
//! let mut graph = Graph::new(1, vec![Type::Int64]);
//! let block = graph.entry();
//! let x = graph.add_arg(block, 0)?;
//! let p = graph.add_sub(block, Input::Instr(x), Input::Instr(x))?;
//! let c = graph.add_const(block, 10)?;
//! let r = graph.add_sub(block, Input::Instr(c), Input::Instr(p))?;
//! graph.add_ret(block, Input::Instr(r))?;
//!
//! optimize(&mut graph)?;
//! verify_graph(&graph)?;
//! # Ok::<(), tinyssa::Error>(())
//! ```
//!
//! ## Running the analyses
//!
//! ```rust,no_run
//! use tinyssa::prelude::*;
//!
//! # let graph = Graph::new(1, vec![]);
//! let dominators = DominatorTree::of(&graph);
//! let loops = LoopAnalysis::of(&graph);
//!
//! for lp in loops.loops() {
//!     match lp.header {
//!         Some(header) => println!("loop at {header}, {} blocks", lp.size()),
//!         None => println!("root loop, {} blocks", lp.size()),
//!     }
//! }
//! ```
//!
//! # Concurrency
//!
//! The library is single-threaded and synchronous. The graph is the sole
//! owner of its blocks and instructions; analyses borrow it immutably, the
//! optimizer mutably. Analysis artifacts stay valid only as long as the
//! graph is not mutated afterwards.

#[macro_use]
pub(crate) mod error;

/// The intermediate representation: types, instructions, blocks and graphs.
pub mod ir;

/// Control-flow analyses: traversal orders, dominators and loops.
pub mod analysis;

/// Local optimizations: constant folding, peephole and the combined pipeline.
pub mod opt;

/// Convenient re-exports of the most commonly used types and traits.
pub mod prelude;

/// `tinyssa` Result type.
///
/// A type alias for `std::result::Result<T, Error>` where the error type is
/// always [`Error`]. Used consistently throughout the crate for all
/// fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `tinyssa` Error type.
///
/// The main error type for all operations in this crate; see the variant
/// documentation for the construction and verification failure modes.
pub use error::Error;
