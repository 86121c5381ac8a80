//! # tinyssa Prelude
//!
//! This module provides a convenient prelude for the most commonly used
//! types and traits of the library. Import it to get quick access to graph
//! construction, the analyses and the optimizer in one line.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use tinyssa::prelude::*;
//!
//! let mut graph = Graph::new(1, vec![Type::Int64]);
//! let block = graph.entry();
//! let x = graph.add_arg(block, 0)?;
//! graph.add_ret(block, Input::Instr(x))?;
//!
//! optimize(&mut graph)?;
//! let dominators = DominatorTree::of(&graph);
//! # Ok::<(), tinyssa::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all tinyssa operations
pub use crate::Error;

/// The result type used throughout tinyssa
pub use crate::Result;

// ================================================================================================
// IR Construction
// ================================================================================================

/// The function body and its construction API
pub use crate::ir::{BasicBlock, BlockId, Graph, Input, InstrFlags, InstrId, Instruction};

/// Opcodes and value types
pub use crate::ir::{Opcode, Type};

/// Structural invariant checking
pub use crate::ir::verify_graph;

// ================================================================================================
// Analyses
// ================================================================================================

/// Graph traversal traits used by the analyses
pub use crate::analysis::{GraphBase, Predecessors, RootedGraph, Successors};

/// Traversal orders
pub use crate::analysis::{postorder, reverse_postorder};

/// Dominator analysis
pub use crate::analysis::{compute_immediate_dominators, DominatorTree};

/// Loop analysis
pub use crate::analysis::{Loop, LoopAnalysis};

// ================================================================================================
// Optimizer
// ================================================================================================

/// Optimization passes and the combined pipeline
pub use crate::opt::{as_constant, constant_folding, optimize, peephole_pass};
