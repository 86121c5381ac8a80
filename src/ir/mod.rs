//! The intermediate representation: typed SSA values in a control-flow graph.
//!
//! # Architecture
//!
//! The IR is built from four layers, leaves first:
//!
//! - [`Type`] - the closed enumeration of value types
//! - [`Instruction`] / [`Input`] - typed SSA values with explicit use-def
//!   and def-use edges and intrusive chain membership in their block
//! - [`BasicBlock`] - an ordered instruction chain (phi prefix, non-phi
//!   suffix) with up to two successors and an unordered predecessor set
//! - [`Graph`] - the function body owning both arenas
//!
//! All cross references are arena handles ([`BlockId`], [`InstrId`]);
//! every mutation goes through [`Graph`] methods that maintain both halves
//! of each edge. [`verify_graph`] checks the resulting invariants.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use tinyssa::ir::{Graph, Input, Type, verify_graph};
//!
//! let mut graph = Graph::new(1, vec![Type::Int64]);
//! let block = graph.entry();
//! let x = graph.add_arg(block, 0)?;
//! let c = graph.add_const(block, 1)?;
//! let sum = graph.add_add(block, Input::Instr(x), Input::Instr(c))?;
//! graph.add_ret(block, Input::Instr(sum))?;
//! verify_graph(&graph)?;
//! # Ok::<(), tinyssa::Error>(())
//! ```

mod block;
mod graph;
mod instruction;
mod opcode;
mod types;
mod verify;

pub use block::{BasicBlock, BlockId};
pub use graph::{Graph, InstrChainIter};
pub use instruction::{Input, InstrFlags, InstrId, Instruction};
pub use opcode::Opcode;
pub use types::Type;
pub use verify::verify_graph;
