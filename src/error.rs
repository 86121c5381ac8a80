use thiserror::Error;

use crate::ir::{BlockId, InstrId, Opcode};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the failure modes of graph construction, structural verification and the
/// optimization passes. Each variant carries enough context to name the offending block or
/// instruction.
///
/// # Error Categories
///
/// ## Construction Errors
/// - [`Error::PhiOrdering`] - A phi was appended after a non-phi instruction
/// - [`Error::NotAPhi`] - A phi operand was added to a non-phi instruction
/// - [`Error::NotAPredecessor`] - A phi operand names a block that is not a predecessor
///
/// ## Structural IR Errors
/// - [`Error::OperandCount`] - An instruction has the wrong number of operands for its opcode
/// - [`Error::Malformed`] - A structural invariant does not hold (reported by verification)
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::{Error, ir::Graph};
///
/// let mut graph = Graph::new(1, vec![]);
/// let block = graph.entry();
/// graph.add_const(block, 1)?;
///
/// // Appending a phi after a non-phi is rejected
/// match graph.add_phi(block) {
///     Err(Error::PhiOrdering(b)) => println!("phi appended too late in {}", b),
///     other => panic!("expected PhiOrdering, got {:?}", other),
/// }
/// # Ok::<(), tinyssa::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A structural invariant of the IR does not hold.
    ///
    /// This error is produced by [`crate::ir::verify_graph`] and includes the
    /// source location where the violation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A phi instruction was appended after a non-phi instruction.
    ///
    /// Within a basic block all phi instructions must precede all non-phi
    /// instructions. Appending a non-phi after phis is legal; the reverse is not.
    #[error("phi appended after a non-phi instruction in block {0}")]
    PhiOrdering(BlockId),

    /// An instruction has the wrong number of operands for its opcode.
    ///
    /// Constant folding requires exactly two operands on `SUB`, `AND` and `SHR`;
    /// any other count means the IR is ill-formed and the pass is aborted.
    #[error("{opcode} expects {expected} operands, found {found}")]
    OperandCount {
        /// The opcode of the ill-formed instruction
        opcode: Opcode,
        /// The number of operands the opcode requires
        expected: usize,
        /// The number of operands actually present
        found: usize,
    },

    /// A phi operand names a block that is not a predecessor of the phi's block.
    ///
    /// Each phi operand carries the incoming value for one specific incoming
    /// edge, so the named block must appear in the owning block's predecessor set.
    #[error("block {pred} is not a predecessor of block {block}")]
    NotAPredecessor {
        /// The block owning the phi instruction
        block: BlockId,
        /// The block named by the phi operand
        pred: BlockId,
    },

    /// A phi operand was added to an instruction that is not a phi.
    #[error("instruction {0} is not a phi")]
    NotAPhi(InstrId),
}
