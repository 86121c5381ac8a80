//! Instruction opcodes.
//!
//! This module provides the fixed [`Opcode`] enumeration. Opcodes are compared
//! by identity; the printable mnemonic is a presentation concern and is only
//! consulted by the debug dumps.
//!
//! The set is intentionally small — just enough to exercise the analyses and
//! the optimizer. Extending it is a matter of adding a variant and its entry
//! in [`Opcode::mnemonic`] and [`Opcode::result_type`].

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::ir::Type;

/// The operation performed by an instruction.
///
/// Each opcode has a fixed result type (see [`Opcode::result_type`]); the
/// convenience constructors on [`crate::ir::Graph`] use it so that callers
/// don't have to repeat the type at every call site.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::ir::{Opcode, Type};
///
/// assert_eq!(Opcode::Eq.result_type(), Type::Bool);
/// assert_eq!(Opcode::Sub.mnemonic(), "SUB");
/// assert!(Opcode::Phi.is_phi());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum Opcode {
    /// Integer addition.
    Add,
    /// Integer subtraction.
    Sub,
    /// Integer multiplication.
    Mul,
    /// Bitwise and.
    And,
    /// Arithmetic right shift.
    Shr,
    /// Equality comparison, produces a boolean.
    Eq,
    /// SSA merge operator; its operands are per-incoming-edge values.
    Phi,
    /// Return from the function.
    Ret,
    /// Integer constant; its single operand is the immediate value.
    Const,
    /// Function argument; its single operand is the argument index.
    Arg,
}

impl Opcode {
    /// Returns the printable mnemonic for this opcode.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::And => "AND",
            Opcode::Shr => "SHR",
            Opcode::Eq => "EQ",
            Opcode::Phi => "PHI",
            Opcode::Ret => "RET",
            Opcode::Const => "CONST",
            Opcode::Arg => "ARG",
        }
    }

    /// Returns the type of the value this opcode produces.
    ///
    /// Comparisons produce [`Type::Bool`], `RET` produces [`Type::Void`],
    /// everything else produces [`Type::Int64`].
    #[must_use]
    pub const fn result_type(self) -> Type {
        match self {
            Opcode::Eq => Type::Bool,
            Opcode::Ret => Type::Void,
            _ => Type::Int64,
        }
    }

    /// Returns `true` if this is the phi opcode.
    #[must_use]
    #[inline]
    pub const fn is_phi(self) -> bool {
        matches!(self, Opcode::Phi)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
