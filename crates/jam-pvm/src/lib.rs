//! PVM core (spec §4.3): program blob decode, paged RAM, gas-metered
//! stepwise interpreter over the thirteen operand shapes.

pub mod interpreter;
pub mod opcodes;
pub mod operands;
pub mod program;
pub mod ram;

pub use interpreter::{Outcome, PvmInstance, Terminal, HALT_ADDRESS, HOST_CALL_BASE_GAS};
pub use program::Program;
pub use ram::{PageAccess, Ram};
