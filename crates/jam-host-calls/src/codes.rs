//! Return-code sentinels written back to `ω7` (and sometimes `ω8`), grounded
//! on the teacher's `codes::` module and `REG_*` constants in `config.rs`.

/// Success.
pub const OK: u64 = 0;
/// "There is none" — the canonical not-found / unset sentinel.
pub const NONE: u64 = u64::MAX;
/// The request makes no sense in this context.
pub const WHAT: u64 = u64::MAX - 1;
/// An index or offset is out of bounds.
pub const OOB: u64 = u64::MAX - 2;
/// No such service.
pub const WHO: u64 = u64::MAX - 3;
/// Storage would exceed the service's balance-backed capacity.
pub const FULL: u64 = u64::MAX - 4;
/// No such core.
pub const CORE: u64 = u64::MAX - 5;
/// Insufficient funds.
pub const CASH: u64 = u64::MAX - 6;
/// Gas limit too low for the receiving service's minimum.
pub const LOW: u64 = u64::MAX - 7;
/// The caller is not authorized to perform this operation.
pub const HUH: u64 = u64::MAX - 8;
