//! Stepwise PVM interpreter (spec §4.3): one `step()` call executes exactly
//! one instruction and returns either `Outcome::Continue` or a `Terminal`.
//!
//! Grounded on `pvm-rust/src/state_wrapper.rs::next_step_impl` for the
//! step-loop shape (gas accounting, Fskip lookup, host-call dispatch) and the
//! various `pvm-rust/src/instructions/*.rs` handlers for per-opcode
//! semantics, consolidated here into one dispatch match rather than the
//! teacher's one-struct-per-instruction registry.

use crate::operands::*;
use crate::opcodes::*;
use crate::program::Program;
use crate::ram::{PageAccess, Ram};
use tracing::trace;

/// Sentinel jump target: a jump whose computed address equals this value
/// is program termination, not a fault (spec §4.3's "halt address").
pub const HALT_ADDRESS: u32 = 0xffff_0000;

/// Gas charged per executed instruction before dispatch.
pub const BASE_GAS_PER_INSTRUCTION: i64 = 1;

/// Gas charged per host call before the handler runs (spec §4.4).
pub const HOST_CALL_BASE_GAS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Trap,
    Halt,
    OutOfGas,
    Segfault { address: u32 },
    /// `ECALLI`: control returns to the host; `id` is the call index from the
    /// instruction operand, not yet gas-charged.
    HostCall { id: u64 },
    InstanceRunError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Terminal(Terminal),
}

pub struct PvmInstance {
    pub registers: [u64; 13],
    pub pc: u32,
    pub gas: i64,
    pub program: Program,
    pub ram: Ram,
}

impl PvmInstance {
    #[must_use]
    pub fn new(program: Program, initial_gas: i64, page_size: u32) -> Self {
        Self {
            registers: [0; 13],
            pc: 0,
            gas: initial_gas,
            program,
            ram: Ram::new(page_size),
        }
    }

    fn reg(&self, i: u8) -> u64 {
        self.registers.get(i as usize).copied().unwrap_or(0)
    }

    fn set_reg(&mut self, i: u8, v: u64) {
        if (i as usize) < self.registers.len() {
            self.registers[i as usize] = v;
        }
    }

    fn reg32(&self, i: u8) -> u32 {
        self.reg(i) as u32
    }

    fn set_reg32_sext(&mut self, i: u8, v: u32) {
        self.set_reg(i, sign_extend(u64::from(v), 4));
    }

    /// Runs instructions until a `Terminal` outcome or `max_steps` is hit —
    /// used by tests; production callers drive `step()` directly so the host
    /// can intercede on `Terminal::HostCall`.
    pub fn run(&mut self, max_steps: u64) -> Terminal {
        for _ in 0..max_steps {
            if let Outcome::Terminal(t) = self.step() {
                return t;
            }
        }
        Terminal::InstanceRunError("max_steps exceeded".into())
    }

    pub fn step(&mut self) -> Outcome {
        if self.pc as usize >= self.program.code.len() {
            return Outcome::Terminal(Terminal::Halt);
        }
        if !self.program.is_instruction_start(self.pc) {
            return Outcome::Terminal(Terminal::Trap);
        }

        self.gas -= BASE_GAS_PER_INSTRUCTION;
        if self.gas < 0 {
            return Outcome::Terminal(Terminal::OutOfGas);
        }

        let idx = self.pc as usize;
        let opcode = self.program.code[idx];
        let fskip = self.program.skip(idx);
        let operand_start = idx + 1;
        let operand_end = (operand_start + fskip as usize).min(self.program.code.len());
        let operands = self.program.code[operand_start..operand_end].to_vec();
        let next_pc = self.pc + 1 + fskip as u32;

        trace!(pc = self.pc, opcode, fskip, "pvm step");

        self.dispatch(opcode, &operands, next_pc)
    }

    fn branch_to(&mut self, target: u32) -> Outcome {
        if target == HALT_ADDRESS {
            return Outcome::Terminal(Terminal::Halt);
        }
        if !self.program.is_instruction_start(target) {
            return Outcome::Terminal(Terminal::Trap);
        }
        self.pc = target;
        Outcome::Continue
    }

    fn dispatch(&mut self, opcode: u8, ops: &[u8], next_pc: u32) -> Outcome {
        match opcode {
            TRAP => Outcome::Terminal(Terminal::Trap),
            FALLTHROUGH => {
                self.pc = next_pc;
                Outcome::Continue
            }
            ECALLI => {
                let id = get_immediate_value_unsigned(ops, 0, ops.len().min(4) as i32);
                self.pc = next_pc;
                Outcome::Terminal(Terminal::HostCall { id })
            }

            LOAD_IMM_64 => {
                let reg = get_register_index(ops.first().copied().unwrap_or(0));
                let value = get_immediate_value_unsigned(ops, 1, (ops.len().saturating_sub(1)).min(8) as i32);
                self.set_reg(reg, value);
                self.pc = next_pc;
                Outcome::Continue
            }
            LOAD_IMM => {
                let RegImm { reg, imm } = parse_one_register_and_immediate(ops, ops.len() as i32);
                self.set_reg(reg, imm as u64);
                self.pc = next_pc;
                Outcome::Continue
            }

            STORE_IMM_U8 | STORE_IMM_U16 | STORE_IMM_U32 | STORE_IMM_U64 => {
                let size = match opcode {
                    STORE_IMM_U8 => 1,
                    STORE_IMM_U16 => 2,
                    STORE_IMM_U32 => 4,
                    _ => 8,
                };
                let (address, value) = parse_two_immediates(ops, ops.len() as i32);
                let bytes = value_to_bytes_le(value as u64, size);
                match self.ram.write(address as u32, &bytes) {
                    Ok(()) => {
                        self.pc = next_pc;
                        Outcome::Continue
                    }
                    Err(f) => Outcome::Terminal(Terminal::Segfault { address: f.address }),
                }
            }

            JUMP => {
                let target = parse_one_offset(ops, ops.len() as i32, self.pc);
                self.branch_to(target)
            }
            JUMP_IND => {
                let reg = get_register_index(ops.first().copied().unwrap_or(0));
                let offset = get_immediate_value(ops, 1, (ops.len().saturating_sub(1)).min(4) as i32);
                let target = (self.reg(reg) as i64).wrapping_add(offset) as u32;
                self.branch_to(target)
            }

            LOAD_U8 | LOAD_I8 | LOAD_U16 | LOAD_I16 | LOAD_U32 | LOAD_I32 | LOAD_U64 => {
                let RegImm { reg, imm } = parse_one_register_and_immediate(ops, ops.len() as i32);
                let (size, signed) = match opcode {
                    LOAD_U8 => (1, false),
                    LOAD_I8 => (1, true),
                    LOAD_U16 => (2, false),
                    LOAD_I16 => (2, true),
                    LOAD_U32 => (4, false),
                    LOAD_I32 => (4, true),
                    _ => (8, false),
                };
                match self.ram.read(imm as u32, size) {
                    Ok(bytes) => {
                        let raw = bytes_to_value_le(&bytes);
                        let value = if signed { sign_extend(raw, size as i32) } else { raw };
                        self.set_reg(reg, value);
                        self.pc = next_pc;
                        Outcome::Continue
                    }
                    Err(f) => Outcome::Terminal(Terminal::Segfault { address: f.address }),
                }
            }
            STORE_U8 | STORE_U16 | STORE_U32 | STORE_U64 => {
                let TwoRegAndImm { a, imm, .. } = parse_two_registers_and_immediate(ops, ops.len() as i32);
                let size = match opcode {
                    STORE_U8 => 1,
                    STORE_U16 => 2,
                    STORE_U32 => 4,
                    _ => 8,
                };
                let value = self.reg(a);
                match self.ram.write(imm as u32, &value_to_bytes_le(value, size)) {
                    Ok(()) => {
                        self.pc = next_pc;
                        Outcome::Continue
                    }
                    Err(f) => Outcome::Terminal(Terminal::Segfault { address: f.address }),
                }
            }

            STORE_IMM_IND_U8 | STORE_IMM_IND_U16 | STORE_IMM_IND_U32 | STORE_IMM_IND_U64 => {
                let size = match opcode {
                    STORE_IMM_IND_U8 => 1,
                    STORE_IMM_IND_U16 => 2,
                    STORE_IMM_IND_U32 => 4,
                    _ => 8,
                };
                let RegAndTwoImm { reg, x, y } = parse_register_and_two_immediates(ops, ops.len() as i32);
                let address = (self.reg(reg) as i64).wrapping_add(x) as u32;
                match self.ram.write(address, &value_to_bytes_le(y as u64, size)) {
                    Ok(()) => {
                        self.pc = next_pc;
                        Outcome::Continue
                    }
                    Err(f) => Outcome::Terminal(Terminal::Segfault { address: f.address }),
                }
            }

            LOAD_IMM_JUMP => {
                let RegAndTwoImm { reg, x, y } = parse_register_and_two_immediates(ops, ops.len() as i32);
                self.set_reg(reg, x as u64);
                let target = (self.pc as i64 + y) as u32;
                self.branch_to(target)
            }

            BRANCH_EQ_IMM | BRANCH_NE_IMM | BRANCH_LT_U_IMM | BRANCH_LE_U_IMM | BRANCH_GE_U_IMM
            | BRANCH_GT_U_IMM | BRANCH_LT_S_IMM | BRANCH_LE_S_IMM | BRANCH_GE_S_IMM
            | BRANCH_GT_S_IMM => {
                let BranchOperands { reg, imm, target } = parse_branch_operands(ops, self.pc);
                let a = self.reg(reg);
                let b = imm as u64;
                let signed_a = a as i64;
                let signed_b = imm;
                let taken = match opcode {
                    BRANCH_EQ_IMM => a == b,
                    BRANCH_NE_IMM => a != b,
                    BRANCH_LT_U_IMM => a < b,
                    BRANCH_LE_U_IMM => a <= b,
                    BRANCH_GE_U_IMM => a >= b,
                    BRANCH_GT_U_IMM => a > b,
                    BRANCH_LT_S_IMM => signed_a < signed_b,
                    BRANCH_LE_S_IMM => signed_a <= signed_b,
                    BRANCH_GE_S_IMM => signed_a >= signed_b,
                    _ => signed_a > signed_b,
                };
                if taken {
                    self.branch_to(target)
                } else {
                    self.pc = next_pc;
                    Outcome::Continue
                }
            }

            MOVE_REG => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, self.reg(a));
                self.pc = next_pc;
                Outcome::Continue
            }
            SBRK => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                let increment = self.reg(a) as u32;
                let prior = self.ram.grow_heap(increment);
                self.set_reg(d, u64::from(prior));
                self.pc = next_pc;
                Outcome::Continue
            }
            COUNT_SET_BITS_64 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, u64::from(self.reg(a).count_ones()));
                self.pc = next_pc;
                Outcome::Continue
            }
            COUNT_SET_BITS_32 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, u64::from(self.reg32(a).count_ones()));
                self.pc = next_pc;
                Outcome::Continue
            }
            LEADING_ZERO_BITS_64 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, u64::from(self.reg(a).leading_zeros()));
                self.pc = next_pc;
                Outcome::Continue
            }
            LEADING_ZERO_BITS_32 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, u64::from(self.reg32(a).leading_zeros()));
                self.pc = next_pc;
                Outcome::Continue
            }
            TRAILING_ZERO_BITS_64 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, u64::from(self.reg(a).trailing_zeros()));
                self.pc = next_pc;
                Outcome::Continue
            }
            TRAILING_ZERO_BITS_32 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, u64::from(self.reg32(a).trailing_zeros()));
                self.pc = next_pc;
                Outcome::Continue
            }
            SIGN_EXTEND_8 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, sign_extend(self.reg(a) & 0xff, 1));
                self.pc = next_pc;
                Outcome::Continue
            }
            SIGN_EXTEND_16 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, sign_extend(self.reg(a) & 0xffff, 2));
                self.pc = next_pc;
                Outcome::Continue
            }
            ZERO_EXTEND_16 => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, self.reg(a) & 0xffff);
                self.pc = next_pc;
                Outcome::Continue
            }
            REVERSE_BYTES => {
                let TwoRegisters { d, a } = parse_two_registers(ops);
                self.set_reg(d, self.reg(a).swap_bytes());
                self.pc = next_pc;
                Outcome::Continue
            }

            STORE_IND_U8 | STORE_IND_U16 | STORE_IND_U32 | STORE_IND_U64 => {
                let size = match opcode {
                    STORE_IND_U8 => 1,
                    STORE_IND_U16 => 2,
                    STORE_IND_U32 => 4,
                    _ => 8,
                };
                let TwoRegAndImm { a, b, imm } = parse_two_registers_and_immediate(ops, ops.len() as i32);
                let address = (self.reg(a) as i64).wrapping_add(imm) as u32;
                let value = self.reg(b);
                match self.ram.write(address, &value_to_bytes_le(value, size)) {
                    Ok(()) => {
                        self.pc = next_pc;
                        Outcome::Continue
                    }
                    Err(f) => Outcome::Terminal(Terminal::Segfault { address: f.address }),
                }
            }
            LOAD_IND_U8 | LOAD_IND_I8 | LOAD_IND_U16 | LOAD_IND_I16 | LOAD_IND_U32 | LOAD_IND_I32
            | LOAD_IND_U64 => {
                let (size, signed) = match opcode {
                    LOAD_IND_U8 => (1, false),
                    LOAD_IND_I8 => (1, true),
                    LOAD_IND_U16 => (2, false),
                    LOAD_IND_I16 => (2, true),
                    LOAD_IND_U32 => (4, false),
                    LOAD_IND_I32 => (4, true),
                    _ => (8, false),
                };
                let TwoRegAndImm { a, b, imm } = parse_two_registers_and_immediate(ops, ops.len() as i32);
                let address = (self.reg(a) as i64).wrapping_add(imm) as u32;
                match self.ram.read(address, size) {
                    Ok(bytes) => {
                        let raw = bytes_to_value_le(&bytes);
                        let value = if signed { sign_extend(raw, size as i32) } else { raw };
                        self.set_reg(b, value);
                        self.pc = next_pc;
                        Outcome::Continue
                    }
                    Err(f) => Outcome::Terminal(Terminal::Segfault { address: f.address }),
                }
            }

            ADD_IMM_32 | AND_IMM | XOR_IMM | OR_IMM | MUL_IMM_32 | SET_LT_U_IMM | SET_LT_S_IMM
            | SHLO_L_IMM_32 | SHLO_R_IMM_32 | SHAR_R_IMM_32 | NEG_ADD_IMM_32 | SET_GT_U_IMM
            | SET_GT_S_IMM | SHLO_L_IMM_ALT_32 | SHLO_R_IMM_ALT_32 | SHAR_R_IMM_ALT_32
            | CMOV_IZ_IMM | CMOV_NZ_IMM => {
                let TwoRegAndImm { a, b, imm } = parse_two_registers_and_immediate(ops, ops.len() as i32);
                let va = self.reg32(a);
                let imm32 = imm as u32;
                let result: Option<u32> = match opcode {
                    ADD_IMM_32 => Some(va.wrapping_add(imm32)),
                    AND_IMM => Some(self.reg(a) as u32 & imm32),
                    XOR_IMM => Some(va ^ imm32),
                    OR_IMM => Some(va | imm32),
                    MUL_IMM_32 => Some(va.wrapping_mul(imm32)),
                    SET_LT_U_IMM => Some(u32::from(va < imm32)),
                    SET_LT_S_IMM => Some(u32::from((va as i32) < (imm32 as i32))),
                    SHLO_L_IMM_32 => Some(va.wrapping_shl(imm32 & 31)),
                    SHLO_R_IMM_32 => Some(va.wrapping_shr(imm32 & 31)),
                    SHAR_R_IMM_32 => Some(arithmetic_shift_right_32(u64::from(va), imm32 & 31) as u32),
                    NEG_ADD_IMM_32 => Some(imm32.wrapping_sub(va)),
                    SET_GT_U_IMM => Some(u32::from(va > imm32)),
                    SET_GT_S_IMM => Some(u32::from((va as i32) > (imm32 as i32))),
                    SHLO_L_IMM_ALT_32 => Some(imm32.wrapping_shl(va & 31)),
                    SHLO_R_IMM_ALT_32 => Some(imm32.wrapping_shr(va & 31)),
                    SHAR_R_IMM_ALT_32 => Some(arithmetic_shift_right_32(u64::from(imm32), va & 31) as u32),
                    CMOV_IZ_IMM => {
                        if va == 0 {
                            Some(imm32)
                        } else {
                            None
                        }
                    }
                    CMOV_NZ_IMM => {
                        if va != 0 {
                            Some(imm32)
                        } else {
                            None
                        }
                    }
                    _ => unreachable!(),
                };
                if let Some(v) = result {
                    self.set_reg32_sext(b, v);
                }
                self.pc = next_pc;
                Outcome::Continue
            }

            ADD_IMM_64 | MUL_IMM_64 | SHLO_L_IMM_64 | SHLO_R_IMM_64 | SHAR_R_IMM_64
            | NEG_ADD_IMM_64 | SHLO_L_IMM_ALT_64 | SHLO_R_IMM_ALT_64 | SHAR_R_IMM_ALT_64
            | ROT_R_64_IMM | ROT_R_64_IMM_ALT | ROT_R_32_IMM | ROT_R_32_IMM_ALT => {
                let TwoRegAndImm { a, b, imm } = parse_two_registers_and_immediate(ops, ops.len() as i32);
                let va = self.reg(a);
                let immu = imm as u64;
                let result = match opcode {
                    ADD_IMM_64 => va.wrapping_add(immu),
                    MUL_IMM_64 => va.wrapping_mul(immu),
                    SHLO_L_IMM_64 => va.wrapping_shl((immu & 63) as u32),
                    SHLO_R_IMM_64 => va.wrapping_shr((immu & 63) as u32),
                    SHAR_R_IMM_64 => arithmetic_shift_right_64(va, (immu & 63) as u32),
                    NEG_ADD_IMM_64 => immu.wrapping_sub(va),
                    SHLO_L_IMM_ALT_64 => immu.wrapping_shl((va & 63) as u32),
                    SHLO_R_IMM_ALT_64 => immu.wrapping_shr((va & 63) as u32),
                    SHAR_R_IMM_ALT_64 => arithmetic_shift_right_64(immu, (va & 63) as u32),
                    ROT_R_64_IMM => va.rotate_right((immu & 63) as u32),
                    ROT_R_64_IMM_ALT => immu.rotate_right((va & 63) as u32),
                    ROT_R_32_IMM => u64::from((va as u32).rotate_right((immu as u32) & 31)),
                    ROT_R_32_IMM_ALT => u64::from((immu as u32).rotate_right((va as u32) & 31)),
                    _ => unreachable!(),
                };
                if matches!(opcode, ROT_R_32_IMM | ROT_R_32_IMM_ALT) {
                    self.set_reg32_sext(b, result as u32);
                } else {
                    self.set_reg(b, result);
                }
                self.pc = next_pc;
                Outcome::Continue
            }

            BRANCH_EQ | BRANCH_NE | BRANCH_LT_U | BRANCH_LT_S | BRANCH_GE_U | BRANCH_GE_S => {
                let RegisterBranchOperands { a, b, target } = parse_register_branch_operands(ops, self.pc);
                let va = self.reg(a);
                let vb = self.reg(b);
                let taken = match opcode {
                    BRANCH_EQ => va == vb,
                    BRANCH_NE => va != vb,
                    BRANCH_LT_U => va < vb,
                    BRANCH_LT_S => (va as i64) < (vb as i64),
                    BRANCH_GE_U => va >= vb,
                    _ => (va as i64) >= (vb as i64),
                };
                if taken {
                    self.branch_to(target)
                } else {
                    self.pc = next_pc;
                    Outcome::Continue
                }
            }

            LOAD_IMM_JUMP_IND => {
                let RegAndTwoImm { reg, x, y } = parse_register_and_two_immediates(ops, ops.len() as i32);
                let base = self.reg(reg);
                let target = (base as i64).wrapping_add(y) as u32;
                self.set_reg(reg, x as u64);
                self.branch_to(target)
            }

            ADD_32 | SUB_32 | MUL_32 | DIV_U_32 | DIV_S_32 | REM_U_32 | REM_S_32 | SHLO_L_32
            | SHLO_R_32 | SHAR_R_32 | AND | XOR | OR | MUL_UPPER_S_S | MUL_UPPER_U_U
            | MUL_UPPER_S_U | SET_LT_U | SET_LT_S | CMOV_IZ | CMOV_NZ | ROT_L_64 | ROT_L_32
            | ROT_R_64 | ROT_R_32 | AND_INV | OR_INV | XNOR | MAX | MAX_U | MIN | MIN_U
            | ADD_64 | SUB_64 | MUL_64 | DIV_U_64 | DIV_S_64 | REM_U_64 | REM_S_64 | SHLO_L_64
            | SHLO_R_64 | SHAR_R_64 => {
                self.three_register_op(opcode, ops);
                self.pc = next_pc;
                Outcome::Continue
            }

            _ => Outcome::Terminal(Terminal::InstanceRunError(format!(
                "unknown opcode {opcode}"
            ))),
        }
    }

    fn three_register_op(&mut self, opcode: u8, ops: &[u8]) {
        let ThreeRegisters { d, a, b } = parse_three_registers(ops);
        let va = self.reg(a);
        let vb = self.reg(b);
        let va32 = va as u32;
        let vb32 = vb as u32;

        match opcode {
            ADD_32 => self.set_reg32_sext(d, va32.wrapping_add(vb32)),
            SUB_32 => self.set_reg32_sext(d, va32.wrapping_sub(vb32)),
            MUL_32 => self.set_reg32_sext(d, va32.wrapping_mul(vb32)),
            DIV_U_32 => {
                let v = if vb32 == 0 { u64::MAX } else { u64::from(va32 / vb32) };
                self.set_reg(d, v);
            }
            DIV_S_32 => {
                let sa = va32 as i32;
                let sb = vb32 as i32;
                let v = if sb == 0 {
                    u64::MAX
                } else if sa == i32::MIN && sb == -1 {
                    va32
                } else {
                    (sa.wrapping_div(sb)) as u32
                };
                self.set_reg32_sext(d, v);
            }
            REM_U_32 => {
                let v = if vb32 == 0 { va32 } else { va32 % vb32 };
                self.set_reg32_sext(d, v);
            }
            REM_S_32 => {
                let sa = va32 as i32;
                let sb = vb32 as i32;
                let v = if sa == i32::MIN && sb == -1 {
                    0
                } else if sb == 0 {
                    sa as u32
                } else {
                    (sa.wrapping_rem(sb)) as u32
                };
                self.set_reg32_sext(d, v);
            }
            SHLO_L_32 => self.set_reg32_sext(d, va32.wrapping_shl(vb32 & 31)),
            SHLO_R_32 => self.set_reg32_sext(d, va32.wrapping_shr(vb32 & 31)),
            SHAR_R_32 => self.set_reg32_sext(d, arithmetic_shift_right_32(va, vb32 & 31) as u32),

            ADD_64 => self.set_reg(d, va.wrapping_add(vb)),
            SUB_64 => self.set_reg(d, va.wrapping_sub(vb)),
            MUL_64 => self.set_reg(d, va.wrapping_mul(vb)),
            DIV_U_64 => self.set_reg(d, if vb == 0 { u64::MAX } else { va / vb }),
            DIV_S_64 => {
                let sa = va as i64;
                let sb = vb as i64;
                let v = if sb == 0 {
                    u64::MAX
                } else if sa == i64::MIN && sb == -1 {
                    va
                } else {
                    sa.wrapping_div(sb) as u64
                };
                self.set_reg(d, v);
            }
            REM_U_64 => self.set_reg(d, if vb == 0 { va } else { va % vb }),
            REM_S_64 => {
                let sa = va as i64;
                let sb = vb as i64;
                let v = if sa == i64::MIN && sb == -1 {
                    0
                } else if sb == 0 {
                    va
                } else {
                    sa.wrapping_rem(sb) as u64
                };
                self.set_reg(d, v);
            }
            SHLO_L_64 => self.set_reg(d, va.wrapping_shl((vb & 63) as u32)),
            SHLO_R_64 => self.set_reg(d, va.wrapping_shr((vb & 63) as u32)),
            SHAR_R_64 => self.set_reg(d, arithmetic_shift_right_64(va, (vb & 63) as u32)),

            AND => self.set_reg(d, va & vb),
            XOR => self.set_reg(d, va ^ vb),
            OR => self.set_reg(d, va | vb),
            MUL_UPPER_S_S => self.set_reg(d, (((va as i64 as i128) * (vb as i64 as i128)) >> 64) as u64),
            MUL_UPPER_U_U => self.set_reg(d, (((va as u128) * (vb as u128)) >> 64) as u64),
            MUL_UPPER_S_U => self.set_reg(d, (((va as i64 as i128) * (vb as u128 as i128)) >> 64) as u64),
            SET_LT_U => self.set_reg(d, u64::from(va < vb)),
            SET_LT_S => self.set_reg(d, u64::from((va as i64) < (vb as i64))),
            CMOV_IZ => {
                if vb == 0 {
                    self.set_reg(d, va);
                }
            }
            CMOV_NZ => {
                if vb != 0 {
                    self.set_reg(d, va);
                }
            }
            ROT_L_64 => self.set_reg(d, va.rotate_left((vb & 63) as u32)),
            ROT_L_32 => self.set_reg32_sext(d, va32.rotate_left(vb32 & 31)),
            ROT_R_64 => self.set_reg(d, va.rotate_right((vb & 63) as u32)),
            ROT_R_32 => self.set_reg32_sext(d, va32.rotate_right(vb32 & 31)),
            AND_INV => self.set_reg(d, va & !vb),
            OR_INV => self.set_reg(d, va | !vb),
            XNOR => self.set_reg(d, !(va ^ vb)),
            MAX => self.set_reg(d, (va as i64).max(vb as i64) as u64),
            MAX_U => self.set_reg(d, va.max(vb)),
            MIN => self.set_reg(d, (va as i64).min(vb as i64) as u64),
            MIN_U => self.set_reg(d, va.min(vb)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_for(code: Vec<u8>, bitmask: Vec<u8>) -> Program {
        Program {
            code,
            bitmask,
            jump_table: vec![],
            element_size: 0,
        }
    }

    #[test]
    fn add_32_then_halt() {
        // ADD_32 d=r7,a=r8,b=r9 then trap: matches the shape of spec.md's ADD scenario.
        let code = vec![ADD_32, 0x87, TRAP];
        let bitmask = vec![1, 0, 1];
        let program = blob_for(code, bitmask);
        let mut vm = PvmInstance::new(program, 10_000, 4096);
        vm.registers[7] = 3;
        vm.registers[8] = 4;
        let outcome = vm.step();
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(vm.registers[7], 7);
        assert_eq!(vm.pc, 2);
        let outcome2 = vm.step();
        assert_eq!(outcome2, Outcome::Terminal(Terminal::Trap));
    }

    #[test]
    fn out_of_gas_reported_before_dispatch() {
        let code = vec![FALLTHROUGH];
        let bitmask = vec![1];
        let program = blob_for(code, bitmask);
        let mut vm = PvmInstance::new(program, 0, 4096);
        assert_eq!(vm.step(), Outcome::Terminal(Terminal::OutOfGas));
    }

    #[test]
    fn halt_at_end_of_code() {
        let program = blob_for(vec![], vec![]);
        let mut vm = PvmInstance::new(program, 100, 4096);
        assert_eq!(vm.step(), Outcome::Terminal(Terminal::Halt));
    }

    #[test]
    fn ecalli_yields_host_call_terminal() {
        let code = vec![ECALLI, 5];
        let bitmask = vec![1, 0];
        let program = blob_for(code, bitmask);
        let mut vm = PvmInstance::new(program, 100, 4096);
        assert_eq!(vm.step(), Outcome::Terminal(Terminal::HostCall { id: 5 }));
        assert_eq!(vm.pc, 2);
    }

    #[test]
    fn store_then_load_round_trips_through_ram() {
        let code = vec![STORE_IMM_U32, 0, 4, 0, 0, 0, 42, 0, 0, 0, TRAP];
        let mut bitmask = vec![0u8; code.len()];
        bitmask[0] = 1;
        bitmask[10] = 1;
        let program = blob_for(code, bitmask);
        let mut vm = PvmInstance::new(program, 1000, 4096);
        vm.ram.init_region(0, 4096, PageAccess::ReadWrite);
        let outcome = vm.step();
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(vm.ram.read(4, 4).unwrap(), 42u32.to_le_bytes().to_vec());
    }
}
