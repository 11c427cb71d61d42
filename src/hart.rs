//! RISC-V hardware thread
//!
//! This is the simplest possible RISC-V hardware thread, which is an
//! execution environment interface where (see section 1.2 of the
//! unprivileged specification):
//!
//! * there is only one hart (this one), which supports only a single
//!   privilege level (there is no notion of privilege)
//! * the hart implements only RV32I, plus the unmodelled CSR
//!   passthrough documented below
//! * all memory is readable and writable, and the full address space
//!   is main memory
//! * every unsupported condition is a fatal halt of this hart: there
//!   are no traps to recover from
//!
//! `tick` controls execution: each call executes the instruction at
//! the current pc, unless the hart has already halted, in which case
//! it is a no-op. The hart borrows a `Memory` and owns a
//! `RegisterFile`; it never outlives the memory it borrows.

use std::io::Write;

use crate::decode::decode;
use crate::fields::*;
use crate::memory::Memory;
use crate::registers::RegisterFile;
use crate::trace;

const OPCODE_LUI: u8 = 0x37;
const OPCODE_AUIPC: u8 = 0x17;
const OPCODE_JAL: u8 = 0x6f;
const OPCODE_JALR: u8 = 0x67;
const OPCODE_BRANCH: u8 = 0x63;
const OPCODE_LOAD: u8 = 0x03;
const OPCODE_STORE: u8 = 0x23;
const OPCODE_OP_IMM: u8 = 0x13;
const OPCODE_OP: u8 = 0x33;
const OPCODE_SYSTEM: u8 = 0x73;

pub const EBREAK_REASON: &str = "EBREAK instruction";
pub const ILLEGAL_REASON: &str = "Illegal instruction";

pub struct Hart<'m> {
    pub pc: u32,
    pub insn_counter: u64,
    pub halt: bool,
    pub halt_reason: String,
    pub show_instructions: bool,
    pub show_registers: bool,
    pub mhartid: u32,
    pub registers: RegisterFile,
    memory: &'m mut Memory,
}

impl<'m> Hart<'m> {
    pub fn new(memory: &'m mut Memory, mhartid: u32) -> Self {
        Self {
            pc: 0,
            insn_counter: 0,
            halt: false,
            halt_reason: String::new(),
            show_instructions: false,
            show_registers: false,
            mhartid,
            registers: RegisterFile::new(),
            memory,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halt
    }

    fn halt_with(&mut self, reason: &str) {
        self.halt = true;
        self.halt_reason = reason.to_string();
    }

    /// Execute the instruction at `pc`, unless the hart has already
    /// halted. Writes a register dump (if `show_registers`) and a
    /// disassembled trace line (if `show_instructions`) to `out`.
    /// Tracing never changes the instruction's effect on registers,
    /// memory, or pc: `out` is a pure side channel.
    pub fn tick(&mut self, out: &mut dyn Write) {
        if self.halt {
            return;
        }
        self.insn_counter += 1;

        if self.show_registers {
            let header = format!("mhartid={} pc=0x{:08x}", self.mhartid, self.pc);
            let _ = write!(out, "{}", self.registers.dump(&header));
        }

        let pc_before = self.pc;
        let instr = self.memory.load32(pc_before);

        if self.show_instructions {
            let disasm = decode(pc_before, instr);
            let annotation = self.execute(instr);
            let _ = writeln!(
                out,
                "{pc_before:08x}: {instr:08x}  {disasm:<35}// {annotation}"
            );
        } else {
            self.execute(instr);
        }
    }

    /// Apply the effect of `instr` (fetched at `self.pc`) to
    /// registers, memory, and `pc`. Returns the trace annotation for
    /// this instruction, whether or not it is ever displayed.
    fn execute(&mut self, instr: u32) -> String {
        match opcode(instr) {
            OPCODE_LUI => self.exec_lui(instr),
            OPCODE_AUIPC => self.exec_auipc(instr),
            OPCODE_JAL => self.exec_jal(instr),
            OPCODE_JALR => self.exec_jalr(instr),
            OPCODE_BRANCH => self.exec_branch(instr),
            OPCODE_LOAD => self.exec_load(instr),
            OPCODE_STORE => self.exec_store(instr),
            OPCODE_OP_IMM => self.exec_op_imm(instr),
            OPCODE_OP => self.exec_op(instr),
            OPCODE_SYSTEM => self.exec_system(instr),
            _ => {
                self.halt_with(ILLEGAL_REASON);
                "halt: illegal instruction".to_string()
            }
        }
    }

    fn exec_lui(&mut self, instr: u32) -> String {
        let value = imm_utype(instr) << 12;
        self.registers.set(rd(instr), value);
        self.pc = self.pc.wrapping_add(4);
        trace::lui(rd(instr), value)
    }

    fn exec_auipc(&mut self, instr: u32) -> String {
        let offset = imm_utype(instr) << 12;
        let value = self.pc.wrapping_add(offset);
        self.registers.set(rd(instr), value);
        let annotation = trace::alu(rd(instr), self.pc, "+", offset, value);
        self.pc = self.pc.wrapping_add(4);
        annotation
    }

    fn exec_jal(&mut self, instr: u32) -> String {
        let link = self.pc.wrapping_add(4);
        let target = self.pc.wrapping_add(imm_jtype(instr) as u32);
        self.registers.set(rd(instr), link);
        self.pc = target;
        trace::jump(rd(instr), link, target)
    }

    fn exec_jalr(&mut self, instr: u32) -> String {
        let link = self.pc.wrapping_add(4);
        let base = self.registers.get(rs1(instr));
        let target = base.wrapping_add(imm_itype(instr) as u32) & !1u32;
        self.registers.set(rd(instr), link);
        self.pc = target;
        trace::jump(rd(instr), link, target)
    }

    fn exec_branch(&mut self, instr: u32) -> String {
        let lhs = self.registers.get(rs1(instr));
        let rhs = self.registers.get(rs2(instr));
        let offset = imm_btype(instr);
        let (taken, symbol) = match funct3(instr) {
            0b000 => (lhs == rhs, "=="),
            0b001 => (lhs != rhs, "!="),
            0b100 => ((lhs as i32) < (rhs as i32), "<s"),
            0b101 => ((lhs as i32) >= (rhs as i32), ">=s"),
            0b110 => (lhs < rhs, "<u"),
            0b111 => (lhs >= rhs, ">=u"),
            _ => {
                self.halt_with(ILLEGAL_REASON);
                return "halt: illegal instruction".to_string();
            }
        };
        self.pc = if taken {
            self.pc.wrapping_add(offset as u32)
        } else {
            self.pc.wrapping_add(4)
        };
        trace::branch(lhs, symbol, rhs, offset, self.pc)
    }

    fn exec_load(&mut self, instr: u32) -> String {
        let addr = self
            .registers
            .get(rs1(instr))
            .wrapping_add(imm_itype(instr) as u32);
        let (value, ext, width) = match funct3(instr) {
            0b000 => (self.memory.load8_sx(addr) as u32, "sx", 1),
            0b001 => (self.memory.load16_sx(addr) as u32, "sx", 2),
            0b010 => (self.memory.load32(addr), "zx", 4),
            0b100 => (self.memory.load8(addr) as u32, "zx", 1),
            0b101 => (self.memory.load16(addr) as u32, "zx", 2),
            _ => {
                self.halt_with(ILLEGAL_REASON);
                return "halt: illegal instruction".to_string();
            }
        };
        self.registers.set(rd(instr), value);
        self.pc = self.pc.wrapping_add(4);
        trace::load(rd(instr), ext, width, addr, value)
    }

    fn exec_store(&mut self, instr: u32) -> String {
        let addr = self
            .registers
            .get(rs1(instr))
            .wrapping_add(imm_stype(instr) as u32);
        let value = self.registers.get(rs2(instr));
        let width = match funct3(instr) {
            0b000 => {
                self.memory.store8(addr, value as u8);
                1
            }
            0b001 => {
                self.memory.store16(addr, value as u16);
                2
            }
            0b010 => {
                self.memory.store32(addr, value);
                4
            }
            _ => {
                self.halt_with(ILLEGAL_REASON);
                return "halt: illegal instruction".to_string();
            }
        };
        self.pc = self.pc.wrapping_add(4);
        trace::store(width, addr, value)
    }

    fn exec_op_imm(&mut self, instr: u32) -> String {
        let lhs = self.registers.get(rs1(instr));
        let imm = imm_itype(instr);
        let imm_u = imm as u32;
        let (result, symbol) = match funct3(instr) {
            0b000 => (lhs.wrapping_add(imm_u), "+"),
            0b010 => (((lhs as i32) < imm) as u32, "<s"),
            0b011 => ((lhs < imm_u) as u32, "<u"),
            0b100 => (lhs ^ imm_u, "^"),
            0b110 => (lhs | imm_u, "|"),
            0b111 => (lhs & imm_u, "&"),
            0b001 => (lhs << (imm_u & 0x1f), "<<"),
            0b101 => {
                let shamt = imm_u & 0x1f;
                if funct7(instr) >> 5 == 0 {
                    (lhs >> shamt, ">>u")
                } else {
                    (((lhs as i32) >> shamt) as u32, ">>s")
                }
            }
            _ => {
                self.halt_with(ILLEGAL_REASON);
                return "halt: illegal instruction".to_string();
            }
        };
        self.registers.set(rd(instr), result);
        let annotation = trace::alu(rd(instr), lhs, symbol, imm_u, result);
        self.pc = self.pc.wrapping_add(4);
        annotation
    }

    fn exec_op(&mut self, instr: u32) -> String {
        let lhs = self.registers.get(rs1(instr));
        let rhs = self.registers.get(rs2(instr));
        let (result, symbol) = match (funct3(instr), funct7(instr) >> 5) {
            (0b000, 0) => (lhs.wrapping_add(rhs), "+"),
            (0b000, _) => (lhs.wrapping_sub(rhs), "-"),
            (0b001, _) => (lhs << (rhs & 0x1f), "<<"),
            (0b010, _) => (((lhs as i32) < (rhs as i32)) as u32, "<s"),
            (0b011, _) => ((lhs < rhs) as u32, "<u"),
            (0b100, _) => (lhs ^ rhs, "^"),
            (0b101, 0) => (lhs >> (rhs & 0x1f), ">>u"),
            (0b101, _) => (((lhs as i32) >> (rhs & 0x1f)) as u32, ">>s"),
            (0b110, _) => (lhs | rhs, "|"),
            (0b111, _) => (lhs & rhs, "&"),
            _ => {
                self.halt_with(ILLEGAL_REASON);
                return "halt: illegal instruction".to_string();
            }
        };
        self.registers.set(rd(instr), result);
        let annotation = trace::alu(rd(instr), lhs, symbol, rhs, result);
        self.pc = self.pc.wrapping_add(4);
        annotation
    }

    /// The system opcode covers ECALL, EBREAK, and the six CSR
    /// instructions. No CSR state is modelled: every CSR variant
    /// degenerates to copying the value named by the instruction's
    /// rs1 field into rd (see the design notes on this
    /// simplification). ECALL is treated as a no-op.
    fn exec_system(&mut self, instr: u32) -> String {
        match funct3(instr) {
            0b000 => match instr {
                0x0000_0073 => {
                    self.pc = self.pc.wrapping_add(4);
                    "ecall: no-op".to_string()
                }
                0x0010_0073 => {
                    self.halt_with(EBREAK_REASON);
                    "halt: ebreak".to_string()
                }
                _ => {
                    self.halt_with(ILLEGAL_REASON);
                    "halt: illegal instruction".to_string()
                }
            },
            0b001..=0b011 | 0b101..=0b111 => {
                let value = self.registers.get(rs1(instr));
                self.registers.set(rd(instr), value);
                let annotation = trace::alu(rd(instr), value, "csr<-", value, value);
                self.pc = self.pc.wrapping_add(4);
                annotation
            }
            _ => {
                self.halt_with(ILLEGAL_REASON);
                "halt: illegal instruction".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::sink;

    fn image(words: &[u32]) -> Memory {
        let mut mem = Memory::new(64);
        for (i, w) in words.iter().enumerate() {
            mem.store32((i * 4) as u32, *w);
        }
        mem
    }

    #[test]
    fn scenario_s1_addi_sequence() {
        let mut mem = image(&[0x00500093, 0xFFF08113, 0x0010_0073]);
        let mut hart = Hart::new(&mut mem, 0);
        while !hart.is_halted() {
            hart.tick(&mut sink());
        }
        assert_eq!(hart.registers.get(1), 5);
        assert_eq!(hart.registers.get(2), 4);
        assert_eq!(hart.halt_reason, EBREAK_REASON);
        assert_eq!(hart.insn_counter, 3);
    }

    #[test]
    fn scenario_s2_x0_is_immutable() {
        let mut mem = image(&[0x02A00013, 0x0010_0073]);
        let mut hart = Hart::new(&mut mem, 0);
        while !hart.is_halted() {
            hart.tick(&mut sink());
        }
        assert_eq!(hart.registers.get(0), 0);
        assert_eq!(hart.insn_counter, 2);
    }

    #[test]
    fn scenario_s3_backward_branch_loop() {
        let mut mem = image(&[
            0x00300093,  // addi x1, x0, 3
            0xFFF08093,  // addi x1, x1, -1
            0xFE009CE3,  // bne x1, x0, -4
            0x0010_0073, // ebreak
        ]);
        let mut hart = Hart::new(&mut mem, 0);
        while !hart.is_halted() {
            hart.tick(&mut sink());
        }
        assert_eq!(hart.registers.get(1), 0);
        assert_eq!(hart.halt_reason, EBREAK_REASON);
        assert_eq!(hart.insn_counter, 8);
    }

    #[test]
    fn scenario_s4_jal_link_and_jump() {
        let mut mem = image(&[
            0x0080_00ef, // jal x1, +8
            0x0010_0073, // ebreak
            0x00700113,  // addi x2, x0, 7
            0x0010_0073, // ebreak
        ]);
        let mut hart = Hart::new(&mut mem, 0);
        while !hart.is_halted() {
            hart.tick(&mut sink());
        }
        assert_eq!(hart.registers.get(1), 4);
        assert_eq!(hart.registers.get(2), 7);
        assert_eq!(hart.pc, 12);
        assert_eq!(hart.insn_counter, 3);
    }

    #[test]
    fn scenario_s5_illegal_instruction() {
        let mut mem = image(&[0x0000_0000]);
        let mut hart = Hart::new(&mut mem, 0);
        hart.tick(&mut sink());
        assert!(hart.is_halted());
        assert_eq!(hart.halt_reason, ILLEGAL_REASON);
        assert_eq!(hart.insn_counter, 1);
        assert_eq!(hart.pc, 0);
    }

    #[test]
    fn scenario_s6_store_load_round_trip() {
        // sw x1, 0x100(x0)
        let sw = (8u32 << 25) | (1u32 << 20) | (0b010 << 12) | 0x23;
        // lw x2, 0x100(x0)
        let lw = (0x100u32 << 20) | (0b010 << 12) | (2u32 << 7) | 0x03;
        let mut mem = image(&[sw, lw, 0x0010_0073]);
        let mut hart = Hart::new(&mut mem, 0);
        hart.registers.set(1, 0xDEADBEEF);
        while !hart.is_halted() {
            hart.tick(&mut sink());
        }
        assert_eq!(hart.registers.get(2), 0xDEADBEEF);
    }

    #[test]
    fn halted_tick_is_a_no_op() {
        let mut mem = image(&[0x0010_0073]);
        let mut hart = Hart::new(&mut mem, 0);
        hart.tick(&mut sink());
        assert!(hart.is_halted());
        let pc_after_halt = hart.pc;
        let counter_after_halt = hart.insn_counter;
        hart.tick(&mut sink());
        assert_eq!(hart.pc, pc_after_halt);
        assert_eq!(hart.insn_counter, counter_after_halt);
    }

    #[test]
    fn csrrw_passes_rs1_value_through_to_rd() {
        // csrrw x3, 0x300, x1 -> rd=3, rs1=1, funct3=001
        let instr = (0x300u32 << 20) | (1u32 << 15) | (0b001 << 12) | (3u32 << 7) | 0x73;
        let mut mem = image(&[instr]);
        let mut hart = Hart::new(&mut mem, 0);
        hart.registers.set(1, 0x1234);
        hart.tick(&mut sink());
        assert_eq!(hart.registers.get(3), 0x1234);
    }

    #[test]
    fn ecall_is_a_no_op() {
        let mut mem = image(&[0x0000_0073, 0x0010_0073]);
        let mut hart = Hart::new(&mut mem, 0);
        hart.tick(&mut sink());
        assert!(!hart.is_halted());
        assert_eq!(hart.pc, 4);
    }

    #[test]
    fn sltiu_compares_register_value_not_register_number() {
        // addi x1, x0, 5 ; sltiu x2, x1, 3 -> x1=5, not less than 3 -> x2 = 0
        let sltiu =
            ((3i32 as u32 & 0xfff) << 20) | (1u32 << 15) | (0b011 << 12) | (2u32 << 7) | 0x13;
        let mut mem = image(&[0x00500093, sltiu]);
        let mut hart = Hart::new(&mut mem, 0);
        hart.tick(&mut sink());
        hart.tick(&mut sink());
        assert_eq!(hart.registers.get(2), 0);
    }

    #[test]
    fn shift_amount_only_uses_low_5_bits() {
        // sll x2, x1, x3 where x3 = 0x21 (33) should behave as shift by 1
        let sll = (3u32 << 20) | (1u32 << 15) | (0b001 << 12) | (2u32 << 7) | 0x33;
        let mut mem = image(&[sll]);
        let mut hart = Hart::new(&mut mem, 0);
        hart.registers.set(1, 1);
        hart.registers.set(3, 0x21);
        hart.tick(&mut sink());
        assert_eq!(hart.registers.get(2), 2);
    }
}
