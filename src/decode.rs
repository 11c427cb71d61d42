//! Disassembly
//!
//! Pure rendering of a 32-bit instruction word into its canonical
//! mnemonic string. `decode` depends only on its two arguments
//! (address, instruction word); it never touches register or memory
//! state, so the same word always disassembles to the same string
//! regardless of when or how many times it is called.

use crate::fields::*;

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

const ILLEGAL: &str = "illegal instruction";

/// Left-justify a mnemonic in an 8-wide field.
fn mnem(name: &str) -> String {
    format!("{name:<8}")
}

fn branch(name: &str, addr: u32, instr: u32) -> String {
    let target = addr.wrapping_add(imm_btype(instr) as u32);
    format!(
        "{}x{}, x{}, 0x{:08x}",
        mnem(name),
        rs1(instr),
        rs2(instr),
        target
    )
}

fn load(name: &str, instr: u32) -> String {
    format!(
        "{}x{}, {}(x{})",
        mnem(name),
        rd(instr),
        imm_itype(instr),
        rs1(instr)
    )
}

fn store(name: &str, instr: u32) -> String {
    format!(
        "{}x{}, {}(x{})",
        mnem(name),
        rs2(instr),
        imm_stype(instr),
        rs1(instr)
    )
}

fn reg_imm(name: &str, instr: u32) -> String {
    format!(
        "{}x{}, x{}, {}",
        mnem(name),
        rd(instr),
        rs1(instr),
        imm_itype(instr)
    )
}

fn shift_imm(name: &str, instr: u32) -> String {
    let shamt = rs2(instr) & 0x1f;
    format!("{}x{}, x{}, 0x{:x}", mnem(name), rd(instr), rs1(instr), shamt)
}

fn reg_reg(name: &str, instr: u32) -> String {
    format!(
        "{}x{}, x{}, x{}",
        mnem(name),
        rd(instr),
        rs1(instr),
        rs2(instr)
    )
}

fn csr_reg(name: &str, instr: u32) -> String {
    format!(
        "{}x{}, 0x{:03x}, x{}",
        mnem(name),
        rd(instr),
        imm_itype(instr) as u32 & 0xfff,
        rs1(instr)
    )
}

fn csr_imm(name: &str, instr: u32) -> String {
    format!(
        "{}x{}, 0x{:03x}, 0x{:x}",
        mnem(name),
        rd(instr),
        imm_itype(instr) as u32 & 0xfff,
        rs1(instr)
    )
}

fn op_imm(instr: u32) -> String {
    match funct3(instr) {
        0b000 => reg_imm("addi", instr),
        0b010 => reg_imm("slti", instr),
        0b011 => reg_imm("sltiu", instr),
        0b100 => reg_imm("xori", instr),
        0b110 => reg_imm("ori", instr),
        0b111 => reg_imm("andi", instr),
        0b001 => shift_imm("slli", instr),
        0b101 => match funct7(instr) >> 5 {
            0 => shift_imm("srli", instr),
            _ => shift_imm("srai", instr),
        },
        _ => ILLEGAL.to_string(),
    }
}

fn op(instr: u32) -> String {
    match (funct3(instr), funct7(instr)) {
        (0b000, 0x00) => reg_reg("add", instr),
        (0b000, 0x20) => reg_reg("sub", instr),
        (0b001, 0x00) => reg_reg("sll", instr),
        (0b010, 0x00) => reg_reg("slt", instr),
        (0b011, 0x00) => reg_reg("sltu", instr),
        (0b100, 0x00) => reg_reg("xor", instr),
        (0b101, 0x00) => reg_reg("srl", instr),
        (0b101, 0x20) => reg_reg("sra", instr),
        (0b110, 0x00) => reg_reg("or", instr),
        (0b111, 0x00) => reg_reg("and", instr),
        _ => ILLEGAL.to_string(),
    }
}

fn load_group(instr: u32) -> String {
    match funct3(instr) {
        0b000 => load("lb", instr),
        0b001 => load("lh", instr),
        0b010 => load("lw", instr),
        0b100 => load("lbu", instr),
        0b101 => load("lhu", instr),
        _ => ILLEGAL.to_string(),
    }
}

fn store_group(instr: u32) -> String {
    match funct3(instr) {
        0b000 => store("sb", instr),
        0b001 => store("sh", instr),
        0b010 => store("sw", instr),
        _ => ILLEGAL.to_string(),
    }
}

fn branch_group(addr: u32, instr: u32) -> String {
    match funct3(instr) {
        0b000 => branch("beq", addr, instr),
        0b001 => branch("bne", addr, instr),
        0b100 => branch("blt", addr, instr),
        0b101 => branch("bge", addr, instr),
        0b110 => branch("bltu", addr, instr),
        0b111 => branch("bgeu", addr, instr),
        _ => ILLEGAL.to_string(),
    }
}

fn system_group(instr: u32) -> String {
    match funct3(instr) {
        0b000 => match instr {
            0x0000_0073 => mnem("ecall"),
            0x0010_0073 => mnem("ebreak"),
            _ => ILLEGAL.to_string(),
        },
        0b001 => csr_reg("csrrw", instr),
        0b010 => csr_reg("csrrs", instr),
        0b011 => csr_reg("csrrc", instr),
        0b101 => csr_imm("csrrwi", instr),
        0b110 => csr_imm("csrrsi", instr),
        0b111 => csr_imm("csrrci", instr),
        _ => ILLEGAL.to_string(),
    }
}

/// Disassemble the instruction word `instr`, fetched from address
/// `addr`, into its canonical mnemonic string. `addr` is only used to
/// resolve pc-relative branch and jump targets to an absolute value.
pub fn decode(addr: u32, instr: u32) -> String {
    match opcode(instr) {
        OPCODE_LUI => format!("{}x{}, 0x{:x}", mnem("lui"), rd(instr), imm_utype(instr)),
        OPCODE_AUIPC => format!("{}x{}, 0x{:x}", mnem("auipc"), rd(instr), imm_utype(instr)),
        OPCODE_JAL => {
            let target = addr.wrapping_add(imm_jtype(instr) as u32);
            format!("{}x{}, 0x{:08x}", mnem("jal"), rd(instr), target)
        }
        OPCODE_JALR => format!(
            "{}x{}, {}(x{})",
            mnem("jalr"),
            rd(instr),
            imm_itype(instr),
            rs1(instr)
        ),
        OPCODE_BRANCH => branch_group(addr, instr),
        OPCODE_LOAD => load_group(instr),
        OPCODE_STORE => store_group(instr),
        OPCODE_OP_IMM => op_imm(instr),
        OPCODE_OP => op(instr),
        OPCODE_SYSTEM => system_group(instr),
        _ => ILLEGAL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_addi() {
        assert_eq!(decode(0, 0x00500093).trim(), "addi    x1, x0, 5");
    }

    #[test]
    fn decodes_ebreak_and_ecall() {
        assert_eq!(decode(0, 0x0010_0073).trim(), "ebreak");
        assert_eq!(decode(0, 0x0000_0073).trim(), "ecall");
    }

    #[test]
    fn decodes_backward_branch_to_absolute_target() {
        // bne x1, x0, -4 fetched at address 8 targets address 4.
        assert_eq!(decode(8, 0xFE009CE3).trim(), "bne     x1, x0, 0x00000004");
    }

    #[test]
    fn decodes_jal_to_absolute_target() {
        let offset: i32 = 8;
        let addr = 0u32;
        let imm20 = (offset as u32 >> 20) & 0x1;
        let imm19_12 = (offset as u32 >> 12) & 0xff;
        let imm11 = (offset as u32 >> 11) & 0x1;
        let imm10_1 = (offset as u32 >> 1) & 0x3ff;
        let instr =
            (imm20 << 31) | (imm19_12 << 12) | (imm11 << 20) | (imm10_1 << 21) | 0b110_1111;
        assert_eq!(decode(addr, instr).trim(), "jal     x0, 0x00000008");
    }

    #[test]
    fn unrecognised_encoding_is_illegal() {
        assert_eq!(decode(0, 0x0000_0000), "illegal instruction");
    }

    #[test]
    fn decoder_is_pure() {
        let words = [0x00500093u32, 0xFFF08113, 0x0010_0073];
        for w in words {
            assert_eq!(decode(0, w), decode(0, w));
        }
    }
}
