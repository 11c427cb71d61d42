//! Trace annotations
//!
//! Builds the `// ...` suffix appended to a disassembled instruction
//! when tracing is on. These functions are pure string formatting
//! over values the caller has already computed during execution; they
//! never read or mutate hart state themselves, so tracing never
//! changes what an instruction does (see the hart module).

pub fn alu(rd: u8, lhs: u32, op_symbol: &str, rhs: u32, result: u32) -> String {
    format!("x{rd} = 0x{lhs:08x} {op_symbol} 0x{rhs:08x} = 0x{result:08x}")
}

pub fn branch(lhs: u32, cmp_symbol: &str, rhs: u32, offset: i32, new_pc: u32) -> String {
    format!("pc += (0x{lhs:08x} {cmp_symbol} 0x{rhs:08x} ? {offset} : 4) = 0x{new_pc:08x}")
}

pub fn load(rd: u8, ext: &str, width: u8, addr: u32, value: u32) -> String {
    format!("x{rd} = {ext}(m{width}(0x{addr:08x})) = 0x{value:08x}")
}

pub fn store(width: u8, addr: u32, value: u32) -> String {
    format!("m{width}(0x{addr:08x}) = 0x{value:08x}")
}

pub fn jump(rd: u8, link: u32, target: u32) -> String {
    format!("x{rd} = 0x{link:08x}, pc = 0x{target:08x}")
}

pub fn lui(rd: u8, value: u32) -> String {
    format!("x{rd} = 0x{value:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alu_annotation_matches_canonical_form() {
        assert_eq!(
            alu(5, 0x10, "+", 0x4, 0x14),
            "x5 = 0x00000010 + 0x00000004 = 0x00000014"
        );
    }
}
