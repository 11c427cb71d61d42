//! Architectural register file
//!
//! 32 general-purpose 32-bit registers. x0 is hard-wired to zero:
//! reads always return 0 and writes are silently discarded.

#[derive(Debug)]
pub struct RegisterFile {
    registers: [u32; 32],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self { registers: [0; 32] }
    }

    pub fn get(&self, r: u8) -> u32 {
        self.registers[r as usize]
    }

    pub fn set(&mut self, r: u8, value: u32) {
        if r != 0 {
            self.registers[r as usize] = value;
        }
    }

    pub fn reset(&mut self) {
        self.registers = [0; 32];
    }

    /// Eight-column, four-row hex dump of all 32 registers. Each row
    /// is prefixed by `header` and the right-justified, three-wide
    /// name of its leading register (x0, x8, x16, x24), with an extra
    /// space separating the row's two halves.
    pub fn dump(&self, header: &str) -> String {
        let mut out = String::new();
        for row in 0..4 {
            let base = row * 8;
            let name = format!("x{base}");
            out.push_str(&format!("{header}{name:>3}: "));
            for col in 0..8 {
                if col > 0 {
                    out.push_str(if col == 4 { "  " } else { " " });
                }
                out.push_str(&format!("{:08x}", self.registers[base + col]));
            }
            out.push('\n');
        }
        out
    }
}
