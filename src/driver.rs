//! Driver
//!
//! Repeatedly ticks a hart until it halts or a caller-supplied
//! instruction budget is exhausted, then reports a termination
//! summary. This is the one piece of the simulator that is allowed to
//! know about wall-clock-style termination conditions; the hart
//! itself only knows about a single `tick`.

use std::io::Write;

use crate::hart::Hart;

/// Outcome of a `run`: either the hart halted on its own (an EBREAK
/// or an illegal instruction) or the instruction budget ran out
/// first, which is reported the same way the spec reports normal,
/// unhalted termination: reason "none".
pub struct RunSummary {
    pub halted: bool,
    pub halt_reason: String,
    pub instructions_executed: u64,
}

/// Tick `hart` until it halts, or until `exec_limit` instructions have
/// been retired (a limit of 0 means unlimited).
pub fn run(hart: &mut Hart, exec_limit: u64, out: &mut dyn Write) -> RunSummary {
    loop {
        if hart.is_halted() {
            break;
        }
        if exec_limit != 0 && hart.insn_counter >= exec_limit {
            break;
        }
        hart.tick(out);
    }

    RunSummary {
        halted: hart.is_halted(),
        halt_reason: hart.halt_reason.clone(),
        instructions_executed: hart.insn_counter,
    }
}

/// Render the two-line termination summary exactly as specified.
pub fn format_summary(summary: &RunSummary) -> String {
    let reason = if summary.halted {
        summary.halt_reason.as_str()
    } else {
        "none"
    };
    format!(
        "Execution terminated. Reason: {reason}\n{} instructions executed",
        summary.instructions_executed
    )
}
