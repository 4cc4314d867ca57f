// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pause points between the passes of a manual duplex scan.

use std::fmt;
use std::io::{BufRead, Write};

use tracing::{debug, warn};

/// A physical pass over the paper stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Front sides, first sheet first.
    Front,
    /// Back sides after flipping the stack, last sheet first.
    Back,
}

impl Pass {
    /// 1-based pass number.
    pub fn number(self) -> u8 {
        match self {
            Self::Front => 1,
            Self::Back => 2,
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => f.write_str("front"),
            Self::Back => f.write_str("back"),
        }
    }
}

/// Confirms that the operator has prepared the next pass.
pub trait PassGate {
    /// `true` to continue with `pass`, `false` to abort the scan.
    fn ready_for_next_pass(&mut self, pass: Pass) -> bool;
}

/// Always ready. For `--yes` and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoGate;

impl PassGate for AutoGate {
    fn ready_for_next_pass(&mut self, pass: Pass) -> bool {
        debug!(%pass, "pass confirmed automatically");
        true
    }
}

/// Asks on a terminal (or any reader/writer pair).
///
/// Enter or "y" continues; "n", "q" or end of input aborts.
pub struct PromptGate<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptGate<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Prompt on stderr, read the answer from stdin.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> PassGate for PromptGate<R, W> {
    fn ready_for_next_pass(&mut self, pass: Pass) -> bool {
        let prompt = match pass {
            Pass::Front => "Load the stack face up, then press Enter (n to cancel): ",
            Pass::Back => "Flip the whole stack and load it again, then press Enter (n to cancel): ",
        };
        if let Err(err) = write!(self.output, "{prompt}").and_then(|_| self.output.flush()) {
            warn!(%err, "cannot show pass prompt");
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) => false,
            Ok(_) => {
                let answer = answer.trim().to_ascii_lowercase();
                !matches!(answer.as_str(), "n" | "no" | "q" | "quit")
            }
            Err(err) => {
                warn!(%err, "cannot read pass confirmation");
                false
            }
        }
    }
}
