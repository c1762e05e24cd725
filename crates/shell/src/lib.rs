// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bsup-shell: shell-style word splitting for build commands.
//!
//! Turns a command string such as `make -C "my dir" 'CFLAGS=-O2 -g'` into the
//! argv handed to the process spawner. Quoting follows POSIX `sh` rules; no
//! expansion, globbing, or operators are interpreted.

mod error;
mod lexer;
mod span;

pub use error::LexerError;
pub use lexer::{split, Lexer, Word};
pub use span::{context_snippet, Span};
