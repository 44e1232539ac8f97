// SPDX-License-Identifier: BSD-3-Clause
//! Render LLVM bitcode as an HTML page of annotated textual IR.

pub mod annotate;
pub mod bitcode;
pub mod cli;
pub mod diagnostic;
pub mod driver;
pub mod html;
pub mod layers;
pub mod loader;
pub mod output;
pub mod uses;
