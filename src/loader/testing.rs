// SPDX-License-Identifier: BSD-3-Clause
//! Assembling textual IR into bitcode for unit tests.

use std::ptr;

use llvm_sys::bit_writer::LLVMWriteBitcodeToMemoryBuffer;
use llvm_sys::core::{
    LLVMContextCreate, LLVMContextDispose, LLVMCreateMemoryBufferWithMemoryRangeCopy,
    LLVMDisposeMemoryBuffer, LLVMDisposeModule, LLVMGetBufferSize, LLVMGetBufferStart,
};
use llvm_sys::ir_reader::LLVMParseIRInContext;

use super::llvm::take_message;

/// `source` as single-module bitcode. Panics when LLVM rejects it.
pub(crate) fn assemble(source: &str) -> Vec<u8> {
    unsafe {
        let context = LLVMContextCreate();
        // The IR parser takes the buffer.
        let buffer = LLVMCreateMemoryBufferWithMemoryRangeCopy(
            source.as_ptr().cast(),
            source.len(),
            b"test.ll\0".as_ptr().cast(),
        );
        let mut module = ptr::null_mut();
        let mut message = ptr::null_mut();
        if LLVMParseIRInContext(context, buffer, &mut module, &mut message) != 0 {
            let message = take_message(message);
            LLVMContextDispose(context);
            panic!("test IR does not assemble: {message}");
        }
        let bitcode = LLVMWriteBitcodeToMemoryBuffer(module);
        let bytes = std::slice::from_raw_parts(
            LLVMGetBufferStart(bitcode).cast::<u8>(),
            LLVMGetBufferSize(bitcode),
        )
        .to_vec();
        LLVMDisposeMemoryBuffer(bitcode);
        LLVMDisposeModule(module);
        LLVMContextDispose(context);
        bytes
    }
}

/// `source` as `llvm-ir` reads it.
pub(crate) fn ir_module(source: &str) -> llvm_ir::Module {
    let mut staged = tempfile::Builder::new()
        .suffix(".bc")
        .tempfile()
        .unwrap();
    std::io::Write::write_all(&mut staged, &assemble(source)).unwrap();
    llvm_ir::Module::from_bc_path(staged.path()).unwrap()
}
