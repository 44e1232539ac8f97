// SPDX-License-Identifier: BSD-3-Clause
//! LLVM's own view of a module, through the C API: parsing with the
//! context's diagnostics captured, the module's assembly text, and the
//! per-value facts the printer annotates lines with.

use std::ffi::{c_char, c_uint, c_void, CStr};
use std::marker::PhantomData;
use std::ptr;

use llvm_sys::bit_reader::{LLVMGetBitcodeModuleInContext2, LLVMParseBitcodeInContext2};
use llvm_sys::core::{
    LLVMContextCreate, LLVMContextDispose, LLVMContextSetDiagnosticHandler,
    LLVMCreateMemoryBufferWithMemoryRangeCopy, LLVMDisposeMemoryBuffer, LLVMDisposeMessage,
    LLVMDisposeModule, LLVMGetCalledValue, LLVMGetDiagInfoDescription, LLVMGetDiagInfoSeverity,
    LLVMGetFirstBasicBlock, LLVMGetFirstFunction, LLVMGetFirstGlobal, LLVMGetFirstGlobalAlias,
    LLVMGetFirstGlobalIFunc, LLVMGetFirstInstruction, LLVMGetMDNodeNumOperands,
    LLVMGetMDNodeOperands, LLVMGetMDString, LLVMGetModuleIdentifier, LLVMGetNextBasicBlock,
    LLVMGetNextFunction, LLVMGetNextGlobal, LLVMGetNextGlobalAlias, LLVMGetNextGlobalIFunc,
    LLVMGetNextInstruction, LLVMGetNumOperands, LLVMGetOperand, LLVMGetTypeKind,
    LLVMGetValueName2, LLVMIsACallInst, LLVMIsAMDNode, LLVMPrintModuleToString,
    LLVMPrintTypeToString, LLVMTypeOf,
};
use llvm_sys::debuginfo::{
    LLVMDILocationGetColumn, LLVMDILocationGetInlinedAt, LLVMDILocationGetLine,
    LLVMInstructionGetDebugLoc,
};
use llvm_sys::prelude::{LLVMContextRef, LLVMDiagnosticInfoRef, LLVMModuleRef, LLVMValueRef};
use llvm_sys::{LLVMDiagnosticSeverity, LLVMTypeKind};

use crate::annotate::SourceLocation;
use crate::diagnostic::Diagnostic;

/// Copy out and free a message LLVM allocated for the caller.
///
/// # Safety
///
/// `message` must be null or a string that is released with
/// `LLVMDisposeMessage`, and must not be used afterwards.
pub(crate) unsafe fn take_message(message: *mut c_char) -> String {
    if message.is_null() {
        return String::new();
    }
    let text = CStr::from_ptr(message).to_string_lossy().into_owned();
    LLVMDisposeMessage(message);
    text
}

/// Copy a string LLVM lent out as a pointer and a length.
///
/// # Safety
///
/// `data` must be null or valid for reads of `len` bytes.
unsafe fn lent_str(data: *const c_char, len: usize) -> String {
    if data.is_null() {
        return String::new();
    }
    let bytes = std::slice::from_raw_parts(data.cast::<u8>(), len);
    String::from_utf8_lossy(bytes).into_owned()
}

extern "C" fn collect_diagnostic(info: LLVMDiagnosticInfoRef, context: *mut c_void) {
    // SAFETY: `context` is the vector `LlvmModule::parse` registered along
    // with this handler; it outlives the parse and the handler is removed
    // before the vector is touched again.
    let diagnostics = unsafe { &mut *context.cast::<Vec<Diagnostic>>() };
    // SAFETY: `info` is live for the duration of the callback, and the
    // description is ours to free.
    let (severity, message) = unsafe {
        (
            LLVMGetDiagInfoSeverity(info),
            take_message(LLVMGetDiagInfoDescription(info)),
        )
    };
    diagnostics.push(match severity {
        LLVMDiagnosticSeverity::LLVMDSError => Diagnostic::error(message),
        LLVMDiagnosticSeverity::LLVMDSWarning => Diagnostic::warning(message),
        LLVMDiagnosticSeverity::LLVMDSRemark => Diagnostic::remark(message),
        LLVMDiagnosticSeverity::LLVMDSNote => Diagnostic::note(message),
    });
}

/// The outcome of [`LlvmModule::parse`]: the module, when LLVM accepted
/// the bytes, and everything LLVM reported while reading them.
pub struct Parsed {
    pub module: Option<LlvmModule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// An LLVM context and the one module parsed into it. Dropping it
/// disposes of both, module first.
pub struct LlvmModule {
    context: LLVMContextRef,
    module: LLVMModuleRef,
}

impl Drop for LlvmModule {
    fn drop(&mut self) {
        // SAFETY: both were created by `parse` and are owned by `self`.
        unsafe {
            if !self.module.is_null() {
                LLVMDisposeModule(self.module);
            }
            LLVMContextDispose(self.context);
        }
    }
}

impl LlvmModule {
    /// Parse single-module bitcode. The module's identifier becomes
    /// `identifier`. With `lazy`, only module-level data is read and
    /// function bodies stay materializable.
    ///
    /// LLVM's default diagnostic handler prints and exits on errors, so a
    /// handler that records diagnostics is installed for the parse.
    pub fn parse(bitcode: &[u8], identifier: &CStr, lazy: bool) -> Parsed {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut owner = LlvmModule {
            // SAFETY: no preconditions.
            context: unsafe { LLVMContextCreate() },
            module: ptr::null_mut(),
        };
        // SAFETY: the context is live; `diagnostics` stays in place until
        // the handler is removed below.
        let failed = unsafe {
            LLVMContextSetDiagnosticHandler(
                owner.context,
                Some(collect_diagnostic),
                (&mut diagnostics as *mut Vec<Diagnostic>).cast(),
            );
            let buffer = LLVMCreateMemoryBufferWithMemoryRangeCopy(
                bitcode.as_ptr().cast(),
                bitcode.len(),
                identifier.as_ptr(),
            );
            let failed = if lazy {
                // Takes the buffer, which the module reads from later.
                LLVMGetBitcodeModuleInContext2(owner.context, buffer, &mut owner.module)
            } else {
                let failed = LLVMParseBitcodeInContext2(owner.context, buffer, &mut owner.module);
                LLVMDisposeMemoryBuffer(buffer);
                failed
            };
            LLVMContextSetDiagnosticHandler(owner.context, None, ptr::null_mut());
            failed != 0
        };
        tracing::trace!(lazy, failed, diagnostics = diagnostics.len(), "parsed bitcode");
        let module = if failed || owner.module.is_null() {
            None
        } else {
            Some(owner)
        };
        Parsed {
            module,
            diagnostics,
        }
    }

    /// The name the module was loaded under (`; ModuleID`).
    pub fn identifier(&self) -> String {
        let mut len = 0;
        // SAFETY: the module is live; the identifier is lent for `len` bytes.
        unsafe { lent_str(LLVMGetModuleIdentifier(self.module, &mut len), len) }
    }

    /// The module in LLVM assembly, as `llvm-dis` writes it.
    pub fn print_to_string(&self) -> String {
        // SAFETY: the module is live; the text is ours to free.
        unsafe { take_message(LLVMPrintModuleToString(self.module)) }
    }

    fn collect(
        &self,
        first: unsafe extern "C" fn(LLVMModuleRef) -> LLVMValueRef,
        next: unsafe extern "C" fn(LLVMValueRef) -> LLVMValueRef,
    ) -> Vec<Value<'_>> {
        let mut values = Vec::new();
        // SAFETY: the module is live and the list is not modified.
        unsafe {
            let mut raw = first(self.module);
            while !raw.is_null() {
                values.push(Value::new(raw));
                raw = next(raw);
            }
        }
        values
    }

    /// Global variables, in printing order.
    pub fn global_variables(&self) -> Vec<Value<'_>> {
        self.collect(LLVMGetFirstGlobal, LLVMGetNextGlobal)
    }

    /// Aliases, then ifuncs: the lines printed after the global variables.
    pub fn indirect_symbols(&self) -> Vec<Value<'_>> {
        let mut symbols = self.collect(LLVMGetFirstGlobalAlias, LLVMGetNextGlobalAlias);
        symbols.extend(self.collect(LLVMGetFirstGlobalIFunc, LLVMGetNextGlobalIFunc));
        symbols
    }

    /// Definitions and declarations, in printing order.
    pub fn functions(&self) -> Vec<Value<'_>> {
        self.collect(LLVMGetFirstFunction, LLVMGetNextFunction)
    }
}

/// A value owned by an [`LlvmModule`].
#[derive(Clone, Copy, Debug)]
pub struct Value<'m> {
    raw: LLVMValueRef,
    module: PhantomData<&'m LlvmModule>,
}

impl<'m> Value<'m> {
    fn new(raw: LLVMValueRef) -> Self {
        Value {
            raw,
            module: PhantomData,
        }
    }

    pub fn name(&self) -> String {
        let mut len = 0;
        // SAFETY: the value is live; its name is lent for `len` bytes.
        unsafe { lent_str(LLVMGetValueName2(self.raw, &mut len), len) }
    }

    /// The value's type as LLVM spells it.
    pub fn type_name(&self) -> String {
        // SAFETY: the value is live; the text is ours to free.
        unsafe { take_message(LLVMPrintTypeToString(LLVMTypeOf(self.raw))) }
    }

    pub fn is_void(&self) -> bool {
        // SAFETY: the value is live.
        unsafe { LLVMGetTypeKind(LLVMTypeOf(self.raw)) == LLVMTypeKind::LLVMVoidTypeKind }
    }

    /// A function's instructions, terminators included, in block order.
    /// Empty for declarations and for bodies that were not materialized.
    pub fn instructions(&self) -> Vec<Value<'m>> {
        let mut instructions = Vec::new();
        // SAFETY: `self` is a live function; its blocks are not modified.
        unsafe {
            let mut block = LLVMGetFirstBasicBlock(self.raw);
            while !block.is_null() {
                let mut inst = LLVMGetFirstInstruction(block);
                while !inst.is_null() {
                    instructions.push(Value::new(inst));
                    inst = LLVMGetNextInstruction(inst);
                }
                block = LLVMGetNextBasicBlock(block);
            }
        }
        instructions
    }

    /// An instruction's `!dbg` location, with its whole inlined-at chain.
    pub fn debug_location(&self) -> Option<SourceLocation> {
        let mut chain = Vec::new();
        // SAFETY: `self` is a live instruction; locations are uniqued
        // metadata owned by the context.
        unsafe {
            let mut loc = LLVMInstructionGetDebugLoc(self.raw);
            while !loc.is_null() {
                chain.push((LLVMDILocationGetLine(loc), LLVMDILocationGetColumn(loc)));
                loc = LLVMDILocationGetInlinedAt(loc);
            }
        }
        chain.into_iter().rev().fold(None, |parent, (line, col)| {
            let loc = SourceLocation::new(line, col);
            Some(match parent {
                Some(parent) => loc.inlined_at(parent),
                None => loc,
            })
        })
    }

    /// For calls to `llvm.dbg.declare` and `llvm.dbg.value`, the name of
    /// the variable described. Empty when the descriptor has no name.
    pub fn debug_variable(&self) -> Option<String> {
        // SAFETY: `self` is a live instruction; operands are only read
        // within their counts.
        unsafe {
            if LLVMIsACallInst(self.raw).is_null() {
                return None;
            }
            let callee = LLVMGetCalledValue(self.raw);
            if callee.is_null() {
                return None;
            }
            let callee = Value::new(callee).name();
            if callee != "llvm.dbg.declare" && callee != "llvm.dbg.value" {
                return None;
            }
            if LLVMGetNumOperands(self.raw) < 2 {
                return Some(String::new());
            }
            Some(variable_name(LLVMGetOperand(self.raw, 1)))
        }
    }
}

/// Operand 1 of a `DILocalVariable` is its name.
///
/// # Safety
///
/// `variable` must be null or a live value.
unsafe fn variable_name(variable: LLVMValueRef) -> String {
    if variable.is_null() || LLVMIsAMDNode(variable).is_null() {
        return String::new();
    }
    let count = LLVMGetMDNodeNumOperands(variable) as usize;
    if count < 2 {
        return String::new();
    }
    let mut operands = vec![ptr::null_mut(); count];
    LLVMGetMDNodeOperands(variable, operands.as_mut_ptr());
    let name = operands[1];
    if name.is_null() {
        return String::new();
    }
    let mut len: c_uint = 0;
    let data = LLVMGetMDString(name, &mut len);
    lent_str(data, len as usize)
}
