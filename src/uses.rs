// SPDX-License-Identifier: BSD-3-Clause
//! Use counting. `llvm-ir` has no use lists, so they are rebuilt from
//! operands: every operand slot of an instruction, terminator or constant
//! user is one use of the value it names.
//!
//! Constant expressions are uniqued in LLVM, so a constant expression
//! that appears in several places is a single user of its operands. Such
//! expressions are keyed by their structure and their operands are counted
//! once.
//!
//! `llvm-ir` does not expose the operands of `landingpad` clauses or of
//! `blockaddress` constants, so values used only there count zero uses.

use either::Either;
use llvm_ir::{Constant, Function, Instruction, Module, Name, Operand, Terminator};
use rustc_hash::{FxHashMap, FxHashSet};

/// Uses of module-level values (global variables, aliases, functions).
#[derive(Debug, Default)]
pub struct GlobalUses<'m> {
    counts: FxHashMap<&'m str, usize>,
    constant_users: FxHashSet<String>,
}

impl<'m> GlobalUses<'m> {
    /// Count uses in `module`. Without `bodies`, uses inside function
    /// bodies are not counted, matching a module whose bodies were never
    /// materialized.
    pub fn new(module: &'m Module, bodies: bool) -> Self {
        let mut uses = GlobalUses::default();
        for global in &module.global_vars {
            if let Some(init) = &global.initializer {
                uses.constant_operand(init);
            }
        }
        for alias in &module.global_aliases {
            uses.constant_operand(&alias.aliasee);
        }
        let functions = if bodies { &module.functions[..] } else { &[] };
        for function in functions {
            for block in &function.basic_blocks {
                for instr in &block.instrs {
                    instruction_operands(instr, |op| uses.operand(op));
                }
                terminator_operands(&block.term, |op| uses.operand(op));
            }
        }
        uses
    }

    pub fn get(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    fn operand(&mut self, op: &'m Operand) {
        if let Operand::ConstantOperand(c) = op {
            self.constant_operand(c);
        }
    }

    /// `c` fills one operand slot of some user.
    fn constant_operand(&mut self, c: &'m Constant) {
        if let Constant::GlobalReference { name, .. } = c {
            *self.counts.entry(name.as_str()).or_default() += 1;
            return;
        }
        let mut children = Vec::new();
        constant_operands(c, &mut children);
        if children.is_empty() {
            return;
        }
        if self.constant_users.insert(format!("{:?}", c)) {
            for child in children {
                self.constant_operand(child);
            }
        }
    }
}

/// The constant operands of a constant user.
fn constant_operands<'m>(c: &'m Constant, out: &mut Vec<&'m Constant>) {
    use Constant::*;
    match c {
        Struct { values, .. } => out.extend(values.iter().map(|v| &**v)),
        Array { elements, .. } => out.extend(elements.iter().map(|e| &**e)),
        Vector(elements) => out.extend(elements.iter().map(|e| &**e)),
        GetElementPtr(gep) => {
            out.push(&gep.address);
            out.extend(gep.indices.iter().map(|i| &**i));
        }
        Add(op) => out.extend([&*op.operand0, &*op.operand1]),
        Sub(op) => out.extend([&*op.operand0, &*op.operand1]),
        Mul(op) => out.extend([&*op.operand0, &*op.operand1]),
        UDiv(op) => out.extend([&*op.operand0, &*op.operand1]),
        SDiv(op) => out.extend([&*op.operand0, &*op.operand1]),
        URem(op) => out.extend([&*op.operand0, &*op.operand1]),
        SRem(op) => out.extend([&*op.operand0, &*op.operand1]),
        And(op) => out.extend([&*op.operand0, &*op.operand1]),
        Or(op) => out.extend([&*op.operand0, &*op.operand1]),
        Xor(op) => out.extend([&*op.operand0, &*op.operand1]),
        Shl(op) => out.extend([&*op.operand0, &*op.operand1]),
        LShr(op) => out.extend([&*op.operand0, &*op.operand1]),
        AShr(op) => out.extend([&*op.operand0, &*op.operand1]),
        FAdd(op) => out.extend([&*op.operand0, &*op.operand1]),
        FSub(op) => out.extend([&*op.operand0, &*op.operand1]),
        FMul(op) => out.extend([&*op.operand0, &*op.operand1]),
        FDiv(op) => out.extend([&*op.operand0, &*op.operand1]),
        FRem(op) => out.extend([&*op.operand0, &*op.operand1]),
        ICmp(cmp) => out.extend([&*cmp.operand0, &*cmp.operand1]),
        FCmp(cmp) => out.extend([&*cmp.operand0, &*cmp.operand1]),
        Trunc(cast) => out.push(&cast.operand),
        ZExt(cast) => out.push(&cast.operand),
        SExt(cast) => out.push(&cast.operand),
        FPTrunc(cast) => out.push(&cast.operand),
        FPExt(cast) => out.push(&cast.operand),
        FPToUI(cast) => out.push(&cast.operand),
        FPToSI(cast) => out.push(&cast.operand),
        UIToFP(cast) => out.push(&cast.operand),
        SIToFP(cast) => out.push(&cast.operand),
        PtrToInt(cast) => out.push(&cast.operand),
        IntToPtr(cast) => out.push(&cast.operand),
        BitCast(cast) => out.push(&cast.operand),
        AddrSpaceCast(cast) => out.push(&cast.operand),
        ExtractElement(e) => out.extend([&*e.vector, &*e.index]),
        InsertElement(e) => out.extend([&*e.vector, &*e.element, &*e.index]),
        // The mask is not an operand.
        ShuffleVector(s) => out.extend([&*s.operand0, &*s.operand1]),
        ExtractValue(e) => out.push(&e.aggregate),
        InsertValue(e) => out.extend([&*e.aggregate, &*e.element]),
        Select(select) => out.extend([
            &*select.condition,
            &*select.true_value,
            &*select.false_value,
        ]),
        Int { .. }
        | Float(_)
        | Null(_)
        | AggregateZero(_)
        | Undef(_)
        | Poison(_)
        | BlockAddress
        | GlobalReference { .. }
        | TokenNone => {}
    }
}

/// Uses of a function's parameters and instruction results.
#[derive(Debug, Default)]
pub struct LocalUses<'f> {
    counts: FxHashMap<&'f Name, usize>,
}

impl<'f> LocalUses<'f> {
    pub fn new(function: &'f Function) -> Self {
        let mut counts: FxHashMap<&'f Name, usize> = FxHashMap::default();
        let mut count = |op: &'f Operand| {
            if let Operand::LocalOperand { name, .. } = op {
                *counts.entry(name).or_default() += 1;
            }
        };
        for block in &function.basic_blocks {
            for instr in &block.instrs {
                instruction_operands(instr, &mut count);
            }
            terminator_operands(&block.term, &mut count);
        }
        LocalUses { counts }
    }

    pub fn get(&self, name: &Name) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

/// Inline assembly callees are not values.
fn callee<A>(function: &Either<A, Operand>) -> Option<&Operand> {
    match function {
        Either::Left(_asm) => None,
        Either::Right(op) => Some(op),
    }
}

/// Calls `f` once per value operand of `instr`, in operand order.
pub(crate) fn instruction_operands<'a>(instr: &'a Instruction, mut f: impl FnMut(&'a Operand)) {
    use Instruction::*;
    match instr {
        Add(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        Sub(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        Mul(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        UDiv(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        SDiv(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        URem(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        SRem(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        And(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        Or(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        Xor(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        Shl(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        LShr(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        AShr(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        FAdd(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        FSub(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        FMul(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        FDiv(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        FRem(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        ICmp(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        FCmp(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        FNeg(i) => f(&i.operand),
        Freeze(i) => f(&i.operand),
        Trunc(i) => f(&i.operand),
        ZExt(i) => f(&i.operand),
        SExt(i) => f(&i.operand),
        FPTrunc(i) => f(&i.operand),
        FPExt(i) => f(&i.operand),
        FPToUI(i) => f(&i.operand),
        FPToSI(i) => f(&i.operand),
        UIToFP(i) => f(&i.operand),
        SIToFP(i) => f(&i.operand),
        PtrToInt(i) => f(&i.operand),
        IntToPtr(i) => f(&i.operand),
        BitCast(i) => f(&i.operand),
        AddrSpaceCast(i) => f(&i.operand),
        ExtractElement(i) => [&i.vector, &i.index].into_iter().for_each(f),
        InsertElement(i) => [&i.vector, &i.element, &i.index].into_iter().for_each(f),
        ShuffleVector(i) => [&i.operand0, &i.operand1].into_iter().for_each(f),
        ExtractValue(i) => f(&i.aggregate),
        InsertValue(i) => [&i.aggregate, &i.element].into_iter().for_each(f),
        Alloca(i) => f(&i.num_elements),
        Load(i) => f(&i.address),
        Store(i) => [&i.value, &i.address].into_iter().for_each(f),
        CmpXchg(i) => [&i.address, &i.expected, &i.replacement]
            .into_iter()
            .for_each(f),
        AtomicRMW(i) => [&i.address, &i.value].into_iter().for_each(f),
        GetElementPtr(i) => {
            f(&i.address);
            i.indices.iter().for_each(f);
        }
        Phi(i) => i.incoming_values.iter().map(|(op, _)| op).for_each(f),
        Select(i) => [&i.condition, &i.true_value, &i.false_value]
            .into_iter()
            .for_each(f),
        VAArg(i) => f(&i.arg_list),
        Call(call) => {
            call.arguments.iter().map(|(op, _)| op).for_each(&mut f);
            if let Some(op) = callee(&call.function) {
                f(op);
            }
        }
        CatchPad(pad) => {
            f(&pad.catch_switch);
            pad.args.iter().for_each(f);
        }
        CleanupPad(pad) => {
            f(&pad.parent_pad);
            pad.args.iter().for_each(f);
        }
        Fence(_) | LandingPad(_) => {}
    }
}

/// Calls `f` once per value operand of `term`.
pub(crate) fn terminator_operands<'a>(term: &'a Terminator, mut f: impl FnMut(&'a Operand)) {
    match term {
        Terminator::Ret(ret) => ret.return_operand.iter().for_each(f),
        Terminator::CondBr(br) => f(&br.condition),
        Terminator::Switch(switch) => f(&switch.operand),
        Terminator::IndirectBr(br) => f(&br.operand),
        Terminator::Resume(resume) => f(&resume.operand),
        Terminator::Invoke(invoke) => {
            invoke.arguments.iter().map(|(op, _)| op).for_each(&mut f);
            if let Some(op) = callee(&invoke.function) {
                f(op);
            }
        }
        Terminator::CallBr(call) => {
            call.arguments.iter().map(|(op, _)| op).for_each(&mut f);
            if let Some(op) = callee(&call.function) {
                f(op);
            }
        }
        Terminator::CleanupRet(ret) => f(&ret.cleanup_pad),
        Terminator::CatchRet(ret) => f(&ret.catch_pad),
        Terminator::CatchSwitch(switch) => f(&switch.parent_pad),
        Terminator::Br(_) | Terminator::Unreachable(_) => {}
    }
}
