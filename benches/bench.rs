use criterion::{black_box, criterion_group, criterion_main, Criterion};

use llvm_html::annotate::CommentWriter;
use llvm_html::bitcode::get_bitcode_file_contents;
use llvm_html::diagnostic::DiagnosticHandler;
use llvm_html::html::{inline_css, HtmlWriter, STYLESHEET};
use llvm_html::loader::{self, LoadOptions};

// ------------------------------------------------------------------
// Helpers

fn assemble(source: &str) -> Vec<u8> {
    use llvm_sys::bit_writer::LLVMWriteBitcodeToMemoryBuffer;
    use llvm_sys::core::*;
    use llvm_sys::ir_reader::LLVMParseIRInContext;

    unsafe {
        let context = LLVMContextCreate();
        let buffer = LLVMCreateMemoryBufferWithMemoryRangeCopy(
            source.as_ptr().cast(),
            source.len(),
            b"bench.ll\0".as_ptr().cast(),
        );
        let mut module = std::ptr::null_mut();
        let mut message = std::ptr::null_mut();
        assert_eq!(LLVMParseIRInContext(context, buffer, &mut module, &mut message), 0);
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

// ------------------------------------------------------------------

pub fn inline(c: &mut Criterion) {
    let mut body = String::from("<html>\n<head>\n<link rel=\"stylesheet\" href=\"\">\n</head>\n");
    for i in 0..10_000 {
        body.push_str(&format!("  %{i} = add i32 %a, %b\n"));
    }
    c.bench_function("inline_css", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(body.len() + STYLESHEET.len());
            inline_css(&mut out, black_box(&body), STYLESHEET).unwrap();
            out
        })
    });
}

pub fn container(c: &mut Criterion) {
    let bytes = assemble(include_str!("../tests/html/hello.ll"));
    c.bench_function("get_bitcode_file_contents(hello)", |b| {
        b.iter(|| {
            let contents = get_bitcode_file_contents(black_box(&bytes)).unwrap();
            contents.modules[0].lto_info().unwrap()
        })
    });
}

pub fn print_hello(c: &mut Criterion) {
    let bitcode = assemble(include_str!("../tests/html/hello.ll"));
    let mut handler = DiagnosticHandler::new("bench", Vec::new(), false);
    let loaded =
        loader::load(&bitcode, "hello.bc", &LoadOptions::default(), &mut handler).unwrap();
    c.bench_function("HtmlWriter::print(hello)", |b| {
        b.iter(|| {
            let mut body = String::new();
            let mut css = String::new();
            let mut comments = CommentWriter::new();
            HtmlWriter::new(black_box(&loaded), loaded.print_options(false))
                .print(&mut body, &mut css, "", Some(&mut comments))
                .unwrap();
            body
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = inline, container, print_hello
}
criterion_main!(benches);
