// SPDX-License-Identifier: BSD-3-Clause
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use tracing_flame::{FlameLayer, FlushGuard};
use tracing_subscriber::{fmt, prelude::*};

use llvm_html::cli;
use llvm_html::diagnostic::{ColorMode, DiagnosticHandler, FatalDiagnostic};
use llvm_html::driver;
use llvm_html::layers::StageTimings;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn setup_global_subscriber(
    flame: Option<&Path>,
    timings: StageTimings,
) -> Result<Option<FlushGuard<BufWriter<File>>>> {
    let filter_layer = tracing::level_filters::LevelFilter::TRACE;
    let fmt_layer = fmt::Layer::default().with_writer(io::stderr);
    let (flame_layer, guard) = match flame {
        Some(path) => {
            let (layer, guard) = FlameLayer::with_file(path)
                .with_context(|| format!("couldn't create {}", path.display()))?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(flame_layer)
        .with(timings)
        .init();
    Ok(guard)
}

fn main() -> ExitCode {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = cli::Args::parse();

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    let colors = ColorMode::from(&args.color).should_use_colors(io::stderr().is_terminal());
    let mut handler = DiagnosticHandler::new(program, io::stderr(), colors);

    let timings = StageTimings::default();
    let _guard = if args.tracing {
        match setup_global_subscriber(args.flame.as_deref(), timings.clone()) {
            Ok(guard) => guard,
            Err(e) => {
                handler.error(format!("{e:#}"));
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let result = driver::run(&args.options(), &mut handler);

    if args.tracing {
        if let Err(e) = timings.report(&mut io::stderr().lock()) {
            handler.warning(format!("could not write stage timings: {e}"));
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Fatal diagnostics were printed when they were raised.
            if e.downcast_ref::<FatalDiagnostic>().is_none() {
                handler.error(format!("{e:#}"));
            }
            ExitCode::FAILURE
        }
    }
}
