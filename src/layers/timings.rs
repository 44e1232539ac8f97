// SPDX-License-Identifier: BSD-3-Clause
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::{Id, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

#[derive(Debug, Default)]
struct Totals {
    time: Duration,
    entries: u64,
}

/// Accumulates wall time per span name. Clones share the totals, so one
/// clone can be installed in the subscriber and another kept to report.
#[derive(Clone, Debug, Default)]
pub struct StageTimings {
    totals: Arc<Mutex<FxHashMap<&'static str, Totals>>>,
}

impl StageTimings {
    /// One line per span name, slowest first.
    pub fn report(&self, w: &mut impl Write) -> io::Result<()> {
        let Ok(totals) = self.totals.lock() else {
            return Ok(());
        };
        let mut rows: Vec<_> = totals.iter().collect();
        rows.sort_by(|a, b| b.1.time.cmp(&a.1.time).then(a.0.cmp(b.0)));
        for (name, t) in rows {
            writeln!(w, "{name}: {} ns in {} entries", t.time.as_nanos(), t.entries)?;
        }
        Ok(())
    }
}

impl<S> Layer<S> for StageTimings
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().replace(Instant::now());
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(start) = span.extensions().get::<Instant>() {
                if let Ok(mut totals) = self.totals.lock() {
                    let t = totals.entry(span.name()).or_default();
                    t.time += start.elapsed();
                    t.entries += 1;
                }
            }
        }
    }
}
