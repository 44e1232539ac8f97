// SPDX-License-Identifier: BSD-3-Clause
mod timings;

pub use timings::StageTimings;
