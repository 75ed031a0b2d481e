//! Driver binary: parses flags, primes the traversal engine at a stopped
//! frame, drains it to exhaustion, and writes the resulting graph to disk.
//!
//! This crate ships no FFI binding to a real debugger (: out of
//! scope); that binding is an external collaborator a concrete deployment
//! supplies by constructing its own [`memoracle::debugger::DebugFrame`].
//! Lacking one, this driver demonstrates the full pipeline against the
//! in-memory [`memoracle::debugger::synthetic`] backend, the same one the
//! engine's own tests run against.

use std::cell::Cell;
use std::process::ExitCode as ProcessExitCode;
use std::rc::Rc;

use clap::Parser;
use log::{error, info};

use memoracle::allocation::{
    shared_tracker, AllocatorEntryBreakpoint, AllocatorReturnBreakpoint,
    DeallocatorEntryBreakpoint, Trigger,
};
use memoracle::config::Config;
use memoracle::debugger::synthetic::{frame_handle, World, X86_64};
use memoracle::engine::Engine;
use memoracle::error::ExitCode;

fn main() -> ProcessExitCode {
    env_logger::init();
    let config = Config::parse();

    match run(&config) {
        Ok(code) => to_process_exit_code(code),
        Err(err) => {
            error!("traversal failed: {err}");
            let code = if err.is_recoverable() {
                ExitCode::NoSymbolsOrFrame
            } else {
                ExitCode::DebuggerSessionFailed
            };
            to_process_exit_code(code)
        }
    }
}

fn run(config: &Config) -> Result<ExitCode, memoracle::Error> {
    if let Some(location) = &config.breakpoint {
        info!("breakpoint requested at `{location}` (synthetic demo ignores location)");
    }

    let world = World::new();
    let x = world.new_int(42);
    let pointee = world.new_int(7);
    let p = world.new_pointer(World::int_type(), Some(pointee));

    // Model a heap-tracked array: the allocator breakpoints fire exactly as
    // a real backend's would, recording `base -> byte-size` before the
    // array's own elements are ever written at that address.
    let tracker = shared_tracker();
    let base = world.reserve();
    let heap_elems = vec![world.new_int(10), world.new_int(20), world.new_int(30)];
    let elem_size = World::int_type().sizeof();
    simulate_allocation(&tracker, base, heap_elems.len() as u64 * elem_size);
    world.new_heap_array_at(base, World::int_type(), heap_elems);
    let h = world.new_pointer(World::int_type(), Some(base));

    if config.track_deallocations {
        info!("--track-deallocations set: purging the heap block before traversal");
        let mut dealloc = DeallocatorEntryBreakpoint::new(Rc::clone(&tracker));
        dealloc.trigger(&X86_64::new().with_register("rdi", base));
    }

    let iterations = config.iterations.max(1);
    for hit in 1..=iterations {
        if hit < iterations {
            info!("breakpoint hit {hit}/{iterations}; continuing to the next hit");
        } else {
            info!("breakpoint hit {hit}/{iterations}; stopping to traverse");
        }
    }

    let frame = world.frame(
        0x7000,
        0x8000,
        Some("main"),
        None,
        vec![("x", x), ("p", p), ("h", h)],
    );

    let mut engine = Engine::new(Rc::clone(&tracker));
    engine.prime(frame_handle(frame))?;
    let vertex_count = engine.run()?;

    info!(
        "traversal complete: {vertex_count} vertices, {} edges",
        engine.graph().edge_count()
    );

    match engine.graph().save(&config.output) {
        Ok(()) => {
            info!("graph written to {}", config.output.display());
            Ok(ExitCode::Success)
        }
        Err(err) => {
            error!("failed to write graph: {err}");
            Ok(ExitCode::IoError)
        }
    }
}

fn to_process_exit_code(code: ExitCode) -> ProcessExitCode {
    ProcessExitCode::from(u8::try_from(i32::from(code)).unwrap_or(255))
}

/// Drive the entry/return breakpoint pair exactly as a stopped inferior
/// would: entry observes the requested size, return observes the returned
/// address, and the tracker only learns the pairing once both have fired.
fn simulate_allocation(tracker: &memoracle::allocation::SharedTracker, address: u64, size: u64) {
    let pending = Rc::new(Cell::new(None));
    let mut entry = AllocatorEntryBreakpoint::new(Rc::clone(&pending));
    let mut ret = AllocatorReturnBreakpoint::new(Rc::clone(tracker), pending);
    entry.trigger(&X86_64::new().with_register("rdi", size));
    ret.trigger(&X86_64::new().with_register("rax", address));
}
