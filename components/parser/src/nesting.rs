//! Nesting limits.
//!
//! The parser and every tree walk over its output recurse once per level of
//! nesting, so deeply nested input is rejected with a parse error before it
//! can exhaust the native stack. Two depths are tracked per thread:
//! - the number of nested windows and statements being parsed right now
//! - the deepest tree level reached below the current window, which the
//!   reducer reports for every expression it builds

use core_types::{JsError, JsResult, SourcePosition};
use std::cell::Cell;

/// Windows, groups and statements that may be open at once.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Depth of the deepest expression tree the parser will build.
pub const MAX_EXPRESSION_DEPTH: usize = 1000;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static REACHED: Cell<usize> = const { Cell::new(0) };
}

fn too_deep(position: SourcePosition) -> JsError {
    JsError::parse("Maximum nesting depth exceeded", position)
}

/// One open level; closing it is tied to the guard's lifetime.
#[must_use]
pub(crate) struct Level(());

impl Drop for Level {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Open a nesting level for the construct starting at `position`.
pub(crate) fn enter(position: SourcePosition) -> JsResult<Level> {
    let depth = DEPTH.with(|depth| {
        let next = depth.get() + 1;
        depth.set(next);
        next
    });
    let level = Level(());
    if depth > MAX_NESTING_DEPTH {
        return Err(too_deep(position));
    }
    REACHED.with(|reached| reached.set(reached.get().max(depth)));
    Ok(level)
}

/// Record a tree `relative` levels below the current window.
pub(crate) fn reach(relative: usize, position: SourcePosition) -> JsResult<()> {
    let absolute = DEPTH.with(Cell::get) + relative;
    if absolute > MAX_EXPRESSION_DEPTH {
        return Err(too_deep(position));
    }
    REACHED.with(|reached| reached.set(reached.get().max(absolute)));
    Ok(())
}

/// Start measuring how deep the next construct goes. Pass the returned
/// mark to [`since`].
pub(crate) fn mark() -> usize {
    let depth = DEPTH.with(Cell::get);
    REACHED.with(|reached| reached.replace(depth))
}

/// Levels below the current window reached since `mark`.
pub(crate) fn since(mark: usize) -> usize {
    let depth = DEPTH.with(Cell::get);
    let reached = REACHED.with(|reached| {
        let value = reached.get();
        reached.set(value.max(mark));
        value
    });
    reached.saturating_sub(depth)
}
