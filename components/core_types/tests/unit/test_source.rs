//! Unit tests for SourcePosition

use core_types::SourcePosition;

#[test]
fn test_start_position() {
    let pos = SourcePosition::start();
    assert_eq!((pos.line, pos.column, pos.offset), (1, 1, 0));
}

#[test]
fn test_default_is_zeroed() {
    let pos = SourcePosition::default();
    assert_eq!((pos.line, pos.column, pos.offset), (0, 0, 0));
}

#[test]
fn test_positions_compare_by_value() {
    let a = SourcePosition {
        line: 3,
        column: 4,
        offset: 20,
    };
    let b = a;
    assert_eq!(a, b);
    assert_eq!(b.to_string(), "line 3, column 4");
}
