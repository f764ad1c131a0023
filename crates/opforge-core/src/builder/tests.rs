//! Tests for the operation builder.

use super::*;
use crate::operation::Arity;

fn builder() -> Builder {
    Builder::new(Arc::new(OperationSet::new()))
}

fn long(n: i64) -> Constant {
    Constant::Long(n)
}

fn publish_ok(mut b: Builder) -> Program {
    b.publish().expect("publish should succeed")
}

#[test]
fn test_builder_new() {
    let b = builder();
    assert!(b.open_frames().is_empty());
    assert_eq!(b.scope_depth(), 0);
    assert!(!b.is_published());
    assert!(!b.is_aborted());
}

#[test]
fn test_publish_single_constant() {
    let mut b = builder();
    b.emit_constant(long(42)).unwrap();
    let program = publish_ok(b);
    assert_eq!(program.body(), &[Operation::Constant(long(42))]);
}

#[test]
fn test_publish_empty_fails() {
    let mut b = builder();
    assert_eq!(b.publish().unwrap_err(), BuildError::EmptyProgram);
}

#[test]
fn test_block_with_local() {
    let mut b = builder();
    b.begin_block().unwrap();
    let x = b.create_local().unwrap();
    b.begin_store_local(x).unwrap();
    b.emit_constant(long(1)).unwrap();
    b.end_store_local().unwrap();
    b.emit_load_local(x).unwrap();
    b.end_block().unwrap();

    let program = publish_ok(b);
    assert_eq!(program.local_count(), 1);
    assert_eq!(program.slots()[0].depth, 1);
    assert_eq!(
        program.body(),
        &[Operation::Block(vec![
            Operation::StoreLocal {
                slot: x,
                value: Box::new(Operation::Constant(long(1))),
            },
            Operation::LoadLocal(x),
        ])]
    );
}

#[test]
fn test_open_frames_reports_stack() {
    let mut b = builder();
    b.begin_block().unwrap();
    b.begin_while().unwrap();
    b.begin_tag(Tag::Statement).unwrap();
    assert_eq!(
        b.open_frames(),
        vec![OperationKind::Block, OperationKind::While, OperationKind::Tag]
    );
}

#[test]
fn test_mismatched_end() {
    let mut b = builder();
    b.begin_block().unwrap();
    b.begin_conditional().unwrap();
    let err = b.end_block().unwrap_err();
    assert_eq!(
        err,
        BuildError::Mismatch {
            open: OperationKind::Conditional,
            closing: OperationKind::Block,
        }
    );
    assert!(b.is_aborted());
}

#[test]
fn test_end_without_begin() {
    let mut b = builder();
    assert_eq!(
        b.end_while().unwrap_err(),
        BuildError::UnexpectedEnd {
            closing: OperationKind::While
        }
    );
}

#[test]
fn test_aborted_builder_refuses_work() {
    let mut b = builder();
    b.end_block().unwrap_err();
    assert_eq!(b.emit_constant(long(1)), Err(BuildError::Aborted));
    assert_eq!(b.publish().unwrap_err(), BuildError::Aborted);
}

#[test]
fn test_publish_with_open_frames() {
    let mut b = builder();
    b.begin_block().unwrap();
    b.begin_if_then().unwrap();
    assert_eq!(
        b.publish().unwrap_err(),
        BuildError::UnclosedFrames {
            open: vec![OperationKind::Block, OperationKind::IfThen]
        }
    );
}

#[test]
fn test_mutation_after_publish() {
    let mut b = builder();
    b.emit_constant(Constant::Null).unwrap();
    b.publish().unwrap();
    assert!(b.is_published());
    assert_eq!(b.begin_block(), Err(BuildError::Published));
    assert_eq!(b.publish().unwrap_err(), BuildError::Published);
}

#[test]
fn test_conditional_child_count() {
    let mut b = builder();
    b.begin_conditional().unwrap();
    b.emit_constant(Constant::Bool(true)).unwrap();
    b.emit_constant(long(1)).unwrap();
    assert_eq!(
        b.end_conditional(),
        Err(BuildError::ChildCount {
            kind: OperationKind::Conditional,
            expected: Arity::Fixed(3),
            found: 2,
        })
    );
}

#[test]
fn test_if_then_else() {
    let mut b = builder();
    b.begin_if_then_else().unwrap();
    b.emit_constant(Constant::Bool(false)).unwrap();
    b.emit_constant(long(1)).unwrap();
    b.emit_constant(long(2)).unwrap();
    b.end_if_then_else().unwrap();
    let program = publish_ok(b);
    assert!(matches!(program.body()[0], Operation::IfThenElse { .. }));
}

#[test]
fn test_local_used_after_block_exit() {
    let mut b = builder();
    b.begin_block().unwrap();
    let x = b.create_local().unwrap();
    b.end_block().unwrap();
    assert_eq!(
        b.emit_load_local(x),
        Err(BuildError::LocalOutOfScope { slot: x })
    );
}

#[test]
fn test_sibling_blocks_get_distinct_slots() {
    let mut b = builder();
    b.begin_block().unwrap();
    let first = b.create_local().unwrap();
    b.end_block().unwrap();
    b.begin_block().unwrap();
    let second = b.create_local().unwrap();
    b.end_block().unwrap();
    assert_ne!(first, second);
    assert_eq!(publish_ok(b).local_count(), 2);
}

#[test]
fn test_store_to_dead_local_fails() {
    let mut b = builder();
    b.begin_block().unwrap();
    let x = b.create_local().unwrap();
    b.end_block().unwrap();
    assert_eq!(
        b.begin_store_local(x),
        Err(BuildError::LocalOutOfScope { slot: x })
    );
}

// ============================================================================
// Labels
// ============================================================================

#[test]
fn test_forward_branch() {
    let mut b = builder();
    b.begin_block().unwrap();
    let done = b.create_label().unwrap();
    b.emit_branch(done).unwrap();
    b.emit_constant(long(1)).unwrap();
    b.emit_label(done).unwrap();
    b.end_block().unwrap();

    let program = publish_ok(b);
    let position = program.labels().position(done).unwrap();
    assert_eq!(position.index, 2);
}

#[test]
fn test_backward_branch() {
    let mut b = builder();
    let top = b.create_label().unwrap();
    b.emit_label(top).unwrap();
    b.emit_branch(top).unwrap();
    let program = publish_ok(b);
    assert_eq!(
        program.labels().position(top),
        Some(LabelPosition {
            container: FrameId::ROOT,
            index: 0
        })
    );
}

#[test]
fn test_unbound_label_fails_publish() {
    let mut b = builder();
    let label = b.create_label().unwrap();
    b.emit_branch(label).unwrap();
    assert_eq!(
        b.publish().unwrap_err(),
        BuildError::UnboundLabel {
            label,
            origin: None
        }
    );
}

#[test]
fn test_unused_unbound_label_fails_publish() {
    let mut b = builder();
    b.emit_constant(Constant::Null).unwrap();
    let label = b.create_label().unwrap();
    assert!(matches!(
        b.publish(),
        Err(BuildError::UnboundLabel { label: l, .. }) if l == label
    ));
}

#[test]
fn test_unbound_label_origin_from_source_section() {
    let mut b = builder();
    b.begin_source_section(17).unwrap();
    let label = b.create_label().unwrap();
    b.emit_constant(Constant::Null).unwrap();
    b.end_source_section(4).unwrap();
    assert_eq!(
        b.publish().unwrap_err(),
        BuildError::UnboundLabel {
            label,
            origin: Some(17)
        }
    );
}

#[test]
fn test_double_emit_fails_immediately() {
    let mut b = builder();
    let label = b.create_label().unwrap();
    b.emit_label(label).unwrap();
    assert_eq!(
        b.emit_label(label),
        Err(BuildError::LabelAlreadyBound { label })
    );
    assert!(b.is_aborted());
}

#[test]
fn test_label_outside_sequence() {
    let mut b = builder();
    let label = b.create_label().unwrap();
    b.begin_while().unwrap();
    assert_eq!(
        b.emit_label(label),
        Err(BuildError::LabelOutsideSequence {
            label,
            container: OperationKind::While
        })
    );
}

#[test]
fn test_branch_into_sibling_block_fails() {
    let mut b = builder();
    let label = b.create_label().unwrap();
    b.begin_block().unwrap();
    b.emit_branch(label).unwrap();
    b.end_block().unwrap();
    b.begin_block().unwrap();
    b.emit_label(label).unwrap();
    b.end_block().unwrap();
    assert_eq!(
        b.publish().unwrap_err(),
        BuildError::BranchOutOfScope { label }
    );
}

#[test]
fn test_loop_labels_shape() {
    let mut b = builder();
    let continue_label = b.create_label().unwrap();
    let break_label = b.create_label().unwrap();
    b.begin_tag(Tag::Statement).unwrap();
    b.emit_label(continue_label).unwrap();
    b.begin_while().unwrap();
    b.emit_constant(Constant::Bool(true)).unwrap();
    b.begin_block().unwrap();
    b.emit_branch(break_label).unwrap();
    b.emit_branch(continue_label).unwrap();
    b.end_block().unwrap();
    b.end_while().unwrap();
    b.emit_label(break_label).unwrap();
    b.end_tag().unwrap();

    let program = publish_ok(b);
    assert_eq!(program.labels().len(), 2);
    assert_eq!(program.labels().position(break_label).unwrap().index, 2);
}

#[test]
fn test_foreign_label_rejected() {
    let mut other = builder();
    other.create_label().unwrap();
    let foreign = other.create_label().unwrap();

    let mut b = builder();
    assert_eq!(
        b.emit_branch(foreign),
        Err(BuildError::UnknownLabel { label: foreign })
    );
}

// ============================================================================
// Source sections, tags and custom operations
// ============================================================================

#[test]
fn test_source_sections_record_spans() {
    let mut b = builder();
    b.begin_source_section(0).unwrap();
    b.begin_source_section(2).unwrap();
    b.emit_constant(long(1)).unwrap();
    b.end_source_section(3).unwrap();
    b.end_source_section(10).unwrap();

    let program = publish_ok(b);
    assert_eq!(program.spans(), &[Span::new(2, 3), Span::new(0, 10)]);
}

#[test]
fn test_custom_operation_arity() {
    let mut set = OperationSet::new();
    let add = set.define("Add", Arity::Fixed(2)).unwrap();
    let mut b = Builder::new(Arc::new(set));
    b.begin_custom(add).unwrap();
    b.emit_constant(long(1)).unwrap();
    assert_eq!(
        b.end_custom(add),
        Err(BuildError::ChildCount {
            kind: OperationKind::Custom("Add".into()),
            expected: Arity::Fixed(2),
            found: 1,
        })
    );
}

#[test]
fn test_custom_operation_mismatch() {
    let mut set = OperationSet::new();
    let add = set.define("Add", Arity::Fixed(2)).unwrap();
    let not = set.define("Not", Arity::Fixed(1)).unwrap();
    let mut b = Builder::new(Arc::new(set));
    b.begin_custom(add).unwrap();
    assert_eq!(
        b.end_custom(not),
        Err(BuildError::Mismatch {
            open: OperationKind::Custom("Add".into()),
            closing: OperationKind::Custom("Not".into()),
        })
    );
}

#[test]
fn test_unknown_custom_operation() {
    let mut b = builder();
    let id = CustomOpId(3);
    assert_eq!(
        b.begin_custom(id),
        Err(BuildError::UnknownOperation { id })
    );
}

#[test]
fn test_tag_region_is_transparent_sequence() {
    let mut b = builder();
    b.begin_tag(Tag::Expression).unwrap();
    b.emit_constant(long(1)).unwrap();
    b.emit_constant(long(2)).unwrap();
    b.end_tag().unwrap();
    let program = publish_ok(b);
    assert_eq!(program.body()[0].sequence().map(<[_]>::len), Some(2));
}

#[test]
fn test_argument_count_tracks_highest_index() {
    let mut b = builder();
    b.emit_load_argument(2).unwrap();
    b.emit_load_argument(0).unwrap();
    assert_eq!(publish_ok(b).argument_count(), 3);
}
