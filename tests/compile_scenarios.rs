use pretty_assertions::assert_eq;
use webscript_lang::ast::{AtomicValue, ContainsValue};
use webscript_lang::error::{CompileError, ExternalDiagnostic};
use webscript_lang::ir::{ConditionalOp, FilterConditional, FilterOpType, HTMLType, Operation, PropertyDetail};
use webscript_lang::{compile, parse_to_ast};

#[test]
fn single_target_single_instruction() {
    let ir = compile(
        r#"targets = [A: "u1"] A: { extract where tag "div" -> out; }"#,
        "s1",
    )
    .expect("compiles");

    assert_eq!(ir.instruction_list.len(), 1);
    let instruction = &ir.instruction_list[0];
    assert_eq!(instruction.url, "u1");
    assert_eq!(instruction.alias, "A");
    assert_eq!(instruction.operations.len(), 1);

    let Operation::Filter(op) = &instruction.operations[0];
    assert_eq!(op.from_alias, "");
    assert_eq!(op.to_alias, "out");
    assert!(matches!(op.optype, FilterOpType::ExtractWhere));
    match &op.condition {
        FilterConditional::Operator { op: ConditionalOp::Any, constraints } => {
            assert_eq!(constraints.len(), 1);
            match &constraints[0] {
                FilterConditional::Property(property) => {
                    assert!(matches!(property.htype, HTMLType::Tag));
                    assert_eq!(
                        property.detail,
                        PropertyDetail::Value(AtomicValue::Values(vec!["div".to_string()]))
                    );
                }
                other => panic!("expected a property leaf, got {other:?}"),
            }
        }
        other => panic!("expected an any-wrapped condition, got {other:?}"),
    }
}

#[test]
fn instruction_order_follows_target_declaration_order() {
    let ir = compile(
        r#"targets = [A: "u1", B: "u2"]
           B: { extract where tag "div" -> out_b; }
           A: { extract where tag "p" -> out_a; }"#,
        "s2",
    )
    .expect("compiles");

    let aliases: Vec<_> = ir.instruction_list.iter().map(|i| i.alias.as_str()).collect();
    assert_eq!(aliases, vec!["A", "B"]);
}

#[test]
fn and_not_composition_preserves_shape() {
    let ir = compile(
        r#"targets = [A: "u1"]
           A: { extract where tag "div" and not attribute "class":"ad" -> x; }"#,
        "s3",
    )
    .expect("compiles");

    let Operation::Filter(op) = &ir.instruction_list[0].operations[0];
    match &op.condition {
        FilterConditional::Operator { op: ConditionalOp::And, constraints } => {
            assert_eq!(constraints.len(), 2);
            assert!(matches!(constraints[0], FilterConditional::Property(_)));
            match &constraints[1] {
                FilterConditional::Operator { op: ConditionalOp::Not, constraints } => {
                    assert_eq!(constraints.len(), 1);
                }
                other => panic!("expected a not node, got {other:?}"),
            }
        }
        other => panic!("expected an and node, got {other:?}"),
    }
}

#[test]
fn text_contains_list_is_normalized() {
    let ir = compile(
        r#"targets = [A: "u1"]
           A: { extract where text contains ["foo","bar"] -> t; }"#,
        "s4",
    )
    .expect("compiles");

    let Operation::Filter(op) = &ir.instruction_list[0].operations[0];
    match &op.condition {
        FilterConditional::Operator { op: ConditionalOp::Any, constraints } => match &constraints[0] {
            FilterConditional::Property(property) => {
                assert!(matches!(property.htype, HTMLType::Text));
                assert_eq!(
                    property.detail,
                    PropertyDetail::Value(AtomicValue::Contains(ContainsValue::Many(vec![
                        "foo".to_string(),
                        "bar".to_string()
                    ])))
                );
            }
            other => panic!("expected a property leaf, got {other:?}"),
        },
        other => panic!("expected an any-wrapped condition, got {other:?}"),
    }
}

#[test]
fn extract_from_where_mixed_attribute_pairs() {
    let ir = compile(
        r#"targets = [A: "u1"]
           A: { extract from prev where attribute ["k1":"v1","k2": contains "v2"] -> y; }"#,
        "s5",
    )
    .expect("compiles");

    let Operation::Filter(op) = &ir.instruction_list[0].operations[0];
    assert_eq!(op.from_alias, "prev");
    assert!(matches!(op.optype, FilterOpType::ExtractFromWhere));

    match &op.condition {
        FilterConditional::Operator { op: ConditionalOp::Any, constraints } => match &constraints[0] {
            FilterConditional::Property(property) => match &property.detail {
                PropertyDetail::Attributes(pairs) => {
                    assert_eq!(pairs.len(), 2);
                    assert_eq!(pairs[0].key.as_deref(), Some("k1"));
                    assert_eq!(pairs[1].key.as_deref(), Some("k2"));
                }
                other => panic!("expected attribute detail, got {other:?}"),
            },
            other => panic!("expected a property leaf, got {other:?}"),
        },
        other => panic!("expected an any-wrapped condition, got {other:?}"),
    }
}

#[test]
fn duplicate_target_lists_are_rejected_before_any_ir_is_produced() {
    let err = parse_to_ast(
        r#"targets = [A: "u1"]
           targets = [B: "u2"]"#,
    )
    .unwrap_err();

    match err {
        CompileError::External(ExternalDiagnostic::MultipleTargetListDefinitions { kept, rejected }) => {
            assert!(kept.contains("A"));
            assert_eq!(rejected.len(), 1);
        }
        other => panic!("expected MultipleTargetListDefinitions, got {other:?}"),
    }
}
