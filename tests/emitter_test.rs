//! Integration tests for the DAG-to-IR emitter and the per-function lifter.

use bumpalo::Bump;
use liftdag::dag::NodeId;
use liftdag::ir::Value;
use liftdag::{parse_dags, DagEmitter, DiagnosticKind, LiftError, LiftOptions, LiftSession, Lifter, PowerPc64};
use std::collections::HashSet;
use std::fmt::Write;

const BUMP_X3: &str = "
function bump {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: i64 = Constant<4>
  t4: i64 = add t2, t3
  t5: ch = CopyToReg t2:1, t1, t4
  t6: ch = Ret t5
}
";

/// Lift `text` with `options`, returning the printed module and the session diagnostics.
fn lift_text(text: &str, options: LiftOptions) -> (String, Vec<liftdag::Diagnostic>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let target = PowerPc64::new();
    let mut dags = parse_dags(text, &target).unwrap();
    let arena = Bump::new();
    let session = LiftSession::new(&arena);
    let mut lifter = Lifter::new("test", &target, &session, options);
    lifter.lift_all(&mut dags).unwrap();
    let output = lifter.module().to_string();
    (output, session.diagnostics())
}

#[test]
fn test_register_increment_scenario() {
    let (output, diagnostics) = lift_text(BUMP_X3, LiftOptions::default());

    let expected = "\
define void @bump() {
entry:
  %X3 = alloca i64
  %X3_1 = load i64, ptr @X3
  store i64 %X3_1, ptr %X3
  br label %body

body:
  %X3_2 = load i64, ptr %X3
  %X3_3 = add i64 %X3_2, 4
  store i64 %X3_3, ptr %X3
  %X3_4 = load i64, ptr %X3
  store i64 %X3_4, ptr @X3
  ret void
}
";
    assert!(output.contains("@X3 = global i64 0"), "{output}");
    assert!(output.contains(expected), "{output}");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn test_register_round_trip_copy() {
    let text = "
function copy {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64 = Register %X4
  t3: i64,ch = CopyFromReg t0, t1
  t4: ch = CopyToReg t3:1, t2, t3
  t5: ch = Ret t4
}";
    let (output, _) = lift_text(text, LiftOptions::default());

    let entry = "\
entry:
  %X3 = alloca i64
  %X3_1 = load i64, ptr @X3
  store i64 %X3_1, ptr %X3
  %X4 = alloca i64
  %X4_1 = load i64, ptr @X4
  store i64 %X4_1, ptr %X4
  br label %body
";
    let body = "\
body:
  %X3_2 = load i64, ptr %X3
  store i64 %X3_2, ptr %X4
  %X3_3 = load i64, ptr %X3
  store i64 %X3_3, ptr @X3
  %X4_2 = load i64, ptr %X4
  store i64 %X4_2, ptr @X4
  ret void
";
    assert!(output.contains(entry), "{output}");
    assert!(output.contains(body), "{output}");
}

#[test]
fn test_emission_is_memoized() {
    let text = "
function shared {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: i64 = Constant<4>
  t4: i64 = add t2, t3
  t5: i64 = mul t4, t4
  t6: ch = CopyToReg t2:1, t1, t5
  t7: ch = Ret t6
}";
    let target = PowerPc64::new();
    let dags = parse_dags(text, &target).unwrap();
    let arena = Bump::new();
    let session = LiftSession::new(&arena);
    let mut module = liftdag::Module::new("m");
    let mut emitter = DagEmitter::new(&dags[0], &target, &mut module, &session, LiftOptions::default());

    let first = emitter.emit(NodeId(4)).unwrap();
    let count = emitter.function().num_insts();
    let second = emitter.emit(NodeId(4)).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(emitter.function().num_insts(), count);

    // The product of the shared add emits exactly one more instruction.
    let product = emitter.emit(NodeId(5)).unwrap();
    assert_eq!(emitter.function().num_insts(), count + 1);
    assert!(matches!(product, Some(Value::Inst(_))));

    // Side effects are produced once per node too.
    emitter.emit(NodeId(6)).unwrap();
    let after_store = emitter.function().num_insts();
    emitter.emit(NodeId(6)).unwrap();
    assert_eq!(emitter.function().num_insts(), after_store);
    assert!(emitter.context().cache.contains(NodeId(6)));
}

#[test]
fn test_unknown_opcode_leaves_a_gap() {
    let text = "
function partial {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64 = Register %X4
  t3: i64,ch = CopyFromReg t0, t1
  t4: i64 = ADD8 t3, t3
  t5: i64 = Constant<1>
  t6: i64 = add t3, t5
  t7: ch = CopyToReg t3:1, t2, t4
  t8: ch = CopyToReg t7, t1, t6
  t9: ch = Ret t8
}";
    let options = LiftOptions { run_selector: false, ..LiftOptions::default() };
    let (output, diagnostics) = lift_text(text, options);

    let unknown: Vec<_> = diagnostics.iter().filter(|d| d.kind == DiagnosticKind::UnknownOpcode).collect();
    assert_eq!(unknown.len(), 1, "{diagnostics:?}");
    assert_eq!(unknown[0].function.as_deref(), Some("partial"));
    assert!(diagnostics.iter().any(|d| d.kind == DiagnosticKind::MissingOperand));

    // Everything not depending on the unknown node is still there.
    assert!(output.contains("add i64 %X3_2, 1"), "{output}");
    assert!(output.contains("ptr %X3\n  %X3_"), "{output}");
    assert!(output.contains("ret void"), "{output}");
}

#[test]
fn test_names_are_unique_across_returns() {
    let text = "
function twice {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: i64 = Constant<0>
  t4: ch = CondCode<seteq>
  t5: ch = TargetAddress<0x2000>
  t6: ch = br_cc t2:1, t4, t2, t3, t5
  t7: ch = Ret t6
  t8: i64,ch = CopyFromReg t7, t1
  t9: i64 = add t8, t8
  t10: ch = CopyToReg t8:1, t1, t9
  t11: ch = Ret t10
}";
    let target = PowerPc64::new();
    let mut dags = parse_dags(text, &target).unwrap();
    let arena = Bump::new();
    let session = LiftSession::new(&arena);
    let mut lifter = Lifter::new("m", &target, &session, LiftOptions::default());
    lifter.lift_all(&mut dags).unwrap();

    let func = lifter.module().function("twice").unwrap();
    let names: Vec<&str> = func.insts().map(|(_, inst)| inst.name.as_str()).filter(|n| !n.is_empty()).collect();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(names.len(), unique.len(), "{names:?}");

    // entry, body, the fall-through of the compare, and the block after the first return
    assert_eq!(func.num_blocks(), 4);
    let returns = func.insts().filter(|(_, inst)| inst.is_return()).count();
    assert_eq!(returns, 2);

    let output = lifter.module().to_string();
    assert!(output.contains("icmp eq i64 %X3_2, 0"), "{output}");
    assert!(output.contains("label %addr_0x2000, label %bb1"), "{output}");
}

#[test]
fn test_malformed_constant_aborts_the_function() {
    let _ = env_logger::builder().is_test(true).try_init();
    let text = "
function good {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: ch = Ret t2:1
}
function bad {
  t0: ch = EntryToken
  t1: i64 = Constant
  t2: ch = Ret t0, t1
}";
    let target = PowerPc64::new();
    let mut dags = parse_dags(text, &target).unwrap();
    let arena = Bump::new();
    let session = LiftSession::new(&arena);
    let mut lifter = Lifter::new("m", &target, &session, LiftOptions::default());

    let err = lifter.lift_all(&mut dags).unwrap_err();
    assert_eq!(err, LiftError::MalformedConstant { node: NodeId(1) });
    assert!(lifter.module().function("good").is_some());
    assert!(lifter.module().function("bad").is_none());
    assert_eq!(session.stats().functions_lifted, 1);
}

#[test]
fn test_depth_limit() {
    let _ = env_logger::builder().is_test(true).try_init();
    let target = PowerPc64::new();
    let mut dags = parse_dags(BUMP_X3, &target).unwrap();
    let arena = Bump::new();
    let session = LiftSession::new(&arena);
    let options = LiftOptions { max_depth: 1, ..LiftOptions::default() };
    let mut lifter = Lifter::new("m", &target, &session, options);

    let err = lifter.lift_function(&mut dags[0]).unwrap_err();
    assert!(matches!(err, LiftError::DepthLimit { limit: 1, .. }), "{err}");
    assert!(lifter.module().functions().is_empty());
}

#[test]
fn test_narrow_memory_accesses() {
    let text = "
function narrow {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: i64,ch = load t2:1, t2 (load 2 sext)
  t4: ch = store t3:1, t3, t2 (store 1 trunc)
  t5: ch = Ret t4
}";
    let (output, diagnostics) = lift_text(text, LiftOptions::default());
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert!(output.contains("load i16, ptr"), "{output}");
    assert!(output.contains("sext i16"), "{output}");
    assert!(output.contains("trunc i64"), "{output}");
    assert!(output.contains("store i8"), "{output}");
}

#[test]
fn test_return_value_and_missing_mem_operand() {
    let text = "
function value {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: i32,ch = load t2:1, t2
  t4: ch = Ret t3:1, t3
}";
    let (output, diagnostics) = lift_text(text, LiftOptions::default());
    assert!(diagnostics.iter().any(|d| d.kind == DiagnosticKind::MissingMemOperand), "{diagnostics:?}");
    assert!(output.contains("load i32, ptr"), "{output}");
    assert!(output.contains("ret i32 %X3_"), "{output}");
}

#[test]
fn test_returns_sharing_a_chain_emit_side_effects_once() {
    let text = "
function shared_tail {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64 = Constant<7>
  t3: ch = CopyToReg t0, t1, t2
  t4: i64 = Constant<256>
  t5: ch = store t3, t2, t4 (store 8)
  t6: ch = Ret t5
  t7: ch = Ret t5
  root t7
}";
    let (output, diagnostics) = lift_text(text, LiftOptions::default());
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    assert_eq!(output.matches("store i64 7, ptr").count(), 2, "{output}");
    assert_eq!(output.matches("alloca").count(), 1, "{output}");
    assert_eq!(output.matches("ret void").count(), 2, "{output}");
    assert!(output.contains("bb1:\n  ret void\n"), "{output}");
}

/// `depth` chained adds on X3, written back and returned.
fn add_chain(depth: usize) -> String {
    let mut text = String::from(
        "function deep {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: i64 = Constant<1>
",
    );
    let mut last = 2;
    for id in 4..4 + depth {
        writeln!(text, "  t{id}: i64 = add t{last}, t3").unwrap();
        last = id;
    }
    let copy = 4 + depth;
    writeln!(text, "  t{copy}: ch = CopyToReg t2:1, t1, t{last}").unwrap();
    writeln!(text, "  t{}: ch = Ret t{copy}", copy + 1).unwrap();
    text.push_str("}\n");
    text
}

#[test]
fn test_deep_graph_within_default_limit() {
    let depth = 4000;
    let (output, diagnostics) = lift_text(&add_chain(depth), LiftOptions::default());
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(output.matches(" = add i64 ").count(), depth);
    assert!(output.contains("ret void"), "{output}");
}

#[test]
fn test_deep_graph_beyond_limit_is_an_error() {
    let _ = env_logger::builder().is_test(true).try_init();
    let target = PowerPc64::new();
    let mut dags = parse_dags(&add_chain(300), &target).unwrap();
    let arena = Bump::new();
    let session = LiftSession::new(&arena);
    let options = LiftOptions { max_depth: 100, ..LiftOptions::default() };
    let mut lifter = Lifter::new("m", &target, &session, options);

    let err = lifter.lift_function(&mut dags[0]).unwrap_err();
    assert!(matches!(err, LiftError::DepthLimit { limit: 100, .. }), "{err}");
    assert!(lifter.module().function("deep").is_none());
}
