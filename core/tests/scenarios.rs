//! End-to-end scenarios, built the way the teacher's own
//! `core/tests/success.rs` drives a program from source to a finished
//! machine state: construct a fixture, run it to completion (or the first
//! suspension point), then assert on the emitted command stream.

mod common;

use common::*;
use sketch_vm::{Command, FieldValue, Interpreter, InterpreterOptions, State};

fn tags(commands: &[Command]) -> Vec<&str> {
    commands.iter().map(|c| c.command_type()).collect()
}

/// S1: Blink.
#[test]
fn test_s1_blink() {
    let setup = func_def(
        "setup",
        vec![expr_stmt(call(ident("pinMode"), vec![int_lit(13), ident("OUTPUT")]))],
    );
    let loop_fn = func_def(
        "loop",
        vec![
            expr_stmt(call(ident("digitalWrite"), vec![int_lit(13), ident("HIGH")])),
            expr_stmt(call(ident("delay"), vec![int_lit(500)])),
            expr_stmt(call(ident("digitalWrite"), vec![int_lit(13), ident("LOW")])),
            expr_stmt(call(ident("delay"), vec![int_lit(500)])),
        ],
    );
    let ast = program(vec![setup, loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 2;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    let tag_list = tags(interp.commands());
    assert_eq!(tag_list[0], "VERSION_INFO");
    assert_eq!(tag_list[1], "PROGRAM_START");
    assert!(tag_list.contains(&"SETUP_START"));
    assert!(tag_list.contains(&"SETUP_END"));

    let pin_mode = interp
        .commands()
        .iter()
        .find(|c| c.command_type() == "PIN_MODE")
        .expect("pinMode should emit PIN_MODE");
    assert_eq!(pin_mode.field("pin"), Some(&FieldValue::Int(13)));
    assert_eq!(pin_mode.field("mode"), Some(&FieldValue::Int(1)));

    let digital_writes = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "DIGITAL_WRITE")
        .count();
    assert_eq!(digital_writes, 4); // HIGH + LOW, twice (2 loop iterations)

    let delays = interp.commands().iter().filter(|c| c.command_type() == "DELAY").count();
    assert_eq!(delays, 4);

    let loop_end_completes: Vec<_> = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "LOOP_END_COMPLETE")
        .collect();
    assert_eq!(loop_end_completes.len(), 2); // one per loop() iteration
    assert_eq!(
        loop_end_completes.last().unwrap().field("limitReached"),
        Some(&FieldValue::Bool(true))
    );

    let program_ends = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "PROGRAM_END")
        .count();
    assert_eq!(program_ends, 2);
    assert_eq!(interp.state(), State::Complete);
}

/// S2: analogRead suspension.
#[test]
fn test_s2_analog_read_suspension() {
    let setup = func_def(
        "setup",
        vec![expr_stmt(call(ident("analogRead"), vec![ident("A0")]))],
    );
    let loop_fn = func_def("loop", vec![]);
    let ast = program(vec![setup, loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 1;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    assert_eq!(interp.state(), State::WaitingForResponse);
    let request = interp
        .commands()
        .iter()
        .find(|c| c.command_type() == "ANALOG_READ_REQUEST")
        .expect("should suspend on an ANALOG_READ_REQUEST");
    assert_eq!(request.field("pin"), Some(&FieldValue::Int(36))); // A0
    assert!(!tags(interp.commands()).contains(&"SETUP_END"));

    let request_id = interp.pending_request_id().unwrap().to_string();
    interp.resume_with_value(&request_id, sketch_vm::Value::Int(512));

    assert!(tags(interp.commands()).contains(&"SETUP_END"));
    assert_eq!(interp.state(), State::Complete);
}

/// A `loop()` iteration that emits a command before suspending mid-body must
/// not re-emit its `LOOP_START(i)` when the resume replays the iteration
/// from the top: exactly one `LOOP_START`/closing tag pair per iteration.
#[test]
fn test_loop_start_not_duplicated_across_suspend() {
    let loop_fn = func_def(
        "loop",
        vec![
            expr_stmt(call(ident("digitalWrite"), vec![int_lit(13), ident("HIGH")])),
            expr_stmt(call(ident("analogRead"), vec![ident("A0")])),
        ],
    );
    let ast = program(vec![loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 1;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    assert_eq!(interp.state(), State::WaitingForResponse);
    // One "main" LOOP_START(0) plus one LOOP_START(1) for the iteration.
    let loop_starts = interp.commands().iter().filter(|c| c.command_type() == "LOOP_START").count();
    assert_eq!(loop_starts, 2, "should not duplicate LOOP_START(1) before suspending");

    let request_id = interp.pending_request_id().unwrap().to_string();
    interp.resume_with_value(&request_id, sketch_vm::Value::Int(512));

    let loop_starts_after = interp.commands().iter().filter(|c| c.command_type() == "LOOP_START").count();
    assert_eq!(loop_starts_after, 2, "resuming must not re-emit LOOP_START(1)");

    let loop_end_completes = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "LOOP_END_COMPLETE")
        .count();
    assert_eq!(loop_end_completes, 1);
    assert_eq!(interp.state(), State::Complete);
}

/// A `delay()` before a suspending request must advance the virtual clock
/// exactly once overall, even though the statements preceding the
/// suspension point are re-executed from the top on resume. Without
/// rewinding the clock/memory/allocator state to what it was on the first
/// attempt, the replayed `delay(100)` would advance it a second time.
#[test]
fn test_clock_not_double_advanced_across_suspend() {
    let setup = func_def(
        "setup",
        vec![
            expr_stmt(call(ident("delay"), vec![int_lit(100)])),
            expr_stmt(call(ident("analogRead"), vec![ident("A0")])),
            expr_stmt(call(ident("digitalWrite"), vec![int_lit(13), ident("HIGH")])),
        ],
    );
    let loop_fn = func_def("loop", vec![]);
    let ast = program(vec![setup, loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 1;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    assert_eq!(interp.state(), State::WaitingForResponse);
    let request_id = interp.pending_request_id().unwrap().to_string();
    interp.resume_with_value(&request_id, sketch_vm::Value::Int(512));

    let digital_write = interp
        .commands()
        .iter()
        .find(|c| c.command_type() == "DIGITAL_WRITE")
        .expect("digitalWrite should run after the resume completes setup()");
    // Had `delay(100)` re-applied its clock advance on replay, this would
    // read 200 instead of 100.
    assert_eq!(digital_write.timestamp(), 100);

    let delays = interp.commands().iter().filter(|c| c.command_type() == "DELAY").count();
    assert_eq!(delays, 1, "delay() must not be re-emitted on replay");
}

/// S3: Switch with fallthrough.
#[test]
fn test_s3_switch_fallthrough() {
    let setup = func_def(
        "setup",
        vec![
            var_decl("int", "x", Some(int_lit(2))),
            switch(
                ident("x"),
                vec![
                    case(Some(int_lit(1)), vec![]),
                    case(
                        Some(int_lit(2)),
                        vec![
                            expr_stmt(member_call("Serial", "println", vec![string_lit("b")])),
                            break_stmt(),
                        ],
                    ),
                    case(Some(int_lit(3)), vec![]),
                ],
            ),
        ],
    );
    let loop_fn = func_def("loop", vec![]);
    let ast = program(vec![setup, loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 1;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    let setup_tags: Vec<&str> = interp
        .commands()
        .iter()
        .skip_while(|c| c.command_type() != "SETUP_START")
        .skip(1)
        .take_while(|c| c.command_type() != "SETUP_END")
        .map(|c| c.command_type())
        .collect();
    assert_eq!(
        setup_tags,
        vec![
            "VAR_SET",
            "SWITCH_STATEMENT",
            "SWITCH_CASE",
            "SWITCH_CASE",
            "FUNCTION_CALL",
            "BREAK_STATEMENT",
        ]
    );
}

/// S4: Division by zero.
#[test]
fn test_s4_division_by_zero() {
    let setup = func_def(
        "setup",
        vec![var_decl("int", "y", Some(binary("/", int_lit(10), int_lit(0))))],
    );
    let loop_fn = func_def("loop", vec![]);
    let ast = program(vec![setup, loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 1;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    let error = interp
        .commands()
        .iter()
        .find(|c| c.command_type() == "ERROR")
        .expect("division by zero should emit ERROR");
    assert_eq!(
        error.field("errorType"),
        Some(&FieldValue::Str("DivisionByZero".to_string()))
    );

    let var_set = interp
        .commands()
        .iter()
        .find(|c| c.command_type() == "VAR_SET")
        .expect("declaration should still emit VAR_SET");
    assert_eq!(var_set.field("variable"), Some(&FieldValue::Str("y".to_string())));
    assert_eq!(var_set.field("value"), Some(&FieldValue::Void));
}

/// S5: Array bounds.
#[test]
fn test_s5_array_bounds() {
    let setup = func_def(
        "setup",
        vec![
            array_var_decl(
                "int",
                "a",
                vec![int_lit(3)],
                array_initializer(vec![int_lit(1), int_lit(2), int_lit(3)]),
            ),
            var_decl("int", "v", Some(array_access(ident("a"), int_lit(5)))),
        ],
    );
    let loop_fn = func_def("loop", vec![]);
    let ast = program(vec![setup, loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 1;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    let error = interp
        .commands()
        .iter()
        .find(|c| c.command_type() == "ERROR")
        .expect("out-of-bounds access should emit ERROR");
    assert_eq!(
        error.field("errorType"),
        Some(&FieldValue::Str("BoundsError".to_string()))
    );

    let var_set = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "VAR_SET")
        .last()
        .expect("v's declaration should still emit VAR_SET");
    assert_eq!(var_set.field("variable"), Some(&FieldValue::Str("v".to_string())));
}

/// S6: Iteration cap.
#[test]
fn test_s6_iteration_cap() {
    let loop_fn = func_def("loop", vec![]);
    let ast = program(vec![loop_fn]);
    let mut options = InterpreterOptions::default();
    options.max_loop_iterations = 3;
    let mut interp = Interpreter::from_ast(ast, options);
    interp.start();

    let loop_starts = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "LOOP_START")
        .count();
    assert_eq!(loop_starts, 4); // the initial "main" start + 3 iterations

    let loop_ends: Vec<_> = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "LOOP_END_COMPLETE")
        .collect();
    assert_eq!(loop_ends.len(), 3);
    assert_eq!(loop_ends[0].field("limitReached"), Some(&FieldValue::Bool(false)));
    assert_eq!(loop_ends[1].field("limitReached"), Some(&FieldValue::Bool(false)));
    assert_eq!(loop_ends[2].field("limitReached"), Some(&FieldValue::Bool(true)));

    let program_ends = interp
        .commands()
        .iter()
        .filter(|c| c.command_type() == "PROGRAM_END")
        .count();
    assert_eq!(program_ends, 2);
    assert_eq!(interp.state(), State::Complete);
}
