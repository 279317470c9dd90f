#![no_main]

use libfuzzer_sys::fuzz_target;
use resumable::{Program, Runtime};

/// Node kinds that can spin forever; the interpreter has no step budget
const LOOPING_NODES: [&str; 5] = [
    "WhileStatement",
    "DoWhileStatement",
    "ForStatement",
    "ForOfStatement",
    "LabeledStatement",
];

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    if source.len() > 10_000 {
        return;
    }

    // Loading must never panic, whatever the document looks like
    let Ok(program) = Program::from_json(source) else {
        return;
    };

    if LOOPING_NODES.iter().any(|kind| source.contains(kind)) {
        return;
    }

    // Errors are expected; panics are not
    let mut runtime = Runtime::new();
    let _ = runtime.eval(program);
});
