use criterion::{criterion_group, criterion_main, Criterion};
use rvasm::interpreter::{Interpreter, StepOutcome};
use rvasm::{parser, preprocessor};

const TESTCASES: &[(&str, &str)] = &[
    ("count_to_1000", "li a0, 0\nli a1, 1000\nloop: addi a0, a0, 1\nbne a0, a1, loop\n"),
    (
        "fibonacci_20",
        "li a0, 0\nli a1, 1\nli t0, 0\nli t1, 20\nloop: mv t2, a1\nadd a1, a0, a1\nmv a0, t2\naddi t0, t0, 1\nbne t0, t1, loop\n",
    ),
    (
        "memory_round_trip",
        ".macro store_and_load %addr %val\nli t0, %addr\nli t1, %val\nsw t1, 0(t0)\nlw t2, 0(t0)\n.end_macro\nli a0, 0\nli a1, 256\nloop: store_and_load 0 42\naddi a0, a0, 1\nbne a0, a1, loop\n",
    ),
];

fn criterion_benchmark(c: &mut Criterion) {
    for (name, source) in TESTCASES {
        c.bench_function(name, |b| {
            let preprocessed = preprocessor::preprocess(source).unwrap();
            let code = parser::parse_all(&preprocessed.lines).unwrap();

            b.iter(|| {
                let mut interp = Interpreter::new(code.clone(), preprocessed.labels.clone());
                while interp.step().unwrap() == StepOutcome::Continued {}
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
