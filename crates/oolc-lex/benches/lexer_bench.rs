use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oolc_lex::Lexer;

fn synthetic_program(classes: usize) -> String {
    let mut source = String::new();
    for i in 0..classes {
        source.push_str(&format!(
            "CLASS C{i} IS\n\
             | a counter class\n\
             n: Integer;\n\
             METHOD step(by: Integer): Integer IS\n\
             BEGIN\n\
             n := n + by; { bump }\n\
             RETURN n;\n\
             END METHOD\n\
             END CLASS\n"
        ));
    }
    source
}

fn bench_tokenize(c: &mut Criterion) {
    let small = synthetic_program(10);
    let large = synthetic_program(500);

    c.bench_function("tokenize_10_classes", |b| {
        b.iter(|| Lexer::tokenize(black_box(&small)).unwrap())
    });
    c.bench_function("tokenize_500_classes", |b| {
        b.iter(|| Lexer::tokenize(black_box(&large)).unwrap())
    });
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
