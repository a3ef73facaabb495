use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use odyssey::{EntityDef, Expr, FieldDef, JoinSpec, QueryCompiler, field, record};

const WIDE: EntityDef = EntityDef::new(
    "Wide",
    &[
        FieldDef::key("Id"),
        FieldDef::new("A"),
        FieldDef::new("B"),
        FieldDef::new("C"),
        FieldDef::new("D"),
        FieldDef::new("E"),
        FieldDef::new("F"),
        FieldDef::new("G"),
    ],
);

/// `(col0 = 0) AND (col1 = 1) AND ...`, nested left to right.
fn build_predicate(n: usize) -> Expr {
    (1..n).fold(field("col0").eq(0_i64), |acc, i| {
        acc.and(field(format!("col{i}")).eq(i as i64))
    })
}

fn bench_select_predicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("compiler/select_predicate");
    let compiler = QueryCompiler::default();

    for n in [1, 5, 10, 50, 100] {
        let predicate = build_predicate(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &predicate, |b, predicate| {
            b.iter(|| black_box(compiler.compile_select(&WIDE, None, Some(predicate), None)));
        });
    }

    group.finish();
}

fn bench_select_projection_and_joins(c: &mut Criterion) {
    let compiler = QueryCompiler::default();
    let projection = record([field("A"), field("B"), field("C")]);
    let joins = JoinSpec::new()
        .inner("Wide", "Other", "Id", "WideId")
        .left("Other", "Third", "Id", "OtherId");
    let predicate = build_predicate(5);

    c.bench_function("compiler/select_projection_and_joins", |b| {
        b.iter(|| {
            black_box(compiler.compile_select(
                &WIDE,
                Some(&projection),
                Some(&predicate),
                Some(&joins),
            ))
        });
    });
}

fn bench_writes(c: &mut Criterion) {
    let compiler = QueryCompiler::default();

    c.bench_function("compiler/insert", |b| {
        b.iter(|| black_box(compiler.compile_insert(&WIDE)));
    });
    c.bench_function("compiler/update", |b| {
        b.iter(|| black_box(compiler.compile_update(&WIDE)));
    });
    c.bench_function("compiler/delete", |b| {
        b.iter(|| black_box(compiler.compile_delete(&WIDE, 42_i64)));
    });
}

criterion_group!(
    benches,
    bench_select_predicate,
    bench_select_projection_and_joins,
    bench_writes
);
criterion_main!(benches);
