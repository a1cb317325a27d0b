//! SQL Generation Benchmarks
//!
//! Measures predicate rendering and binding collection for typical queries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_orm::{Predicate, QueryBuilder};

fn bench_basic_sql_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic_sql_generation");

    group.bench_function("simple_select", |b| {
        let query = QueryBuilder::table("users").select("id, name, email");

        b.iter(|| black_box(query.to_sql()))
    });

    group.bench_function("select_with_where", |b| {
        let query = QueryBuilder::table("users")
            .select("id, name, email")
            .where_eq("role", "admin")
            .where_gt("created_at", "2024-01-01")
            .where_null("deleted_at");

        b.iter(|| black_box(query.compile()))
    });

    group.bench_function("select_with_joins", |b| {
        let query = QueryBuilder::table("credit_transactions")
            .select("credit_transactions.id, users.email, plans.slug")
            .join("users", "users.id", "credit_transactions.user_id")
            .left_join("plans", "plans.id", "credit_transactions.plan_id")
            .where_in("credit_transactions.type", ["purchase", "gift"])
            .order_by_desc("credit_transactions.created_at")
            .limit(50);

        b.iter(|| black_box(query.compile()))
    });

    group.finish();
}

fn bench_grouped_predicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouped_predicates");

    for size in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("or_groups", size), &size, |b, &size| {
            let query = QueryBuilder::table("users").filters((0..size).map(|i| {
                Predicate::group(vec![
                    Predicate::eq("role", format!("role_{}", i)),
                    Predicate::like("email", format!("%{}@example.com", i)).or(),
                ])
            }));

            b.iter(|| black_box(query.compile()))
        });
    }

    group.finish();
}

fn bench_aggregate_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregates");

    group.bench_function("count_with_filters", |b| {
        let query = QueryBuilder::table("users")
            .where_eq("role", "member")
            .where_between("id", 100, 200)
            .order_by_asc("id")
            .for_page(3, 25);

        b.iter(|| black_box(query.compile_count()))
    });

    group.bench_function("grouped_totals", |b| {
        let query = QueryBuilder::table("credit_transactions")
            .select("type")
            .select_raw("SUM(amount) AS total")
            .where_eq("user_id", 7)
            .group_by("type")
            .having_raw("SUM(amount) > ?", vec![0.into()]);

        b.iter(|| black_box(query.compile()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_basic_sql_generation,
    bench_grouped_predicates,
    bench_aggregate_compilation
);
criterion_main!(benches);
