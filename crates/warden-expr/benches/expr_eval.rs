// SPDX-License-Identifier: MIT OR Apache-2.0
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use warden_expr::{Expr, FunctionMap, MapScope};

const MATCHER: &str = "r_sub == p_sub && r_obj == p_obj && r_act == p_act";

// ---------------------------------------------------------------------------
// compile vs evaluate
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_acl_matcher", |b| {
        b.iter(|| Expr::parse(black_box(MATCHER)));
    });
}

fn bench_eval(c: &mut Criterion) {
    let expr = Expr::parse(MATCHER).unwrap();
    let fm = FunctionMap::new();
    let mut scope = MapScope::new(&fm);
    scope
        .set("r_sub", "alice")
        .set("r_obj", "data1")
        .set("r_act", "read")
        .set("p_sub", "alice")
        .set("p_obj", "data1")
        .set("p_act", "read");

    c.bench_function("eval_acl_matcher", |b| {
        b.iter(|| expr.matches(black_box(&scope)));
    });
}

criterion_group!(benches, bench_parse, bench_eval);
criterion_main!(benches);
