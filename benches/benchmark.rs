use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use siftrule::notation::parse;
use siftrule::{Rule, RuleSet};

fn dispatch_table() -> RuleSet {
    let extensions = ["js", "mjs", "ts", "css", "scss", "html", "svg", "png", "jpg", "json", "md", "rs"];
    let text = extensions
        .iter()
        .map(|ext| format!("{{filename: /\\.{ext}$/i, size: {{$lt: 1024 * 1024}}}} --> {ext}"))
        .collect::<Vec<_>>()
        .join(";\n");
    text.parse().unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let rules = dispatch_table();
    let last = parse("{filename: 'main.RS', size: 2048}").unwrap();
    let none = parse("{filename: 'Makefile', size: 2048}").unwrap();
    c.bench_function("first_apply last of 12", |b| b.iter(|| rules.first_apply(black_box(&last)).unwrap()));
    c.bench_function("first_apply no match", |b| b.iter(|| rules.first_apply(black_box(&none)).unwrap()));

    let references: RuleSet = "{max: {$gte: {$ref: '/min'}}} --> ordered".parse().unwrap();
    let record = parse("{min: 3, max: 5}").unwrap();
    c.bench_function("first_apply with $ref", |b| b.iter(|| references.first_apply(black_box(&record)).unwrap()));

    let text = "{filename: /\\.js$/, size: {$lt: 60 * 1024}, tags: {$in: [web, 'api']}} --> 0xFF #== scripts";
    c.bench_function("parse rule text", |b| {
        b.iter(|| Rule::from_text(black_box(text)).unwrap())
    });
    c.bench_function("stringify literal", |b| b.iter(|| black_box(&last).to_string()));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
