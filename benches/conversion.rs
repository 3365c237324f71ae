//! Benchmarks for the conversion pipeline.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use tempfile::TempDir;

use folio::math::{SymbolTable, resolve};
use folio::render::FixedRenderer;
use folio::{HtmlConfig, LatexConfig, convert_html, convert_latex, parse_document};

const THESIS: &str = include_str!("../tests/fixtures/thesis.xml");

// ============================================================================
// Math Resolver Benchmarks
// ============================================================================

fn bench_resolve_text(c: &mut Criterion) {
    let symbols = SymbolTable::standard();
    c.bench_function("resolve_text", |b| {
        b.iter(|| resolve(black_box(r"\alpha_{i}^{2} + \mathbf{v}_{j} \leq \sum x_k"), symbols));
    });
}

fn bench_resolve_fallback(c: &mut Criterion) {
    let symbols = SymbolTable::standard();
    c.bench_function("resolve_fallback", |b| {
        b.iter(|| resolve(black_box(r"\frac{1}{\sqrt{1 - v^2/c^2}}"), symbols));
    });
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_document", |b| {
        b.iter(|| parse_document(black_box(THESIS)).unwrap());
    });
}

fn bench_convert_html(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let config = HtmlConfig::new(tmp.path());
    let renderer = FixedRenderer::svg();
    c.bench_function("convert_html", |b| {
        b.iter(|| convert_html(black_box(THESIS), &config, &renderer).unwrap());
    });
}

fn bench_convert_latex(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let config = LatexConfig {
        image_dir: tmp.path().join("images"),
        ..LatexConfig::default()
    };
    let renderer = FixedRenderer::new(&b"%PDF-1.5"[..]);
    c.bench_function("convert_latex", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(8 * 1024);
            convert_latex(black_box(THESIS), &mut out, &config, &renderer).unwrap();
            out
        });
    });
}

criterion_group!(
    benches,
    bench_resolve_text,
    bench_resolve_fallback,
    bench_parse,
    bench_convert_html,
    bench_convert_latex,
);

criterion_main!(benches);
