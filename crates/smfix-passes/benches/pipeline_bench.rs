//! Pipeline benchmarks
//!
//! Run with: cargo bench -p smfix-passes

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smfix_core::{Lanes, Sequence};
use smfix_passes::{PassContext, PassPipeline, ShutoffPass, ToolRemapPass, SequencePass};
use smfix_settings::Config;

/// Layered two-tool print with progress markers and tower wipes
fn synthetic_gcode(layers: usize) -> String {
    let mut out = String::with_capacity(layers * 2048);
    let mut remaining = layers * 2;
    for layer in 0..layers {
        let tool = layer % 4;
        out.push_str(&format!(";LAYER_CHANGE\n;Z:{:.1}\n", 0.2 * (layer + 1) as f32));
        out.push_str(&format!("M73 P{} R{}\n", layer, remaining));
        out.push_str("; CP TOOLCHANGE START\n");
        out.push_str(&format!("M104 S150 T{} ; cooldown\n", (tool + 1) % 4));
        out.push_str(&format!("T{}\nM109 S210 T{}\n", tool, tool));
        out.push_str("; CP TOOLCHANGE WIPE\n");
        for i in 0..8 {
            out.push_str(&format!("G1 X{} Y10 E0.2 F1800\n", i * 5));
        }
        out.push_str("; CP TOOLCHANGE END\n");
        for i in 0..100 {
            out.push_str(&format!("G1 X{:.3} Y{:.3} E0.04512\n", i as f32 * 0.5, layer as f32));
        }
        remaining = remaining.saturating_sub(1);
        out.push_str(&format!("M73 P{} R{}\n", layer, remaining));
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let text = synthetic_gcode(200);
    c.bench_function("parse_sequence", |b| {
        b.iter(|| Sequence::parse(black_box(&text)))
    });
}

fn bench_parallel_passes(c: &mut Criterion) {
    let sequence = Sequence::parse(&synthetic_gcode(200)).unwrap();
    let mut group = c.benchmark_group("parallel_passes");
    for lanes in [1, 4] {
        let ctx = PassContext::new(Lanes::new(lanes));
        group.bench_function(format!("remap_{}_lanes", lanes), |b| {
            b.iter(|| ToolRemapPass::new().apply(black_box(sequence.clone()), &ctx))
        });
        group.bench_function(format!("shutoff_{}_lanes", lanes), |b| {
            b.iter(|| ShutoffPass::new().apply(black_box(sequence.clone()), &ctx))
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let sequence = Sequence::parse(&synthetic_gcode(200)).unwrap();
    let pipeline = PassPipeline::from_config(&Config::default());
    c.bench_function("full_pipeline", |b| {
        b.iter(|| pipeline.run(black_box(sequence.clone())))
    });
}

criterion_group!(benches, bench_parse, bench_parallel_passes, bench_full_pipeline);
criterion_main!(benches);
