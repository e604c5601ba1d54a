use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use textbook_qa::models::Document;
use textbook_qa::services::{
    TextChunker, parse_mcq_answer, parse_mcq_block, parse_mcq_input, split_batch,
};

fn batch_text(n: usize) -> String {
    (1..=n)
        .map(|i| {
            format!(
                "{i}. Which organ pumps blood around the body?\nA. Liver\nB. Heart\nC. Lung\nD. Kidney"
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn mcq_parsing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcq_parsing");

    let single = "Which organ pumps blood? A. Liver B. Heart C. Lung D. Kidney";
    group.bench_function("single_line", |b| {
        b.iter(|| parse_mcq_input(black_box(single)))
    });

    let multi = "Which organ pumps blood?\nA. Liver\nB. Heart\nC. Lung\nD. Kidney";
    group.bench_function("multi_line", |b| b.iter(|| parse_mcq_input(black_box(multi))));

    let batch = batch_text(50);
    group.throughput(Throughput::Bytes(batch.len() as u64));
    group.bench_function("batch_50", |b| {
        b.iter(|| {
            split_batch(black_box(&batch))
                .iter()
                .map(|block| parse_mcq_block(block))
                .filter(Result::is_ok)
                .count()
        })
    });

    group.finish();
}

fn answer_parsing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("answer_parsing");

    group.bench_function("letter", |b| {
        b.iter(|| parse_mcq_answer(black_box("B. The heart pumps blood.")))
    });
    group.bench_function("unparsed", |b| {
        b.iter(|| parse_mcq_answer(black_box("I am not sure about this one.")))
    });

    group.finish();
}

fn chunking_benchmark(c: &mut Criterion) {
    let content = "The heart is a muscular organ that pumps blood through the body. ".repeat(2000);
    let document = Document::new(
        content.clone(),
        std::path::Path::new("book.txt"),
        "bench".to_string(),
        Default::default(),
    );
    let chunker = TextChunker::with_defaults();

    let mut group = c.benchmark_group("chunking");
    group.throughput(Throughput::Bytes(content.len() as u64));
    group.bench_function("chunk_document", |b| b.iter(|| chunker.chunk(black_box(&document))));
    group.finish();
}

criterion_group!(
    benches,
    mcq_parsing_benchmark,
    answer_parsing_benchmark,
    chunking_benchmark
);
criterion_main!(benches);
