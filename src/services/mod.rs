pub mod answer;
mod batch;
pub mod chunker;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod mcq_parser;
pub mod oracle;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use answer::{parse_mcq_answer, parse_shortqa_answer};
pub use batch::process_batch;
pub use chunker::{TextChunker, estimate_tokens};
pub use embedding::{Embedder, HttpEmbedder, OnnxEmbedder, create_embedder};
pub use index::{EmbeddingIndex, IndexHandle, IndexStatus};
pub use ingest::DocumentIngestor;
pub use mcq_parser::{parse_mcq_block, parse_mcq_input, split_batch};
pub use oracle::{AnswerOracle, OpenAiOracle};
pub use pipeline::{BatchAnswer, BatchOutcome, QaPipeline};
pub use prompt::{build_mcq_prompt, build_shortqa_prompt, with_context};
pub use retriever::Retriever;
pub use vector_store::{
    CollectionInfo, CollectionMeta, QdrantBackend, SqliteBackend, VectorStore, create_backend,
};
