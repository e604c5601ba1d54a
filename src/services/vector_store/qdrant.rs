//! Qdrant vector store backend implementation.
//!
//! Collection metadata lives in a reserved point whose payload carries
//! `kind = "meta"`; searches exclude it.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, GetPointsBuilder, PointId,
    PointStruct, PointsIdsList, SearchPointsBuilder, SetPayloadPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use uuid::Uuid;

use super::{CollectionInfo, CollectionMeta, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{DocumentChunk, SearchResult, VectorStoreConfig};

const KIND_FIELD: &str = "kind";
const KIND_META: &str = "meta";
const KIND_CHUNK: &str = "chunk";
const COMPLETE_FIELD: &str = "complete";

fn meta_point_id() -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, b"textbook-qa:collection-meta").to_string()
}

fn string_field(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}

fn int_field(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(n)) => Some(*n),
        _ => None,
    })
}

fn bool_field(payload: &HashMap<String, Value>, key: &str) -> Option<bool> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::BoolValue(b)) => Some(*b),
        _ => None,
    })
}

pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
        })
    }

    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        if !self.collection_exists().await? {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
        let total = info.result.map_or(0, |r| r.points_count.unwrap_or(0));

        let meta = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![PointId::from(meta_point_id())])
                    .with_payload(true),
            )
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?
            .result
            .into_iter()
            .next();

        let Some(meta) = meta else {
            return Ok(Some(CollectionInfo {
                points_count: total,
                ..Default::default()
            }));
        };

        Ok(Some(CollectionInfo {
            points_count: total.saturating_sub(1),
            dimension: int_field(&meta.payload, "dimension").map(|d| d as u64),
            embedding_model: string_field(&meta.payload, "embedding_model"),
            source_checksum: string_field(&meta.payload, "source_checksum"),
            complete: bool_field(&meta.payload, COMPLETE_FIELD).unwrap_or(false),
        }))
    }

    async fn create_collection(&self, meta: &CollectionMeta) -> Result<(), VectorStoreError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection)
            .vectors_config(VectorParamsBuilder::new(meta.dimension, Distance::Cosine));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert(KIND_FIELD.to_string(), KIND_META.into());
        payload.insert(COMPLETE_FIELD.to_string(), false.into());
        payload.insert("dimension".to_string(), (meta.dimension as i64).into());
        payload.insert(
            "embedding_model".to_string(),
            meta.embedding_model.clone().into(),
        );
        if let Some(ref checksum) = meta.source_checksum {
            payload.insert("source_checksum".to_string(), checksum.clone().into());
        }

        // Cosine distance rejects zero vectors, so the marker gets a unit vector
        let mut vector = vec![0.0f32; meta.dimension as usize];
        if let Some(first) = vector.first_mut() {
            *first = 1.0;
        }

        self.client
            .upsert_points(
                UpsertPointsBuilder::new(
                    &self.collection,
                    vec![PointStruct::new(meta_point_id(), vector, payload)],
                )
                .wait(true),
            )
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn mark_complete(&self) -> Result<(), VectorStoreError> {
        if !self.collection_exists().await? {
            return Err(VectorStoreError::CollectionError(format!(
                "collection '{}' does not exist",
                self.collection
            )));
        }

        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert(COMPLETE_FIELD.to_string(), true.into());

        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(&self.collection, payload)
                    .points_selector(PointsIdsList {
                        ids: vec![PointId::from(meta_point_id())],
                    })
                    .wait(true),
            )
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn upsert_points(&self, chunks: Vec<DocumentChunk>) -> Result<(), VectorStoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = chunks
            .into_iter()
            .map(|chunk| {
                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert(KIND_FIELD.to_string(), KIND_CHUNK.into());
                payload.insert("document_id".to_string(), chunk.document_id.into());
                payload.insert(
                    "chunk_index".to_string(),
                    i64::from(chunk.chunk_index).into(),
                );
                payload.insert("content".to_string(), chunk.content.into());
                payload.insert(
                    "start_offset".to_string(),
                    (chunk.start_offset as i64).into(),
                );
                payload.insert("end_offset".to_string(), (chunk.end_offset as i64).into());
                payload.insert("checksum".to_string(), chunk.checksum.into());

                PointStruct::new(chunk.id, chunk.dense_vector, payload)
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        let filter = Filter::must_not([Condition::matches(KIND_FIELD, KIND_META.to_string())]);

        let mut search_builder = SearchPointsBuilder::new(&self.collection, query_vector, limit)
            .filter(filter)
            .with_payload(true);

        if let Some(score) = min_score {
            search_builder = search_builder.score_threshold(score);
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let search_results = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;

                let chunk_id = match point.id.and_then(|id| id.point_id_options) {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid,
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => {
                        num.to_string()
                    }
                    None => String::new(),
                };

                SearchResult {
                    chunk_id,
                    score: point.score,
                    content: string_field(&payload, "content").unwrap_or_default(),
                    chunk_index: int_field(&payload, "chunk_index").unwrap_or(0) as u32,
                    start_offset: int_field(&payload, "start_offset").unwrap_or(0) as u64,
                    end_offset: int_field(&payload, "end_offset").unwrap_or(0) as u64,
                }
            })
            .collect();

        Ok(search_results)
    }

    async fn delete_collection(&self) -> Result<(), VectorStoreError> {
        if !self.collection_exists().await? {
            return Ok(());
        }

        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_point_id_is_stable_uuid() {
        let id = meta_point_id();
        assert_eq!(id, meta_point_id());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_payload_field_helpers() {
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert("content".to_string(), "The heart".into());
        payload.insert("chunk_index".to_string(), 7i64.into());
        payload.insert(COMPLETE_FIELD.to_string(), true.into());

        assert_eq!(string_field(&payload, "content").as_deref(), Some("The heart"));
        assert_eq!(int_field(&payload, "chunk_index"), Some(7));
        assert_eq!(string_field(&payload, "chunk_index"), None);
        assert_eq!(int_field(&payload, "missing"), None);
        assert_eq!(bool_field(&payload, COMPLETE_FIELD), Some(true));
        assert_eq!(bool_field(&payload, "content"), None);
    }

    #[test]
    fn test_backend_from_config() {
        let backend = QdrantBackend::new(&VectorStoreConfig::default()).unwrap();
        assert_eq!(backend.collection(), crate::models::DEFAULT_COLLECTION);
    }
}
