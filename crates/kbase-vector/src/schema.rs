use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const COL_ID: &str = "id";
pub const COL_CONTENT: &str = "content";
pub const COL_SOURCE: &str = "source";
pub const COL_META: &str = "meta";
pub const COL_WRITTEN_AT: &str = "written_at";
pub const COL_VECTOR: &str = "vector";
/// Added by LanceDB to vector search results.
pub const COL_DISTANCE: &str = "_distance";

/// One row per chunk. `meta` holds the full metadata map as JSON.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(COL_ID, DataType::Utf8, false),
        Field::new(COL_CONTENT, DataType::Utf8, false),
        Field::new(COL_SOURCE, DataType::Utf8, false),
        Field::new(COL_META, DataType::Utf8, false),
        Field::new(COL_WRITTEN_AT, DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new(COL_VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
