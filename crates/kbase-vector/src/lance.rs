use std::collections::BTreeSet;
use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use kbase_core::error::{Error, Result};
use kbase_core::traits::VectorIndex;
use kbase_core::types::{IndexEntry, Meta, Namespace, ScoredEntry, META_SOURCE};

use crate::schema::{build_chunk_schema, COL_CONTENT, COL_DISTANCE, COL_META};
use crate::table::{namespace_of, open_db, table_name};

/// LanceDB-backed index, one table per namespace, cosine distance.
///
/// Exposes a blocking API over its own tokio runtime; do not call it from
/// inside another async runtime.
pub struct LanceIndex {
    db: Connection,
    table_prefix: String,
    runtime: Runtime,
}

impl LanceIndex {
    /// Connect to `uri` and verify the database answers a table listing.
    pub fn open(uri: &str, table_prefix: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(Error::store)?;
        let db = runtime.block_on(open_db(uri)).map_err(Error::store)?;
        let tables = runtime.block_on(db.table_names().execute()).map_err(Error::store)?;
        info!(uri, tables = tables.len(), "opened LanceDB index");
        Ok(Self { db, table_prefix: table_prefix.to_string(), runtime })
    }

    async fn open_table(&self, namespace: &Namespace) -> Result<Option<Table>> {
        let name = table_name(&self.table_prefix, namespace);
        let names = self.db.table_names().execute().await.map_err(Error::store)?;
        if !names.contains(&name) {
            return Ok(None);
        }
        let table = self.db.open_table(&name).execute().await.map_err(Error::store)?;
        Ok(Some(table))
    }

    async fn write_async(&self, namespace: &Namespace, entries: Vec<IndexEntry>) -> Result<()> {
        let Some(first) = entries.first() else { return Ok(()) };
        let dim = first.vector.len();
        if dim == 0 || entries.iter().any(|e| e.vector.len() != dim) {
            return Err(Error::store("all vectors in a write must share one non-zero dimension"));
        }
        let dim = i32::try_from(dim).map_err(Error::store)?;
        let batch = entries_to_record_batch(namespace, &entries, dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        match self.open_table(namespace).await? {
            Some(table) => {
                table.add(reader).execute().await.map_err(Error::store)?;
            }
            None => {
                let name = table_name(&self.table_prefix, namespace);
                self.db.create_table(&name, reader).execute().await.map_err(Error::store)?;
            }
        }
        debug!(namespace = %namespace, rows = entries.len(), "wrote rows");
        Ok(())
    }

    async fn query_async(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<ScoredEntry>> {
        let Some(table) = self.open_table(namespace).await? else { return Ok(Vec::new()) };
        if table.count_rows(None).await.map_err(Error::store)? == 0 {
            return Ok(Vec::new());
        }
        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(Error::store)?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(Error::store)?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
            out.extend(record_batch_to_entries(&batch)?);
        }
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        out.truncate(k);
        Ok(out)
    }

    async fn delete_all_async(&self, namespace: &Namespace) -> Result<()> {
        if let Some(table) = self.open_table(namespace).await? {
            table.delete("true").await.map_err(Error::store)?;
            info!(namespace = %namespace, "deleted all rows");
        }
        Ok(())
    }

    async fn describe_partitions_async(&self) -> Result<BTreeSet<Namespace>> {
        let names = self.db.table_names().execute().await.map_err(Error::store)?;
        let mut out = BTreeSet::new();
        for name in names {
            let Some(namespace) = namespace_of(&self.table_prefix, &name) else { continue };
            let table = self.db.open_table(&name).execute().await.map_err(Error::store)?;
            if table.count_rows(None).await.map_err(Error::store)? > 0 {
                out.insert(namespace);
            }
        }
        Ok(out)
    }
}

impl VectorIndex for LanceIndex {
    fn write(&self, namespace: &Namespace, entries: Vec<IndexEntry>) -> Result<()> {
        self.runtime.block_on(self.write_async(namespace, entries))
    }

    fn query(&self, namespace: &Namespace, vector: &[f32], k: usize) -> Result<Vec<ScoredEntry>> {
        self.runtime.block_on(self.query_async(namespace, vector, k))
    }

    fn delete_all(&self, namespace: &Namespace) -> Result<()> {
        self.runtime.block_on(self.delete_all_async(namespace))
    }

    fn describe_partitions(&self) -> Result<BTreeSet<Namespace>> {
        self.runtime.block_on(self.describe_partitions_async())
    }
}

fn row_id(namespace: &Namespace, now: i64, i: usize, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(namespace.as_str().as_bytes());
    hasher.update(&now.to_le_bytes());
    hasher.update(&i.to_le_bytes());
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn entries_to_record_batch(namespace: &Namespace, entries: &[IndexEntry], dim: i32) -> Result<RecordBatch> {
    let now = Utc::now().timestamp_millis();
    let mut ids = Vec::with_capacity(entries.len());
    let mut contents = Vec::with_capacity(entries.len());
    let mut sources = Vec::with_capacity(entries.len());
    let mut metas = Vec::with_capacity(entries.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        ids.push(row_id(namespace, now, i, &e.text));
        contents.push(e.text.clone());
        sources.push(e.meta.get(META_SOURCE).cloned().unwrap_or_default());
        metas.push(serde_json::to_string(&e.meta).map_err(Error::store)?);
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    RecordBatch::try_new(
        build_chunk_schema(dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(metas)),
            Arc::new(TimestampMillisecondArray::from(vec![now; entries.len()])),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
        ],
    )
    .map_err(Error::store)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::store(format!("missing {name} column")))
}

fn record_batch_to_entries(batch: &RecordBatch) -> Result<Vec<ScoredEntry>> {
    let contents = string_column(batch, COL_CONTENT)?;
    let metas = string_column(batch, COL_META)?;
    let distances = batch
        .column_by_name(COL_DISTANCE)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let meta: Meta = serde_json::from_str(metas.value(i)).map_err(Error::store)?;
        // cosine distance is 1 - similarity
        let score = match distances {
            Some(d) if d.is_valid(i) => 1.0 - d.value(i),
            _ => 0.0,
        };
        out.push(ScoredEntry { text: contents.value(i).to_string(), meta, score });
    }
    Ok(out)
}
