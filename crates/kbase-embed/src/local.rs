use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use kbase_core::config::{expand_path, EmbeddingSettings};
use kbase_core::error::Error;
use kbase_core::traits::Embedder;

use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

/// BGE-M3 style sentence embedder on an XLM-RoBERTa backbone.
pub struct LocalEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    batch_size: usize,
}

impl LocalEmbedder {
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        info!(model_dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let vb = load_weights(&model_dir, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim, max_len = settings.max_len, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len: settings.max_len, batch_size: settings.batch_size.max(1) })
    }

    fn embed_rows(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros(input_ids.shape(), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        if start.elapsed().as_millis() > 100 * texts.len() as u128 {
            warn!(rows = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding batch");
        }
        Ok(rows)
    }
}

impl Embedder for LocalEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> kbase_core::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let rows = self.embed_rows(batch).map_err(Error::embedding)?;
            out.extend(rows);
        }
        debug!(texts = texts.len(), "embedded batch");
        Ok(out)
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => {
                info!("embedding on Metal");
                return dev;
            }
            Err(e) => warn!(error = %e, "Metal unavailable; falling back to CPU"),
        }
    }
    info!("embedding on CPU");
    Device::Cpu
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        let tensors = candle_core::safetensors::load(&safetensors, device)
            .with_context(|| format!("reading weights from {}", safetensors.display()))?;
        return Ok(VarBuilder::from_tensors(tensors, DType::F32, device));
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)
        .with_context(|| format!("reading weights from {}", weights_path.display()))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("models/bge-m3"), PathBuf::from("../models/bge-m3")]);
    for dir in candidates {
        if dir.exists() { return Ok(dir); }
        debug!(dir = %dir.display(), "model dir not found");
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
