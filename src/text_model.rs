use anyhow::{Result, bail};
use async_trait::async_trait;
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_nn::ops::softmax;
use candle_transformers::models::debertav2::{
    Config as DebertaV2Config, DebertaV2SeqClassificationModel, Id2Label,
};
use hf_hub::{Repo, RepoType, api::tokio::Api};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::{PaddingParams, Tokenizer};

use crate::engine::BatchedEngine;
use crate::types::{AnalysisRequest, LabelScore, TextAnalysis};

/// DeBERTa-class sequence-classification model used to score submitted
/// text. Implements [`BatchedEngine`] so the batch worker can drive it.
pub struct TextModel {
    model: DebertaV2SeqClassificationModel,
    tokenizer: Tokenizer,
    device: Device,
    id2label: Id2Label,
}

#[derive(Debug, Clone)]
pub struct TextModelConfig {
    pub model_id: Option<String>,
    pub model_path: Option<PathBuf>,
    pub revision: String,
    pub use_pth: bool,
    pub cpu: bool,
    pub max_sequence_length: usize,
    pub id2label: Option<HashMap<u32, String>>,
}

impl Default for TextModelConfig {
    fn default() -> Self {
        Self {
            model_id: None,
            model_path: None,
            revision: "main".to_string(),
            use_pth: false,
            cpu: false,
            max_sequence_length: 512,
            id2label: None,
        }
    }
}

impl TextModel {
    fn device(cpu: bool) -> Result<Device> {
        if cpu {
            Ok(Device::Cpu)
        } else if metal_is_available() {
            tracing::info!("Using metal acceleration");
            Ok(Device::new_metal(0)?)
        } else if cuda_is_available() {
            tracing::info!("Using CUDA GPU acceleration");
            Ok(Device::new_cuda(0)?)
        } else {
            tracing::info!(
                "CUDA not available, running on CPU. To run on GPU, build with `--features cuda`"
            );
            Ok(Device::Cpu)
        }
    }

    #[tracing::instrument(skip(config), fields(model_id = ?config.model_id, cpu = config.cpu))]
    pub async fn new(config: TextModelConfig) -> Result<Self> {
        let device = Self::device(config.cpu)?;

        // Get files from either the HuggingFace API, or from a specified local directory
        let (config_filename, tokenizer_filename, weights_filename) = {
            match &config.model_path {
                Some(base_path) => {
                    if !base_path.is_dir() {
                        bail!("Model path {} is not a directory.", base_path.display());
                    }

                    let config_file = base_path.join("config.json");
                    let tokenizer_file = base_path.join("tokenizer.json");
                    let weights_file = if config.use_pth {
                        base_path.join("pytorch_model.bin")
                    } else {
                        base_path.join("model.safetensors")
                    };
                    (config_file, tokenizer_file, weights_file)
                }
                None => {
                    if config.model_id.is_none() {
                        bail!("Either model_id or model_path must be specified");
                    }

                    let repo = Repo::with_revision(
                        config.model_id.unwrap(),
                        RepoType::Model,
                        config.revision.clone(),
                    );
                    let api = Api::new()?;
                    let api = api.repo(repo);
                    let config_file = api.get("config.json").await?;
                    let tokenizer_file = api.get("tokenizer.json").await?;
                    let weights_file = if config.use_pth {
                        api.get("pytorch_model.bin").await?
                    } else {
                        api.get("model.safetensors").await?
                    };
                    (config_file, tokenizer_file, weights_file)
                }
            }
        };

        let model_config = std::fs::read_to_string(config_filename)?;
        let model_config: DebertaV2Config = serde_json::from_str(&model_config)?;

        // Command-line id2label takes precedence. Otherwise, use model config's id2label.
        let id2label = if let Some(id2label) = config.id2label {
            id2label
        } else if let Some(id2label) = &model_config.id2label {
            id2label.clone()
        } else {
            bail!("Id2Label not found in the model configuration nor specified as a parameter");
        };

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| anyhow::anyhow!("Tokenizer error: {e}"))?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: config.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Tokenizer truncation error: {e}"))?;

        let vb = if config.use_pth {
            VarBuilder::from_pth(
                &weights_filename,
                candle_transformers::models::debertav2::DTYPE,
                &device,
            )?
        } else {
            unsafe {
                VarBuilder::from_mmaped_safetensors(
                    &[weights_filename],
                    candle_transformers::models::debertav2::DTYPE,
                    &device,
                )?
            }
        };

        let vb = vb.set_prefix("deberta");
        let model =
            DebertaV2SeqClassificationModel::load(vb, &model_config, Some(id2label.clone()))?;

        Ok(Self {
            model,
            tokenizer,
            device,
            id2label,
        })
    }

    fn label_for(&self, class: u32) -> String {
        self.id2label
            .get(&class)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{class}"))
    }
}

#[async_trait]
impl BatchedEngine for TextModel {
    #[tracing::instrument(skip(self, requests), fields(batch_size = requests.len()))]
    async fn analyze_batch(
        &self,
        requests: Vec<AnalysisRequest>,
    ) -> Result<Vec<Result<TextAnalysis>>> {
        let texts: Vec<String> = requests.iter().map(|req| req.content.clone()).collect();

        // Tokenize the whole batch off the async runtime
        let tokenizer_clone = self.tokenizer.clone();
        let (input_ids, attention_mask, token_type_ids) = tokio::task::spawn_blocking(move || {
            tokenizer_clone
                .encode_batch(texts, true)
                .map_err(|e| anyhow::anyhow!("Tokenization error: {e}"))
                .map(|encodings| {
                    let mut encoding_stack = Vec::default();
                    let mut attention_mask_stack = Vec::default();
                    let mut token_type_id_stack = Vec::default();

                    for encoding in &encodings {
                        encoding_stack.push(encoding.get_ids().to_vec());
                        attention_mask_stack.push(encoding.get_attention_mask().to_vec());
                        token_type_id_stack.push(encoding.get_type_ids().to_vec());
                    }

                    (encoding_stack, attention_mask_stack, token_type_id_stack)
                })
        })
        .await??;

        // Convert to tensors
        let input_ids_tensors: Result<Vec<_>> = input_ids
            .iter()
            .map(|ids| Tensor::new(ids.as_slice(), &self.device).map_err(anyhow::Error::from))
            .collect();
        let attention_mask_tensors: Result<Vec<_>> = attention_mask
            .iter()
            .map(|mask| Tensor::new(mask.as_slice(), &self.device).map_err(anyhow::Error::from))
            .collect();
        let token_type_ids_tensors: Result<Vec<_>> = token_type_ids
            .iter()
            .map(|types| Tensor::new(types.as_slice(), &self.device).map_err(anyhow::Error::from))
            .collect();

        let ids_tensor = Tensor::stack(&input_ids_tensors?, 0)?;
        let mask_tensor = Tensor::stack(&attention_mask_tensors?, 0)?;
        let type_ids_tensor = Tensor::stack(&token_type_ids_tensors?, 0)?;

        // Run inference
        let logits = self
            .model
            .forward(&ids_tensor, Some(type_ids_tensor), Some(mask_tensor))?;
        let predictions = logits.argmax(1)?.to_vec1::<u32>()?;
        let probs = softmax(&logits, 1)?.to_vec2::<f32>()?;

        let analyses = requests
            .iter()
            .enumerate()
            .map(|(index, _)| {
                let scores: Vec<LabelScore> = probs[index]
                    .iter()
                    .enumerate()
                    .map(|(class, &score)| LabelScore {
                        label: self.label_for(class as u32),
                        score: f64::from(score),
                    })
                    .collect();

                // Non-padding positions of the encoded input
                let token_count = attention_mask[index]
                    .iter()
                    .map(|&m| m as usize)
                    .sum::<usize>();

                Ok(TextAnalysis {
                    predicted: self.label_for(predictions[index]),
                    scores,
                    token_count,
                })
            })
            .collect();

        Ok(analyses)
    }
}
