use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::assets::ModelAssets;
use crate::pooling::mean_pool;
use crate::SemanticError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Tokenizer plus ONNX session for one sentence-embedding model.
///
/// `Session::run` needs `&mut`, so the session sits behind a mutex; the
/// tokenizer is shared freely.
pub(crate) struct OnnxEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxEncoder {
    /// Build the session and tokenizer. Blocking; call from a blocking thread.
    pub(crate) fn load(
        assets: &ModelAssets,
        intra_threads: usize,
        max_sequence_length: usize,
    ) -> Result<Self, SemanticError> {
        let mut tokenizer = Tokenizer::from_file(&assets.tokenizer_path).map_err(|e| {
            SemanticError::TokenizerMissing(format!(
                "{}: {e}",
                assets.tokenizer_path.display()
            ))
        })?;
        truncate_to(&mut tokenizer, max_sequence_length)?;

        let session = build_session(assets, intra_threads).map_err(|e| {
            SemanticError::ModelNotFound(format!("{}: {e}", assets.model_path.display()))
        })?;

        info!(model = %assets.model_path.display(), "ONNX model loaded");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Mean-pooled (not yet normalized) embeddings, one per text, in input order.
    pub(crate) fn embed<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (encoded, max_len) = encode_documents(&self.tokenizer, texts)?;
        let batch = build_padded_batch(encoded, max_len)?;

        let mut guard = self
            .session
            .lock()
            .map_err(|_| SemanticError::Inference("onnx session lock poisoned".into()))?;
        execute_session(&mut guard, &batch).map_err(|e| SemanticError::Inference(e.to_string()))
    }
}

fn build_session(assets: &ModelAssets, intra_threads: usize) -> Result<Session, BoxError> {
    let session = Session::builder()?
        .with_intra_threads(intra_threads.max(1))?
        .with_log_level(ort::logging::LogLevel::Warning)?
        .commit_from_file(&assets.model_path)?;
    Ok(session)
}

/// Cap encodings at `max_length` tokens, special tokens included. The
/// tokenizer trims the text and keeps `[CLS]`/`[SEP]` in place.
fn truncate_to(tokenizer: &mut Tokenizer, max_length: usize) -> Result<(), SemanticError> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| SemanticError::InvalidConfig(format!("tokenizer truncation: {e}")))?;
    Ok(())
}

struct EncodedDoc {
    ids: Vec<i64>,
    mask: Vec<i64>,
}

fn encode_documents<T>(
    tokenizer: &Tokenizer,
    texts: &[T],
) -> Result<(Vec<EncodedDoc>, usize), SemanticError>
where
    T: AsRef<str>,
{
    let mut encoded = Vec::with_capacity(texts.len());
    let mut max_len = 0usize;

    for text in texts {
        let encoding = tokenizer
            .encode(text.as_ref(), true)
            .map_err(|e| SemanticError::Inference(e.to_string()))?;
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&x| i64::from(x)).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| i64::from(x))
            .collect();
        max_len = max_len.max(ids.len());
        encoded.push(EncodedDoc { ids, mask });
    }

    Ok((encoded, max_len))
}

/// Row-major `[batch, seq_len]` model inputs.
struct PaddedBatch {
    batch: usize,
    seq_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
}

fn build_padded_batch(encoded: Vec<EncodedDoc>, max_len: usize) -> Result<PaddedBatch, SemanticError> {
    let seq_len = max_len.max(1);
    let batch = encoded.len();
    let mut input_ids = Vec::with_capacity(batch * seq_len);
    let mut attention_mask = Vec::with_capacity(batch * seq_len);

    for EncodedDoc { ids, mask } in encoded {
        if ids.len() != mask.len() {
            return Err(SemanticError::Inference(
                "tokenizer produced mismatched id/mask lengths".into(),
            ));
        }
        let pad = seq_len.saturating_sub(ids.len());
        input_ids.extend(ids);
        attention_mask.extend(mask);
        input_ids.extend(std::iter::repeat_n(0, pad));
        attention_mask.extend(std::iter::repeat_n(0, pad));
    }

    Ok(PaddedBatch {
        batch,
        seq_len,
        input_ids,
        attention_mask,
    })
}

fn execute_session(session: &mut Session, batch: &PaddedBatch) -> Result<Vec<Vec<f32>>, BoxError> {
    let shape = vec![batch.batch as i64, batch.seq_len as i64];
    let input_ids = Tensor::from_array((shape.clone(), batch.input_ids.clone()))?;
    let attention_mask = Tensor::from_array((shape.clone(), batch.attention_mask.clone()))?;
    let token_type_ids = Tensor::from_array((shape, vec![0i64; batch.batch * batch.seq_len]))?;

    let outputs = session.run(ort::inputs! {
        "input_ids" => input_ids,
        "attention_mask" => attention_mask,
        "token_type_ids" => token_type_ids,
    })?;

    let (output_shape, hidden) = outputs[0].try_extract_tensor::<f32>()?;
    let dims: Vec<usize> = output_shape.iter().map(|&d| d as usize).collect();
    if dims.len() != 3 || dims[0] != batch.batch || dims[1] != batch.seq_len {
        return Err(format!("unexpected output shape: {output_shape:?}").into());
    }
    let hidden_dim = dims[2];
    debug!(batch = batch.batch, seq_len = batch.seq_len, hidden_dim, "onnx batch done");

    let per_doc = batch.seq_len * hidden_dim;
    let vectors = (0..batch.batch)
        .map(|i| {
            let rows = &hidden[i * per_doc..(i + 1) * per_doc];
            let mask = &batch.attention_mask[i * batch.seq_len..(i + 1) * batch.seq_len];
            mean_pool(rows, mask, hidden_dim)
        })
        .collect();
    Ok(vectors)
}
