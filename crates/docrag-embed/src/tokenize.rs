use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use docrag_core::error::{Error, Result};

/// XLM-RoBERTa `<pad>` id.
pub const PAD_ID: u32 = 1;

/// Tokenize a batch into `[B, T]` id and attention-mask tensors, truncating to
/// `max_len` and padding to the longest sequence in the batch.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| Error::embedding(format!("Tokenization failed: {e}")))?;
    let seq_len = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(texts.len() * seq_len);
    let mut mask = Vec::with_capacity(texts.len() * seq_len);
    for enc in &encodings {
        let n = enc.get_ids().len().min(seq_len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        ids.extend(std::iter::repeat(PAD_ID).take(seq_len - n));
        mask.extend(std::iter::repeat(0u32).take(seq_len - n));
    }
    let input_ids = Tensor::from_vec(ids, (texts.len(), seq_len), device).map_err(Error::embedding)?;
    let attention_mask = Tensor::from_vec(mask, (texts.len(), seq_len), device).map_err(Error::embedding)?;
    Ok((input_ids, attention_mask))
}
