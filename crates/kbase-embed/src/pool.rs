use anyhow::{Result, ensure};
use candle_core::{DType, Tensor};

/// Mean over unmasked tokens followed by L2 normalisation: `[B,T,H] -> [B,H]`, in f32.
///
/// A row whose mask is all zero pools to a zero vector rather than NaN.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, hidden_dim) = hidden.dims3()?;
    ensure!(
        attention_mask.dims() == &[batch, tokens][..],
        "mask shape {:?} does not match hidden shape {:?}",
        attention_mask.dims(),
        hidden.dims()
    );

    let hidden = hidden.to_dtype(DType::F32)?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(DType::F32)?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let counts = mask.sum_keepdim(1)?.clamp(1f32, f32::MAX)?;
    let mean = summed.broadcast_div(&counts)?;
    let norms = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12f32, f32::MAX)?;
    let pooled = mean.broadcast_div(&norms)?;
    ensure!(pooled.dims() == &[batch, hidden_dim][..], "pooled shape mismatch: {:?}", pooled.dims());
    Ok(pooled)
}
