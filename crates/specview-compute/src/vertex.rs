//! Vertex encoding (C1): quantize, delta-encode, and byte-shuffle contour
//! vertex streams before they're handed to a general-purpose entropy
//! compressor downstream.

/// Rounds a float vertex stream to `round(v * rounding_factor)` and
/// delta-encodes it, either strided by `(x, y)` pairs (`stride = 2`) or as
/// a flat index stream (`stride = 1`).
pub fn quantize_and_delta(values: &[f32], rounding_factor: f64, stride: usize) -> Vec<i32> {
    let stride = stride.max(1);
    let quantized: Vec<i32> = values
        .iter()
        .map(|v| (*v as f64 * rounding_factor).round() as i32)
        .collect();
    let mut out = vec![0i32; quantized.len()];
    for lane in 0..stride {
        let mut prev = 0i32;
        let mut i = lane;
        while i < quantized.len() {
            out[i] = quantized[i].wrapping_sub(prev);
            prev = quantized[i];
            i += stride;
        }
    }
    out
}

/// Inverse of [`quantize_and_delta`]: reconstructs the quantized integer
/// stream, leaving the caller to divide by `rounding_factor`.
pub fn undelta(deltas: &[i32], stride: usize) -> Vec<i32> {
    let stride = stride.max(1);
    let mut out = vec![0i32; deltas.len()];
    for lane in 0..stride {
        let mut acc = 0i32;
        let mut i = lane;
        while i < deltas.len() {
            acc = acc.wrapping_add(deltas[i]);
            out[i] = acc;
            i += stride;
        }
    }
    out
}

/// Byte-shuffles a stream of little-endian `i32`s: transposes the `4x4`
/// byte matrix formed by every 4 consecutive values, so that all the
/// low-order bytes land together, then all the next-order bytes, and so
/// on. Same-significance bytes sit adjacent in the output, which is what
/// boosts a downstream general-purpose compressor's hit rate.
pub fn shuffle_bytes(values: &[i32]) -> Vec<u8> {
    let n = values.len();
    let mut out = vec![0u8; n * 4];
    for plane in 0..4 {
        for (i, v) in values.iter().enumerate() {
            out[plane * n + i] = v.to_le_bytes()[plane];
        }
    }
    out
}

/// Inverse of [`shuffle_bytes`].
pub fn unshuffle_bytes(bytes: &[u8]) -> Vec<i32> {
    let n = bytes.len() / 4;
    let mut out = vec![0i32; n];
    for plane in 0..4 {
        for i in 0..n {
            let byte = bytes[plane * n + i];
            let word = &mut out[i];
            let mut le = word.to_le_bytes();
            le[plane] = byte;
            *word = i32::from_le_bytes(le);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_undelta_round_trip_single_stream() {
        let values = [1.0f32, 2.5, 2.6, -3.0, 10.0];
        let deltas = quantize_and_delta(&values, 100.0, 1);
        let restored = undelta(&deltas, 1);
        let expected: Vec<i32> = values.iter().map(|v| (*v as f64 * 100.0).round() as i32).collect();
        assert_eq!(restored, expected);
    }

    #[test]
    fn delta_undelta_round_trip_paired_stream() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let deltas = quantize_and_delta(&values, 1.0, 2);
        let restored = undelta(&deltas, 2);
        assert_eq!(restored, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn shuffle_unshuffle_round_trip() {
        let values = vec![1i32, -2, 300_000, i32::MAX, -7];
        let shuffled = shuffle_bytes(&values);
        let restored = unshuffle_bytes(&shuffled);
        assert_eq!(restored, values);
    }
}
