//! Channel downmix and linear-interpolation resampling.
//!
//! Both the preprocessor and the streaming loader funnel PCM through these
//! two functions, so every path into the fingerprinter sees identical
//! arithmetic.

/// Average interleaved channels down to mono.
///
/// Trailing samples that do not form a whole frame are dropped.
pub fn downmix_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let channels = channels as usize;
    let frames = interleaved.len() / channels;
    let mut mono = Vec::with_capacity(frames);
    for frame in 0..frames {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            sum += interleaved[frame * channels + ch];
        }
        mono.push(sum / channels as f32);
    }
    mono
}

/// Resample mono PCM from `input_rate` to `output_rate` by linear
/// interpolation.
///
/// Output length is `⌊n · output_rate / input_rate⌋`. The tail, where the
/// interpolation window would run past the end, repeats the last sample.
pub fn resample_linear(input: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input.is_empty() || input_rate == output_rate {
        return input.to_vec();
    }

    let ratio = output_rate as f64 / input_rate as f64;
    let output_len = (input.len() as f64 * ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_index = i as f64 / ratio;
        let index = src_index as usize;
        if index + 1 < input.len() {
            let frac = (src_index - index as f64) as f32;
            output.push(input[index] * (1.0 - frac) + input[index + 1] * frac);
        } else {
            output.push(*input.last().unwrap());
        }
    }

    output
}
