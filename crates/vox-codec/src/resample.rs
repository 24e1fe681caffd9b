//! Band-limiting FIR and linear-interpolation sample-rate conversion.
//! Deliberately simple: spec §4.B/§4.C call for a fixed 7-tap filter and
//! linear interpolation, not a general-purpose polyphase resampler.

/// Fixed symmetric 7-tap low-pass FIR applied before any rate conversion.
pub const LOWPASS_TAPS: [f32; 7] = [0.02, 0.12, 0.22, 0.28, 0.22, 0.12, 0.02];

/// Apply the fixed low-pass FIR in place (edge samples use zero-padding).
pub fn lowpass(input: &[f32]) -> Vec<f32> {
    let taps = &LOWPASS_TAPS;
    let half = taps.len() / 2;
    let mut out = Vec::with_capacity(input.len());
    for i in 0..input.len() {
        let mut acc = 0f32;
        for (k, &tap) in taps.iter().enumerate() {
            let offset = k as isize - half as isize;
            let idx = i as isize + offset;
            if idx >= 0 && (idx as usize) < input.len() {
                acc += tap * input[idx as usize];
            }
        }
        out.push(acc);
    }
    out
}

/// Linearly resample `input` at `in_rate` Hz to `out_rate` Hz.
pub fn linear_resample(input: &[f32], in_rate: u32, out_rate: u32) -> Vec<f32> {
    if input.is_empty() || in_rate == out_rate {
        return input.to_vec();
    }
    let ratio = in_rate as f64 / out_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx0 = src_pos.floor() as usize;
        let frac = (src_pos - idx0 as f64) as f32;
        let s0 = input.get(idx0).copied().unwrap_or(0.0);
        let s1 = input.get(idx0 + 1).copied().unwrap_or(s0);
        out.push(s0 + (s1 - s0) * frac);
    }
    out
}

/// Inbound pipeline step: band-limit then upsample 8 kHz -> 16 kHz.
pub fn upsample_8k_to_16k(input: &[f32]) -> Vec<f32> {
    let filtered = lowpass(input);
    linear_resample(&filtered, 8000, 16000)
}

/// Outbound pipeline step: band-limit (only if above 8 kHz) then
/// downsample to 8 kHz.
pub fn downsample_to_8k(input: &[f32], in_rate: u32) -> Vec<f32> {
    let source = if in_rate > 8000 {
        lowpass(input)
    } else {
        input.to_vec()
    };
    linear_resample(&source, in_rate, 8000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsample_doubles_length() {
        let input = vec![0.0f32; 160];
        let out = upsample_8k_to_16k(&input);
        assert_eq!(out.len(), 320);
    }

    #[test]
    fn round_trip_8_16_8_approximates_identity() {
        let n = 800;
        let tone: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin())
            .collect();
        let up = upsample_8k_to_16k(&tone);
        let down = downsample_to_8k(&up, 16000);

        let len = tone.len().min(down.len());
        let mut err = 0f64;
        let mut energy = 0f64;
        for i in 0..len {
            let d = (tone[i] - down[i]) as f64;
            err += d * d;
            energy += (tone[i] as f64) * (tone[i] as f64);
        }
        let rel_err = (err / energy.max(1e-9)).sqrt();
        assert!(rel_err < 0.25, "relative error too high: {rel_err}");
    }
}
