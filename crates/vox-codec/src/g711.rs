//! G.711 µ-law (PCMU) codec: the only codec voxbridge speaks on the wire.
//! Transcoding to A-law or any wideband codec is explicitly out of scope.

use once_cell::sync::Lazy;

const BIAS: i16 = 0x84;
const CLIP: i16 = 32635;

/// 256-entry µ-law -> linear PCM decode table, built once from the
/// standard ITU-T G.711 formula (spec §4.B step 2).
static DECODE_TABLE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = mulaw_to_linear_raw(i as u8);
    }
    table
});

fn mulaw_to_linear_raw(encoded: u8) -> i16 {
    let mu = !encoded;
    let sign = (mu & 0x80) != 0;
    let exponent = (mu >> 4) & 0x07;
    let mantissa = mu & 0x0F;
    let mut sample = ((mantissa as i32) << 3) + (BIAS as i32);
    sample <<= exponent as i32;
    sample -= BIAS as i32;
    let sample = sample as i16;
    if sign {
        -sample
    } else {
        sample
    }
}

/// Decode one µ-law byte to a linear PCM16 sample via the lookup table.
pub fn decode_sample(encoded: u8) -> i16 {
    DECODE_TABLE[encoded as usize]
}

/// Encode one linear PCM16 sample to µ-law.
pub fn encode_sample(mut sample: i16) -> u8 {
    let sign = if sample < 0 {
        sample = sample.saturating_neg();
        0x80u8
    } else {
        0x00
    };

    let magnitude = sample.min(CLIP) as i32 + BIAS as i32;
    let exponent = exponent_of(magnitude);
    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;

    !(sign | (exponent << 4) | mantissa)
}

/// Position (0-7) of the highest set bit among bits 14..7 of `magnitude`.
fn exponent_of(magnitude: i32) -> u8 {
    let mut exponent: u8 = 7;
    let mut mask = 0x4000i32;
    while exponent > 0 {
        if magnitude & mask != 0 {
            break;
        }
        mask >>= 1;
        exponent -= 1;
    }
    exponent
}

/// Decode a buffer of µ-law bytes to linear PCM16.
pub fn decode(encoded: &[u8], out: &mut Vec<i16>) {
    out.clear();
    out.extend(encoded.iter().map(|&b| decode_sample(b)));
}

/// Encode a buffer of linear PCM16 samples to µ-law bytes.
pub fn encode(samples: &[i16], out: &mut Vec<u8>) {
    out.clear();
    out.extend(samples.iter().map(|&s| encode_sample(s)));
}

/// Decode a µ-law buffer directly to float32 samples in [-1, 1], the form
/// the inbound processor hands to the resampler.
pub fn decode_to_f32(encoded: &[u8], out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        encoded
            .iter()
            .map(|&b| decode_sample(b) as f32 / i16::MAX as f32),
    );
}

/// Encode float32 samples in [-1, 1] to µ-law, clamping out-of-range input.
pub fn encode_from_f32(samples: &[f32], out: &mut Vec<u8>) {
    out.clear();
    out.extend(samples.iter().map(|&s| {
        let clamped = s.clamp(-1.0, 1.0);
        encode_sample((clamped * i16::MAX as f32) as i16)
    }));
}

/// 160 bytes of µ-law silence (0xFF), the frame the outbound scheduler
/// emits whenever the FIFO underruns.
pub fn silence_frame(len: usize) -> Vec<u8> {
    vec![0xFFu8; len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_table_has_256_entries() {
        assert_eq!(DECODE_TABLE.len(), 256);
    }

    #[test]
    fn silence_byte_decodes_near_zero() {
        // 0xFF is the conventional silence byte; its magnitude should be
        // the smallest representable, close to (but not exactly) zero.
        let v = decode_sample(0xFF);
        assert!(v.unsigned_abs() < 40);
    }

    #[test]
    fn round_trip_sine_meets_snr_floor() {
        // 1 kHz tone at 8 kHz sample rate, one period's worth of samples.
        let n = 800;
        let mut samples = Vec::with_capacity(n);
        for i in 0..n {
            let t = i as f32 / 8000.0;
            let s = (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
            samples.push((s * 20000.0) as i16);
        }
        let mut encoded = Vec::new();
        encode(&samples, &mut encoded);
        let mut decoded = Vec::new();
        decode(&encoded, &mut decoded);

        let mut signal_energy = 0f64;
        let mut error_energy = 0f64;
        for (a, b) in samples.iter().zip(decoded.iter()) {
            let s = *a as f64;
            let e = (*a as f64) - (*b as f64);
            signal_energy += s * s;
            error_energy += e * e;
        }
        let snr_db = 10.0 * (signal_energy / error_energy.max(1.0)).log10();
        assert!(snr_db > 20.0, "SNR too low: {snr_db} dB");
    }

    #[test]
    fn encode_decode_is_approximately_idempotent() {
        for sample in [-30000i16, -1000, -1, 0, 1, 1000, 30000] {
            let encoded = encode_sample(sample);
            let decoded = decode_sample(encoded);
            let err = (sample as i32 - decoded as i32).abs();
            // mu-law quantization error grows with magnitude; bound loosely.
            assert!(err < sample.unsigned_abs() as i32 / 8 + 200);
        }
    }
}
