// DSP utilities - Buffer primitives used by the mix pass
//
// All functions work in place on caller-owned slices and never allocate,
// so they are safe to call from the mixing context.

/// Flush denormals to zero
///
/// Denormal floats (very close to 0) can slow down some CPUs a lot.
/// Threshold: 1e-15 (well below 32-bit float noise)
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft clipping with tanh
///
/// Smoothly bounds the signal to [-1, 1]. Almost linear near 0.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Hard clipping, strict clamp to [-1, 1]
#[inline]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-1.0, 1.0)
}

/// Interleave a stereo pair and accumulate it into `out`
///
/// `out[2i] += left[i]` and `out[2i + 1] += right[i]`, in a single pass
/// without an interleaved scratch buffer. `out` must be exactly twice as
/// long as each input.
#[inline]
pub fn sum_interleaved(out: &mut [f32], left: &[f32], right: &[f32]) {
    debug_assert!(
        left.len() == right.len() && out.len() == 2 * left.len(),
        "Mismatching buffer sizes"
    );

    for ((frame, l), r) in out.chunks_exact_mut(2).zip(left).zip(right) {
        frame[0] += *l;
        frame[1] += *r;
    }
}

/// Peak absolute value of a buffer
pub fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_denormals() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.1), 0.1);
        assert_eq!(flush_denormals_to_zero(-0.1), -0.1);
    }

    #[test]
    fn test_soft_clip() {
        assert!((soft_clip(0.0) - 0.0).abs() < 0.001);
        assert!((soft_clip(0.5) - 0.462).abs() < 0.01);

        assert!(soft_clip(10.0) <= 1.0);
        assert!(soft_clip(10.0) > 0.99);
        assert!(soft_clip(-10.0) >= -1.0);
        assert!(soft_clip(-10.0) < -0.99);
    }

    #[test]
    fn test_hard_clip() {
        assert_eq!(hard_clip(2.0), 1.0);
        assert_eq!(hard_clip(-3.0), -1.0);
        assert_eq!(hard_clip(0.25), 0.25);
    }

    #[test]
    fn test_sum_interleaved_accumulates() {
        let mut out = vec![1.0; 6];
        sum_interleaved(&mut out, &[0.5, 1.0, 1.5], &[-1.0, -2.0, -3.0]);
        assert_eq!(out, vec![1.5, 0.0, 2.0, -1.0, 2.5, -2.0]);

        sum_interleaved(&mut out, &[0.5, 0.0, 0.0], &[0.0, 0.0, 3.0]);
        assert_eq!(out, vec![2.0, 0.0, 2.0, -1.0, 2.5, 1.0]);
    }

    #[test]
    fn test_peak() {
        assert_eq!(peak(&[0.1, -0.7, 0.5]), 0.7);
        assert_eq!(peak(&[]), 0.0);
    }
}
