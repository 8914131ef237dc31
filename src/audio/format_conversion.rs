// Format conversion between the engine's f32 signal and device/file formats
//
// - Device side: the engine always produces interleaved stereo f32. cpal
//   streams may be F32, I16 or U16 and may expose more or fewer than two
//   channels; `write_stereo_to_interleaved_frame` handles both.
// - File side: 16-bit PCM export goes through `f32_to_i16`.
//
// All conversions are allocation-free.

use cpal::{FromSample, Sample};

/// Convert f32 sample to i16
///
/// Maps [-1.0, 1.0] to [i16::MIN, i16::MAX], clamping out of range values.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);

    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Write one stereo frame into a device frame of any channel count
///
/// Extra channels get silence; a mono device gets the average of L and R.
#[inline]
pub fn write_stereo_to_interleaved_frame<T>(
    (left_sample, right_sample): (f32, f32),
    output_frame: &mut [T],
) where
    T: Sample + FromSample<f32>,
{
    if output_frame.len() >= 2 {
        output_frame[0] = T::from_sample(left_sample);
        output_frame[1] = T::from_sample(right_sample);
        for channel_sample in output_frame.iter_mut().skip(2) {
            *channel_sample = T::from_sample(0.0f32);
        }
    } else if let Some(channel_sample) = output_frame.first_mut() {
        let mono_sample = (left_sample + right_sample) * 0.5;
        *channel_sample = T::from_sample(mono_sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_conversion() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);

        let mid = f32_to_i16(0.5);
        assert!(mid > 0 && mid < i16::MAX);

        // Out of range input is clamped
        assert_eq!(f32_to_i16(4.0), i16::MAX);
        assert_eq!(f32_to_i16(-4.0), i16::MIN);
    }

    #[test]
    fn test_stereo_frame_f32() {
        let mut frame = [0.0f32; 2];
        write_stereo_to_interleaved_frame((0.25, -0.5), &mut frame);
        assert_eq!(frame, [0.25, -0.5]);
    }

    #[test]
    fn test_stereo_frame_extra_channels_silent() {
        let mut frame = [1.0f32; 4];
        write_stereo_to_interleaved_frame((0.25, -0.5), &mut frame);
        assert_eq!(frame, [0.25, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_stereo_frame_mono_device() {
        let mut frame = [0.0f32; 1];
        write_stereo_to_interleaved_frame((0.5, 0.25), &mut frame);
        assert_eq!(frame, [0.375]);
    }

    #[test]
    fn test_stereo_frame_i16() {
        let mut frame = [0i16; 2];
        write_stereo_to_interleaved_frame((1.0, -1.0), &mut frame);
        assert!(frame[0] >= i16::MAX - 1);
        assert!(frame[1] <= i16::MIN + 1);
    }
}
