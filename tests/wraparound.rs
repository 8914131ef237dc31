// Property tests for the looping window cursor
//
// For any clip length and window length, consecutive windows of a looping
// sound read the clip as an endless cyclic stream.

use mysound_engine::sound::{Cursor, Sound};
use proptest::prelude::*;

proptest! {
    #[test]
    fn looping_windows_follow_the_clip_cyclically(
        len in 1usize..64,
        window in 1usize..32,
        cycles in 1usize..20,
    ) {
        let data: Vec<f32> = (0..len).map(|i| i as f32).collect();
        let span = window.min(len);
        let mut sound = Sound::new(window, data);
        sound.play();

        let mut left = vec![0.0; window];
        let mut right = vec![0.0; window];
        let mut expected = 0usize;

        for _ in 0..cycles {
            prop_assert!(sound.process(&mut left, &mut right));
            for (i, &sample) in left.iter().enumerate() {
                if i < span {
                    prop_assert_eq!(sample, (expected % len) as f32);
                    expected += 1;
                } else {
                    prop_assert_eq!(sample, 0.0);
                }
            }

            match sound.cursor() {
                Cursor::Playing { start, end } => {
                    prop_assert!(start < len && end < len);
                    prop_assert_eq!(start, expected % len);
                }
                Cursor::Stopped => prop_assert!(false, "Looping sound stopped"),
            }
        }
    }

    #[test]
    fn non_looping_sound_plays_each_sample_once(
        len in 1usize..64,
        window in 1usize..32,
    ) {
        let data: Vec<f32> = (1..=len).map(|i| i as f32).collect();
        let mut sound = Sound::new(window, data.clone());
        sound.set_looping(false);
        sound.play();

        let mut left = vec![0.0; window];
        let mut right = vec![0.0; window];
        let mut played = Vec::new();

        // Enough cycles to exhaust the clip, plus one extra
        for _ in 0..=len.div_ceil(window.min(len)) {
            if sound.process(&mut left, &mut right) {
                played.extend(left.iter().copied().filter(|&s| s != 0.0));
            }
        }

        prop_assert_eq!(played, data);
        prop_assert!(!sound.is_playing());
    }
}
