//! Edge case tests for window production
//!
//! The basic cursor walks (wrap, exact multiples, short clips) live in the
//! unit tests of `sound.rs`. These cover flag changes landing on awkward
//! cursor positions: the short final window, a wrapping window, a stopped
//! sound.

use mysound_engine::sound::effect::FnEffect;
use mysound_engine::sound::{Cursor, Sound};

/// Run one window and return the left channel
fn next_window(sound: &mut Sound) -> Vec<f32> {
    let window = sound.window_length();
    let mut left = vec![f32::NAN; window];
    let mut right = vec![f32::NAN; window];
    sound.process(&mut left, &mut right);
    assert_eq!(left, right, "Both channels must carry the same signal");
    left
}

fn clip(len: usize) -> Vec<f32> {
    (1..=len).map(|v| v as f32).collect()
}

#[test]
fn test_looping_enabled_on_short_final_window() {
    let mut sound = Sound::new(4, clip(6));
    sound.set_looping(false);
    sound.play();

    assert_eq!(next_window(&mut sound), vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(sound.cursor(), Cursor::Playing { start: 4, end: 5 });

    // The short window was already laid out, it plays as is and then wraps
    sound.set_looping(true);
    assert_eq!(next_window(&mut sound), vec![5.0, 6.0, 0.0, 0.0]);
    assert_eq!(sound.cursor(), Cursor::Playing { start: 0, end: 3 });
    assert_eq!(next_window(&mut sound), vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(next_window(&mut sound), vec![5.0, 6.0, 1.0, 2.0]);
}

#[test]
fn test_looping_disabled_before_short_final_window() {
    let mut sound = Sound::new(4, clip(6));
    sound.play();

    sound.set_looping(false);
    assert_eq!(next_window(&mut sound), vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(sound.cursor(), Cursor::Playing { start: 4, end: 5 });
    assert_eq!(next_window(&mut sound), vec![5.0, 6.0, 0.0, 0.0]);
    assert!(!sound.is_playing());
}

#[test]
fn test_looping_toggled_back_before_wrap_keeps_looping() {
    let mut sound = Sound::new(4, clip(6));
    sound.play();
    next_window(&mut sound);
    assert!(sound.cursor().is_wrapping());

    sound.set_looping(false);
    sound.set_looping(true);
    assert_eq!(next_window(&mut sound), vec![5.0, 6.0, 1.0, 2.0]);
    assert_eq!(sound.cursor(), Cursor::Playing { start: 2, end: 5 });
}

#[test]
fn test_pause_during_wrapping_window() {
    let mut sound = Sound::new(4, clip(6));
    sound.play();
    next_window(&mut sound);

    sound.set_paused(true);
    assert_eq!(next_window(&mut sound), vec![0.0; 4]);
    assert_eq!(next_window(&mut sound), vec![0.0; 4]);
    assert_eq!(sound.cursor(), Cursor::Playing { start: 4, end: 1 });

    sound.set_paused(false);
    assert_eq!(next_window(&mut sound), vec![5.0, 6.0, 1.0, 2.0]);
}

#[test]
fn test_play_keeps_pause_flag() {
    let mut sound = Sound::new(2, clip(4));
    sound.set_paused(true);
    sound.play();

    assert!(sound.is_playing());
    assert_eq!(next_window(&mut sound), vec![0.0; 2]);
    assert_eq!(sound.cursor(), Cursor::Playing { start: 0, end: 1 });

    sound.set_paused(false);
    assert_eq!(next_window(&mut sound), vec![1.0, 2.0]);
}

#[test]
fn test_stop_during_wrap_then_play_restarts() {
    let mut sound = Sound::new(4, clip(6));
    sound.play();
    next_window(&mut sound);
    assert!(sound.cursor().is_wrapping());

    sound.stop();
    assert_eq!(next_window(&mut sound), vec![0.0; 4]);

    sound.play();
    assert_eq!(next_window(&mut sound), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_set_data_during_wrap_then_play_shorter_clip() {
    let mut sound = Sound::new(4, clip(6));
    sound.play();
    next_window(&mut sound);

    sound.set_data(clip(2));
    assert_eq!(sound.cursor(), Cursor::Stopped);

    sound.play();
    assert_eq!(sound.cursor(), Cursor::Playing { start: 0, end: 1 });
    assert_eq!(next_window(&mut sound), vec![1.0, 2.0, 0.0, 0.0]);
}

#[test]
fn test_single_sample_clip() {
    let mut sound = Sound::new(2, vec![0.5]);
    sound.play();
    for _ in 0..4 {
        assert_eq!(next_window(&mut sound), vec![0.5, 0.0]);
    }

    sound.set_looping(false);
    assert_eq!(next_window(&mut sound), vec![0.5, 0.0]);
    assert!(!sound.is_playing());
    assert_eq!(next_window(&mut sound), vec![0.0, 0.0]);
}

#[test]
fn test_effects_skipped_while_stopped() {
    let mut sound = Sound::new(2, clip(2));
    sound.add_effect(Box::new(FnEffect::new("Offset", |b: &mut [f32]| {
        b.iter_mut().for_each(|s| *s += 1.0);
    })));

    assert_eq!(next_window(&mut sound), vec![0.0, 0.0]);

    sound.play();
    assert_eq!(next_window(&mut sound), vec![2.0, 3.0]);

    sound.set_paused(true);
    assert_eq!(next_window(&mut sound), vec![0.0, 0.0]);
}

#[test]
fn test_extreme_values_pass_through() {
    let data = vec![f32::MAX, f32::MIN, 0.0, -0.0];
    let mut sound = Sound::new(4, data.clone());
    sound.play();
    assert_eq!(next_window(&mut sound), data);
}
