//! Behavioural properties of the mixer as seen through its public API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use pcmix_audio::{
    ChannelState, Mixer, MixerError, MixerSystem, Pan, PcmSource, ToneSource, MIX_ACCUM_BUFLEN,
};

fn constant(value: i16, samples: usize) -> PcmSource {
    PcmSource::new(vec![value; samples], false)
}

fn mix(mixer: &Mixer, samples: usize) -> Vec<i16> {
    let mut out = vec![0i16; samples * 2];
    mixer.get_pcm(&mut out);
    out
}

#[test]
fn test_silence_without_active_channels() {
    let system = MixerSystem::new();
    let mut out = vec![7i16; 512];
    system.get_pcm(&mut out);
    assert!(out.iter().all(|&s| s == 0));

    system.init(4, 44100).unwrap();
    system.assign(1, constant(1000, 1024), false).unwrap();
    let mut out = vec![7i16; 512];
    system.get_pcm(&mut out);
    assert!(out.iter().all(|&s| s == 0), "assigned but unstarted channel must be silent");
}

#[test]
fn test_unity_passthrough() {
    let mixer = Mixer::new(1, 44100).unwrap();
    mixer.assign(1, constant(-1234, 256), false).unwrap();
    mixer.set_volume(1, 1.0).unwrap();
    mixer.set_pan(1, 0.0).unwrap();
    mixer.start(1).unwrap();

    let out = mix(&mixer, 256);
    assert!(out.iter().all(|&s| s == -1234));
}

#[test]
fn test_mixing_is_additive() {
    let samples = 200;
    let first = || ToneSource::new(440.0, 6000, 44100).limited(samples as u64);
    let second = || ToneSource::new(660.0, 5000, 44100).stereo(true);

    let setup = |with_first: bool, with_second: bool| {
        let mixer = Mixer::new(2, 44100).unwrap();
        if with_first {
            mixer.assign(1, first(), false).unwrap();
            mixer.set_volume(1, 0.7).unwrap();
            mixer.set_pan(1, -0.3).unwrap();
            mixer.start(1).unwrap();
        }
        if with_second {
            mixer.assign(2, second(), true).unwrap();
            mixer.set_volume(2, 0.5).unwrap();
            mixer.set_pan(2, 0.4).unwrap();
            mixer.start(2).unwrap();
        }
        mix(&mixer, samples)
    };

    let a = setup(true, false);
    let b = setup(false, true);
    let both = setup(true, true);
    for i in 0..samples * 2 {
        assert_eq!(i32::from(both[i]), i32::from(a[i]) + i32::from(b[i]), "sample {}", i);
    }
}

#[test]
fn test_output_saturates() {
    let mixer = Mixer::new(2, 44100).unwrap();
    for (channel, value) in [(1, i16::MAX), (2, i16::MAX)] {
        mixer.assign(channel, constant(value, 64), false).unwrap();
        mixer.start(channel).unwrap();
    }
    assert!(mix(&mixer, 64).iter().all(|&s| s == i16::MAX));

    let mixer = Mixer::new(2, 44100).unwrap();
    for channel in 1..=2 {
        mixer.assign(channel, constant(i16::MIN, 64), false).unwrap();
        mixer.start(channel).unwrap();
    }
    assert!(mix(&mixer, 64).iter().all(|&s| s == i16::MIN));
}

#[test]
fn test_stereo_pan_boundaries() {
    let mixer = Mixer::new(1, 44100).unwrap();
    let source = PcmSource::new(vec![800, 600], true);
    let stereo = source.is_stereo();
    mixer.assign(1, source, stereo).unwrap();

    mixer.set_pan(1, -1.0).unwrap();
    let pan = mixer.pan(1).unwrap();
    assert_eq!((pan.stereo_left, pan.stereo_right), (256, 0));

    mixer.set_pan(1, 1.0).unwrap();
    let pan = mixer.pan(1).unwrap();
    assert_eq!((pan.stereo_left, pan.stereo_right), (0, 256));

    mixer.set_pan(1, 0.0).unwrap();
    assert_eq!(mixer.pan(1), Some(Pan::CENTER));

    mixer.set_pan(1, -1.0).unwrap();
    mixer.start(1).unwrap();
    assert_eq!(mix(&mixer, 1), vec![800, 0]);
}

#[test]
fn test_fade_out_with_cut_converges() {
    let rate = 1000;
    let mixer = Mixer::new(1, rate).unwrap();
    mixer.assign(1, constant(1000, 4096), false).unwrap();
    mixer.start(1).unwrap();
    mixer.set_fade(1, 0.0, 0.5, true).unwrap();

    let out = mix(&mixer, 500);
    assert_eq!(mixer.volume(1), Some(0.0));
    assert!(!mixer.status(1));
    assert_eq!(mixer.state(1), Some(ChannelState::Assigned));

    let left: Vec<i16> = out.iter().step_by(2).copied().collect();
    assert!(left[0] < 1000);
    assert!(left.windows(2).all(|w| w[1] <= w[0]), "envelope must not rise");
    assert_eq!(*left.last().unwrap(), 0);

    // Stopped: further pulls are silent
    assert!(mix(&mixer, 64).iter().all(|&s| s == 0));
}

#[test]
fn test_fade_in_reaches_target() {
    let mixer = Mixer::new(1, 1000).unwrap();
    mixer.assign(1, constant(100, 4096), false).unwrap();
    mixer.set_volume(1, 0.0).unwrap();
    mixer.start(1).unwrap();
    mixer.set_fade(1, 2.0, 0.1, false).unwrap();

    let out = mix(&mixer, 150);
    assert_eq!(mixer.volume(1), Some(2.0));
    assert_eq!(mixer.is_fading(1), Some(false));
    assert!(mixer.status(1));
    assert_eq!(out[2 * 99], 200);
    assert_eq!(out[2 * 149], 200);
    assert!(out[0] < 10);
}

#[test]
fn test_batch_split_is_bit_identical() {
    let build = || {
        let mixer = Mixer::new(3, 44100).unwrap();
        mixer.assign(1, ToneSource::new(440.0, 12000, 44100), false).unwrap();
        mixer.set_pan(1, -0.25).unwrap();
        mixer.start(1).unwrap();
        mixer.set_fade(1, 0.0, 0.02, true).unwrap();

        mixer
            .assign(2, ToneSource::new(330.0, 9000, 44100).stereo(true), true)
            .unwrap();
        mixer.set_volume(2, 0.3).unwrap();
        mixer.set_pan(2, 0.6).unwrap();
        mixer.start(2).unwrap();
        mixer.set_fade(2, 1.2, 0.015, false).unwrap();

        mixer.assign(3, constant(321, 10_000), false).unwrap();
        mixer.set_volume(3, 0.9).unwrap();
        mixer.start(3).unwrap();
        mixer
    };

    let n = MIX_ACCUM_BUFLEN / 2 - 12;
    let whole = mix(&build(), 2 * n);

    let split_mixer = build();
    let mut split = mix(&split_mixer, n);
    split.extend(mix(&split_mixer, n));

    assert_eq!(whole, split);
}

#[test]
fn test_oversized_request_matches_small_pulls() {
    let build = || {
        let mixer = Mixer::new(1, 48000).unwrap();
        mixer.assign(1, ToneSource::new(1000.0, 20000, 48000), false).unwrap();
        mixer.start(1).unwrap();
        mixer.set_fade(1, 0.25, 0.05, false).unwrap();
        mixer
    };

    let total = MIX_ACCUM_BUFLEN * 3 + 100;
    let whole = mix(&build(), total);

    let pulled = build();
    let mut pieces = Vec::new();
    let mut left = total;
    while left > 0 {
        let n = left.min(333);
        pieces.extend(mix(&pulled, n));
        left -= n;
    }
    assert_eq!(whole, pieces);
}

#[test]
fn test_rising_fade_holds_at_target_after_landing_early() {
    // 30000 / 44100 rounds up to one unit per sample, so the ramp reaches
    // the target 14100 samples before the fade itself lands
    let target = 30_000.0 / 16_777_216.0;
    let build = || {
        let mixer = Mixer::new(1, 44100).unwrap();
        mixer.assign(1, constant(i16::MAX, 50_000), false).unwrap();
        mixer.set_volume(1, 0.0).unwrap();
        mixer.start(1).unwrap();
        mixer.set_fade(1, target, 1.0, false).unwrap();
        mixer
    };

    let level = {
        let mixer = Mixer::new(1, 44100).unwrap();
        mixer.assign(1, constant(i16::MAX, 1), false).unwrap();
        mixer.set_volume(1, target).unwrap();
        mixer.start(1).unwrap();
        mix(&mixer, 1)[0]
    };

    let mixer = build();
    let mut split = mix(&mixer, 30_720);
    assert_eq!(mixer.volume(1), Some(target));
    assert_eq!(mixer.is_fading(1), Some(true));
    split.extend(mix(&mixer, 10_000));
    assert_eq!(mixer.volume(1), Some(target));

    assert!(split.iter().all(|&s| s <= level), "fade passed its target");
    assert_eq!(split[2 * 30_500], level);

    let whole = mix(&build(), 40_720);
    assert_eq!(whole, split);

    let other = build();
    let mut uneven = mix(&other, 30_010);
    uneven.extend(mix(&other, 10_710));
    assert_eq!(whole, uneven);
}

#[test]
fn test_slot_exclusivity() {
    let mixer = Mixer::new(1, 44100).unwrap();
    mixer.assign(1, constant(111, 64), false).unwrap();
    assert_eq!(
        mixer.assign(1, constant(999, 64), false),
        Err(MixerError::AlreadyAssigned(1))
    );

    mixer.start(1).unwrap();
    assert!(mix(&mixer, 8).iter().all(|&s| s == 111));

    mixer.reset(1).unwrap();
    assert!(mixer.assign(1, constant(999, 64), false).is_ok());
}

#[test]
fn test_control_plane_runs_alongside_mixing() {
    let mixer = Arc::new(Mixer::new(4, 44100).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let control = {
        let mixer = Arc::clone(&mixer);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut round = 0u32;
            while !done.load(Ordering::Acquire) {
                let channel = round % 4 + 1;
                let _ = mixer.assign(channel, ToneSource::new(220.0, 8000, 44100), false);
                let _ = mixer.start(channel);
                let _ = mixer.set_volume(channel, (round % 7) as f32 * 0.3);
                let _ = mixer.set_pan(channel, (round % 5) as f32 * 0.5 - 1.0);
                let _ = mixer.set_fade(channel, 0.0, 0.001, round % 2 == 0);
                if round % 3 == 0 {
                    let _ = mixer.reset(channel);
                }
                round = round.wrapping_add(1);
            }
        })
    };

    let mut out = vec![0i16; 512];
    for _ in 0..500 {
        mixer.get_pcm(&mut out);
    }
    done.store(true, Ordering::Release);
    control.join().unwrap();

    mixer.reset_all();
    mixer.get_pcm(&mut out);
    assert!(out.iter().all(|&s| s == 0));
}
