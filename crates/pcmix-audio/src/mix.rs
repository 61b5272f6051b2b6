//! Accumulate and quantize stages of the mixing loop
//!
//! Both stages work purely on a [`Snapshot`] plus the per-channel PCM
//! scratch buffers decoded for the same batch, and take no locks.

use crate::fixed::{channel_volume, round_shift, MONO_SHIFT, STEREO_SHIFT};
use crate::snapshot::{ChannelView, Snapshot};

/// Sum every audible channel of `snapshot` into `accum`.
///
/// `pcm[n]` holds the samples decoded for channel `n` this batch, and
/// `accum` must hold at least `2 * snapshot.samples()` values. The first
/// `2 * snapshot.samples()` values are overwritten with interleaved
/// left/right sums.
pub fn accumulate(snapshot: &Snapshot, pcm: &[Vec<i16>], accum: &mut [i32]) {
    let samples = snapshot.samples();
    let accum = &mut accum[..samples * 2];
    accum.fill(0);

    let base_volume = snapshot.base_volume();
    for (view, pcm) in snapshot.channels().iter().zip(pcm) {
        if view.is_audible() {
            accumulate_channel(view, base_volume, pcm, accum, samples);
        }
    }
}

fn accumulate_channel(
    view: &ChannelView,
    base_volume: i64,
    pcm: &[i16],
    accum: &mut [i32],
    samples: usize,
) {
    let (pan_left, pan_right) = view.pan.multipliers(view.is_stereo);
    let envelope = view.envelope;

    if envelope.is_constant() {
        let volume = channel_volume(envelope.start, base_volume);
        let gains = (volume * pan_left, volume * pan_right);
        if view.is_stereo {
            mix_stereo(accum, &pcm[..samples * 2], |_| gains);
        } else {
            mix_mono(accum, &pcm[..samples], |_| gains);
        }
    } else {
        let gains = |index: usize| {
            let volume = channel_volume(envelope.volume_at(index), base_volume);
            (volume * pan_left, volume * pan_right)
        };
        if view.is_stereo {
            mix_stereo(accum, &pcm[..samples * 2], gains);
        } else {
            mix_mono(accum, &pcm[..samples], gains);
        }
    }
}

#[inline]
fn mix_stereo<G>(accum: &mut [i32], pcm: &[i16], gains: G)
where
    G: Fn(usize) -> (i64, i64),
{
    for (index, (out, frame)) in accum
        .chunks_exact_mut(2)
        .zip(pcm.chunks_exact(2))
        .enumerate()
    {
        let (left, right) = gains(index);
        out[0] = out[0].saturating_add(round_shift(i64::from(frame[0]) * left, STEREO_SHIFT) as i32);
        out[1] = out[1].saturating_add(round_shift(i64::from(frame[1]) * right, STEREO_SHIFT) as i32);
    }
}

#[inline]
fn mix_mono<G>(accum: &mut [i32], pcm: &[i16], gains: G)
where
    G: Fn(usize) -> (i64, i64),
{
    for (index, (out, &sample)) in accum.chunks_exact_mut(2).zip(pcm).enumerate() {
        let (left, right) = gains(index);
        let sample = i64::from(sample);
        out[0] = out[0].saturating_add(round_shift(sample * left, MONO_SHIFT) as i32);
        out[1] = out[1].saturating_add(round_shift(sample * right, MONO_SHIFT) as i32);
    }
}

/// Saturate accumulated values to 16 bits. Writes `min(accum, output)`
/// values.
pub fn quantize(accum: &[i32], output: &mut [i16]) {
    for (out, &value) in output.iter_mut().zip(accum) {
        *out = value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    }
}
