//! Fixed-point conventions for volume, pan and accumulation
//!
//! Volume is linear amplitude scaled by `2^VOLUME_BITS`, pan is a position
//! in `0..=256` scaled by `2^PAN_BITS`. The mixing loop multiplies a 16-bit
//! sample by `channel_volume * pan_multiplier` in 64 bits and shifts the
//! product back down with round-to-nearest, so every output sample is an
//! exact function of these integers.

/// Fractional bits of a fixed-point volume
pub const VOLUME_BITS: u32 = 24;

/// Fractional bits of a fixed-point pan position
pub const PAN_BITS: u32 = 8;

/// Fixed-point unity volume (1.0)
pub const VOLUME_ONE: i32 = 1 << VOLUME_BITS;

/// Largest linear volume a channel may be set to
pub const VOLUME_MAX: i32 = 0x7FFF_FFFF >> VOLUME_BITS;

/// Largest fixed-point channel volume
pub const VOLUME_FIXED_MAX: i32 = VOLUME_MAX << VOLUME_BITS;

/// Pan multiplier for an unattenuated side; also the full-right pan position
pub const PAN_ONE: i32 = 1 << PAN_BITS;

/// Center pan position
pub const PAN_CENTER: i32 = PAN_ONE / 2;

/// Fractional bits of the base (master) volume. The extra three bits leave
/// room for the `0..=15` integer range.
pub const BASE_VOLUME_BITS: u32 = VOLUME_BITS + 3;

/// Largest linear base volume
pub const BASE_VOLUME_MAX: f32 = 15.0;

/// Shift applied to stereo samples after scaling
pub const STEREO_SHIFT: u32 = VOLUME_BITS + PAN_BITS;

/// Shift applied to mono samples after scaling. Mono pan multipliers sum to
/// 256 across both sides, so center is 128 and needs one bit less.
pub const MONO_SHIFT: u32 = STEREO_SHIFT - 1;

/// Samples mixed per batch (bounds the accumulation buffer)
pub const MIX_ACCUM_BUFLEN: usize = 1024;

/// Convert a linear volume to fixed point, clamping to `0..=VOLUME_MAX`
pub fn volume_to_fixed(volume: f32) -> i32 {
    if volume.is_nan() {
        return 0;
    }
    let clamped = f64::from(volume).clamp(0.0, f64::from(VOLUME_MAX));
    (clamped * f64::from(VOLUME_ONE)).round() as i32
}

/// Convert a fixed-point volume back to linear
pub fn fixed_to_volume(volume: i32) -> f32 {
    (f64::from(volume) / f64::from(VOLUME_ONE)) as f32
}

/// Convert a linear base volume to its fixed-point scale, clamping to
/// `0..=BASE_VOLUME_MAX`
pub fn base_volume_to_fixed(volume: f32) -> i64 {
    if volume.is_nan() {
        return 0;
    }
    let clamped = f64::from(volume).clamp(0.0, f64::from(BASE_VOLUME_MAX));
    (clamped * (1u64 << BASE_VOLUME_BITS) as f64).round() as i64
}

/// Convert a fixed-point base volume back to linear
pub fn fixed_to_base_volume(volume: i64) -> f32 {
    (volume as f64 / (1u64 << BASE_VOLUME_BITS) as f64) as f32
}

/// Scale a channel volume by the base volume, yielding a `2^VOLUME_BITS`
/// scaled gain
#[inline]
pub fn channel_volume(volume: i32, base_volume: i64) -> i64 {
    (i64::from(volume) * base_volume) >> BASE_VOLUME_BITS
}

/// Arithmetic right shift with round-to-nearest (halves round up)
#[inline]
pub fn round_shift(value: i64, shift: u32) -> i64 {
    (value + (1i64 << (shift - 1))) >> shift
}

/// Pan position and the stereo multipliers derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pan {
    /// Position in `0..=PAN_ONE`; 0 is full left
    pub position: i32,
    /// Left multiplier for stereo input, `0..=PAN_ONE`
    pub stereo_left: u16,
    /// Right multiplier for stereo input, `0..=PAN_ONE`
    pub stereo_right: u16,
}

impl Pan {
    pub const CENTER: Pan = Pan {
        position: PAN_CENTER,
        stereo_left: PAN_ONE as u16,
        stereo_right: PAN_ONE as u16,
    };

    /// Build a pan setting from a balance in `-1.0..=1.0` (clamped)
    ///
    /// Stereo input keeps the side being panned toward at unity and
    /// attenuates the other side by the ratio `(1 - p) / (1 + p)` (or its
    /// mirror), so a centered stereo channel passes through untouched.
    pub fn from_balance(balance: f32) -> Self {
        let p = if balance.is_nan() {
            0.0
        } else {
            f64::from(balance).clamp(-1.0, 1.0)
        };
        let one = f64::from(PAN_ONE);
        let position = ((p + 1.0) * f64::from(PAN_CENTER)).round() as i32;

        let pan_l = 1.0 - p;
        let pan_r = 1.0 + p;
        let (stereo_left, stereo_right) = if pan_l < pan_r {
            ((pan_l / pan_r * one).round() as u16, PAN_ONE as u16)
        } else {
            (PAN_ONE as u16, (pan_r / pan_l * one).round() as u16)
        };

        Self {
            position,
            stereo_left,
            stereo_right,
        }
    }

    /// Linear balance in `-1.0..=1.0` for this position
    pub fn balance(&self) -> f32 {
        (f64::from(self.position - PAN_CENTER) / f64::from(PAN_CENTER)) as f32
    }

    /// Left and right multipliers for a channel of the given layout
    #[inline]
    pub fn multipliers(&self, is_stereo: bool) -> (i64, i64) {
        if is_stereo {
            (i64::from(self.stereo_left), i64::from(self.stereo_right))
        } else {
            (
                i64::from(PAN_ONE - self.position),
                i64::from(self.position),
            )
        }
    }
}

impl Default for Pan {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Unrounded length of a fade of `length` seconds at `mix_rate`, in samples
pub fn fade_span(length: f32, mix_rate: u32) -> f64 {
    f64::from(length.max(0.0)) * f64::from(mix_rate)
}

/// Whole samples after which a fade over `span` lands, never less than one
pub fn fade_samples(span: f64) -> u32 {
    span.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Per-sample volume delta that moves `from` to `to` over `span` samples,
/// rounded to nearest. `span` is the unrounded product of length and rate;
/// spans under one sample count as one.
pub fn fade_rate(from: i32, to: i32, span: f64) -> i32 {
    let delta = f64::from(to) - f64::from(from);
    (delta / span.max(1.0)).round() as i32
}
