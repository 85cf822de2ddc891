//! The mapping from a [`TelemetrySample`] to a set of musical control
//! parameters. Every transform is a normalize/clamp/lerp chain driven by
//! the config ranges, followed by exponential smoothing against the
//! previous tick, so the output is total over arbitrary input and moves
//! without zipper noise.

use crate::config::Config;
use crate::scale;
use crate::telemetry::TelemetrySample;

/// Beat patterns, selected by gear. Higher gears get busier kits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BeatPattern {
    #[default]
    Kick,
    KickSnare,
    FullKit,
    Electronic,
    Complex,
    RaceMode,
}

impl BeatPattern {
    /// Pattern for a gear. Reverse and neutral ride on the first-gear
    /// pattern; anything above sixth stays in race mode.
    pub fn for_gear(gear: i32) -> Self {
        match gear.clamp(1, 6) {
            1 => BeatPattern::Kick,
            2 => BeatPattern::KickSnare,
            3 => BeatPattern::FullKit,
            4 => BeatPattern::Electronic,
            5 => BeatPattern::Complex,
            _ => BeatPattern::RaceMode,
        }
    }

    /// The tag sent to the synthesis engine.
    pub fn tag(&self) -> &'static str {
        match self {
            BeatPattern::Kick => "kick",
            BeatPattern::KickSnare => "kick_snare",
            BeatPattern::FullKit => "full_kit",
            BeatPattern::Electronic => "electronic",
            BeatPattern::Complex => "complex",
            BeatPattern::RaceMode => "race_mode",
        }
    }
}

/// One tick's worth of musical control values.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicParams {
    pub bpm: f32,
    pub beat_intensity: f32,
    pub beat_pattern: BeatPattern,

    /// MIDI note number the melody is centered on.
    pub base_pitch: i32,
    /// Scale-quantized semitone offset from `base_pitch`.
    pub pitch_offset: f32,
    pub volume: f32,

    /// Stereo position, -1.0 (left) to 1.0 (right).
    pub pan: f32,
    pub distortion: f32,
    pub reverb: f32,
    /// Low-pass cutoff in Hz.
    pub filter_cutoff: f32,
    pub filter_resonance: f32,

    pub warmth: f32,
    pub ambient_level: f32,

    /// One-shot events, true only on the tick they fire.
    pub trigger_turbo: bool,
    pub trigger_warning: bool,
    pub trigger_celebration: bool,
}

impl Default for MusicParams {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beat_intensity: 0.7,
            beat_pattern: BeatPattern::Kick,
            base_pitch: 60,
            pitch_offset: 0.0,
            volume: 0.7,
            pan: 0.0,
            distortion: 0.0,
            reverb: 0.2,
            filter_cutoff: 1000.0,
            filter_resonance: 0.3,
            warmth: 0.5,
            ambient_level: 0.3,
            trigger_turbo: false,
            trigger_warning: false,
            trigger_celebration: false,
        }
    }
}

impl MusicParams {
    /// The state sent while telemetry is gone: everything audible pulled
    /// to zero, tempo parked at its floor.
    pub fn neutral(config: &Config) -> Self {
        Self {
            bpm: config.rhythm.bpm_range.0,
            beat_intensity: 0.0,
            volume: 0.0,
            ambient_level: 0.0,
            distortion: 0.0,
            base_pitch: config.melody.base_pitch,
            ..Default::default()
        }
    }
}

/// Maps telemetry samples to [`MusicParams`]. Holds the previous output
/// for smoothing and the edge-detection state for the one-shot triggers.
pub struct Mapper {
    config: Config,
    last: Option<MusicParams>,
    last_best_lap: i32,
}

impl Mapper {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            last: None,
            last_best_lap: 0,
        }
    }

    /// Derive this tick's parameters from a sample.
    pub fn map(&mut self, sample: &TelemetrySample) -> MusicParams {
        let mut params = MusicParams {
            base_pitch: self.config.melody.base_pitch,
            filter_resonance: self.config.effects.filter_resonance,
            ambient_level: self.config.ambience.ambient_level,
            ..Default::default()
        };

        // Each section can be switched off wholesale, leaving its
        // parameters at their defaults.
        if self.config.rhythm.enable_rhythm {
            self.map_rhythm(sample, &mut params);
        }
        if self.config.melody.enable_melody {
            self.map_melody(sample, &mut params);
        }
        if self.config.effects.enable_effects {
            self.map_effects(sample, &mut params);
        }
        if self.config.ambience.enable_ambience {
            self.map_ambience(sample, &mut params);
        }

        if let Some(last) = &self.last {
            apply_smoothing(&mut params, last, self.config.smoothing);
        }
        self.last = Some(params.clone());
        params
    }

    /// Forget smoothing history and trigger state, e.g. across sessions.
    pub fn reset(&mut self) {
        self.last = None;
        self.last_best_lap = 0;
    }

    fn map_rhythm(&self, sample: &TelemetrySample, params: &mut MusicParams) {
        let rhythm = &self.config.rhythm;

        let rpm_norm = unit_norm(sample.rpm as f32, rhythm.rpm_range) * rhythm.rpm_sensitivity;
        params.bpm = lerp(rhythm.bpm_range, rpm_norm.clamp(0.0, 1.0));

        let speed_norm =
            unit_norm(sample.speed_kmh, rhythm.speed_range) * rhythm.speed_sensitivity;
        params.beat_intensity = lerp(rhythm.beat_intensity_range, speed_norm.clamp(0.0, 1.0));

        params.beat_pattern = BeatPattern::for_gear(sample.gear);
    }

    fn map_melody(&self, sample: &TelemetrySample, params: &mut MusicParams) {
        let melody = &self.config.melody;

        let steer_norm = (signed_norm(sample.steer_angle, melody.steer_range)
            * melody.steer_sensitivity)
            .clamp(-1.0, 1.0);
        let steer_offset = steer_norm * melody.steer_pitch_influence;

        let brake_norm = (sample.brake * melody.brake_sensitivity).clamp(0.0, 1.0);
        let brake_offset = -brake_norm * melody.brake_pitch_drop;

        params.pitch_offset =
            scale::quantize(steer_offset + brake_offset, melody.scale, melody.key);

        let throttle_norm = (sample.throttle * melody.throttle_sensitivity).clamp(0.0, 1.0);
        params.volume = lerp(melody.throttle_volume_range, throttle_norm);
    }

    fn map_effects(&self, sample: &TelemetrySample, params: &mut MusicParams) {
        let effects = &self.config.effects;

        let g_norm = (signed_norm(sample.g_lateral, effects.lateral_g_range)
            * effects.effects_sensitivity)
            .clamp(-1.0, 1.0);
        params.pan = lerp(effects.pan_range, (g_norm + 1.0) / 2.0);

        let max_slip = sample.wheel_slip.max();
        params.distortion = if max_slip > effects.wheel_slip_threshold {
            lerp(effects.distortion_range, max_slip.clamp(0.0, 1.0))
        } else {
            effects.distortion_range.0
        };

        let speed_norm = unit_norm(sample.speed_kmh, effects.speed_reverb_range).clamp(0.0, 1.0);
        params.reverb = lerp(effects.reverb_range, speed_norm);

        let temp_norm = unit_norm(sample.water_temp, effects.engine_temp_range).clamp(0.0, 1.0);
        params.filter_cutoff = lerp(effects.filter_freq_range, temp_norm);

        if effects.enable_turbo_sound && sample.turbo_boost > effects.turbo_threshold {
            params.trigger_turbo = true;
        }
        if effects.enable_tc_abs_sound
            && self.config.ambience.enable_warning_sounds
            && (sample.tc_active > 0.0 || sample.abs_active > 0.0)
        {
            params.trigger_warning = true;
        }
    }

    fn map_ambience(&mut self, sample: &TelemetrySample, params: &mut MusicParams) {
        let ambience = &self.config.ambience;

        let temp_norm = unit_norm(sample.water_temp, ambience.temp_range).clamp(0.0, 1.0);
        params.warmth = lerp(ambience.warmth_range, temp_norm);

        if ambience.enable_lap_feedback {
            if ambience.best_lap_celebration
                && sample.best_lap > 0
                && self.last_best_lap > 0
                && sample.best_lap < self.last_best_lap
            {
                params.trigger_celebration = true;
            }
            self.last_best_lap = sample.best_lap;
        }
    }
}

/// Normalize into 0..1 over a range. Degenerate ranges map to 0 instead
/// of dividing by zero.
fn unit_norm(value: f32, (min, max): (f32, f32)) -> f32 {
    if max == min {
        return 0.0;
    }
    (value - min) / (max - min)
}

/// Normalize into -1..1 over a range, with the midpoint at 0.
fn signed_norm(value: f32, range: (f32, f32)) -> f32 {
    unit_norm(value, range) * 2.0 - 1.0
}

fn lerp((start, end): (f32, f32), t: f32) -> f32 {
    start + (end - start) * t
}

fn smooth(current: f32, last: f32, factor: f32) -> f32 {
    last + (current - last) * factor
}

/// Exponentially smooth the continuous fields toward their new values.
/// Discrete fields and triggers pass through untouched.
fn apply_smoothing(params: &mut MusicParams, last: &MusicParams, factor: f32) {
    params.bpm = smooth(params.bpm, last.bpm, factor);
    params.beat_intensity = smooth(params.beat_intensity, last.beat_intensity, factor);
    params.pitch_offset = smooth(params.pitch_offset, last.pitch_offset, factor);
    params.volume = smooth(params.volume, last.volume, factor);
    params.pan = smooth(params.pan, last.pan, factor);
    params.distortion = smooth(params.distortion, last.distortion, factor);
    params.reverb = smooth(params.reverb, last.reverb, factor);
    params.filter_cutoff = smooth(params.filter_cutoff, last.filter_cutoff, factor);
    params.warmth = smooth(params.warmth, last.warmth, factor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{SessionStatus, Wheels};

    fn live_sample() -> TelemetrySample {
        TelemetrySample {
            status: SessionStatus::Live,
            speed_kmh: 150.0,
            rpm: 5000,
            gear: 3,
            throttle: 0.8,
            brake: 0.0,
            steer_angle: 0.2,
            g_lateral: 0.5,
            water_temp: 90.0,
            best_lap: 100_000,
            ..Default::default()
        }
    }

    fn assert_in_declared_ranges(p: &MusicParams, c: &Config) {
        assert!(p.bpm >= c.rhythm.bpm_range.0 && p.bpm <= c.rhythm.bpm_range.1);
        assert!(
            p.beat_intensity >= c.rhythm.beat_intensity_range.0
                && p.beat_intensity <= c.rhythm.beat_intensity_range.1
        );
        assert!(p.volume >= c.melody.throttle_volume_range.0);
        assert!(p.volume <= c.melody.throttle_volume_range.1);
        assert!(p.pan >= c.effects.pan_range.0 && p.pan <= c.effects.pan_range.1);
        assert!(p.distortion >= c.effects.distortion_range.0);
        assert!(p.distortion <= c.effects.distortion_range.1);
        assert!(p.reverb >= c.effects.reverb_range.0 && p.reverb <= c.effects.reverb_range.1);
        assert!(p.filter_cutoff >= c.effects.filter_freq_range.0);
        assert!(p.filter_cutoff <= c.effects.filter_freq_range.1);
        assert!(p.warmth >= c.ambience.warmth_range.0 && p.warmth <= c.ambience.warmth_range.1);
    }

    #[test]
    fn in_range_input_stays_in_declared_output_ranges() {
        let config = Config::default();
        let mut mapper = Mapper::new(config.clone());
        let p = mapper.map(&live_sample());
        assert_in_declared_ranges(&p, &config);
    }

    #[test]
    fn extreme_input_is_clamped_not_propagated() {
        let config = Config::default();
        let mut mapper = Mapper::new(config.clone());
        let sample = TelemetrySample {
            speed_kmh: 9000.0,
            rpm: 500_000,
            gear: 42,
            throttle: 55.0,
            brake: -3.0,
            steer_angle: -80.0,
            g_lateral: 1000.0,
            water_temp: 100_000.0,
            wheel_slip: Wheels {
                front_left: 99.0,
                front_right: 99.0,
                rear_left: 99.0,
                rear_right: 99.0,
            },
            ..Default::default()
        };
        // Smoothing would hide a clamp bug behind the default start state,
        // so map twice and check the converged second tick too.
        let p1 = mapper.map(&sample);
        assert!(p1.bpm.is_finite());
        let p2 = mapper.map(&sample);
        assert_in_declared_ranges(&p2, &config);
        assert_eq!(p2.beat_pattern, BeatPattern::RaceMode);
    }

    #[test]
    fn higher_rpm_means_faster_tempo() {
        let mut mapper = Mapper::new(Config::default());
        let mut slow = live_sample();
        slow.rpm = 2000;
        let mut fast = live_sample();
        fast.rpm = 7500;

        let p_slow = mapper.map(&slow);
        mapper.reset();
        let p_fast = mapper.map(&fast);
        assert!(p_fast.bpm > p_slow.bpm);
    }

    #[test]
    fn repeated_input_converges_to_fixed_point() {
        let mut mapper = Mapper::new(Config::default());
        let sample = live_sample();

        let first = mapper.map(&sample);
        let mut prev = first.clone();
        let mut last_delta = f32::MAX;
        for _ in 0..200 {
            let next = mapper.map(&sample);
            let delta = (next.bpm - prev.bpm).abs();
            assert!(delta <= last_delta + 1e-6);
            last_delta = delta;
            prev = next;
        }
        // After 200 smoothing steps at factor 0.1 the output has settled.
        let settled = mapper.map(&sample);
        assert!((settled.bpm - prev.bpm).abs() < 1e-3);
    }

    #[test]
    fn braking_drags_pitch_down() {
        let config = Config::default();
        let mut mapper = Mapper::new(config);
        let mut sample = live_sample();
        sample.steer_angle = 0.0;
        sample.brake = 1.0;
        let p = mapper.map(&sample);
        assert!(p.pitch_offset < 0.0);
    }

    #[test]
    fn pitch_offset_lands_on_the_scale() {
        let config = Config::default();
        let (scale, key) = (config.melody.scale, config.melody.key);
        let mut mapper = Mapper::new(config);
        for steer in [-1.0, -0.6, -0.2, 0.0, 0.3, 0.7, 1.0] {
            mapper.reset();
            let mut sample = live_sample();
            sample.steer_angle = steer;
            let p = mapper.map(&sample);
            let requantized = scale::quantize(p.pitch_offset, scale, key);
            assert!((requantized - p.pitch_offset).abs() < 1e-4);
        }
    }

    #[test]
    fn left_g_pans_left_right_g_pans_right() {
        let mut mapper = Mapper::new(Config::default());
        let mut left = live_sample();
        left.g_lateral = -2.0;
        let p_left = mapper.map(&left);
        assert!(p_left.pan < 0.0);

        mapper.reset();
        let mut right = live_sample();
        right.g_lateral = 2.0;
        let p_right = mapper.map(&right);
        assert!(p_right.pan > 0.0);
    }

    #[test]
    fn slip_below_threshold_leaves_distortion_at_floor() {
        let config = Config::default();
        let mut mapper = Mapper::new(config.clone());
        let mut sample = live_sample();
        sample.wheel_slip = Wheels {
            front_left: 0.05,
            front_right: 0.02,
            rear_left: 0.04,
            rear_right: 0.03,
        };
        let p = mapper.map(&sample);
        assert_eq!(p.distortion, config.effects.distortion_range.0);
    }

    #[test]
    fn turbo_and_warning_triggers_fire_when_enabled() {
        let mut mapper = Mapper::new(Config::default());
        let mut sample = live_sample();
        sample.turbo_boost = 0.9;
        sample.tc_active = 1.0;
        let p = mapper.map(&sample);
        assert!(p.trigger_turbo);
        assert!(p.trigger_warning);
    }

    #[test]
    fn triggers_respect_feature_switches() {
        let mut config = Config::default();
        config.effects.enable_turbo_sound = false;
        config.effects.enable_tc_abs_sound = false;
        let mut mapper = Mapper::new(config);
        let mut sample = live_sample();
        sample.turbo_boost = 0.9;
        sample.abs_active = 1.0;
        let p = mapper.map(&sample);
        assert!(!p.trigger_turbo);
        assert!(!p.trigger_warning);
    }

    #[test]
    fn celebration_fires_only_on_improved_best_lap() {
        let mut mapper = Mapper::new(Config::default());
        let mut sample = live_sample();
        sample.best_lap = 100_000;
        assert!(!mapper.map(&sample).trigger_celebration);

        // Same best lap, no trigger.
        assert!(!mapper.map(&sample).trigger_celebration);

        sample.best_lap = 98_500;
        assert!(mapper.map(&sample).trigger_celebration);

        // Improvement was consumed; steady state again.
        assert!(!mapper.map(&sample).trigger_celebration);
    }

    #[test]
    fn disabled_sections_leave_their_params_at_defaults() {
        let mut config = Config::default();
        config.rhythm.enable_rhythm = false;
        config.effects.enable_effects = false;
        let mut mapper = Mapper::new(config);

        let p = mapper.map(&live_sample());
        let d = MusicParams::default();
        assert_eq!(p.bpm, d.bpm);
        assert_eq!(p.beat_intensity, d.beat_intensity);
        assert_eq!(p.beat_pattern, d.beat_pattern);
        assert_eq!(p.pan, d.pan);
        assert_eq!(p.reverb, d.reverb);
        assert_eq!(p.distortion, d.distortion);
        // Sections still enabled keep mapping.
        assert!(p.volume != d.volume);
    }

    #[test]
    fn celebration_respects_its_own_switch() {
        let mut config = Config::default();
        config.ambience.best_lap_celebration = false;
        let mut mapper = Mapper::new(config);

        let mut sample = live_sample();
        sample.best_lap = 100_000;
        mapper.map(&sample);
        sample.best_lap = 98_500;
        assert!(!mapper.map(&sample).trigger_celebration);
    }

    #[test]
    fn neutral_state_is_silent() {
        let config = Config::default();
        let n = MusicParams::neutral(&config);
        assert_eq!(n.volume, 0.0);
        assert_eq!(n.beat_intensity, 0.0);
        assert_eq!(n.ambient_level, 0.0);
        assert_eq!(n.bpm, config.rhythm.bpm_range.0);
        assert!(!n.trigger_turbo && !n.trigger_warning && !n.trigger_celebration);
    }
}
