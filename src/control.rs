//! Translates [`MusicParams`] into the engine's OSC address space. The
//! addresses are fixed contract with the SuperCollider patch: musical
//! parameters live under `/acc/music/`, the untouched channel feed under
//! `/acc/raw/` for patches that want to do their own mapping.

use crate::config::Config;
use crate::mapper::MusicParams;
use crate::osc::OscMessage;
use crate::telemetry::TelemetrySample;

/// The parameter messages for one tick.
pub fn music_messages(params: &MusicParams) -> Vec<OscMessage> {
    let mut msgs = vec![
        OscMessage::single("/acc/music/bpm", params.bpm),
        OscMessage::single("/acc/music/beat/intensity", params.beat_intensity),
        OscMessage::single("/acc/music/beat/pattern", params.beat_pattern.tag()),
        OscMessage::single("/acc/music/pitch/base", params.base_pitch),
        OscMessage::single("/acc/music/pitch/offset", params.pitch_offset),
        OscMessage::single("/acc/music/dynamics/volume", params.volume),
        OscMessage::single("/acc/music/timbre/filter", params.filter_cutoff),
        OscMessage::single("/acc/music/timbre/resonance", params.filter_resonance),
        OscMessage::single("/acc/music/timbre/distortion", params.distortion),
        OscMessage::single("/acc/music/timbre/warmth", params.warmth),
        OscMessage::single("/acc/music/spatial/pan", params.pan),
        OscMessage::single("/acc/music/spatial/reverb", params.reverb),
        OscMessage::single("/acc/music/ambient/level", params.ambient_level),
    ];

    // Triggers are only sent on the tick they fire, so the patch can
    // treat any arrival as the event itself.
    if params.trigger_turbo {
        msgs.push(OscMessage::single("/acc/music/event/turbo", 1_i32));
    }
    if params.trigger_warning {
        msgs.push(OscMessage::single("/acc/music/event/warning", 1_i32));
    }
    if params.trigger_celebration {
        msgs.push(OscMessage::single("/acc/music/event/celebration", 1_i32));
    }

    msgs
}

/// The raw channel feed, for patches mapping telemetry themselves.
pub fn raw_messages(sample: &TelemetrySample) -> Vec<OscMessage> {
    vec![
        OscMessage::single("/acc/raw/speed", sample.speed_kmh),
        OscMessage::single("/acc/raw/rpm", sample.rpm),
        OscMessage::single("/acc/raw/gear", sample.gear),
        OscMessage::single("/acc/raw/throttle", sample.throttle),
        OscMessage::single("/acc/raw/brake", sample.brake),
        OscMessage::single("/acc/raw/steer", sample.steer_angle),
    ]
}

/// The bundle sent when telemetry has been gone long enough that holding
/// the last state would be a lie. Built from [`MusicParams::neutral`], so
/// it pulls the mix to silence while parking the rest of the parameters;
/// the patch stays alive and picks right back up when data returns.
pub fn silence_messages(config: &Config) -> Vec<OscMessage> {
    music_messages(&MusicParams::neutral(config))
}
