//! The `SampleAccumulator` drains a [`TelemetrySource`] and holds the most
//! recent samples. It can be queried for the freshest state with
//! [`SampleAccumulator::latest`], which also smooths the jumpy channels
//! (G forces, wheel slip) over a short window and answers with the
//! last-known sample while the source is dropped out.

use crate::telemetry::{TelemetrySample, TelemetrySource, Wheels};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Window for the rolling average of the noisy channels.
const BUFFER_SIZE: usize = 5;

/// What [`SampleAccumulator::latest`] knows about the current tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Latest {
    /// A sample derived from fresh data this tick.
    Fresh(TelemetrySample),
    /// No fresh data; this is the last-known sample, with the number of
    /// consecutive ticks it has been reused.
    Held(TelemetrySample, u32),
    /// Nothing has ever arrived from the source.
    Empty,
}

pub struct SampleAccumulator<Src>
where
    Src: TelemetrySource,
{
    source_handle: Arc<Mutex<Src>>,

    // Recent samples, newest at the back.
    window: VecDeque<TelemetrySample>,

    // Consecutive latest() calls that produced no fresh sample.
    stale_ticks: u32,
}

impl<Src> SampleAccumulator<Src>
where
    Src: TelemetrySource,
{
    /// Instantiates a new `SampleAccumulator` attached to a source.
    pub fn new(source_handle: Arc<Mutex<Src>>) -> Self {
        Self {
            source_handle,
            window: VecDeque::new(),
            stale_ticks: 0,
        }
    }

    /// Drain the source and report the freshest available state. The
    /// returned sample's G forces and wheel slip are averaged over the
    /// last [`BUFFER_SIZE`] samples so a single spiky physics frame does
    /// not slam the music.
    pub fn latest(&mut self) -> Latest {
        let mut got_fresh = false;
        for sample in self.source_handle.lock().unwrap().by_ref() {
            self.window.push_back(sample);
            got_fresh = true;
        }
        while self.window.len() > BUFFER_SIZE {
            self.window.pop_front();
        }

        let newest = match self.window.back() {
            Some(s) => s.clone(),
            None => return Latest::Empty,
        };

        if got_fresh {
            self.stale_ticks = 0;
            Latest::Fresh(self.averaged(newest))
        } else {
            self.stale_ticks += 1;
            Latest::Held(self.averaged(newest), self.stale_ticks)
        }
    }

    fn averaged(&self, mut newest: TelemetrySample) -> TelemetrySample {
        let len = self.window.len() as f32;
        debug_assert!(len > 0.0);

        let mut g_lat = 0.0;
        let mut g_lon = 0.0;
        let mut slip = Wheels::default();
        for s in &self.window {
            g_lat += s.g_lateral;
            g_lon += s.g_longitudinal;
            slip.front_left += s.wheel_slip.front_left;
            slip.front_right += s.wheel_slip.front_right;
            slip.rear_left += s.wheel_slip.rear_left;
            slip.rear_right += s.wheel_slip.rear_right;
        }

        newest.g_lateral = g_lat / len;
        newest.g_longitudinal = g_lon / len;
        newest.wheel_slip = Wheels {
            front_left: slip.front_left / len,
            front_right: slip.front_right / len,
            rear_left: slip.rear_left / len,
            rear_right: slip.rear_right / len,
        };
        newest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::SessionStatus;
    use std::collections::VecDeque;

    /// A scriptable source backed by a queue of samples.
    #[derive(Default)]
    struct ScriptedSource {
        queue: VecDeque<TelemetrySample>,
    }

    impl Iterator for ScriptedSource {
        type Item = TelemetrySample;
        fn next(&mut self) -> Option<Self::Item> {
            self.queue.pop_front()
        }
    }

    impl TelemetrySource for ScriptedSource {
        fn connected(&self) -> bool {
            true
        }
    }

    fn sample_with_g(g_lateral: f32) -> TelemetrySample {
        TelemetrySample {
            status: SessionStatus::Live,
            g_lateral,
            ..Default::default()
        }
    }

    #[test]
    fn empty_source_reports_empty() {
        let src = Arc::new(Mutex::new(ScriptedSource::default()));
        let mut acc = SampleAccumulator::new(src);
        assert_eq!(acc.latest(), Latest::Empty);
    }

    #[test]
    fn fresh_samples_are_averaged_over_window() {
        let src = Arc::new(Mutex::new(ScriptedSource::default()));
        {
            let mut locked = src.lock().unwrap();
            for g in [1.0, 2.0, 3.0] {
                locked.queue.push_back(sample_with_g(g));
            }
        }
        let mut acc = SampleAccumulator::new(Arc::clone(&src));
        match acc.latest() {
            Latest::Fresh(s) => assert!((s.g_lateral - 2.0).abs() < 1e-6),
            other => panic!("expected fresh sample, got {:?}", other),
        }
    }

    #[test]
    fn window_is_bounded() {
        let src = Arc::new(Mutex::new(ScriptedSource::default()));
        {
            let mut locked = src.lock().unwrap();
            for i in 0..20 {
                locked.queue.push_back(sample_with_g(i as f32));
            }
        }
        let mut acc = SampleAccumulator::new(Arc::clone(&src));
        match acc.latest() {
            // Only the last BUFFER_SIZE samples (15..19) survive.
            Latest::Fresh(s) => assert!((s.g_lateral - 17.0).abs() < 1e-6),
            other => panic!("expected fresh sample, got {:?}", other),
        }
    }

    #[test]
    fn dropout_holds_last_known_and_counts() {
        let src = Arc::new(Mutex::new(ScriptedSource::default()));
        src.lock().unwrap().queue.push_back(sample_with_g(1.5));

        let mut acc = SampleAccumulator::new(Arc::clone(&src));
        assert!(matches!(acc.latest(), Latest::Fresh(_)));

        match acc.latest() {
            Latest::Held(s, ticks) => {
                assert!((s.g_lateral - 1.5).abs() < 1e-6);
                assert_eq!(ticks, 1);
            }
            other => panic!("expected held sample, got {:?}", other),
        }
        assert!(matches!(acc.latest(), Latest::Held(_, 2)));

        // Fresh data resets the staleness counter.
        src.lock().unwrap().queue.push_back(sample_with_g(0.5));
        assert!(matches!(acc.latest(), Latest::Fresh(_)));
    }
}
