//! Progress and info notification sinks.
//!
//! Generation reports two independent streams: an integer percentage and
//! human-readable stage labels. Sinks are passed explicitly into the
//! generation entry point and invoked synchronously at fixed milestones.

/// Receives progress notifications from a running generation.
pub trait ProgressSink: Send {
    /// Overall progress as a percentage in [0, 100]. Values are
    /// monotonically non-decreasing over one run.
    fn on_progress(&mut self, percent: u8);

    /// A stage label or diagnostic message.
    fn on_info(&mut self, info: &str);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&mut self, _percent: u8) {}
    fn on_info(&mut self, _info: &str) {}
}

/// Adapts a pair of closures to a [`ProgressSink`].
pub struct CallbackSink<P, I> {
    pub progress: P,
    pub info: I,
}

impl<P, I> ProgressSink for CallbackSink<P, I>
where
    P: FnMut(u8) + Send,
    I: FnMut(&str) + Send,
{
    fn on_progress(&mut self, percent: u8) {
        (self.progress)(percent);
    }

    fn on_info(&mut self, info: &str) {
        (self.info)(info);
    }
}

/// Converts raw stage fractions into clamped, monotonically non-decreasing
/// percentages before forwarding them to the sink.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    last_percent: u8,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            last_percent: 0,
        }
    }

    /// Reports `fraction` in [0, 1] as a whole percentage, never below an
    /// earlier report.
    pub(crate) fn report(&mut self, fraction: f32) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8;
        self.last_percent = self.last_percent.max(percent);
        self.sink.on_progress(self.last_percent);
    }

    pub(crate) fn info(&mut self, info: &str) {
        self.sink.on_info(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_clamps_and_stays_monotonic() {
        let mut percents = Vec::new();
        let mut sink = CallbackSink {
            progress: |p| percents.push(p),
            info: |_: &str| {},
        };

        {
            let mut tracker = ProgressTracker::new(&mut sink);
            tracker.report(0.25);
            tracker.report(0.1); // regression must not surface
            tracker.report(1.5); // clamped to 100
            tracker.report(0.9);
        }

        assert_eq!(percents, vec![25, 25, 100, 100]);
    }

    #[test]
    fn test_callback_sink_forwards_info() {
        let mut infos: Vec<String> = Vec::new();
        let mut sink = CallbackSink {
            progress: |_| {},
            info: |s: &str| infos.push(s.to_string()),
        };

        sink.on_info("Simulating Tectonics");
        sink.on_progress(10);

        assert_eq!(infos, vec!["Simulating Tectonics".to_string()]);
    }
}
