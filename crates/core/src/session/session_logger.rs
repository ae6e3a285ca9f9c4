use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for authentication session events.
///
/// Decouples the session loop from specific output mechanisms so callers
/// can observe per-frame behavior without changing the orchestration code.
pub trait SessionLogger: Send {
    /// Report frame-level progress against the session's frame cap.
    fn progress(&mut self, current: u64, cap: u64);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. match score, face count).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn progress(&mut self, _current: u64, _cap: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger backed by the `log` facade that tracks per-stage timing and
/// metrics and reports a summary when the session ends.
///
/// Progress output is throttled to every `throttle_frames` frames.
pub struct LogSessionLogger {
    throttle_frames: u64,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: u64,
    messages: Vec<String>,
}

impl LogSessionLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = vec![format!(
            "Session summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for LogSessionLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SessionLogger for LogSessionLogger {
    fn progress(&mut self, current: u64, cap: u64) {
        self.frames = current;
        if current % self.throttle_frames == 0 || current == cap {
            log::info!("Frames: {current}/{cap}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("score", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = LogSessionLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("classify", 5.0);

        assert_eq!(logger.timings_for("detect").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("classify").unwrap(), &[5.0]);
        assert!(logger.timings_for("embed").is_none());
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = LogSessionLogger::new(10);
        logger.progress(4, 100);
        logger.timing("detect", 20.0);
        logger.metric("score", 40.0);
        logger.metric("score", 60.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Session summary (4 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("score: avg 50.0"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogSessionLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = LogSessionLogger::new(10);
        logger.info("session started");
        assert_eq!(logger.messages, vec!["session started".to_string()]);
    }

    #[test]
    fn test_zero_throttle_is_clamped() {
        let logger = LogSessionLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
    }
}
