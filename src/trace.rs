//! Human readable progress lines emitted while a run is in progress

/// Receives one line of progress narration at a time
pub trait TraceSink {
    fn trace(&mut self, line: &str);
}

impl<F> TraceSink for F
where
    F: FnMut(&str),
{
    fn trace(&mut self, line: &str) {
        self(line)
    }
}

/// Forwards every line to `tracing` at info level
#[derive(Debug, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn trace(&mut self, line: &str) {
        tracing::info!(target: "backup_monitor::trace", "{}", line);
    }
}

/// Passes lines through to an inner sink and keeps a copy of each
pub struct RecordingSink<'a> {
    inner: &'a mut dyn TraceSink,
    lines: Vec<String>,
}

impl<'a> RecordingSink<'a> {
    pub fn new(inner: &'a mut dyn TraceSink) -> Self {
        Self {
            inner,
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl TraceSink for RecordingSink<'_> {
    fn trace(&mut self, line: &str) {
        self.lines.push(line.to_string());
        self.inner.trace(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |line: &str| seen.push(line.to_string());
            sink.trace("first");
            sink.trace("second");
        }
        assert_eq!(seen, vec!["first", "second"]);
    }

    #[test]
    fn test_recording_sink_tees_lines() {
        let mut forwarded = Vec::new();
        let mut inner = |line: &str| forwarded.push(line.to_string());

        let mut recorder = RecordingSink::new(&mut inner);
        recorder.trace("Analysis started.");
        recorder.trace("Group: nas");
        assert_eq!(recorder.lines().len(), 2);

        let recorded = recorder.into_lines();
        assert_eq!(recorded, vec!["Analysis started.", "Group: nas"]);
        assert_eq!(forwarded, recorded);
    }
}
