use std::time::{Duration, Instant};

const STATUS_TTL: Duration = Duration::from_secs(4);

// state local to the tui; everything about the beat itself comes from
// the session's DisplayState each frame
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub show_help: bool,
    status: Option<(String, Instant)>,
}

impl TuiState {
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Instant::now()));
    }

    // the last message, until it goes stale
    pub fn status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| at.elapsed() < STATUS_TTL)
            .map(|(msg, _)| msg.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_shown_after_being_set() {
        let mut ts = TuiState::default();
        assert_eq!(ts.status(), None);
        ts.set_status("saved MyBeat.beat");
        assert_eq!(ts.status(), Some("saved MyBeat.beat"));
    }
}
