use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Wall-clock timer for one pipeline stage.
///
/// Starting and stopping are logged at `info` so a request's stage
/// breakdown shows up in the service log without extra plumbing.
pub struct Timer {
    stage: String,
    started: Option<DateTime<Utc>>,
    elapsed: Option<Duration>,
}

impl Timer {
    pub fn new(stage: &str) -> Self {
        Timer {
            stage: stage.to_owned(),
            started: None,
            elapsed: None,
        }
    }

    /// Create a timer that is already running.
    pub fn started(stage: &str) -> Self {
        let mut t = Timer::new(stage);
        t.start();
        t
    }

    pub fn start(&mut self) {
        debug!("{}: starting", self.stage);

        self.started = Some(Utc::now());
        self.elapsed = None;
    }

    /// Stop the timer and return the elapsed milliseconds.
    pub fn stop(&mut self) -> i64 {
        match self.started.take() {
            None => debug!("{}: not running", self.stage),
            Some(started) => {
                let d = Utc::now() - started;

                self.elapsed = Some(d);
                info!("{} took {} msec", self.stage, d.num_milliseconds());
            }
        }

        self.millis()
    }

    /// Milliseconds measured by the last `stop`, or 0 if never stopped.
    pub fn millis(&self) -> i64 {
        self.elapsed.map_or(0, |d| d.num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::Timer;

    #[test]
    fn unstarted_timer_reports_zero() {
        let mut t = Timer::new("idle");
        assert_eq!(t.stop(), 0);
        assert_eq!(t.millis(), 0);
    }

    #[test]
    fn stopped_timer_keeps_its_measurement() {
        let mut t = Timer::started("sleep");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let ms = t.stop();
        assert!(ms >= 5);
        assert_eq!(t.millis(), ms);

        // a second stop is a no-op
        assert_eq!(t.stop(), ms);
    }
}
