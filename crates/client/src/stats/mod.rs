// Session stats - population counts, frames per second, uptime
//
// Read model only: nothing here feeds back into rendering or the connection.
use protocol::Snapshot;

const FPS_WINDOW_MS: f64 = 1000.0;

/// Values published for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsView {
    pub alive: usize,
    pub food: usize,
    /// `None` until the first one-second window has closed.
    pub fps: Option<u32>,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SessionStats {
    started_at: f64,
    alive: usize,
    food: usize,
    frames: u32,
    window_start: f64,
    fps: Option<u32>,
}

impl SessionStats {
    /// `now` is a monotonic millisecond timestamp.
    pub fn new(now: f64) -> Self {
        Self {
            started_at: now,
            alive: 0,
            food: 0,
            frames: 0,
            window_start: now,
            fps: None,
        }
    }

    /// Count one rendered snapshot. Returns true when an fps value was published.
    pub fn record_frame(&mut self, snapshot: &Snapshot, now: f64) -> bool {
        self.alive = snapshot.creatures.len();
        self.food = snapshot.food.len();
        self.frames += 1;
        self.poll(now)
    }

    /// Publish the frame count once a full window has elapsed.
    pub fn poll(&mut self, now: f64) -> bool {
        if now - self.window_start < FPS_WINDOW_MS {
            return false;
        }
        self.fps = Some(self.frames);
        self.frames = 0;
        self.window_start = now;
        true
    }

    pub fn view(&self, now: f64) -> StatsView {
        StatsView {
            alive: self.alive,
            food: self.food,
            fps: self.fps,
            uptime_secs: ((now - self.started_at).max(0.0) / 1000.0) as u64,
        }
    }
}

#[cfg(test)]
impl SessionStats {
    /// Frames counted in the current, still open, window.
    pub fn pending_frames(&self) -> u32 {
        self.frames
    }
}

/// `HH:MM:SS`, hours keep growing past 99.
pub fn format_uptime(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
