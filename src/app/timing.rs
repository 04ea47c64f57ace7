use std::time::{Duration, Instant};

const TITLE_REFRESH_SECS: f32 = 0.5;
const FIRST_FRAME: Duration = Duration::from_millis(16);

/// Frame cadence and the fps readout shown in the window title.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Option<Instant>,
    frame_count: u32,
    pub frame_dt: f32,
    render_ms: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: None,
            frame_count: 0,
            frame_dt: FIRST_FRAME.as_secs_f32(),
            render_ms: 0.0,
            base_title,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Records a frame starting at `now`. Returns a new title roughly twice a
    /// second.
    pub fn update(&mut self, now: Instant) -> Option<String> {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => FIRST_FRAME,
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt.as_secs_f32().max(0.0);

        let since = *self.last_fps_time.get_or_insert(now);
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(since).as_secs_f32();
        if elapsed < TITLE_REFRESH_SECS {
            return None;
        }
        let fps = self.frame_count as f32 / elapsed;
        self.frame_count = 0;
        self.last_fps_time = Some(now);
        Some(format!(
            "{} - {:.1} fps ({:.2} ms/frame, render {:.2} ms)",
            self.base_title,
            fps,
            self.frame_dt * 1000.0,
            self.render_ms
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_assumes_sixty_hz() {
        let mut timing = FrameTiming::new("shapelab".to_string());
        assert!(timing.update(Instant::now()).is_none());
        assert!((timing.frame_dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn title_reports_fps_every_half_second() {
        let mut timing = FrameTiming::new("shapelab".to_string());
        let start = Instant::now();
        let mut titles = Vec::new();
        for frame in 0..=30u64 {
            let now = start + Duration::from_millis(frame * 20);
            if let Some(title) = timing.update(now) {
                titles.push(title);
            }
        }
        assert_eq!(titles.len(), 1);
        assert!(titles[0].starts_with("shapelab - 52.0 fps"), "{}", titles[0]);
        assert!(titles[0].contains("20.00 ms/frame"), "{}", titles[0]);
        assert!((timing.frame_dt - 0.02).abs() < 1e-6);
    }
}
