//! Run statistics.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Metrics of one image evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStats {
    pub image_path: Option<PathBuf>,
    pub height: usize,
    pub width: usize,
    pub batches: usize,
    /// Pixels inside the image's coverage.
    pub valid_pixels: usize,
    pub elapsed: Duration,
}

impl ImageStats {
    pub fn total_pixels(&self) -> usize {
        self.height * self.width
    }

    /// Classified pixels per second.
    pub fn pixels_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_pixels() as f64 / secs
        }
    }
}

/// Statistics of a whole fusion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub images: Vec<ImageStats>,
    /// Pixels covered by at least one image in the fused result.
    pub covered_pixels: usize,
    pub total_elapsed: Duration,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, image: ImageStats) {
        self.images.push(image);
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn total_pixels(&self) -> usize {
        self.images.iter().map(ImageStats::total_pixels).sum()
    }

    pub fn total_batches(&self) -> usize {
        self.images.iter().map(|s| s.batches).sum()
    }

    pub fn valid_pixels(&self) -> usize {
        self.images.iter().map(|s| s.valid_pixels).sum()
    }

    /// Mean evaluation time per image in milliseconds.
    pub fn average_image_time_ms(&self) -> f64 {
        if self.images.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .images
            .iter()
            .map(|s| s.elapsed.as_secs_f64() * 1000.0)
            .sum();
        total / self.images.len() as f64
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Statistics:")?;
        writeln!(f, "  Images: {}", self.image_count())?;
        writeln!(
            f,
            "  Pixels: {} ({} valid)",
            self.total_pixels(),
            self.valid_pixels()
        )?;
        writeln!(f, "  Batches: {}", self.total_batches())?;
        writeln!(f, "  Fused coverage: {} pixels", self.covered_pixels)?;
        writeln!(
            f,
            "  Average image time: {:.2} ms",
            self.average_image_time_ms()
        )?;
        writeln!(
            f,
            "  Total time: {:.2} s",
            self.total_elapsed.as_secs_f64()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(batches: usize, valid: usize, ms: u64) -> ImageStats {
        ImageStats {
            image_path: None,
            height: 10,
            width: 20,
            batches,
            valid_pixels: valid,
            elapsed: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_run_stats_aggregates() {
        let mut stats = RunStats::new();
        assert_eq!(stats.average_image_time_ms(), 0.0);
        stats.record(image(4, 150, 100));
        stats.record(image(4, 200, 300));

        assert_eq!(stats.image_count(), 2);
        assert_eq!(stats.total_pixels(), 400);
        assert_eq!(stats.total_batches(), 8);
        assert_eq!(stats.valid_pixels(), 350);
        assert!((stats.average_image_time_ms() - 200.0).abs() < 1e-9);
        assert!(stats.to_string().contains("Images: 2"));
    }

    #[test]
    fn test_pixels_per_second() {
        assert_eq!(image(1, 0, 0).pixels_per_second(), 0.0);
        assert!((image(1, 0, 1000).pixels_per_second() - 200.0).abs() < 1e-9);
    }
}
