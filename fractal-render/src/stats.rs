use std::time::Duration;

use crate::tile::{RenderBox, RenderBoxState};

/// Aggregate timing over the tiles of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderBoxTimeStats {
    pub min: Duration,
    pub max: Duration,
    pub average: Duration,
    /// `(unfinished tiles × average) / threads`.
    pub remaining: Duration,
    pub completed: usize,
    pub total: usize,
}

impl RenderBoxTimeStats {
    /// All durations are zero until at least one tile has finished.
    pub fn from_boxes(boxes: &[RenderBox], threads: usize) -> Self {
        let finished: Vec<Duration> = boxes
            .iter()
            .filter(|b| b.state == RenderBoxState::Rendered)
            .map(|b| b.render_time)
            .collect();

        let total = boxes.len();
        let completed = finished.len();
        let (Some(&min), Some(&max)) = (finished.iter().min(), finished.iter().max()) else {
            return Self {
                total,
                ..Self::default()
            };
        };

        let sum: Duration = finished.iter().sum();
        let average = sum / completed as u32;
        let unfinished = (total - completed) as f64;
        let remaining = average.mul_f64(unfinished / threads.max(1) as f64);

        Self {
            min,
            max,
            average,
            remaining,
            completed,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(state: RenderBoxState, ms: u64) -> RenderBox {
        RenderBox {
            state,
            render_time: Duration::from_millis(ms),
            ..RenderBox::new(0, 0, 8, 8)
        }
    }

    #[test]
    fn empty_pass_is_all_zero() {
        let stats = RenderBoxTimeStats::from_boxes(&[], 4);
        assert_eq!(stats, RenderBoxTimeStats::default());

        let queued = [tile(RenderBoxState::Queued, 0); 3];
        let stats = RenderBoxTimeStats::from_boxes(&queued, 4);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.remaining, Duration::ZERO);
    }

    #[test]
    fn aggregates_finished_tiles_and_extrapolates() {
        let boxes = [
            tile(RenderBoxState::Rendered, 10),
            tile(RenderBoxState::Rendered, 30),
            tile(RenderBoxState::Rendering, 0),
            tile(RenderBoxState::Queued, 0),
            tile(RenderBoxState::Queued, 0),
            tile(RenderBoxState::Queued, 0),
        ];
        let stats = RenderBoxTimeStats::from_boxes(&boxes, 2);
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(30));
        assert_eq!(stats.average, Duration::from_millis(20));
        // 4 unfinished × 20 ms / 2 threads.
        assert_eq!(stats.remaining, Duration::from_millis(40));
        assert_eq!((stats.completed, stats.total), (2, 6));
    }
}
