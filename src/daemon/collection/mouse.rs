use chrono::NaiveDate;

/// Turns absolute pointer positions into travelled distance.
#[derive(Debug, Default)]
pub struct MouseTracker {
    last: Option<(f64, f64)>,
    day: Option<NaiveDate>,
}

impl MouseTracker {
    /// Returns the Euclidean distance from the previous position. The first position of a day
    /// only seeds the tracker, so distance never leaks across midnight.
    pub fn move_to(&mut self, x: f64, y: f64, today: NaiveDate) -> Option<f64> {
        let previous = if self.day == Some(today) {
            self.last
        } else {
            None
        };
        self.last = Some((x, y));
        self.day = Some(today);

        let (previous_x, previous_y) = previous?;
        let distance = (x - previous_x).hypot(y - previous_y);
        (distance > 0.).then_some(distance)
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.day = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::MouseTracker;

    const DAY: NaiveDate = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    #[test]
    fn first_position_only_seeds() {
        let mut tracker = MouseTracker::default();
        assert_eq!(tracker.move_to(100., 200., DAY), None);
        assert_eq!(tracker.move_to(130., 240., DAY), Some(50.));
        assert_eq!(tracker.move_to(130., 240., DAY), None);
    }

    #[test]
    fn new_day_reseeds() {
        let mut tracker = MouseTracker::default();
        tracker.move_to(0., 0., DAY);
        let next_day = DAY.succ_opt().unwrap();
        assert_eq!(tracker.move_to(300., 400., next_day), None);
        assert_eq!(tracker.move_to(300., 410., next_day), Some(10.));

        tracker.reset();
        assert_eq!(tracker.move_to(0., 0., next_day), None);
    }
}
