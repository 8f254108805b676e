//! Classification of day-over-day position changes.
//!
//! Both the roll-cost charge and the holding-time tracker branch on how a
//! position moved between two days. The branch is computed once here as a
//! [`PositionChange`] so each case can be reasoned about (and tested) on
//! its own.

/// How a position moved from `prev` to `next`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionChange {
    /// No change (within tolerance).
    Hold,
    /// From flat to a non-zero position.
    Open,
    /// Same direction, larger magnitude.
    Add,
    /// Same direction, smaller magnitude.
    Reduce,
    /// Crossed zero into the opposite direction.
    Flip,
    /// From a non-zero position to flat.
    Close,
}

impl PositionChange {
    /// Classify the move `prev -> next`.
    ///
    /// Changes with `|next - prev| < tolerance` are [`Hold`](Self::Hold);
    /// with a zero tolerance only exact equality holds.
    pub fn classify(prev: f64, next: f64, tolerance: f64) -> Self {
        let delta = next - prev;
        if delta == 0.0 || delta.abs() < tolerance {
            PositionChange::Hold
        } else if prev == 0.0 {
            PositionChange::Open
        } else if next == 0.0 {
            PositionChange::Close
        } else if (prev > 0.0) != (next > 0.0) {
            PositionChange::Flip
        } else if next.abs() > prev.abs() {
            PositionChange::Add
        } else {
            PositionChange::Reduce
        }
    }
}

/// Size of the position held over from `prev` into `next` in the same
/// direction: `min(|prev|, |next|)` when both are non-zero with equal sign,
/// zero otherwise. Same-day increases are not part of it.
pub fn carried_over(prev: f64, next: f64) -> f64 {
    match PositionChange::classify(prev, next, 0.0) {
        PositionChange::Hold | PositionChange::Add | PositionChange::Reduce => {
            prev.abs().min(next.abs())
        }
        PositionChange::Open | PositionChange::Flip | PositionChange::Close => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PositionChange::*;

    #[test]
    fn classify_each_branch() {
        assert_eq!(PositionChange::classify(0.0, 0.0, 0.0), Hold);
        assert_eq!(PositionChange::classify(1.0, 1.0 + 1e-9, 1e-7), Hold);
        assert_eq!(PositionChange::classify(0.0, 2.0, 0.0), Open);
        assert_eq!(PositionChange::classify(0.0, -2.0, 0.0), Open);
        assert_eq!(PositionChange::classify(1.0, 2.0, 0.0), Add);
        assert_eq!(PositionChange::classify(-1.0, -2.0, 0.0), Add);
        assert_eq!(PositionChange::classify(2.0, 1.0, 0.0), Reduce);
        assert_eq!(PositionChange::classify(-2.0, -1.0, 0.0), Reduce);
        assert_eq!(PositionChange::classify(1.0, -1.0, 0.0), Flip);
        assert_eq!(PositionChange::classify(-1.0, 3.0, 0.0), Flip);
        assert_eq!(PositionChange::classify(1.0, 0.0, 0.0), Close);
    }

    #[test]
    fn carried_over_excludes_increase() {
        assert_eq!(carried_over(2.0, 5.0), 2.0);
        assert_eq!(carried_over(5.0, 2.0), 2.0);
        assert_eq!(carried_over(-3.0, -3.0), 3.0);
        assert_eq!(carried_over(2.0, -2.0), 0.0);
        assert_eq!(carried_over(0.0, 2.0), 0.0);
        assert_eq!(carried_over(2.0, 0.0), 0.0);
        assert_eq!(carried_over(0.0, 0.0), 0.0);
    }
}
