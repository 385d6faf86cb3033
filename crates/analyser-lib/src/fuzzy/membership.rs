//! Linguistic labels and membership functions
//!
//! Every fuzzy variable is partitioned into the same five labels with
//! breakpoints at quarter fractions of its universe. The two edge labels
//! collapse their outer side onto the universe boundary, which keeps the
//! five degrees summing to exactly 1 at every point of the universe.

use serde::{Deserialize, Serialize};

/// The five linguistic labels shared by every variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Label {
    pub const ALL: [Label; 5] = [
        Label::VeryLow,
        Label::Low,
        Label::Medium,
        Label::High,
        Label::VeryHigh,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::VeryLow => write!(f, "very_low"),
            Label::Low => write!(f, "low"),
            Label::Medium => write!(f, "medium"),
            Label::High => write!(f, "high"),
            Label::VeryHigh => write!(f, "very_high"),
        }
    }
}

/// Triangular membership function with vertices `a <= b <= c`.
///
/// `a == b` or `b == c` degenerates the corresponding side into a step,
/// which is how the shoulder labels at the universe edges are expressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    a: f64,
    b: f64,
    c: f64,
}

impl Triangle {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        debug_assert!(a <= b && b <= c);
        Self { a, b, c }
    }

    /// Membership degree of `x`, in `[0, 1]`.
    pub fn degree(&self, x: f64) -> f64 {
        if x < self.a || x > self.c {
            0.0
        } else if x <= self.b {
            if self.b == self.a {
                1.0
            } else {
                (x - self.a) / (self.b - self.a)
            }
        } else if self.c == self.b {
            1.0
        } else {
            (self.c - x) / (self.c - self.b)
        }
    }
}

/// Build the five-label partition of `[0, universe_max]`.
///
/// Breakpoints sit at quarter fractions; each label overlaps only its
/// immediate neighbors.
pub fn auto_partition(universe_max: f64) -> [Triangle; 5] {
    let q = universe_max / 4.0;
    [
        Triangle::new(0.0, 0.0, q),
        Triangle::new(0.0, q, 2.0 * q),
        Triangle::new(q, 2.0 * q, 3.0 * q),
        Triangle::new(2.0 * q, 3.0 * q, 4.0 * q),
        Triangle::new(3.0 * q, 4.0 * q, 4.0 * q),
    ]
}

/// Fuzzify `x` against a partition: one degree per label.
pub fn fuzzify(partition: &[Triangle; 5], x: f64) -> [f64; 5] {
    let mut degrees = [0.0; 5];
    for (slot, mf) in degrees.iter_mut().zip(partition.iter()) {
        *slot = mf.degree(x);
    }
    degrees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_degrees() {
        let mf = Triangle::new(0.0, 10.0, 20.0);
        assert_eq!(mf.degree(-1.0), 0.0);
        assert_eq!(mf.degree(0.0), 0.0);
        assert!((mf.degree(5.0) - 0.5).abs() < 1e-9);
        assert_eq!(mf.degree(10.0), 1.0);
        assert!((mf.degree(15.0) - 0.5).abs() < 1e-9);
        assert_eq!(mf.degree(20.0), 0.0);
        assert_eq!(mf.degree(25.0), 0.0);
    }

    #[test]
    fn test_shoulder_triangles_are_full_at_the_edge() {
        let left = Triangle::new(0.0, 0.0, 25.0);
        assert_eq!(left.degree(0.0), 1.0);
        assert!((left.degree(12.5) - 0.5).abs() < 1e-9);
        assert_eq!(left.degree(25.0), 0.0);

        let right = Triangle::new(75.0, 100.0, 100.0);
        assert_eq!(right.degree(100.0), 1.0);
        assert!((right.degree(87.5) - 0.5).abs() < 1e-9);
        assert_eq!(right.degree(75.0), 0.0);
    }

    #[test]
    fn test_partition_of_unity() {
        for universe_max in [100.0, 1000.0, 37.0] {
            let partition = auto_partition(universe_max);
            let steps = 200;
            for i in 0..=steps {
                let x = universe_max * f64::from(i) / f64::from(steps);
                let total: f64 = fuzzify(&partition, x).iter().sum();
                assert!(
                    (total - 1.0).abs() < 1e-9,
                    "membership sum at x={x} on [0,{universe_max}] was {total}"
                );
            }
        }
    }

    #[test]
    fn test_each_label_overlaps_only_neighbors() {
        let partition = auto_partition(100.0);
        // At the midpoint of very_low/low overlap, medium and above are zero.
        let degrees = fuzzify(&partition, 12.5);
        assert!(degrees[Label::VeryLow.index()] > 0.0);
        assert!(degrees[Label::Low.index()] > 0.0);
        assert_eq!(degrees[Label::Medium.index()], 0.0);
        assert_eq!(degrees[Label::High.index()], 0.0);
        assert_eq!(degrees[Label::VeryHigh.index()], 0.0);
    }
}
