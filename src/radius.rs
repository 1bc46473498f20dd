//! Region radii as linear functions of time, packed into a single integer.
//!
//! The bottom two bits encode the slope (0b01 growing, 0b10 shrinking, 0b00
//! frozen); the remaining bits are the y-intercept shifted left by two.
//! Evaluating at a time, freezing, and re-sloping are each a couple of
//! shifts and adds, which matters because the flooder recomputes collision
//! times on every node visit.

use crate::ints::Time;
use std::ops::{Add, Sub};

const GROWING: i64 = 0b01;
const SHRINKING: i64 = 0b10;
const SLOPE_MASK: i64 = 0b11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Radius(pub i64);

impl Radius {
    /// A constant radius of `base`.
    pub const fn frozen(base: Time) -> Radius {
        Radius(base << 2)
    }

    /// A radius that is zero at `time` and grows at unit rate.
    pub const fn growing_from_zero_at(time: Time) -> Radius {
        Radius(((-time) << 2) | GROWING)
    }

    /// The y-intercept: the radius this line would have at time zero.
    #[inline]
    pub fn base(&self) -> Time {
        self.0 >> 2
    }

    #[inline]
    pub fn is_growing(&self) -> bool {
        self.0 & GROWING != 0
    }

    #[inline]
    pub fn is_shrinking(&self) -> bool {
        self.0 & SHRINKING != 0
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.0 & SLOPE_MASK == 0
    }

    /// Value of the radius at absolute time `time`.
    #[inline]
    pub fn at(&self, time: Time) -> Time {
        if self.is_growing() {
            (self.0 >> 2) + time
        } else if self.is_shrinking() {
            (self.0 >> 2) - time
        } else {
            self.0 >> 2
        }
    }

    /// Time at which the radius crosses zero.
    ///
    /// Panics on a frozen radius, which never does.
    pub fn zero_time(&self) -> Time {
        if self.is_growing() {
            -(self.0 >> 2)
        } else if self.is_shrinking() {
            self.0 >> 2
        } else {
            panic!("frozen radius never reaches zero")
        }
    }

    /// Time at which `self + other` crosses zero, assuming the pair is
    /// approaching (combined slope 1 or 2).
    pub fn sum_zero_time(&self, other: Radius) -> Time {
        let neg_sum = -(self.0 >> 2) - (other.0 >> 2);
        if self.is_growing() && other.is_growing() {
            neg_sum >> 1
        } else {
            neg_sum
        }
    }

    /// True when exactly one side is growing and the other is growing or
    /// frozen, i.e. the two fronts are closing their gap.
    #[inline]
    pub fn approaching(&self, other: Radius) -> bool {
        (self.0 | other.0) & SLOPE_MASK == GROWING
    }

    /// Keep the current value at `time`, switch slope to +1.
    pub fn then_growing_at(&self, time: Time) -> Radius {
        Radius(((self.at(time) - time) << 2) | GROWING)
    }

    /// Keep the current value at `time`, switch slope to -1.
    pub fn then_shrinking_at(&self, time: Time) -> Radius {
        Radius(((self.at(time) + time) << 2) | SHRINKING)
    }

    /// Keep the current value at `time`, switch slope to 0.
    pub fn then_frozen_at(&self, time: Time) -> Radius {
        Radius(self.at(time) << 2)
    }
}

impl Add<Time> for Radius {
    type Output = Radius;
    #[inline]
    fn add(self, rhs: Time) -> Radius {
        Radius(self.0 + (rhs << 2))
    }
}

impl Sub<Time> for Radius {
    type Output = Radius;
    #[inline]
    fn sub(self, rhs: Time) -> Radius {
        Radius(self.0 - (rhs << 2))
    }
}
