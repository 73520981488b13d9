//! Interval lattice over the extended integers.
//!
//! An `Interval` is a closed pair `[lo, hi]` meaning "the value provably
//! lies in this range". Top is `(-inf, +inf)`; there is no explicit bottom
//! (an unreached value is simply absent from the abstract state). Finite
//! bounds are `i128` so the 64-bit classification boundaries are exactly
//! representable; arithmetic that would leave `i128` saturates to the
//! matching infinity, which only ever widens the claim.

use crate::ir::types::IntWidth;

/// One endpoint of an interval.
///
/// The derived order is total: `NegInf < Finite(a) < Finite(b) < PosInf`
/// for `a < b`, which is exactly the extended-integer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bound {
    NegInf,
    Finite(i128),
    PosInf,
}

impl Bound {
    fn neg(self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Finite(x) => x.checked_neg().map(Bound::Finite).unwrap_or(Bound::PosInf),
        }
    }

    /// Addition rounding down: an indeterminate sum becomes `-inf`.
    fn add_low(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
            (Bound::Finite(a), Bound::Finite(b)) => {
                a.checked_add(b).map(Bound::Finite).unwrap_or(Bound::NegInf)
            }
        }
    }

    /// Addition rounding up: an indeterminate sum becomes `+inf`.
    fn add_high(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::Finite(a), Bound::Finite(b)) => {
                a.checked_add(b).map(Bound::Finite).unwrap_or(Bound::PosInf)
            }
        }
    }

    fn sign(self) -> i32 {
        match self {
            Bound::NegInf => -1,
            Bound::PosInf => 1,
            Bound::Finite(x) => match x.cmp(&0) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            },
        }
    }

    fn mul(self, other: Bound) -> Bound {
        if let (Bound::Finite(a), Bound::Finite(b)) = (self, other) {
            return a.checked_mul(b).map(Bound::Finite).unwrap_or_else(|| {
                if (a < 0) != (b < 0) {
                    Bound::NegInf
                } else {
                    Bound::PosInf
                }
            });
        }
        // At least one endpoint is infinite. inf * 0 is 0 in interval
        // arithmetic; otherwise the sign rule applies.
        match self.sign() * other.sign() {
            0 => Bound::Finite(0),
            s if s < 0 => Bound::NegInf,
            _ => Bound::PosInf,
        }
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::NegInf => f.write_str("-inf"),
            Bound::PosInf => f.write_str("+inf"),
            Bound::Finite(x) => write!(f, "{}", x),
        }
    }
}

/// A closed integer interval `[lo, hi]`, `lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl Interval {
    /// `(-inf, +inf)`: no information.
    pub const TOP: Interval = Interval {
        lo: Bound::NegInf,
        hi: Bound::PosInf,
    };

    pub fn new(lo: Bound, hi: Bound) -> Interval {
        debug_assert!(lo <= hi, "malformed interval [{}, {}]", lo, hi);
        Interval { lo, hi }
    }

    /// The interval containing exactly one value.
    pub fn singleton(v: i64) -> Interval {
        let b = Bound::Finite(v as i128);
        Interval { lo: b, hi: b }
    }

    pub fn is_top(&self) -> bool {
        *self == Interval::TOP
    }

    /// Lattice join: the smallest interval covering both operands.
    pub fn join(self, other: Interval) -> Interval {
        Interval {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Widening: a bound that grew since the last visit jumps straight to
    /// its infinity, so fixpoint iteration cannot chase an unbounded chain.
    pub fn widen(old: Interval, new: Interval) -> Interval {
        Interval {
            lo: if new.lo < old.lo { Bound::NegInf } else { old.lo },
            hi: if new.hi > old.hi { Bound::PosInf } else { old.hi },
        }
    }

    /// `[a,b] + [c,d] = [a+c, b+d]`
    pub fn add(self, other: Interval) -> Interval {
        Interval {
            lo: self.lo.add_low(other.lo),
            hi: self.hi.add_high(other.hi),
        }
    }

    /// `[a,b] - [c,d] = [a-d, b-c]`
    pub fn sub(self, other: Interval) -> Interval {
        Interval {
            lo: self.lo.add_low(other.hi.neg()),
            hi: self.hi.add_high(other.lo.neg()),
        }
    }

    /// `[a,b] * [c,d]`: min and max over the four endpoint products.
    pub fn mul(self, other: Interval) -> Interval {
        let products = [
            self.lo.mul(other.lo),
            self.lo.mul(other.hi),
            self.hi.mul(other.lo),
            self.hi.mul(other.hi),
        ];
        Interval {
            lo: products.iter().copied().min().unwrap_or(Bound::NegInf),
            hi: products.iter().copied().max().unwrap_or(Bound::PosInf),
        }
    }

    /// `-[a,b] = [-b, -a]`
    pub fn neg(self) -> Interval {
        Interval {
            lo: self.hi.neg(),
            hi: self.lo.neg(),
        }
    }

    /// `true` if every value of the interval is representable at `width`:
    /// `lo >= -2^W` and `hi <= 2^W - 1`, both inclusive.
    pub fn fits(&self, width: IntWidth) -> bool {
        self.lo >= Bound::Finite(width.min_value()) && self.hi <= Bound::Finite(width.max_value())
    }

    /// `true` if `v` lies inside the interval. Test helper for soundness
    /// assertions.
    pub fn contains(&self, v: i128) -> bool {
        self.lo <= Bound::Finite(v) && Bound::Finite(v) <= self.hi
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lo, self.hi)
    }
}
