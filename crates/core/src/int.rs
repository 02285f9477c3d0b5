use core::{
    cmp::Ordering,
    fmt::{self, Display},
    hash::{Hash, Hasher},
    str::FromStr,
};
use num_bigint::{BigInt, ParseBigIntError, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// An arbitrary-precision signed integer.
///
/// All Whitespace values, labels, and folded constants are [`Int`]s.
/// Equality, ordering, and hashing are value-based; the hash writes only the
/// low 64 bits of the two's complement representation so that maps keyed by
/// [`Int`] bucket by those bits and resolve collisions by full comparison.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Int(BigInt);

impl Int {
    /// Returns the integer zero.
    pub fn zero() -> Self {
        Self(BigInt::ZERO)
    }

    /// Creates an [`Int`] from a sign and big-endian binary digits.
    ///
    /// An empty digit sequence denotes zero. This is the form in which the
    /// lexer collects `push`, `copy`, `slide`, and label arguments.
    pub fn from_bits(negative: bool, bits: impl IntoIterator<Item = bool>) -> Self {
        let mut magnitude = BigInt::ZERO;
        for bit in bits {
            magnitude <<= 1usize;
            if bit {
                magnitude += 1;
            }
        }
        if negative {
            magnitude = -magnitude;
        }
        Self(magnitude)
    }

    /// Returns `true` if `self` is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if `self` is one.
    pub fn is_one(&self) -> bool {
        self.0.sign() == Sign::Plus && self.0.magnitude().is_one()
    }

    /// Returns `true` if `self` is negative one.
    pub fn is_neg_one(&self) -> bool {
        self.0.sign() == Sign::Minus && self.0.magnitude().is_one()
    }

    /// Returns `true` if `self` is negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Returns the sum of `self` and `rhs`.
    pub fn add(&self, rhs: &Self) -> Self {
        Self(&self.0 + &rhs.0)
    }

    /// Returns the difference of `self` and `rhs`.
    pub fn sub(&self, rhs: &Self) -> Self {
        Self(&self.0 - &rhs.0)
    }

    /// Returns the product of `self` and `rhs`.
    pub fn mul(&self, rhs: &Self) -> Self {
        Self(&self.0 * &rhs.0)
    }

    /// Returns the negation of `self`.
    pub fn neg(&self) -> Self {
        Self(-&self.0)
    }

    /// Returns the quotient of `self` and `rhs`, rounded toward negative
    /// infinity.
    ///
    /// # Panics
    ///
    /// If `rhs` is zero.
    pub fn div(&self, rhs: &Self) -> Self {
        assert!(!rhs.is_zero(), "division by zero");
        Self(self.0.div_floor(&rhs.0))
    }

    /// Returns the Euclidean remainder of `self` and `rhs`.
    ///
    /// The remainder is always in `[0, |rhs|)`. For negative divisors it
    /// deliberately does not pair with [`Int::div`]: the quotient floors
    /// while the remainder stays non-negative.
    ///
    /// # Panics
    ///
    /// If `rhs` is zero.
    pub fn rem(&self, rhs: &Self) -> Self {
        assert!(!rhs.is_zero(), "division by zero");
        let mut remainder = self.0.mod_floor(&rhs.0);
        // The floored remainder carries the divisor's sign; lift it into
        // [0, |rhs|) for negative divisors.
        if remainder.is_negative() {
            remainder -= &rhs.0;
        }
        Self(remainder)
    }

    /// Returns `self` shifted left by `rhs` bits.
    ///
    /// # Panics
    ///
    /// If `rhs` does not fit a `usize`.
    pub fn shl(&self, rhs: &Self) -> Self {
        Self(&self.0 << Self::shift_amount(rhs))
    }

    /// Returns `self` shifted right by `rhs` bits, preserving the sign.
    ///
    /// # Panics
    ///
    /// If `rhs` does not fit a `usize`.
    pub fn shr(&self, rhs: &Self) -> Self {
        Self(&self.0 >> Self::shift_amount(rhs))
    }

    fn shift_amount(rhs: &Self) -> usize {
        rhs.to_usize()
            .unwrap_or_else(|| panic!("shift amount out of range: {rhs}"))
    }

    /// Returns the bitwise `and` of `self` and `rhs`.
    pub fn and(&self, rhs: &Self) -> Self {
        Self(&self.0 & &rhs.0)
    }

    /// Returns the bitwise `or` of `self` and `rhs`.
    pub fn or(&self, rhs: &Self) -> Self {
        Self(&self.0 | &rhs.0)
    }

    /// Returns the bitwise `xor` of `self` and `rhs`.
    pub fn xor(&self, rhs: &Self) -> Self {
        Self(&self.0 ^ &rhs.0)
    }

    /// Returns the low 64 bits of the two's complement representation.
    pub fn low_u64(&self) -> u64 {
        let digit = self.0.iter_u64_digits().next().unwrap_or(0);
        match self.0.sign() {
            Sign::Minus => digit.wrapping_neg(),
            Sign::NoSign | Sign::Plus => digit,
        }
    }

    /// Returns `Some(k)` iff `self` is the positive power of two `2^k`.
    pub fn checked_log2(&self) -> Option<u64> {
        if !self.0.is_positive() {
            return None;
        }
        let magnitude = self.0.magnitude();
        if magnitude.count_ones() != 1 {
            return None;
        }
        Some(magnitude.bits() - 1)
    }

    /// Returns the Unicode code point named by `self` if any.
    pub fn to_code_point(&self) -> Option<char> {
        self.0.to_u32().and_then(char::from_u32)
    }

    /// Converts `self` into a `usize` if it fits.
    pub fn to_usize(&self) -> Option<usize> {
        self.0.to_usize()
    }

    /// Converts `self` into an `i64` if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }
}

impl From<i64> for Int {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<u32> for Int {
    fn from(value: u32) -> Self {
        Self(BigInt::from(value))
    }
}

impl FromStr for Int {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s).map(Self)
    }
}

impl Hash for Int {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.low_u64());
    }
}

impl Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl PartialEq<i64> for Int {
    fn eq(&self, other: &i64) -> bool {
        self.0 == BigInt::from(*other)
    }
}

impl PartialOrd<i64> for Int {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        self.0.partial_cmp(&BigInt::from(*other))
    }
}

#[cfg(test)]
mod tests {
    use super::Int;

    fn int(value: i64) -> Int {
        Int::from(value)
    }

    #[test]
    fn div_rounds_toward_negative_infinity() {
        let cases: &[(i64, i64, i64)] = &[
            (7, 3, 2),
            (-7, 3, -3),
            (7, -3, -3),
            (-7, -3, 2),
            (6, 3, 2),
            (-6, 3, -2),
            (6, -3, -2),
            (-6, -3, 2),
            (0, 5, 0),
        ];
        for &(lhs, rhs, quotient) in cases {
            assert_eq!(int(lhs).div(&int(rhs)), quotient, "{lhs} div {rhs}");
        }
    }

    #[test]
    fn rem_is_euclidean() {
        // The remainder is in [0, |rhs|) regardless of either sign.
        let cases: &[(i64, i64, i64)] = &[
            (7, 3, 1),
            (-7, 3, 2),
            (7, -3, 1),
            (-7, -3, 2),
            (6, 3, 0),
            (-6, 3, 0),
            (6, -3, 0),
            (-6, -3, 0),
            (0, 5, 0),
        ];
        for &(lhs, rhs, remainder) in cases {
            assert_eq!(int(lhs).rem(&int(rhs)), remainder, "{lhs} mod {rhs}");
        }
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn div_by_zero_panics() {
        let _ = int(1).div(&Int::zero());
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn rem_by_zero_panics() {
        let _ = int(1).rem(&Int::zero());
    }

    #[test]
    fn low_u64_is_twos_complement() {
        assert_eq!(int(0).low_u64(), 0);
        assert_eq!(int(42).low_u64(), 42);
        assert_eq!(int(-1).low_u64(), u64::MAX);
        assert_eq!(int(-2).low_u64(), u64::MAX - 1);
        assert_eq!(int(i64::MIN).low_u64(), 1 << 63);
        // 2^64 + 5 truncates to 5
        let big = Int::from_bits(false, core::iter::once(true))
            .shl(&int(64))
            .add(&int(5));
        assert_eq!(big.low_u64(), 5);
        assert_eq!(big.neg().low_u64(), 5u64.wrapping_neg());
    }

    #[test]
    fn checked_log2_detects_powers_of_two() {
        assert_eq!(int(1).checked_log2(), Some(0));
        assert_eq!(int(2).checked_log2(), Some(1));
        assert_eq!(int(8).checked_log2(), Some(3));
        assert_eq!(int(1 << 40).checked_log2(), Some(40));
        assert_eq!(int(0).checked_log2(), None);
        assert_eq!(int(-8).checked_log2(), None);
        assert_eq!(int(6).checked_log2(), None);
    }

    #[test]
    fn from_bits_builds_signed_magnitudes() {
        assert_eq!(Int::from_bits(false, []), 0);
        assert_eq!(Int::from_bits(true, []), 0);
        let bits = [true, false, true, false]; // 0b1010
        assert_eq!(Int::from_bits(false, bits), 10);
        assert_eq!(Int::from_bits(true, bits), -10);
    }

    #[test]
    fn shifts_are_arithmetic() {
        assert_eq!(int(3).shl(&int(4)), 48);
        assert_eq!(int(-48).shr(&int(4)), -3);
        assert_eq!(int(-7).shr(&int(1)), -4);
    }

    #[test]
    fn bitwise_ops_use_twos_complement() {
        assert_eq!(int(0b1100).and(&int(0b1010)), 0b1000);
        assert_eq!(int(0b1100).or(&int(0b1010)), 0b1110);
        assert_eq!(int(0b1100).xor(&int(0b1010)), 0b0110);
        assert_eq!(int(-1).and(&int(0xff)), 0xff);
    }

    #[test]
    fn code_points() {
        assert_eq!(int(65).to_code_point(), Some('A'));
        assert_eq!(int(0x1F600).to_code_point(), Some('\u{1F600}'));
        assert_eq!(int(-1).to_code_point(), None);
        assert_eq!(int(0xD800).to_code_point(), None);
        assert_eq!(int(0x11_0000).to_code_point(), None);
    }
}
