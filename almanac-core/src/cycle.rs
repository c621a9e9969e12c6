//! Length cycles
//!
//! A cycle such as `31 28.25 31 30` says how many base instances each
//! successive instance of a unit holds. Fractions accumulate per position:
//! position 2 above is 28 three loops out of four and 29 on the fourth.
//!
//! All iterations are 1-based. Position sums are computed in closed form
//! (`floor(length * loops)` per position), so no operation here walks
//! from iteration 1.

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::{CalendarError, Length, Limits};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthCycle {
    lengths: Vec<Length>,
}

impl LengthCycle {
    // ========== Construction ==========

    /// Build a cycle; every length must be positive
    pub fn new(lengths: Vec<Length>) -> Result<Self, CalendarError> {
        if lengths.is_empty() {
            return Err(CalendarError::EmptyOrInvalidCycle("cycle is empty".to_string()));
        }
        if let Some(bad) = lengths.iter().find(|l| !l.is_positive()) {
            return Err(CalendarError::EmptyOrInvalidCycle(format!(
                "length {} is not positive",
                bad
            )));
        }
        Ok(Self { lengths })
    }

    pub fn from_integers(values: &[i64]) -> Result<Self, CalendarError> {
        Self::new(values.iter().copied().map(Length::from_i64).collect())
    }

    /// Derived cycles may hold zero-length positions as long as the total is positive
    fn derived(lengths: Vec<Length>) -> Result<Self, CalendarError> {
        if lengths.is_empty() || lengths.iter().any(|l| !l.is_positive() && !l.is_zero()) {
            return Err(CalendarError::EmptyOrInvalidCycle(
                "derived cycle has negative lengths".to_string(),
            ));
        }
        let cycle = Self { lengths };
        if !cycle.total().is_positive() {
            return Err(CalendarError::EmptyOrInvalidCycle("cycle sums to zero".to_string()));
        }
        Ok(cycle)
    }

    // ========== Accessors ==========

    pub fn lengths(&self) -> &[Length] {
        &self.lengths
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Sum of one loop of the cycle
    pub fn total(&self) -> Length {
        self.lengths
            .iter()
            .fold(Length::from_i64(0), |acc, l| acc.add(l))
    }

    pub fn is_integral(&self) -> bool {
        self.lengths.iter().all(Length::is_integer)
    }

    // ========== Arithmetic ==========

    /// Split a 1-based iteration into (position in cycle, completed loops)
    fn locate(&self, iteration: i64) -> Result<(usize, i64), CalendarError> {
        if iteration < 1 {
            return Err(CalendarError::InvalidIteration(iteration));
        }
        let n = self.lengths.len() as i64;
        let index = (iteration - 1) % n;
        let loops = (iteration - 1) / n;
        Ok((index as usize, loops))
    }

    /// Integer length of the instance at `iteration`
    ///
    /// The extra instance lands on the loop where this position's fractional
    /// remainder crosses a whole number.
    pub fn length_at(&self, iteration: i64) -> Result<i64, CalendarError> {
        let (index, loops) = self.locate(iteration)?;
        let overflow = || CalendarError::IterationOverflow(iteration);
        let length = &self.lengths[index];
        let fraction = length.fraction();
        let extra = fraction.floor_mul(loops + 1).ok_or_else(overflow)?
            - fraction.floor_mul(loops).ok_or_else(overflow)?;
        length
            .whole()
            .and_then(|whole| whole.checked_add(i64::try_from(extra).ok()?))
            .ok_or_else(overflow)
    }

    /// Base iteration of the first base instance inside `iteration`
    pub fn first_instance_iteration(&self, iteration: i64) -> Result<i64, CalendarError> {
        let (index, loops) = self.locate(iteration)?;

        // Position j has been used loops+1 times if it comes before `index`
        let overflow = || CalendarError::IterationOverflow(iteration);
        let mut sum: i128 = 1;
        for (j, length) in self.lengths.iter().enumerate() {
            let used = if j < index { loops + 1 } else { loops };
            let part = length.floor_mul(used).ok_or_else(overflow)?;
            sum = sum.checked_add(part).ok_or_else(overflow)?;
        }
        i64::try_from(sum).map_err(|_| overflow())
    }

    /// Iteration of this cycle that contains base instance `base_iteration`
    ///
    /// Inverse of `first_instance_iteration`: the largest iteration whose
    /// first base instance is at or before `base_iteration`.
    pub fn iteration_at_instance(&self, base_iteration: i64) -> Result<i64, CalendarError> {
        if base_iteration < 1 {
            return Err(CalendarError::InvalidIteration(base_iteration));
        }

        // Gallop to an upper bound, then bisect
        let mut low: i64 = 1;
        let mut high: i64 = 2;
        while self.first_instance_iteration(high)? <= base_iteration {
            low = high;
            high = high
                .checked_mul(2)
                .ok_or(CalendarError::IterationOverflow(base_iteration))?;
        }
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            if self.first_instance_iteration(mid)? <= base_iteration {
                low = mid;
            } else {
                high = mid;
            }
        }
        Ok(low)
    }

    /// Equivalent all-integer cycle
    ///
    /// Repeats the cycle once per unit of the LCM of the fraction
    /// denominators; `length_at` on the result matches this cycle at
    /// every iteration.
    pub fn expand(&self, limits: &Limits) -> Result<Vec<i64>, CalendarError> {
        let mut loops: u64 = 1;
        for length in &self.lengths {
            let denominator = length.denominator().ok_or(CalendarError::CycleExpansionOverflow {
                required: u128::MAX,
                limit: u128::from(limits.max_denominator),
            })?;
            loops = lcm(loops, denominator).ok_or(CalendarError::CycleExpansionOverflow {
                required: u128::MAX,
                limit: u128::from(limits.max_denominator),
            })?;
            if loops > limits.max_denominator {
                return Err(CalendarError::CycleExpansionOverflow {
                    required: u128::from(loops),
                    limit: u128::from(limits.max_denominator),
                });
            }
        }

        let entries = u128::from(loops) * self.lengths.len() as u128;
        if entries > u128::from(limits.max_expanded_cycle_len) {
            return Err(CalendarError::CycleExpansionOverflow {
                required: entries,
                limit: u128::from(limits.max_expanded_cycle_len),
            });
        }

        debug!(cycle = %self, loops, entries = entries as u64, "expanding length cycle");
        (1..=entries as i64).map(|i| self.length_at(i)).collect()
    }

    /// Shortest cycle whose `length_at` reproduces `values`, repeated forever
    ///
    /// Tries every period that divides `values.len()`, averaging each
    /// position across its repeats; the full-length period always works.
    pub fn condense(values: &[i64]) -> Result<Self, CalendarError> {
        let n = values.len();
        if n == 0 {
            return Err(CalendarError::EmptyOrInvalidCycle("nothing to condense".to_string()));
        }

        for period in (1..=n).filter(|d| n % d == 0) {
            let repeats = (n / period) as u64;
            let candidate: Vec<Length> = (0..period)
                .map(|j| {
                    let sum: i64 = values.iter().skip(j).step_by(period).sum();
                    Length::from_ratio(sum, repeats).unwrap_or_default()
                })
                .collect();

            let cycle = match Self::derived(candidate) {
                Ok(cycle) => cycle,
                Err(_) => continue,
            };
            let reproduces = values
                .iter()
                .enumerate()
                .all(|(i, v)| cycle.length_at(i as i64 + 1).ok() == Some(*v));
            if reproduces {
                return Ok(cycle);
            }
        }

        Err(CalendarError::EmptyOrInvalidCycle(
            "values do not form a usable cycle".to_string(),
        ))
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Greatest common divisor, shared with the hierarchy's period search
pub fn gcd_i64(a: i64, b: i64) -> i64 {
    gcd(a.unsigned_abs(), b.unsigned_abs()) as i64
}

impl Default for LengthCycle {
    fn default() -> Self {
        Self { lengths: vec![Length::default()] }
    }
}

impl FromStr for LengthCycle {
    type Err = CalendarError;

    /// Space-separated decimals: "31 28.25 31 30"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lengths = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Length>, _>>()?;
        Self::new(lengths)
    }
}

impl fmt::Display for LengthCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.lengths.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl Serialize for LengthCycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.lengths.serialize(serializer)
    }
}

struct CycleVisitor;

impl<'de> Visitor<'de> for CycleVisitor {
    type Value = LengthCycle;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of lengths or a space-separated string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<LengthCycle, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<LengthCycle, A::Error> {
        let mut lengths = Vec::new();
        while let Some(length) = seq.next_element::<Length>()? {
            lengths.push(length);
        }
        LengthCycle::new(lengths).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for LengthCycle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CycleVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(s: &str) -> LengthCycle {
        s.parse().unwrap()
    }

    fn lengths(c: &LengthCycle, count: i64) -> Vec<i64> {
        (1..=count).map(|i| c.length_at(i).unwrap()).collect()
    }

    #[test]
    fn test_constant_cycle() {
        let c = cycle("4");
        assert!(lengths(&c, 20).iter().all(|&l| l == 4));
    }

    #[test]
    fn test_integer_cycle_repeats() {
        let c = cycle("2 5 8 12");
        assert_eq!(lengths(&c, 9), vec![2, 5, 8, 12, 2, 5, 8, 12, 2]);
    }

    #[test]
    fn test_half_leap() {
        assert_eq!(lengths(&cycle("3.5"), 4), vec![3, 4, 3, 4]);
    }

    #[test]
    fn test_mixed_cycle() {
        let c = cycle("11 12.5 14");
        assert_eq!(c.length_at(2).unwrap(), 12);
        assert_eq!(c.length_at(5).unwrap(), 13);
        assert_eq!(c.length_at(8).unwrap(), 12);
        assert_eq!(c.length_at(11).unwrap(), 13);
        assert_eq!(c.length_at(12).unwrap(), 14);
    }

    #[test]
    fn test_several_fractions() {
        let c = cycle("1.5 4.25 100.1");
        assert_eq!(lengths(&c, 6), vec![1, 4, 100, 2, 4, 100]);
        assert_eq!(c.length_at(11).unwrap(), 5);
        assert_eq!(c.length_at(30).unwrap(), 101);
    }

    #[test]
    fn test_quarter_leap_in_month_cycle() {
        let c = cycle("31 28.25 31 30");
        assert_eq!(c.length_at(2).unwrap(), 28);
        assert_eq!(c.length_at(6).unwrap(), 28);
        assert_eq!(c.length_at(10).unwrap(), 28);
        assert_eq!(c.length_at(14).unwrap(), 29);
        assert_eq!(c.length_at(11).unwrap(), 31);
    }

    #[test]
    fn test_invalid_iteration() {
        let c = cycle("4");
        assert_eq!(c.length_at(0), Err(CalendarError::InvalidIteration(0)));
        assert_eq!(c.first_instance_iteration(-3), Err(CalendarError::InvalidIteration(-3)));
        assert_eq!(c.iteration_at_instance(0), Err(CalendarError::InvalidIteration(0)));
    }

    #[test]
    fn test_rejects_empty_and_non_positive() {
        assert!(matches!(
            "".parse::<LengthCycle>(),
            Err(CalendarError::EmptyOrInvalidCycle(_))
        ));
        assert!(matches!(
            "4 0 3".parse::<LengthCycle>(),
            Err(CalendarError::EmptyOrInvalidCycle(_))
        ));
        assert!(matches!(
            "4 -1".parse::<LengthCycle>(),
            Err(CalendarError::EmptyOrInvalidCycle(_))
        ));
        assert!(matches!("4 x".parse::<LengthCycle>(), Err(CalendarError::InvalidLength(_))));
    }

    #[test]
    fn test_first_instance_iteration() {
        let c = cycle("31 28.25 31 30");
        let expected = [
            (1, 1), (2, 32), (3, 60), (4, 91), (5, 121), (6, 152), (7, 180), (8, 211),
            (13, 361), (14, 392), (15, 421), (16, 452),
        ];
        for (iteration, first) in expected {
            assert_eq!(c.first_instance_iteration(iteration).unwrap(), first, "iteration {}", iteration);
        }
    }

    #[test]
    fn test_first_instance_is_cumulative_length() {
        let c = cycle("1.5 4.25 100.1 7");
        let mut running = 1;
        for i in 1..=200 {
            assert_eq!(c.first_instance_iteration(i).unwrap(), running);
            running += c.length_at(i).unwrap();
        }
    }

    #[test]
    fn test_periodicity_of_integral_cycles() {
        let expanded = cycle("31 28.25 31 30").expand(&Limits::default()).unwrap();
        for c in [cycle("2 5 8 12"), LengthCycle::from_integers(&expanded).unwrap()] {
            let total = c.total().whole().unwrap();
            for i in 1..50 {
                assert_eq!(
                    c.first_instance_iteration(i + c.len() as i64).unwrap(),
                    c.first_instance_iteration(i).unwrap() + total
                );
            }
        }
    }

    #[test]
    fn test_iteration_at_instance_inverts_first() {
        let c = cycle("31 28.25 31 30");
        assert_eq!(c.iteration_at_instance(1).unwrap(), 1);
        assert_eq!(c.iteration_at_instance(31).unwrap(), 1);
        assert_eq!(c.iteration_at_instance(32).unwrap(), 2);
        assert_eq!(c.iteration_at_instance(100).unwrap(), 4);
        assert_eq!(c.iteration_at_instance(481).unwrap(), 16);
        assert_eq!(c.iteration_at_instance(482).unwrap(), 17);
    }

    #[test]
    fn test_iteration_at_instance_skips_empty_instances() {
        // Lengths run 0, 1, 0, 1, ...
        let c = cycle("0.5");
        assert_eq!(c.iteration_at_instance(1).unwrap(), 2);
        assert_eq!(c.iteration_at_instance(2).unwrap(), 4);
    }

    #[test]
    fn test_expand() {
        let limits = Limits::default();
        assert_eq!(cycle("30.25").expand(&limits).unwrap(), vec![30, 30, 30, 31]);
        assert_eq!(cycle("1.75").expand(&limits).unwrap(), vec![1, 2, 2, 2]);
        assert_eq!(cycle("2 5 8").expand(&limits).unwrap(), vec![2, 5, 8]);
        assert_eq!(
            cycle("30.25 1.75").expand(&limits).unwrap(),
            vec![30, 1, 30, 2, 30, 2, 31, 2]
        );
        assert_eq!(cycle("2.5 5.2").expand(&limits).unwrap().len(), 20);
        assert_eq!(cycle("1 2.5 4 5.2").expand(&limits).unwrap().len(), 40);
    }

    #[test]
    fn test_expand_matches_length_at() {
        let c = cycle("1 2.5 4 5.2");
        let expanded = c.expand(&Limits::default()).unwrap();
        let n = expanded.len() as i64;
        for i in 1..=(3 * n) {
            assert_eq!(expanded[((i - 1) % n) as usize], c.length_at(i).unwrap());
        }
    }

    #[test]
    fn test_expand_guards_denominators() {
        let c = cycle("1.0000001 1.3333333");
        assert!(matches!(
            c.expand(&Limits::default()),
            Err(CalendarError::CycleExpansionOverflow { .. })
        ));

        let small = Limits::default().with_max_expanded_cycle_len(3);
        assert!(matches!(
            cycle("30.25").expand(&small),
            Err(CalendarError::CycleExpansionOverflow { required: 4, limit: 3 })
        ));
    }

    #[test]
    fn test_condense() {
        let c = LengthCycle::condense(&[120, 120, 120, 121]).unwrap();
        assert_eq!(c.to_string(), "120.25");

        let c = LengthCycle::condense(&[2, 5, 2, 5]).unwrap();
        assert_eq!(c.to_string(), "2 5");

        let c = LengthCycle::condense(&[30, 1, 30, 2, 30, 2, 31, 2]).unwrap();
        assert_eq!(lengths(&c, 8), vec![30, 1, 30, 2, 30, 2, 31, 2]);
    }

    #[test]
    fn test_condense_expand_agree() {
        let leap = cycle("31 28.25 31 30");
        let expanded = leap.expand(&Limits::default()).unwrap();
        let condensed = LengthCycle::condense(&expanded).unwrap();
        assert_eq!(lengths(&condensed, 64), lengths(&leap, 64));
    }

    #[test]
    fn test_serde_accepts_string_or_list() {
        let from_str: LengthCycle = serde_json::from_str("\"31 28.25 31 30\"").unwrap();
        let from_list: LengthCycle = serde_json::from_str("[31, \"28.25\", 31, 30]").unwrap();
        assert_eq!(from_str, from_list);
        assert_eq!(
            serde_json::to_string(&from_str).unwrap(),
            "[\"31\",\"28.25\",\"31\",\"30\"]"
        );
        assert!(serde_json::from_str::<LengthCycle>("[]").is_err());
    }

    #[test]
    fn test_huge_lengths_overflow_instead_of_wrapping() {
        let c = cycle("9223372036854775807.5");
        assert_eq!(c.length_at(1).unwrap(), i64::MAX);
        assert_eq!(c.length_at(2), Err(CalendarError::IterationOverflow(2)));
        assert_eq!(c.first_instance_iteration(2), Err(CalendarError::IterationOverflow(2)));

        let beyond = cycle("9223372036854775808");
        assert_eq!(beyond.length_at(1), Err(CalendarError::IterationOverflow(1)));
    }

    #[test]
    fn test_default_is_one() {
        assert_eq!(LengthCycle::default().to_string(), "1");
    }
}
