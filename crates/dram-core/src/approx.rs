//! Approximate values: a measurement plus an "is this exact?" flag.
//!
//! Uncertainty only ever spreads: any arithmetic touching an approximate
//! operand yields an approximate result. Plain `f64` factors (unit conversion
//! constants, percentages) are treated as exact.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How far off an approximate value is assumed to be at most, as a fraction.
pub const APPROX_TOLERANCE: f64 = 0.1;

// ─── ApproximateValue ────────────────────────────────────────────────────────

/// A finite measurement that may be flagged as imprecise.
///
/// Construction rejects `NaN` and infinities, and so does every operation
/// whose result would overflow. Deserialisation goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawApproximate", into = "RawApproximate")]
pub struct ApproximateValue {
  value:          f64,
  is_approximate: bool,
}

/// Wire shape of [`ApproximateValue`]; mirrors the `{val, is_approximate}`
/// composite stored by the ledger.
#[derive(Serialize, Deserialize)]
struct RawApproximate {
  val:            f64,
  is_approximate: bool,
}

impl TryFrom<RawApproximate> for ApproximateValue {
  type Error = Error;

  fn try_from(raw: RawApproximate) -> Result<Self> {
    Self::new(raw.val, raw.is_approximate)
  }
}

impl From<ApproximateValue> for RawApproximate {
  fn from(v: ApproximateValue) -> Self {
    Self { val: v.value, is_approximate: v.is_approximate }
  }
}

impl ApproximateValue {
  pub fn new(value: f64, is_approximate: bool) -> Result<Self> {
    if !value.is_finite() {
      return Err(Error::Value(format!("{value} is not a finite measurement")));
    }
    Ok(Self { value, is_approximate })
  }

  /// A value known exactly.
  pub fn exact(value: f64) -> Result<Self> { Self::new(value, false) }

  /// A value flagged as possibly imprecise.
  pub fn approximate(value: f64) -> Result<Self> { Self::new(value, true) }

  pub fn value(&self) -> f64 { self.value }

  pub fn is_approximate(&self) -> bool { self.is_approximate }

  pub fn add(self, other: Self) -> Result<Self> {
    Self::new(
      self.value + other.value,
      self.is_approximate || other.is_approximate,
    )
  }

  pub fn multiply(self, other: Self) -> Result<Self> {
    Self::new(
      self.value * other.value,
      self.is_approximate || other.is_approximate,
    )
  }

  /// Scale by an exact factor. The flag is carried over unchanged.
  pub fn scale_by(self, factor: f64) -> Result<Self> {
    if !factor.is_finite() {
      return Err(Error::Value(format!("scale factor {factor} is not finite")));
    }
    Self::new(self.value * factor, self.is_approximate)
  }

  /// The value halfway between `self` and `other`.
  pub fn midpoint(self, other: Self) -> Result<Self> {
    self.add(other)?.scale_by(0.5)
  }

  /// The `(low, high)` band this value may occupy when approximate values are
  /// assumed to be off by at most `tolerance` (a fraction, e.g. `0.1`).
  /// Exact values collapse to `(value, value)`.
  pub fn envelope(&self, tolerance: f64) -> (f64, f64) {
    if !self.is_approximate {
      return (self.value, self.value);
    }
    let a = self.value * (1.0 - tolerance);
    let b = self.value * (1.0 + tolerance);
    (a.min(b), a.max(b))
  }
}

impl fmt::Display for ApproximateValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_approximate {
      f.write_str("~")?;
    }
    write!(f, "{}", self.value)
  }
}

// ─── ApproxRange ─────────────────────────────────────────────────────────────

/// An inclusive `[min, max]` pair of approximate values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct ApproxRange {
  pub min: ApproximateValue,
  pub max: ApproximateValue,
}

#[derive(Serialize, Deserialize)]
struct RawRange {
  min: ApproximateValue,
  max: ApproximateValue,
}

impl TryFrom<RawRange> for ApproxRange {
  type Error = Error;

  fn try_from(raw: RawRange) -> Result<Self> { Self::new("range", raw.min, raw.max) }
}

impl From<ApproxRange> for RawRange {
  fn from(r: ApproxRange) -> Self { Self { min: r.min, max: r.max } }
}

impl ApproxRange {
  /// Build a range, rejecting `min > max`. `what` names the quantity in the
  /// error message.
  pub fn new(
    what: &'static str,
    min: ApproximateValue,
    max: ApproximateValue,
  ) -> Result<Self> {
    if min.value() > max.value() {
      return Err(Error::InvalidRange { what, min: min.value(), max: max.value() });
    }
    Ok(Self { min, max })
  }

  /// A degenerate range with both ends equal to `v`.
  pub fn point(v: ApproximateValue) -> Self { Self { min: v, max: v } }

  pub fn is_point(&self) -> bool { self.min.value() == self.max.value() }

  pub fn is_approximate(&self) -> bool {
    self.min.is_approximate() || self.max.is_approximate()
  }

  /// Sum two ranges bound by bound.
  pub fn add(self, other: Self) -> Result<Self> {
    Ok(Self { min: self.min.add(other.min)?, max: self.max.add(other.max)? })
  }

  /// The widest band the range may cover once each approximate end is
  /// allowed to be off by `tolerance`.
  pub fn envelope(&self, tolerance: f64) -> (f64, f64) {
    (self.min.envelope(tolerance).0, self.max.envelope(tolerance).1)
  }
}

impl fmt::Display for ApproxRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.min == self.max {
      write!(f, "{}", self.min)
    } else {
      write!(f, "{}-{}", self.min, self.max)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(value: f64, approx: bool) -> ApproximateValue {
    ApproximateValue::new(value, approx).unwrap()
  }

  #[test]
  fn add_flag_is_or_of_operands() {
    for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
      let sum = v(1.5, a).add(v(2.0, b)).unwrap();
      assert_eq!(sum.value(), 3.5);
      assert_eq!(sum.is_approximate(), a || b);
    }
  }

  #[test]
  fn multiply_keeps_uncertainty() {
    let product = v(3.0, true).multiply(v(2.0, false)).unwrap();
    assert_eq!(product.value(), 6.0);
    assert!(product.is_approximate());
  }

  #[test]
  fn exact_factor_does_not_introduce_approximation() {
    let scaled = v(12.0, false).scale_by(29.5735).unwrap();
    assert!(!scaled.is_approximate());

    let scaled = v(12.0, true).scale_by(29.5735).unwrap();
    assert!(scaled.is_approximate());
  }

  #[test]
  fn non_finite_inputs_are_rejected() {
    assert!(matches!(ApproximateValue::exact(f64::NAN), Err(Error::Value(_))));
    assert!(matches!(
      ApproximateValue::approximate(f64::INFINITY),
      Err(Error::Value(_))
    ));
    assert!(matches!(v(1.0, false).scale_by(f64::NAN), Err(Error::Value(_))));
  }

  #[test]
  fn overflow_is_rejected() {
    let err = v(f64::MAX, false).add(v(f64::MAX, false)).unwrap_err();
    assert!(matches!(err, Error::Value(_)));
  }

  #[test]
  fn midpoint_of_abv_bounds() {
    let mid = v(4.0, false).midpoint(v(6.0, true)).unwrap();
    assert_eq!(mid.value(), 5.0);
    assert!(mid.is_approximate());
  }

  #[test]
  fn envelope_widens_only_approximate_values() {
    assert_eq!(v(10.0, false).envelope(0.1), (10.0, 10.0));
    let (lo, hi) = v(10.0, true).envelope(0.1);
    assert!((lo - 9.0).abs() < 1e-9);
    assert!((hi - 11.0).abs() < 1e-9);
  }

  #[test]
  fn deserialize_rejects_non_finite() {
    let ok: ApproximateValue =
      serde_json::from_str(r#"{"val": 5.0, "is_approximate": true}"#).unwrap();
    assert_eq!(ok, v(5.0, true));

    let bad = serde_json::from_str::<ApproximateValue>(
      r#"{"val": 1e400, "is_approximate": false}"#,
    );
    assert!(bad.is_err());
  }

  #[test]
  fn range_rejects_inverted_bounds() {
    let err = ApproxRange::new("quantity", v(2.0, false), v(1.0, false)).unwrap_err();
    assert!(matches!(err, Error::InvalidRange { what: "quantity", .. }));
  }

  #[test]
  fn deserialize_rejects_inverted_range() {
    let ok: ApproxRange = serde_json::from_str(
      r#"{"min": {"val": 1.0, "is_approximate": false},
          "max": {"val": 2.0, "is_approximate": true}}"#,
    )
    .unwrap();
    assert_eq!(ok, ApproxRange::new("range", v(1.0, false), v(2.0, true)).unwrap());

    let bad = serde_json::from_str::<ApproxRange>(
      r#"{"min": {"val": 3.0, "is_approximate": false},
          "max": {"val": 2.0, "is_approximate": false}}"#,
    );
    assert!(bad.is_err());
  }

  #[test]
  fn range_sum_and_envelope() {
    let a = ApproxRange::new("units", v(1.0, false), v(2.0, false)).unwrap();
    let b = ApproxRange::new("units", v(0.5, false), v(1.0, true)).unwrap();
    let sum = a.add(b).unwrap();
    assert_eq!(sum.min, v(1.5, false));
    assert_eq!(sum.max, v(3.0, true));

    let (lo, hi) = sum.envelope(APPROX_TOLERANCE);
    assert_eq!(lo, 1.5);
    assert!((hi - 3.3).abs() < 1e-9);
  }

  #[test]
  fn display_marks_approximate_values() {
    assert_eq!(v(5.0, true).to_string(), "~5");
    let range = ApproxRange::new("quantity", v(1.0, false), v(2.0, true)).unwrap();
    assert_eq!(range.to_string(), "1-~2");
  }
}
