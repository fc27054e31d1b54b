//! Operation registry: the fixed set of arithmetic operations.
//!
//! Each [`Operation`] knows its name, its arity and how to evaluate itself
//! over exactly `arity` integer operands. Evaluation is pure: no side
//! effects, same inputs always give the same output. All arithmetic is
//! checked; results that do not fit in an `i64` fail with
//! [`CalcError::Overflow`] instead of wrapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};

/// A supported arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Plus,
    Minus,
    Times,
    Divide,
    Pow,
    Abs,
    Fact,
}

/// Every operation, in registry order.
pub const OPERATIONS: [Operation; 7] = [
    Operation::Plus,
    Operation::Minus,
    Operation::Times,
    Operation::Divide,
    Operation::Pow,
    Operation::Abs,
    Operation::Fact,
];

impl Operation {
    /// Looks up an operation by name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::UnknownOperation`] carrying the name as given
    /// when no operation matches.
    pub fn lookup(name: &str) -> CalcResult<Self> {
        let key = name.to_ascii_lowercase();
        OPERATIONS
            .iter()
            .copied()
            .find(|op| op.name() == key)
            .ok_or_else(|| CalcError::UnknownOperation {
                name: name.to_string(),
            })
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Times => "times",
            Self::Divide => "divide",
            Self::Pow => "pow",
            Self::Abs => "abs",
            Self::Fact => "fact",
        }
    }

    /// Name used in evaluation error messages ("Error while performing
    /// operation Divide: ...").
    fn display_name(self) -> &'static str {
        match self {
            Self::Plus => "Plus",
            Self::Minus => "Minus",
            Self::Times => "Times",
            Self::Divide => "Divide",
            Self::Pow => "Pow",
            Self::Abs => "Abs",
            Self::Fact => "Factorial",
        }
    }

    /// Number of operands the operation consumes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Abs | Self::Fact => 1,
            Self::Plus | Self::Minus | Self::Times | Self::Divide | Self::Pow => 2,
        }
    }

    /// Evaluates the operation over `operands`.
    ///
    /// `operands[0]` is the left/first argument. The caller is responsible
    /// for arity validation; a slice of the wrong length is reported as an
    /// arity mismatch rather than indexed out of bounds.
    ///
    /// # Errors
    ///
    /// - [`CalcError::ArityMismatch`] if `operands.len() != self.arity()`
    /// - [`CalcError::DivisionByZero`] for `divide` by 0 (and `pow` of 0 to a
    ///   negative exponent)
    /// - [`CalcError::InvalidDomain`] for `fact` of a negative number
    /// - [`CalcError::Overflow`] if the result does not fit in an `i64`
    pub fn evaluate(self, operands: &[i64]) -> CalcResult<i64> {
        let overflow = || CalcError::Overflow {
            operation: self.display_name(),
        };

        match (self, operands) {
            (Self::Plus, &[a, b]) => a.checked_add(b).ok_or_else(overflow),
            (Self::Minus, &[a, b]) => a.checked_sub(b).ok_or_else(overflow),
            (Self::Times, &[a, b]) => a.checked_mul(b).ok_or_else(overflow),
            (Self::Divide, &[a, b]) => {
                if b == 0 {
                    return Err(CalcError::DivisionByZero {
                        operation: self.display_name(),
                    });
                }
                // `/` on integers truncates toward zero.
                a.checked_div(b).ok_or_else(overflow)
            }
            (Self::Pow, &[a, b]) => self.pow(a, b),
            (Self::Abs, &[a]) => a.checked_abs().ok_or_else(overflow),
            (Self::Fact, &[a]) => self.factorial(a),
            _ => Err(CalcError::ArityMismatch {
                operation: self.name().to_string(),
                expected: self.arity(),
                actual: operands.len(),
            }),
        }
    }

    fn pow(self, base: i64, exponent: i64) -> CalcResult<i64> {
        if exponent < 0 {
            // Truncated value of base^exponent = 1 / base^|exponent|.
            return match base {
                0 => Err(CalcError::DivisionByZero {
                    operation: self.display_name(),
                }),
                1 => Ok(1),
                -1 => Ok(if exponent % 2 == 0 { 1 } else { -1 }),
                _ => Ok(0),
            };
        }

        let overflow = || CalcError::Overflow {
            operation: self.display_name(),
        };
        // |base| <= 1 never overflows, whatever the exponent.
        match base {
            0 => return Ok(if exponent == 0 { 1 } else { 0 }),
            1 => return Ok(1),
            -1 => return Ok(if exponent % 2 == 0 { 1 } else { -1 }),
            _ => {}
        }
        let exponent = u32::try_from(exponent).map_err(|_| overflow())?;
        base.checked_pow(exponent).ok_or_else(overflow)
    }

    fn factorial(self, n: i64) -> CalcResult<i64> {
        if n < 0 {
            return Err(CalcError::InvalidDomain {
                operation: self.display_name(),
            });
        }
        (2..=n).try_fold(1_i64, |acc, k| {
            acc.checked_mul(k).ok_or(CalcError::Overflow {
                operation: self.display_name(),
            })
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Operation::lookup("plus").unwrap(), Operation::Plus);
        assert_eq!(Operation::lookup("PLUS").unwrap(), Operation::Plus);
        assert_eq!(Operation::lookup("Fact").unwrap(), Operation::Fact);
    }

    #[test]
    fn lookup_unknown_keeps_original_name() {
        let err = Operation::lookup("Modulo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOperation);
        assert_eq!(err.to_string(), "Error: unknown operation: Modulo");
    }

    #[test]
    fn arities_match_registry_table() {
        let arities: Vec<_> = OPERATIONS.iter().map(|op| (op.name(), op.arity())).collect();
        assert_eq!(
            arities,
            vec![
                ("plus", 2),
                ("minus", 2),
                ("times", 2),
                ("divide", 2),
                ("pow", 2),
                ("abs", 1),
                ("fact", 1),
            ]
        );
    }

    #[test]
    fn binary_operations() {
        assert_eq!(Operation::Plus.evaluate(&[2, 3]).unwrap(), 5);
        assert_eq!(Operation::Minus.evaluate(&[20, 10]).unwrap(), 10);
        assert_eq!(Operation::Minus.evaluate(&[10, 20]).unwrap(), -10);
        assert_eq!(Operation::Times.evaluate(&[-4, 6]).unwrap(), -24);
        assert_eq!(Operation::Pow.evaluate(&[2, 10]).unwrap(), 1024);
        assert_eq!(Operation::Pow.evaluate(&[7, 0]).unwrap(), 1);
    }

    #[test]
    fn divide_truncates_toward_zero() {
        assert_eq!(Operation::Divide.evaluate(&[7, 2]).unwrap(), 3);
        assert_eq!(Operation::Divide.evaluate(&[-7, 2]).unwrap(), -3);
        assert_eq!(Operation::Divide.evaluate(&[7, -2]).unwrap(), -3);
        assert_eq!(Operation::Divide.evaluate(&[-7, -2]).unwrap(), 3);
    }

    #[test]
    fn divide_by_zero_fails() {
        let err = Operation::Divide.evaluate(&[5, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DivisionByZero);
        assert_eq!(
            err.to_string(),
            "Error while performing operation Divide: division by 0"
        );
    }

    #[test]
    fn unary_operations() {
        assert_eq!(Operation::Abs.evaluate(&[-9]).unwrap(), 9);
        assert_eq!(Operation::Abs.evaluate(&[9]).unwrap(), 9);
        assert_eq!(Operation::Fact.evaluate(&[0]).unwrap(), 1);
        assert_eq!(Operation::Fact.evaluate(&[5]).unwrap(), 120);
        assert_eq!(Operation::Fact.evaluate(&[20]).unwrap(), 2_432_902_008_176_640_000);
    }

    #[test]
    fn factorial_of_negative_is_invalid_domain() {
        let err = Operation::Fact.evaluate(&[-1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDomain);
        assert_eq!(
            err.to_string(),
            "Error while performing operation Factorial: not supported for the negative number"
        );
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let cases: [(Operation, &[i64]); 6] = [
            (Operation::Plus, &[i64::MAX, 1]),
            (Operation::Minus, &[i64::MIN, 1]),
            (Operation::Times, &[i64::MAX, 2]),
            (Operation::Divide, &[i64::MIN, -1]),
            (Operation::Abs, &[i64::MIN]),
            (Operation::Fact, &[21]),
        ];
        for (op, args) in cases {
            let err = op.evaluate(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Overflow, "{op} {args:?}");
        }
        assert_eq!(
            Operation::Pow.evaluate(&[2, 64]).unwrap_err().kind(),
            ErrorKind::Overflow
        );
        assert_eq!(
            Operation::Pow.evaluate(&[3, i64::MAX]).unwrap_err().kind(),
            ErrorKind::Overflow
        );
    }

    #[test]
    fn pow_with_negative_exponent_truncates() {
        assert_eq!(Operation::Pow.evaluate(&[2, -1]).unwrap(), 0);
        assert_eq!(Operation::Pow.evaluate(&[1, -5]).unwrap(), 1);
        assert_eq!(Operation::Pow.evaluate(&[-1, -3]).unwrap(), -1);
        assert_eq!(Operation::Pow.evaluate(&[-1, -4]).unwrap(), 1);
        assert_eq!(
            Operation::Pow.evaluate(&[0, -1]).unwrap_err().kind(),
            ErrorKind::DivisionByZero
        );
    }

    #[test]
    fn pow_of_unit_bases_ignores_large_exponents() {
        assert_eq!(Operation::Pow.evaluate(&[1, i64::MAX]).unwrap(), 1);
        assert_eq!(Operation::Pow.evaluate(&[-1, i64::MAX]).unwrap(), -1);
        assert_eq!(Operation::Pow.evaluate(&[0, i64::MAX]).unwrap(), 0);
    }

    #[test]
    fn wrong_operand_count_is_arity_mismatch() {
        let err = Operation::Plus.evaluate(&[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArityMismatch);
        let err = Operation::Abs.evaluate(&[1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArityMismatch);
    }

    proptest! {
        #[test]
        fn divide_matches_truncated_quotient(a in -1_000_000i64..1_000_000, b in 1i64..1000) {
            let q = Operation::Divide.evaluate(&[a, b]).unwrap();
            // Truncation: the remainder carries the sign of the dividend.
            let r = a - q * b;
            prop_assert!(r.abs() < b);
            prop_assert!(r == 0 || r.signum() == a.signum());
        }

        #[test]
        fn evaluation_is_deterministic(a in any::<i64>(), b in any::<i64>()) {
            for op in OPERATIONS {
                let args: Vec<i64> = [a, b].into_iter().take(op.arity()).collect();
                prop_assert_eq!(op.evaluate(&args), op.evaluate(&args));
            }
        }
    }
}
