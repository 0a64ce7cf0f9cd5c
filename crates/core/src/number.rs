//! Exact numeric values for cross-type literal comparison.
//!
//! `xsd:decimal` and the integer types are taken from their lexical form,
//! `xsd:double` and `xsd:float` from their binary value, so `"0.1"^^xsd:double`
//! does not equal `"0.1"^^xsd:decimal`.

/// A finite number as `digits × 10^exponent`. Normalized: no leading or
/// trailing zero digits, and zero is the empty digit list with `negative = false`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExactDecimal {
    negative: bool,
    /// Most significant digit first.
    digits: Vec<u8>,
    exponent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Number {
    Finite(ExactDecimal),
    NaN,
    PositiveInfinity,
    NegativeInfinity,
}

impl ExactDecimal {
    fn zero() -> Self {
        Self {
            negative: false,
            digits: Vec::new(),
            exponent: 0,
        }
    }

    /// `None` when stripping trailing zeros pushes the exponent out of range.
    fn normalized(negative: bool, mut digits: Vec<u8>, mut exponent: i64) -> Option<Self> {
        let leading = digits.iter().take_while(|d| **d == 0).count();
        digits.drain(..leading);
        if digits.is_empty() {
            return Some(Self::zero());
        }
        while digits.last() == Some(&0) {
            digits.pop();
            exponent = exponent.checked_add(1)?;
        }
        Some(Self {
            negative,
            digits,
            exponent,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Parses `[+-]digits[.digits][(e|E)[+-]digits]`. Exponents beyond the
    /// `i64` range yield `None`.
    pub fn parse(lexical: &str) -> Option<Self> {
        let s = lexical.trim();
        let (negative, s) = match s.as_bytes().first()? {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, exp) = match s.find(['e', 'E']) {
            Some(i) => (&s[..i], Some(&s[i + 1..])),
            None => (s, None),
        };
        let (int_part, frac_part) = match mantissa.find('.') {
            Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let mut digits = Vec::with_capacity(int_part.len() + frac_part.len());
        for c in int_part.bytes().chain(frac_part.bytes()) {
            if !c.is_ascii_digit() {
                return None;
            }
            digits.push(c - b'0');
        }
        let mut exponent = -i64::try_from(frac_part.len()).ok()?;
        if let Some(exp) = exp {
            exponent = exponent.checked_add(exp.parse::<i64>().ok()?)?;
        }
        Self::normalized(negative, digits, exponent)
    }

    /// Exact decimal expansion of a finite double.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let bits = value.to_bits();
        let negative = bits >> 63 == 1;
        let exp_bits = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1u64 << 52) - 1);
        let (mantissa, exp2) = if exp_bits == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), exp_bits - 1075)
        };

        // little-endian working digits
        let mut digits: Vec<u8> = mantissa
            .to_string()
            .bytes()
            .rev()
            .map(|c| c - b'0')
            .collect();
        let exponent = if exp2 >= 0 {
            for _ in 0..exp2 {
                multiply_small(&mut digits, 2);
            }
            0
        } else {
            // m × 2^-k = m × 5^k × 10^-k
            for _ in 0..-exp2 {
                multiply_small(&mut digits, 5);
            }
            exp2
        };
        digits.reverse();
        Self::normalized(negative, digits, exponent)
    }
}

fn multiply_small(little_endian: &mut Vec<u8>, factor: u8) {
    let mut carry = 0u8;
    for d in little_endian.iter_mut() {
        let product = *d * factor + carry;
        *d = product % 10;
        carry = product / 10;
    }
    while carry > 0 {
        little_endian.push(carry % 10);
        carry /= 10;
    }
}

impl Number {
    pub fn from_decimal_lexical(lexical: &str) -> Option<Self> {
        ExactDecimal::parse(lexical).map(Number::Finite)
    }

    /// Parses an `xsd:double` / `xsd:float` lexical form, including `INF`,
    /// `-INF` and `NaN`.
    pub fn from_double_lexical(lexical: &str) -> Option<Self> {
        match lexical.trim() {
            "NaN" => Some(Number::NaN),
            "INF" | "+INF" => Some(Number::PositiveInfinity),
            "-INF" => Some(Number::NegativeInfinity),
            other => {
                if !is_numeric_lexical(other) {
                    return None;
                }
                // Out-of-range exponents saturate to infinity or zero here.
                let value: f64 = other.parse().ok()?;
                Some(Self::from_f64(value))
            }
        }
    }

    /// Parses a float lexical form, rounding to single precision first.
    pub fn from_float_lexical(lexical: &str) -> Option<Self> {
        match Self::from_double_lexical(lexical)? {
            Number::Finite(_) => {
                let value: f32 = lexical.trim().parse().ok()?;
                Some(Self::from_f64(f64::from(value)))
            }
            special => Some(special),
        }
    }

    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            Number::NaN
        } else if value == f64::INFINITY {
            Number::PositiveInfinity
        } else if value == f64::NEG_INFINITY {
            Number::NegativeInfinity
        } else {
            // finite by now
            Number::Finite(ExactDecimal::from_f64(value).unwrap_or_else(ExactDecimal::zero))
        }
    }
}

/// Syntax check for `[+-]digits[.digits][(e|E)[+-]digits]` without
/// evaluating the exponent.
fn is_numeric_lexical(lexical: &str) -> bool {
    let s = lexical.trim();
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exp) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |part: &str| part.bytes().all(|c| c.is_ascii_digit());
    let mantissa_ok = !(int_part.is_empty() && frac_part.is_empty()) && digits(int_part) && digits(frac_part);
    let exp_ok = exp.map_or(true, |e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && digits(e)
    });
    mantissa_ok && exp_ok
}
