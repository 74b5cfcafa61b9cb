use {
    super::error::GatewayError,
    serde::{Deserialize, Serialize},
    std::fmt,
    std::ops::{Add, Sub},
};

/// A positive-or-zero minor-unit monetary amount (cents, pence, ...).
///
/// Authorization amounts must be strictly positive (spec §4.1); zero is
/// only reachable via refund bookkeeping (`payment.amount - refunded`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, GatewayError> {
        if cents < 0 {
            return Err(GatewayError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    /// Authorization amounts must be positive, not merely non-negative.
    pub fn new_positive(cents: i64) -> Result<Self, GatewayError> {
        if cents <= 0 {
            return Err(GatewayError::Validation(format!(
                "amount must be positive, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0.checked_add(other.0).map(MoneyAmount)
    }

    pub fn checked_sub(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0
            .checked_sub(other.0)
            .filter(|&v| v >= 0)
            .map(MoneyAmount)
    }
}

impl Add for MoneyAmount {
    type Output = MoneyAmount;

    fn add(self, rhs: MoneyAmount) -> MoneyAmount {
        self.checked_add(rhs).expect("MoneyAmount overflow")
    }
}

impl Sub for MoneyAmount {
    type Output = MoneyAmount;

    fn sub(self, rhs: MoneyAmount) -> MoneyAmount {
        self.checked_sub(rhs).expect("MoneyAmount underflow")
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO-4217 currency whitelist (spec §4.1 "currency whitelist"). Extend
/// this list as the merchant config grows; an unrecognized code is a
/// validation error, never a silent default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Jpy => "jpy",
        }
    }

    /// Number of decimal places the minor unit represents. JPY has no
    /// minor unit; everything else here uses 2.
    pub fn minor_unit_exponent(&self) -> u32 {
        match self {
            Self::Jpy => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            "jpy" => Ok(Self::Jpy),
            other => Err(GatewayError::Validation(format!(
                "unknown currency: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: MoneyAmount,
    currency: Currency,
}

impl Money {
    pub fn new(amount: MoneyAmount, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Both operands must share a currency — refunds must match their
    /// parent payment's currency (spec §3 `Refund` invariant).
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_rejected() {
        assert!(MoneyAmount::new(-1).is_err());
    }

    #[test]
    fn zero_amount_allowed_but_not_positive() {
        assert!(MoneyAmount::new(0).is_ok());
        assert!(MoneyAmount::new_positive(0).is_err());
    }

    #[test]
    fn checked_sub_rejects_negative_result() {
        let a = MoneyAmount::new(100).unwrap();
        let b = MoneyAmount::new(200).unwrap();
        assert!(a.checked_sub(b).is_none());
    }

    #[test]
    fn currency_roundtrip() {
        for c in [Currency::Usd, Currency::Eur, Currency::Gbp, Currency::Jpy] {
            let s = c.as_str();
            assert_eq!(Currency::try_from(s).unwrap(), c);
        }
    }
}
