use serde::{Deserialize, Serialize};

use super::error::GatewayError;

/// Raw card material as submitted by the client. This type must never be
/// persisted or logged — it is validated, handed to the tokenization
/// collaborator, and dropped (spec §4.1: "discarded from in-memory
/// structures as early as possible").
#[derive(Clone)]
pub struct RawCard {
    pub pan: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub cvv: String,
}

impl std::fmt::Debug for RawCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCard")
            .field("pan", &mask_pan(&self.pan))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvv", &"***")
            .finish()
    }
}

impl RawCard {
    /// Validates format, Luhn checksum, and expiry-in-future. Never
    /// persists the PAN or CVV; callers must discard `self` immediately
    /// after tokenization.
    pub fn validate(&self, now_year: u32, now_month: u32) -> Result<(), GatewayError> {
        let digits: String = self.pan.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != self.pan.len() || !(12..=19).contains(&digits.len()) {
            return Err(GatewayError::Validation(
                "PAN must be 12-19 digits".to_string(),
            ));
        }
        if !luhn_check(&digits) {
            return Err(GatewayError::Validation("PAN failed Luhn check".to_string()));
        }
        if !(1..=12).contains(&self.expiry_month) {
            return Err(GatewayError::Validation("invalid expiry month".to_string()));
        }
        if (self.expiry_year, self.expiry_month) < (now_year, now_month) {
            return Err(GatewayError::Validation("card has expired".to_string()));
        }
        if self.cvv.len() < 3 || self.cvv.len() > 4 || !self.cvv.chars().all(|c| c.is_ascii_digit())
        {
            return Err(GatewayError::Validation("invalid CVV format".to_string()));
        }
        Ok(())
    }

    pub fn last_four(&self) -> String {
        let digits: String = self.pan.chars().filter(|c| c.is_ascii_digit()).collect();
        digits.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect()
    }

    pub fn brand(&self) -> CardBrand {
        CardBrand::detect(&self.pan)
    }
}

/// Luhn (mod-10) checksum, standard card-number validation algorithm.
pub fn luhn_check(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let d = c.to_digit(10).unwrap_or(0);
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Masks a PAN to the spec's required display form (`****1234`).
pub fn mask_pan(pan: &str) -> String {
    let digits: String = pan.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "****".to_string();
    }
    let last4 = &digits[digits.len() - 4..];
    format!("****{last4}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardBrand {
    pub fn detect(pan: &str) -> Self {
        let digits: String = pan.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.starts_with('4') {
            Self::Visa
        } else if digits.len() >= 2 {
            let prefix2: u32 = digits[..2].parse().unwrap_or(0);
            if (51..=55).contains(&prefix2) {
                Self::Mastercard
            } else if prefix2 == 34 || prefix2 == 37 {
                Self::Amex
            } else if digits.starts_with("6011") {
                Self::Discover
            } else {
                Self::Unknown
            }
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
            Self::Unknown => "unknown",
        }
    }
}

/// Opaque substitute for a PAN (spec §3 `CardToken`). The mapping PAN →
/// token must be injective: two distinct PANs never collide to the same
/// token (see the Open Question in spec §9 — this type codifies the
/// stronger uniqueness property rather than raw format-preserving
/// encryption).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardToken {
    pub token: String,
    pub last_four: String,
    pub brand: CardBrand,
    pub key_version: u32,
    pub active: bool,
    pub expiry_month: u32,
    pub expiry_year: u32,
}

impl CardToken {
    pub fn masked_display(&self) -> String {
        format!("****{}", self.last_four)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luhn_accepts_known_test_numbers() {
        assert!(luhn_check("4242424242424242"));
        assert!(luhn_check("5555555555554444"));
    }

    #[test]
    fn luhn_rejects_tampered_number() {
        assert!(!luhn_check("4242424242424241"));
    }

    #[test]
    fn mask_pan_keeps_last_four_only() {
        assert_eq!(mask_pan("4242424242424242"), "****4242");
    }

    #[test]
    fn validate_rejects_expired_card() {
        let card = RawCard {
            pan: "4242424242424242".to_string(),
            expiry_month: 1,
            expiry_year: 2020,
            cvv: "123".to_string(),
        };
        assert!(card.validate(2026, 1).is_err());
    }

    #[test]
    fn validate_accepts_valid_card() {
        let card = RawCard {
            pan: "4242424242424242".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".to_string(),
        };
        assert!(card.validate(2026, 1).is_ok());
    }

    #[test]
    fn brand_detection() {
        assert_eq!(CardBrand::detect("4242424242424242"), CardBrand::Visa);
        assert_eq!(CardBrand::detect("5555555555554444"), CardBrand::Mastercard);
    }

    #[test]
    fn debug_impl_never_prints_raw_pan() {
        let card = RawCard {
            pan: "4242424242424242".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".to_string(),
        };
        let printed = format!("{card:?}");
        assert!(!printed.contains("4242424242424242"));
        assert!(!printed.contains("123"));
    }
}
