use crate::errors::KittyError;
use crate::storage::BlobStore;
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const SETTINGS_KEY: &str = "settings";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    // Balances whose absolute value is below this are "settled".  Repeated
    // division (e.g. 100 / 3) leaves residues, so zero is never tested
    // directly.  A receipt amount at most this far from the claimed amount
    // is an exact match.
    #[serde(with = "rust_decimal::serde::float")]
    pub tolerance: Decimal,

    // A receipt amount within this distance of the claimed amount is a
    // "close" match rather than a mismatch.
    #[serde(with = "rust_decimal::serde::float")]
    pub close_tolerance: Decimal,

    // Candidate amounts found on a receipt must be strictly below this
    #[serde(with = "rust_decimal::serde::float")]
    pub max_plausible_amount: Decimal,

    // Displayed before amounts
    pub currency_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tolerance: dec!(0.01),
            close_tolerance: dec!(1.00),
            max_plausible_amount: dec!(100000),
            currency_symbol: "$".into(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, KittyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the settings from the store, or fall back to the defaults when
    /// none were saved.
    pub fn load(store: &impl BlobStore) -> Result<Self> {
        match store.read(SETTINGS_KEY)? {
            None => Ok(Settings::default()),
            Some(json) => Ok(Settings::from_json(&json)?),
        }
    }

    pub fn save(&self, store: &mut impl BlobStore) -> Result<()> {
        store.write(SETTINGS_KEY, &serde_json::to_string(self)?)
    }

    /// Whether the amount should be considered as zero
    pub fn is_negligible(&self, amount: Decimal) -> bool {
        amount.abs() < self.tolerance
    }
}
