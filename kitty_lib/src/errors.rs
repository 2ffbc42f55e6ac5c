use crate::shopping::ItemId;
use rust_decimal::Decimal;

#[derive(thiserror::Error, Debug)]
pub enum KittyError {
    #[error("{0}")]
    Str(String),

    #[error("A description is required")]
    EmptyDescription,

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("A payment method is required")]
    MissingPaymentMethod,

    #[error("A receipt screenshot is required")]
    MissingScreenshot,

    #[error("Choose who should buy the item")]
    MissingAssignee,

    #[error("Unknown account {0:?}")]
    UnknownAccount(String),

    #[error("An expense cannot be split with the account that paid it")]
    SplitWithPayer,

    #[error("Item {0:?} must be assigned before it can be bought")]
    NotAssigned(ItemId),

    #[error("At least two accounts are required, got {0}")]
    TooFewAccounts(usize),

    #[error("{0}")]
    Regex(#[from] regex::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Base64(#[from] base64::DecodeError),
}
