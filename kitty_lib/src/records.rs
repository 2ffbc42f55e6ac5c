//! The persisted shape of the ledger.
//!
//! Records evolved over time: the first version only knew about two people
//! ("you" and "housemate") and had no split target, later versions added
//! optional fields.  Everything is normalized here, when records are
//! loaded, so that the rest of the crate only sees the current model.

use crate::accounts::{AccountCollection, Payer};
use crate::errors::KittyError;
use crate::expenses::{Expense, ExpenseId, SplitWith};
use crate::settlements::{
    Screenshot, Settlement, SettlementId, SettlementKind, SettlementStatus,
};
use crate::shopping::{ItemId, ShoppingItem};
use crate::suggestions::{Suggestion, SuggestionId, SuggestionStatus};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Local};
use log::warn;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Stored in place of an account in `splitWith`
pub const SPLIT_ALL: &str = "all";

fn is_false(b: &bool) -> bool {
    !*b
}

/// Parse a list of records.  Missing or blank data is an empty list.
pub fn parse_list<R: DeserializeOwned>(
    json: Option<&str>,
) -> Result<Vec<R>, KittyError> {
    match json.map(str::trim) {
        None | Some("") | Some("null") => Ok(Vec::new()),
        Some(json) => Ok(serde_json::from_str(json)?),
    }
}

fn parse_payer(registry: &AccountCollection, label: &str) -> Payer {
    registry.parse_payer(label).unwrap_or_else(|| {
        warn!("unknown account {label:?}, assuming another account");
        Payer::LegacyHousemate
    })
}

//--------------------------------------------------------------
// Expenses
//--------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: i64,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub paid_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_with: Option<String>,
    pub date: DateTime<Local>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_settlement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub from_to_buy: bool,
}

impl ExpenseRecord {
    pub fn from_expense(e: &Expense, registry: &AccountCollection) -> Self {
        ExpenseRecord {
            id: e.id.0,
            description: e.description.clone(),
            amount: e.amount,
            paid_by: registry.payer_label(&e.paid_by),
            split_with: Some(match e.split_with {
                SplitWith::All => SPLIT_ALL.into(),
                SplitWith::With(acc) => {
                    registry.name(acc).unwrap_or(SPLIT_ALL).into()
                }
            }),
            date: e.date,
            is_settlement: e.is_settlement,
            settlement_id: e.settlement_id.map(|s| s.0),
            from_to_buy: e.from_to_buy,
        }
    }

    /// Amounts are positive, except for purchases from the shopping list
    /// that had no estimated price.
    pub fn has_valid_amount(&self) -> bool {
        self.amount > Decimal::ZERO
            || (self.from_to_buy && self.amount.is_zero())
    }

    /// Records without a split target, or with one that is not a known
    /// account, are split between everyone.  Invalid amounts are kept as
    /// is, since they are part of the shared history.
    pub fn into_expense(self, registry: &AccountCollection) -> Expense {
        if !self.has_valid_amount() {
            warn!("expense {}: unexpected amount {}", self.id, self.amount);
        }
        let split_with = match self.split_with.as_deref().map(str::trim) {
            None | Some(SPLIT_ALL) => SplitWith::All,
            Some(label) => match registry.find(label) {
                Some(acc) => SplitWith::With(acc),
                None => {
                    warn!("expense {}: unknown split {label:?}", self.id);
                    SplitWith::All
                }
            },
        };
        Expense {
            id: ExpenseId(self.id),
            paid_by: parse_payer(registry, &self.paid_by),
            description: self.description,
            amount: self.amount,
            split_with,
            date: self.date,
            is_settlement: self.is_settlement,
            settlement_id: self.settlement_id.map(SettlementId),
            from_to_buy: self.from_to_buy,
        }
    }
}

//--------------------------------------------------------------
// Suggestions
//--------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub id: i64,
    pub description: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
    pub date: DateTime<Local>,
    #[serde(default = "pending")]
    pub status: SuggestionStatus,
}

fn pending() -> SuggestionStatus {
    SuggestionStatus::Pending
}

impl SuggestionRecord {
    pub fn from_suggestion(s: &Suggestion) -> Self {
        SuggestionRecord {
            id: s.id.0,
            description: s.description.clone(),
            amount: s.amount,
            reason: s.reason.clone(),
            date: s.date,
            status: s.status,
        }
    }

    pub fn into_suggestion(self) -> Suggestion {
        Suggestion {
            id: SuggestionId(self.id),
            description: self.description,
            amount: self.amount,
            reason: self.reason.filter(|r| !r.trim().is_empty()),
            date: self.date,
            status: self.status,
        }
    }
}

//--------------------------------------------------------------
// Shopping items
//--------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItemRecord {
    pub id: i64,
    pub description: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
    pub date: DateTime<Local>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub bought: bool,
}

impl ShoppingItemRecord {
    pub fn from_item(i: &ShoppingItem, registry: &AccountCollection) -> Self {
        ShoppingItemRecord {
            id: i.id.0,
            description: i.description.clone(),
            amount: i.amount,
            reason: i.reason.clone(),
            date: i.date,
            assigned_to: i.assigned_to.map(|p| registry.payer_label(&p)),
            bought: i.bought,
        }
    }

    pub fn into_item(self, registry: &AccountCollection) -> ShoppingItem {
        ShoppingItem {
            id: ItemId(self.id),
            description: self.description,
            amount: self.amount,
            reason: self.reason.filter(|r| !r.trim().is_empty()),
            date: self.date,
            assigned_to: self
                .assigned_to
                .as_deref()
                .filter(|a| !a.trim().is_empty())
                .map(|a| parse_payer(registry, a)),
            bought: self.bought,
        }
    }
}

//--------------------------------------------------------------
// Settlements
//--------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRecord {
    // base64
    pub data: String,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub screenshot: ScreenshotRecord,
    pub date: DateTime<Local>,
    pub paid_by: String,
    pub status: SettlementStatus,
    #[serde(rename = "type")]
    pub kind: SettlementKind,
}

impl SettlementRecord {
    pub fn from_settlement(
        s: &Settlement,
        registry: &AccountCollection,
    ) -> Self {
        SettlementRecord {
            id: s.id.0,
            amount: s.amount,
            payment_method: s.payment_method.clone(),
            notes: s.notes.clone(),
            screenshot: ScreenshotRecord {
                data: STANDARD.encode(&s.screenshot.data),
                filename: s.screenshot.filename.clone(),
                mime_type: s.screenshot.mime_type.clone(),
                size: s.screenshot.size(),
            },
            date: s.date,
            paid_by: registry.payer_label(&s.paid_by),
            status: s.status,
            kind: s.kind,
        }
    }

    pub fn into_settlement(
        self,
        registry: &AccountCollection,
    ) -> Result<Settlement, KittyError> {
        let data = STANDARD.decode(self.screenshot.data.as_bytes())?;
        if data.len() != self.screenshot.size {
            warn!(
                "settlement {}: screenshot is {} bytes, expected {}",
                self.id,
                data.len(),
                self.screenshot.size,
            );
        }
        Ok(Settlement {
            id: SettlementId(self.id),
            amount: self.amount,
            payment_method: self.payment_method,
            notes: self.notes,
            screenshot: Screenshot {
                data,
                filename: self.screenshot.filename,
                mime_type: self.screenshot.mime_type,
            },
            date: self.date,
            paid_by: parse_payer(registry, &self.paid_by),
            status: self.status,
            kind: self.kind,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::accounts::test::{three_accounts, ALEX, JO, SAM};
    use crate::accounts::Payer;
    use crate::expenses::SplitWith;
    use crate::records::{
        parse_list, ExpenseRecord, SettlementRecord, ShoppingItemRecord,
        SuggestionRecord,
    };
    use crate::settlements::SettlementKind;
    use crate::suggestions::SuggestionStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_legacy_expense() {
        // as written by the two-person version
        let json = r#"[
            {"id": 1717000000000, "description": "Pizza", "amount": 24.5,
             "paidBy": "you", "date": "2024-05-29T16:26:40.000Z"},
            {"id": 1716000000000, "description": "Gas", "amount": 60,
             "paidBy": "housemate", "date": "2024-05-18T02:40:00.000Z"}
        ]"#;
        let reg = three_accounts();
        let records: Vec<ExpenseRecord> = parse_list(Some(json)).unwrap();
        let expenses: Vec<_> =
            records.into_iter().map(|r| r.into_expense(&reg)).collect();
        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[0].amount, dec!(24.5));
        assert_eq!(expenses[0].paid_by, Payer::LegacyYou);
        assert_eq!(expenses[0].split_with, SplitWith::All);
        assert!(!expenses[0].is_settlement);
        assert_eq!(expenses[1].paid_by, Payer::LegacyHousemate);
    }

    #[test]
    fn test_expense_round_trip() {
        let json = r#"{"id": 5, "description": "Settlement", "amount": 30,
            "paidBy": "sam", "splitWith": "alex",
            "date": "2024-05-29T16:26:40+02:00",
            "isSettlement": true, "settlementId": 4}"#;
        let reg = three_accounts();
        let record: ExpenseRecord = serde_json::from_str(json).unwrap();
        let expense = record.clone().into_expense(&reg);
        assert_eq!(expense.paid_by, Payer::Account(SAM));
        assert_eq!(expense.split_with, SplitWith::With(ALEX));
        assert!(expense.is_settlement);

        let back = ExpenseRecord::from_expense(&expense, &reg);
        assert_eq!(back, record);

        // amounts stay JSON numbers, unset flags are omitted
        let value = serde_json::to_value(&back).unwrap();
        assert!(value["amount"].is_number());
        assert!(value.get("fromToBuy").is_none());
    }

    #[test]
    fn test_unknown_labels() {
        let json = r#"{"id": 5, "description": "Rent", "amount": 900,
            "paidBy": "bob", "splitWith": "carol",
            "date": "2024-05-29T16:26:40Z"}"#;
        let reg = three_accounts();
        let record: ExpenseRecord = serde_json::from_str(json).unwrap();
        let expense = record.into_expense(&reg);
        assert_eq!(expense.paid_by, Payer::LegacyHousemate);
        assert_eq!(expense.split_with, SplitWith::All);
    }

    #[test]
    fn test_invalid_amounts() {
        let json = r#"[
            {"id": 1, "description": "Refund", "amount": -12,
             "paidBy": "sam", "date": "2024-05-29T16:26:40Z"},
            {"id": 2, "description": "Nothing", "amount": 0,
             "paidBy": "sam", "date": "2024-05-29T16:26:40Z"},
            {"id": 3, "description": "Stamps", "amount": 0,
             "paidBy": "sam", "date": "2024-05-29T16:26:40Z",
             "fromToBuy": true}
        ]"#;
        let reg = three_accounts();
        let records: Vec<ExpenseRecord> = parse_list(Some(json)).unwrap();
        let valid: Vec<_> =
            records.iter().map(ExpenseRecord::has_valid_amount).collect();
        assert_eq!(valid, vec![false, false, true]);

        // still loaded, only reported
        let expenses: Vec<_> =
            records.into_iter().map(|r| r.into_expense(&reg)).collect();
        assert_eq!(expenses.len(), 3);
        assert_eq!(expenses[0].amount, dec!(-12));
    }

    #[test]
    fn test_empty_lists() {
        assert!(parse_list::<ExpenseRecord>(None).unwrap().is_empty());
        assert!(parse_list::<ExpenseRecord>(Some(" ")).unwrap().is_empty());
        assert!(parse_list::<ExpenseRecord>(Some("null")).unwrap().is_empty());
        assert!(parse_list::<ExpenseRecord>(Some("{oops")).is_err());
    }

    #[test]
    fn test_suggestion_and_item() {
        let json = r#"[{"id": 2, "description": "Bin bags", "amount": null,
            "reason": "", "date": "2024-06-01T09:00:00Z",
            "status": "pending"}]"#;
        let s: Vec<SuggestionRecord> = parse_list(Some(json)).unwrap();
        let s = s.into_iter().next().unwrap().into_suggestion();
        assert_eq!(s.amount, None);
        assert_eq!(s.reason, None);
        assert_eq!(s.status, SuggestionStatus::Pending);

        let reg = three_accounts();
        let json = r#"[{"id": 3, "description": "Soap", "amount": 4.2,
            "date": "2024-06-01T09:00:00Z", "assignedTo": "jo"}]"#;
        let items: Vec<ShoppingItemRecord> = parse_list(Some(json)).unwrap();
        let item = items.into_iter().next().unwrap().into_item(&reg);
        assert_eq!(item.amount, Some(dec!(4.2)));
        assert_eq!(item.assigned_to, Some(Payer::Account(JO)));
        assert!(!item.bought);

        let back = ShoppingItemRecord::from_item(&item, &reg);
        assert_eq!(back.assigned_to.as_deref(), Some("jo"));
    }

    #[test]
    fn test_settlement() {
        let json = r#"{"id": 9, "amount": 30, "paymentMethod": "Bank",
            "notes": null,
            "screenshot": {"data": "iVBORw==", "filename": "r.png",
                           "mimeType": "image/png", "size": 4},
            "date": "2024-06-01T09:00:00Z", "paidBy": "sam",
            "status": "completed", "type": "payment_received"}"#;
        let reg = three_accounts();
        let record: SettlementRecord = serde_json::from_str(json).unwrap();
        let s = record.clone().into_settlement(&reg).unwrap();
        assert_eq!(s.screenshot.data, vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(s.kind, SettlementKind::PaymentReceived);
        assert_eq!(s.paid_by, Payer::Account(SAM));
        assert_eq!(SettlementRecord::from_settlement(&s, &reg), record);

        let mut bad = record;
        bad.screenshot.data = "not base64!".into();
        assert!(bad.into_settlement(&reg).is_err());
    }
}
