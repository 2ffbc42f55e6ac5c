use crate::accounts::{AccountId, Payer};
use crate::errors::KittyError;
use crate::expenses::{Expense, ExpenseId, SplitWith};
use crate::session::Session;
use crate::utils::non_blank;
use chrono::{DateTime, Local};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct SettlementId(pub i64);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Completed,
    Pending,
}

/// The direction of a settlement, from the point of view of the account
/// that recorded it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    PaymentSent,
    PaymentReceived,
}

/// An image proving the payment, typically a screenshot of a banking app
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screenshot {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl Screenshot {
    pub fn new(data: Vec<u8>, filename: &str, mime_type: &str) -> Self {
        Screenshot {
            data,
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A payment made by one account to another to pay back a debt.
/// Settlements are immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub id: SettlementId,
    pub amount: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
    pub screenshot: Screenshot,
    pub date: DateTime<Local>,

    // Who sent the money
    pub paid_by: Payer,

    pub status: SettlementStatus,
    pub kind: SettlementKind,
}

/// Details used to record a settlement.
/// The counterparty is optional: by default it is the account with the
/// largest debt in the direction of the payment.
#[derive(Default)]
pub struct SettlementDetails<'a> {
    pub amount: Decimal,
    pub payment_method: &'a str,
    pub notes: Option<&'a str>,
    pub screenshot: Option<Screenshot>,
    pub counterparty: Option<AccountId>,
}

/// What was created by a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub settlement: SettlementId,
    pub expense: ExpenseId,
    pub kind: SettlementKind,
    pub counterparty: AccountId,
}

impl Session {
    /// Record a settlement, along with the expense that offsets it in the
    /// balances.  Nothing is changed if the details are invalid.
    pub fn submit_settlement(
        &mut self,
        details: SettlementDetails,
    ) -> Result<SettlementReceipt, KittyError> {
        if details.amount <= Decimal::ZERO {
            return Err(KittyError::NonPositiveAmount(details.amount));
        }
        let payment_method = details.payment_method.trim();
        if payment_method.is_empty() {
            return Err(KittyError::MissingPaymentMethod);
        }
        let screenshot = match details.screenshot {
            Some(s) if !s.data.is_empty() => s,
            Some(_) | None => return Err(KittyError::MissingScreenshot),
        };
        let (kind, counterparty) = self.settlement_direction(details.counterparty)?;

        let (sender, receiver) = match kind {
            SettlementKind::PaymentSent => (self.current, counterparty),
            SettlementKind::PaymentReceived => (counterparty, self.current),
        };

        let date = self.now();
        let settlement_id = SettlementId(self.next_id(date));
        let expense_id = ExpenseId(self.next_id(date));
        let description = format!(
            "Settlement: {} paid {}",
            self.registry.display_name(sender),
            self.registry.display_name(receiver),
        );

        self.book.settlements.insert(
            0,
            Settlement {
                id: settlement_id,
                amount: details.amount,
                payment_method: payment_method.into(),
                notes: non_blank(details.notes),
                screenshot,
                date,
                paid_by: Payer::Account(sender),
                status: SettlementStatus::Completed,
                kind,
            },
        );

        // The receiver now "owes" the sender the full amount, which cancels
        // the debt that motivated the payment.
        self.push_expense(Expense {
            id: expense_id,
            description,
            amount: details.amount,
            paid_by: Payer::Account(sender),
            split_with: SplitWith::With(receiver),
            date,
            is_settlement: true,
            settlement_id: Some(settlement_id),
            from_to_buy: false,
        });

        info!(
            "recorded {kind:?} of {} with {:?} by {payment_method}",
            details.amount,
            self.registry.name(counterparty),
        );
        Ok(SettlementReceipt {
            settlement: settlement_id,
            expense: expense_id,
            kind,
            counterparty,
        })
    }

    pub fn get_settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.book.settlements.iter().find(|s| s.id == id)
    }

    /// Who the payment is exchanged with, and in which direction.
    /// With an explicit counterparty, the direction follows the balance with
    /// that account.  Otherwise it follows the aggregated balances: if the
    /// current account owes anything, it is paying its largest creditor,
    /// otherwise it is being paid by its largest debtor.
    fn settlement_direction(
        &self,
        counterparty: Option<AccountId>,
    ) -> Result<(SettlementKind, AccountId), KittyError> {
        let balances = self.balances();

        if let Some(other) = counterparty {
            self.check_account(other)?;
            if other == self.current {
                return Err(KittyError::Str(
                    "Cannot settle with yourself".into(),
                ));
            }
            let b = balances.get(other);
            let kind = if b.is_sign_negative()
                && !self.settings.is_negligible(b)
            {
                SettlementKind::PaymentSent
            } else {
                SettlementKind::PaymentReceived
            };
            return Ok((kind, other));
        }

        let first_other = || {
            self.registry
                .others(self.current)
                .next()
                .ok_or(KittyError::TooFewAccounts(self.registry.len()))
        };
        if self.settings.is_negligible(balances.totals().you_owe) {
            let other = match balances.largest_debtor(&self.settings) {
                Some((acc, _)) => acc,
                None => first_other()?,
            };
            Ok((SettlementKind::PaymentReceived, other))
        } else {
            let other = match balances.largest_creditor(&self.settings) {
                Some((acc, _)) => acc,
                None => first_other()?,
            };
            Ok((SettlementKind::PaymentSent, other))
        }
    }
}

#[cfg(test)]
mod test {
    use crate::accounts::test::{ALEX, JO, SAM};
    use crate::accounts::{AccountId, Payer};
    use crate::errors::KittyError;
    use crate::expenses::{ExpenseDetails, SplitWith};
    use crate::session::test::new_session;
    use crate::session::Session;
    use crate::settlements::{
        Screenshot, SettlementDetails, SettlementKind, SettlementStatus,
    };
    use rust_decimal_macros::dec;

    fn receipt() -> Option<Screenshot> {
        Some(Screenshot::new(vec![0x89, 0x50, 0x4e, 0x47], "r.png", "image/png"))
    }

    fn alex_paid_90(current: AccountId) -> Session {
        let mut session = new_session(current);
        session
            .add_expense(ExpenseDetails {
                description: "Cleaning supplies",
                amount: dec!(90),
                paid_by: ALEX,
                split_with: SplitWith::All,
            })
            .unwrap();
        session
    }

    #[test]
    fn test_validation() {
        let mut session = alex_paid_90(ALEX);
        assert!(matches!(
            session.submit_settlement(SettlementDetails {
                amount: dec!(0),
                payment_method: "Bank",
                screenshot: receipt(),
                ..Default::default()
            }),
            Err(KittyError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            session.submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "  ",
                screenshot: receipt(),
                ..Default::default()
            }),
            Err(KittyError::MissingPaymentMethod)
        ));
        assert!(matches!(
            session.submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "Bank",
                ..Default::default()
            }),
            Err(KittyError::MissingScreenshot)
        ));
        assert!(matches!(
            session.submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "Bank",
                screenshot: Some(Screenshot::default()),
                ..Default::default()
            }),
            Err(KittyError::MissingScreenshot)
        ));
        assert!(session
            .submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "Bank",
                screenshot: receipt(),
                counterparty: Some(ALEX),
                ..Default::default()
            })
            .is_err());
        assert!(session.settlements().is_empty());
        assert_eq!(session.expenses().len(), 1);
    }

    #[test]
    fn test_payment_received() {
        // Sam and Jo both owe 30 to Alex, Sam pays back
        let mut session = alex_paid_90(ALEX);
        let r = session
            .submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "Bank transfer",
                notes: Some("June"),
                screenshot: receipt(),
                counterparty: Some(SAM),
            })
            .unwrap();
        assert_eq!(r.kind, SettlementKind::PaymentReceived);
        assert_eq!(r.counterparty, SAM);

        let s = session.get_settlement(r.settlement).unwrap();
        assert_eq!(s.paid_by, Payer::Account(SAM));
        assert_eq!(s.status, SettlementStatus::Completed);
        assert_eq!(s.notes.as_deref(), Some("June"));
        assert_eq!(s.screenshot.size(), 4);

        let e = session.get_expense(r.expense).unwrap();
        assert!(e.is_settlement);
        assert_eq!(e.settlement_id, Some(r.settlement));
        assert_eq!(e.paid_by, Payer::Account(SAM));
        assert_eq!(e.split_with, SplitWith::With(ALEX));
        assert_eq!(e.amount, dec!(30));

        let b = session.balances();
        assert_eq!(b.get(SAM), dec!(0));
        assert_eq!(b.get(JO), dec!(30));
    }

    #[test]
    fn test_default_counterparty() {
        // Sam and Jo owe the same amount, the first in registry order wins
        let mut session = alex_paid_90(ALEX);
        let r = session
            .submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "Cash",
                screenshot: receipt(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(r.kind, SettlementKind::PaymentReceived);
        assert_eq!(r.counterparty, SAM);
    }

    #[test]
    fn test_payment_sent() {
        let mut session = alex_paid_90(JO);
        assert_eq!(session.totals().you_owe, dec!(30));

        let r = session
            .submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "Venmo",
                screenshot: receipt(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(r.kind, SettlementKind::PaymentSent);
        assert_eq!(r.counterparty, ALEX);
        let e = session.get_expense(r.expense).unwrap();
        assert_eq!(e.paid_by, Payer::Account(JO));
        assert_eq!(e.split_with, SplitWith::With(ALEX));
        assert!(session.balances().is_settled(session.settings()));
    }

    #[test]
    fn test_uneven_debt() {
        // 100 / 3 cannot be paid back exactly
        let mut session = new_session(SAM);
        session
            .add_expense(ExpenseDetails {
                description: "Internet",
                amount: dec!(100),
                paid_by: JO,
                split_with: SplitWith::All,
            })
            .unwrap();
        let owed = session.totals().you_owe.round_dp(2);
        assert_eq!(owed, dec!(33.33));
        session
            .submit_settlement(SettlementDetails {
                amount: owed,
                payment_method: "Bank",
                screenshot: receipt(),
                ..Default::default()
            })
            .unwrap();
        assert!(session.balances().is_settled(session.settings()));
    }
}
