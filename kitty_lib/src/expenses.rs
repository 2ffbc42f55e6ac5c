use crate::accounts::{AccountId, Payer};
use crate::categories::Category;
use crate::errors::KittyError;
use crate::session::Session;
use crate::settlements::SettlementId;
use chrono::{DateTime, Local};
use log::{debug, info};
use rust_decimal::Decimal;

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct ExpenseId(pub i64);

/// Who shares the cost of an expense
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SplitWith {
    // Every account in the registry
    All,

    // Only the payer and the given account
    With(AccountId),
}

/// Something that was paid by one account on behalf of several.
/// Expenses are shared by all accounts, and never modified once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,

    // Total amount paid.  Positive, except for purchases from the shopping
    // list whose price was never estimated.
    pub amount: Decimal,

    pub paid_by: Payer,
    pub split_with: SplitWith,
    pub date: DateTime<Local>,

    // Set for the expense that offsets a settlement.  Such expenses transfer
    // the whole amount between the two accounts instead of splitting it.
    pub is_settlement: bool,
    pub settlement_id: Option<SettlementId>,

    // Set when the expense was created by buying an item from the shopping
    // list.
    pub from_to_buy: bool,
}

impl Expense {
    pub fn category(&self) -> Category {
        Category::from_description(&self.description)
    }
}

/// Details used to record a new expense, as entered by the user.
pub struct ExpenseDetails<'a> {
    pub description: &'a str,
    pub amount: Decimal,
    pub paid_by: AccountId,
    pub split_with: SplitWith,
}

impl Session {
    /// Record a new expense entered by the user.  Nothing is changed if the
    /// details are invalid.
    pub fn add_expense(
        &mut self,
        details: ExpenseDetails,
    ) -> Result<ExpenseId, KittyError> {
        let description = details.description.trim();
        if description.is_empty() {
            return Err(KittyError::EmptyDescription);
        }
        if details.amount <= Decimal::ZERO {
            return Err(KittyError::NonPositiveAmount(details.amount));
        }
        self.check_account(details.paid_by)?;
        if let SplitWith::With(other) = details.split_with {
            self.check_account(other)?;
            if other == details.paid_by {
                return Err(KittyError::SplitWithPayer);
            }
        }

        let date = self.now();
        let id = ExpenseId(self.next_id(date));
        self.push_expense(Expense {
            id,
            description: description.into(),
            amount: details.amount,
            paid_by: Payer::Account(details.paid_by),
            split_with: details.split_with,
            date,
            is_settlement: false,
            settlement_id: None,
            from_to_buy: false,
        });
        info!("added expense {description:?} for {}", details.amount);
        Ok(id)
    }

    /// Delete an expense.  Returns false if it no longer exists.
    pub fn delete_expense(&mut self, id: ExpenseId) -> bool {
        let before = self.expenses.len();
        self.expenses.retain(|e| e.id != id);
        let deleted = self.expenses.len() != before;
        if deleted {
            info!("deleted expense {id:?}");
        } else {
            debug!("expense {id:?} already deleted");
        }
        deleted
    }

    pub fn get_expense(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    /// Most recent first
    pub(crate) fn push_expense(&mut self, expense: Expense) {
        self.expenses.insert(0, expense);
    }
}
