use crate::accounts::{AccountId, Payer};
use crate::errors::KittyError;
use crate::expenses::{Expense, ExpenseId, SplitWith};
use crate::session::{Decision, Session};
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use rust_decimal::Decimal;

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct ItemId(pub i64);

/// Where an item is in its lifecycle
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ItemState {
    Unassigned,
    Assigned,
    Bought,
}

/// Something on the shopping list, created by accepting a suggestion.
/// Once bought, the item is removed from the list and replaced with an
/// expense.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingItem {
    pub id: ItemId,
    pub description: String,
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
    pub date: DateTime<Local>,

    // Who is expected to buy the item
    pub assigned_to: Option<Payer>,

    // Never true for items still on the list, kept for the stored format
    pub bought: bool,
}

impl ShoppingItem {
    pub fn state(&self) -> ItemState {
        match (self.bought, self.assigned_to) {
            (true, _) => ItemState::Bought,
            (false, Some(_)) => ItemState::Assigned,
            (false, None) => ItemState::Unassigned,
        }
    }
}

impl Session {
    pub fn get_item(&self, id: ItemId) -> Option<&ShoppingItem> {
        self.book.shopping_items.iter().find(|i| i.id == id)
    }

    /// Assign an unassigned item to someone.  Returns false if the item no
    /// longer exists or was already assigned.
    pub fn assign_item(
        &mut self,
        id: ItemId,
        assignee: Option<AccountId>,
    ) -> Result<bool, KittyError> {
        let assignee = assignee.ok_or(KittyError::MissingAssignee)?;
        self.check_account(assignee)?;

        let Some(item) =
            self.book.shopping_items.iter_mut().find(|i| i.id == id)
        else {
            debug!("item {id:?} no longer exists");
            return Ok(false);
        };
        if item.state() != ItemState::Unassigned {
            debug!("item {id:?} is already assigned");
            return Ok(false);
        }
        item.assigned_to = Some(Payer::Account(assignee));
        info!("assigned {:?} to {assignee:?}", item.description);
        Ok(true)
    }

    /// Assign every unassigned item to the same person.  Returns the number
    /// of items that were assigned.
    pub fn assign_all_unassigned(
        &mut self,
        assignee: Option<AccountId>,
        decision: Decision,
    ) -> Result<usize, KittyError> {
        let assignee = assignee.ok_or(KittyError::MissingAssignee)?;
        self.check_account(assignee)?;
        if decision != Decision::Confirm {
            return Ok(0);
        }

        let mut count = 0;
        for item in self
            .book
            .shopping_items
            .iter_mut()
            .filter(|i| i.state() == ItemState::Unassigned)
        {
            item.assigned_to = Some(Payer::Account(assignee));
            count += 1;
        }
        info!("assigned {count} items to {assignee:?}");
        Ok(count)
    }

    /// Mark an assigned item as bought.  It is removed from the shopping
    /// list and recorded as an expense paid by its assignee.
    /// Returns None if the item no longer exists.
    pub fn mark_bought(
        &mut self,
        id: ItemId,
    ) -> Result<Option<ExpenseId>, KittyError> {
        let Some(pos) = self.book.shopping_items.iter().position(|i| i.id == id)
        else {
            debug!("item {id:?} no longer exists");
            return Ok(None);
        };
        let assigned = self
            .book
            .shopping_items
            .get(pos)
            .is_some_and(|i| i.assigned_to.is_some());
        if !assigned {
            return Err(KittyError::NotAssigned(id));
        }
        let item = self.book.shopping_items.remove(pos);
        Ok(Some(self.record_purchase(item)))
    }

    /// Mark every assigned item as bought.  Unassigned items stay on the
    /// list.  Returns the new expenses, in the order items were listed.
    pub fn mark_all_bought(&mut self, decision: Decision) -> Vec<ExpenseId> {
        if decision != Decision::Confirm {
            return Vec::new();
        }

        let (bought, remaining): (Vec<_>, Vec<_>) = self
            .book
            .shopping_items
            .drain(..)
            .partition(|i| i.state() == ItemState::Assigned);
        self.book.shopping_items = remaining;

        let ids: Vec<ExpenseId> = bought
            .into_iter()
            .map(|item| self.record_purchase(item))
            .collect();
        info!("marked {} items as bought", ids.len());
        ids
    }

    /// Create the expense for a bought item
    fn record_purchase(&mut self, item: ShoppingItem) -> ExpenseId {
        // a legacy "you" is whoever buys it now, and must not follow the
        // viewer once recorded
        let assignee = item.assigned_to.unwrap_or(Payer::LegacyYou);
        let paid_by = Payer::Account(
            self.registry.resolve_viewpoint(&assignee, self.current).paid_by,
        );
        let amount = item.amount.unwrap_or_else(|| {
            warn!("{:?} bought without a price", item.description);
            Decimal::ZERO
        });

        let date = self.now();
        let id = ExpenseId(self.next_id(date));
        self.push_expense(Expense {
            id,
            description: item.description,
            amount,
            paid_by,
            split_with: SplitWith::All,
            date,
            is_settlement: false,
            settlement_id: None,
            from_to_buy: true,
        });
        id
    }
}
