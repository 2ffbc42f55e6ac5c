use crate::errors::KittyError;
use crate::session::{Decision, Session};
use crate::shopping::{ItemId, ShoppingItem};
use crate::utils::non_blank;
use chrono::{DateTime, Local};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct SuggestionId(pub i64);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A proposed purchase, waiting for someone to accept or reject it.
/// Accepted and rejected suggestions are removed from the list straight
/// away, so stored suggestions are always pending.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub description: String,

    // Estimated price, if known
    pub amount: Option<Decimal>,

    pub reason: Option<String>,
    pub date: DateTime<Local>,
    pub status: SuggestionStatus,
}

impl Session {
    /// Propose a new purchase
    pub fn suggest(
        &mut self,
        description: &str,
        amount: Option<Decimal>,
        reason: Option<&str>,
    ) -> Result<SuggestionId, KittyError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(KittyError::EmptyDescription);
        }
        if let Some(a) = amount {
            if a <= Decimal::ZERO {
                return Err(KittyError::NonPositiveAmount(a));
            }
        }

        let date = self.now();
        let id = SuggestionId(self.next_id(date));
        self.book.suggestions.insert(
            0,
            Suggestion {
                id,
                description: description.into(),
                amount,
                reason: non_blank(reason),
                date,
                status: SuggestionStatus::Pending,
            },
        );
        info!("suggested {description:?}");
        Ok(id)
    }

    pub fn get_suggestion(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.book.suggestions.iter().find(|s| s.id == id)
    }

    /// Accept a suggestion, which moves it to the shopping list.
    /// Returns None if the suggestion no longer exists.
    pub fn accept_suggestion(&mut self, id: SuggestionId) -> Option<ItemId> {
        let Some(mut suggestion) = self.take_suggestion(id) else {
            debug!("suggestion {id:?} no longer exists");
            return None;
        };
        suggestion.status = SuggestionStatus::Accepted;

        let date = self.now();
        let item_id = ItemId(self.next_id(date));
        self.book.shopping_items.insert(
            0,
            ShoppingItem {
                id: item_id,
                description: suggestion.description,
                amount: suggestion.amount,
                reason: suggestion.reason,
                date,
                assigned_to: None,
                bought: false,
            },
        );
        info!("accepted suggestion {id:?} as item {item_id:?}");
        Some(item_id)
    }

    /// Reject a suggestion, which discards it.  Nothing happens unless the
    /// user confirmed.  Returns whether the suggestion was removed.
    pub fn reject_suggestion(
        &mut self,
        id: SuggestionId,
        decision: Decision,
    ) -> bool {
        if decision != Decision::Confirm {
            return false;
        }
        match self.take_suggestion(id) {
            None => {
                debug!("suggestion {id:?} no longer exists");
                false
            }
            Some(mut suggestion) => {
                suggestion.status = SuggestionStatus::Rejected;
                info!("rejected suggestion {:?}", suggestion.description);
                true
            }
        }
    }

    /// Remove a pending suggestion from the list
    fn take_suggestion(&mut self, id: SuggestionId) -> Option<Suggestion> {
        let pos = self
            .book
            .suggestions
            .iter()
            .position(|s| s.id == id && s.status == SuggestionStatus::Pending)?;
        Some(self.book.suggestions.remove(pos))
    }
}
