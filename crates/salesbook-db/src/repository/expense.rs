//! # Expense Repository
//!
//! Business expenses: CRUD, filtering and per-category summaries.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use salesbook_core::report::{summarize_expenses, ExpenseSummary};
use salesbook_core::validation::{validate_expense_input, validate_expense_patch};
use salesbook_core::{CoreError, Expense, ExpenseFilters, ExpenseInput, ExpensePatch};

use crate::error::DbResult;
use crate::store::ExpenseStore;

#[derive(Debug, Clone)]
pub struct ExpenseRepository<S> {
    store: S,
}

impl<S: ExpenseStore> ExpenseRepository<S> {
    pub fn new(store: S) -> Self {
        ExpenseRepository { store }
    }

    /// Expenses matching `filters`, newest date first.
    pub async fn list(&self, filters: &ExpenseFilters) -> DbResult<Vec<Expense>> {
        let expenses = self.store.select_expenses().await?;
        Ok(filters.apply(expenses))
    }

    /// Total and per-category amounts of the expenses matching `filters`.
    pub async fn summary(&self, filters: &ExpenseFilters) -> DbResult<ExpenseSummary> {
        let expenses = self.list(filters).await?;
        Ok(summarize_expenses(&expenses))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Expense>> {
        self.store.select_expense(id).await
    }

    pub async fn create(&self, input: ExpenseInput) -> DbResult<Expense> {
        validate_expense_input(&input)?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            label: input.label.trim().to_string(),
            category: input.category,
            amount: input.amount,
            date: input.date,
            note: clean_note(input.note),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_expense(&expense).await?;
        info!(id = %expense.id, category = %expense.category, amount = %expense.amount, "Expense created");
        Ok(expense)
    }

    pub async fn update(&self, id: &str, patch: ExpensePatch) -> DbResult<Expense> {
        validate_expense_patch(&patch)?;

        let mut expense = self
            .store
            .select_expense(id)
            .await?
            .ok_or_else(|| CoreError::ExpenseNotFound(id.to_string()))?;

        if let Some(label) = patch.label {
            expense.label = label.trim().to_string();
        }
        if let Some(category) = patch.category {
            expense.category = category;
        }
        if let Some(amount) = patch.amount {
            expense.amount = amount;
        }
        if let Some(date) = patch.date {
            expense.date = date;
        }
        if patch.note.is_some() {
            expense.note = clean_note(patch.note);
        }
        expense.updated_at = Utc::now();

        self.store.update_expense(&expense).await?;
        debug!(id = %id, "Expense updated");
        Ok(expense)
    }

    pub async fn remove(&self, id: &str) -> DbResult<()> {
        if !self.store.delete_expense(id).await? {
            return Err(CoreError::ExpenseNotFound(id.to_string()).into());
        }
        info!(id = %id, "Expense removed");
        Ok(())
    }
}

fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
