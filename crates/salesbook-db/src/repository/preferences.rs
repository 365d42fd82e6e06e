//! # Preferences Repository
//!
//! The per-owner preferences record: display currency and the ordered list
//! of accepted payment methods. Seeded with defaults on first read.

use tracing::{debug, info};

use salesbook_core::validation::{normalize_currency, validate_payment_method};
use salesbook_core::{CoreError, PaymentMethodOption, Preferences};

use crate::error::DbResult;
use crate::store::PreferencesStore;

#[derive(Debug, Clone)]
pub struct PreferencesRepository<S> {
    store: S,
}

impl<S: PreferencesStore> PreferencesRepository<S> {
    pub fn new(store: S) -> Self {
        PreferencesRepository { store }
    }

    /// Current preferences, persisting the defaults when none exist yet.
    pub async fn get(&self) -> DbResult<Preferences> {
        if let Some(preferences) = self.store.select_preferences().await? {
            return Ok(preferences);
        }

        let preferences = Preferences::default();
        self.store.save_preferences(&preferences).await?;
        info!(currency = %preferences.currency, "Default preferences seeded");
        Ok(preferences)
    }

    /// Sets the display currency. The code is stored upper-cased.
    pub async fn update_currency(&self, code: &str) -> DbResult<Preferences> {
        let currency = normalize_currency(code)?;
        let mut preferences = self.get().await?;
        preferences.currency = currency;
        self.store.save_preferences(&preferences).await?;
        debug!(currency = %preferences.currency, "Currency updated");
        Ok(preferences)
    }

    /// Appends a payment method. Values are unique, compared exactly.
    pub async fn add_payment_method(&self, option: PaymentMethodOption) -> DbResult<Preferences> {
        let option = PaymentMethodOption::new(option.value.trim(), option.label.trim());
        validate_payment_method(&option)?;

        let mut preferences = self.get().await?;
        if preferences.has_payment_method(&option.value) {
            return Err(CoreError::DuplicatePaymentMethod {
                value: option.value,
            }
            .into());
        }

        debug!(value = %option.value, "Payment method added");
        preferences.payment_methods.push(option);
        self.store.save_preferences(&preferences).await?;
        Ok(preferences)
    }

    /// Removes a payment method by value. Unknown values are ignored.
    pub async fn remove_payment_method(&self, value: &str) -> DbResult<Preferences> {
        let mut preferences = self.get().await?;
        let before = preferences.payment_methods.len();
        preferences.payment_methods.retain(|m| m.value != value);

        if preferences.payment_methods.len() != before {
            self.store.save_preferences(&preferences).await?;
            debug!(value = %value, "Payment method removed");
        }
        Ok(preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    #[tokio::test]
    async fn test_first_read_seeds_defaults() {
        let store = LocalStore::in_memory();
        let repo = PreferencesRepository::new(store.clone());

        let prefs = repo.get().await.unwrap();
        assert_eq!(prefs.currency, "MAD");
        assert_eq!(prefs.payment_methods.len(), 4);
        assert_eq!(prefs.payment_methods[0].value, "cash");
        assert!(store.select_preferences().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_currency_normalizes() {
        let repo = PreferencesRepository::new(LocalStore::in_memory());
        assert_eq!(repo.update_currency("eur").await.unwrap().currency, "EUR");
        assert!(repo.update_currency("EURO").await.is_err());
        assert!(repo.update_currency("E1R").await.is_err());
        assert_eq!(repo.get().await.unwrap().currency, "EUR");
    }

    #[tokio::test]
    async fn test_payment_methods_unique_and_ordered() {
        let repo = PreferencesRepository::new(LocalStore::in_memory());

        let prefs = repo
            .add_payment_method(PaymentMethodOption::new("cheque", "Chèque"))
            .await
            .unwrap();
        assert_eq!(prefs.payment_methods.last().unwrap().value, "cheque");

        let err = repo
            .add_payment_method(PaymentMethodOption::new("cash", "Cash again"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // Case-sensitive: "Cash" is a different value.
        repo.add_payment_method(PaymentMethodOption::new("Cash", "Cash"))
            .await
            .unwrap();

        let prefs = repo.remove_payment_method("card").await.unwrap();
        assert!(!prefs.has_payment_method("card"));
        let prefs = repo.remove_payment_method("unknown").await.unwrap();
        assert_eq!(prefs.payment_methods.len(), 5);
    }
}
