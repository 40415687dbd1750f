//! Address book.

use tracing::instrument;

use lumen_core::{AddressFields, AddressId, UserId, ValidAddress};

use crate::db::Store;
use crate::error::ShopError;
use crate::models::{Address, CurrentUser};

/// Address book operations for signed-in users.
pub struct AddressService<'a> {
    store: &'a dyn Store,
}

impl<'a> AddressService<'a> {
    /// Create a new address service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn list_addresses(&self, user: UserId) -> Result<Vec<Address>, ShopError> {
        Ok(self.store.addresses_for_user(user).await?)
    }

    /// The user's default address, if one is set.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn default_address(&self, user: UserId) -> Result<Option<Address>, ShopError> {
        Ok(self
            .store
            .addresses_for_user(user)
            .await?
            .into_iter()
            .find(|a| a.is_default))
    }

    /// Add an address to the user's book.
    ///
    /// A blank email is filled from the user's account.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Validation` if the fields are incomplete or invalid.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn save_address(
        &self,
        user: &CurrentUser,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Address, ShopError> {
        let address = validate_for(user, fields)?;
        Ok(self
            .store
            .insert_user_address(user.id, &address, is_default)
            .await?)
    }

    /// Edit one of the user's addresses.
    ///
    /// An address already used by an order is left untouched and the edit is
    /// stored as a new address instead.
    ///
    /// # Errors
    ///
    /// - `ShopError::NotFound` if the address is not the user's
    /// - `ShopError::Validation` if the fields are incomplete or invalid
    #[instrument(skip(self, user, fields), fields(user_id = %user.id))]
    pub async fn update_address(
        &self,
        user: &CurrentUser,
        id: AddressId,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Address, ShopError> {
        let owned = self
            .store
            .address(id)
            .await?
            .is_some_and(|a| a.user_id == Some(user.id));
        if !owned {
            return Err(ShopError::NotFound("Address"));
        }

        let address = validate_for(user, fields)?;
        if let Some(updated) = self
            .store
            .update_unreferenced_address(user.id, id, &address, is_default)
            .await?
        {
            return Ok(updated);
        }

        tracing::info!(address_id = %id, "Address is referenced by an order, storing edit as new address");
        Ok(self
            .store
            .insert_user_address(user.id, &address, is_default)
            .await?)
    }
}

fn validate_for(user: &CurrentUser, fields: &AddressFields) -> Result<ValidAddress, ShopError> {
    let blank_email = fields.email.as_deref().is_none_or(|e| e.trim().is_empty());
    if blank_email {
        let filled = AddressFields {
            email: Some(user.email.as_str().to_owned()),
            ..fields.clone()
        };
        return Ok(filled.validate()?);
    }
    Ok(fields.validate()?)
}
