//! Address book queries.

use async_trait::async_trait;
use sqlx::PgConnection;

use lumen_core::{AddressId, UserId, ValidAddress};

use super::{AddressRow, PgStore};
use crate::db::{AddressRepo, RepositoryError};
use crate::models::Address;

const ADDRESS_COLUMNS: &str = "id, user_id, full_name, email, street, city, state, postal_code, \
    country, phone, is_default, created_at";

/// Insert an address row.
pub(super) async fn insert(
    conn: &mut PgConnection,
    user: Option<UserId>,
    address: &ValidAddress,
    is_default: bool,
) -> Result<Address, RepositoryError> {
    let row = sqlx::query_as::<_, AddressRow>(&format!(
        r"
        INSERT INTO shop.addresses
            (user_id, full_name, email, street, city, state, postal_code, country, phone, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {ADDRESS_COLUMNS}
        "
    ))
    .bind(user)
    .bind(&address.full_name)
    .bind(address.email.as_str())
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(&address.phone)
    .bind(is_default)
    .fetch_one(conn)
    .await?;

    Address::try_from(row)
}

/// Clear every default of `user` except `keep`.
async fn clear_other_defaults(
    conn: &mut PgConnection,
    user: UserId,
    keep: Option<AddressId>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE shop.addresses
        SET is_default = FALSE
        WHERE user_id = $1 AND is_default AND id IS DISTINCT FROM $2
        ",
    )
    .bind(user)
    .bind(keep)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl AddressRepo for PgStore {
    async fn address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Address::try_from).transpose()
    }

    async fn addresses_for_user(&self, user: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            SELECT {ADDRESS_COLUMNS}
            FROM shop.addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at DESC, id DESC
            "
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Address::try_from).collect()
    }

    async fn insert_user_address(
        &self,
        user: UserId,
        address: &ValidAddress,
        is_default: bool,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if is_default {
            clear_other_defaults(&mut tx, user, None).await?;
        }
        let created = insert(&mut tx, Some(user), address, is_default).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_unreferenced_address(
        &self,
        user: UserId,
        id: AddressId,
        address: &ValidAddress,
        is_default: bool,
    ) -> Result<Option<Address>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            UPDATE shop.addresses a
            SET full_name = $3, email = $4, street = $5, city = $6, state = $7,
                postal_code = $8, country = $9, phone = $10, is_default = $11
            WHERE a.id = $1 AND a.user_id = $2
              AND NOT EXISTS (SELECT 1 FROM shop.orders o WHERE o.address_id = a.id)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user)
        .bind(&address.full_name)
        .bind(address.email.as_str())
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(&address.phone)
        .bind(is_default)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if is_default {
            clear_other_defaults(&mut tx, user, Some(id)).await?;
        }

        tx.commit().await?;
        Address::try_from(row).map(Some)
    }
}
