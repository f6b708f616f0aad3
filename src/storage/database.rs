use crate::config::DatabaseConfig;
use crate::domain::*;
use crate::error::{Result, ShopError};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params::IntoParams, Builder, Connection, Database};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    /// Open the database named by the config: a remote libsql instance when
    /// `url` is set, otherwise a local file.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.url.is_empty() {
            info!("Opening local database at {}", config.local_path);
            Builder::new_local(&config.local_path)
                .build()
                .await
                .map_err(|e| ShopError::Database {
                    message: format!("Failed to open local database: {e}"),
                })?
        } else {
            info!("Connecting to remote database at {}", config.url);
            Builder::new_remote(config.url.clone(), config.auth_token.clone())
                .build()
                .await
                .map_err(|e| ShopError::Database {
                    message: format!("Failed to connect to database: {e}"),
                })?
        };

        Ok(Self { db })
    }

    /// Get a connection to the database
    pub async fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| ShopError::Database {
            message: format!("Failed to get database connection: {e}"),
        })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_connection().await?;
        let migration_sql = include_str!("../../migrations/001_init.sql");

        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| ShopError::Database {
                message: format!("Failed to run migrations: {e}"),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

/// Database storage implementation. Entities are serialized to JSON in each
/// table's data column; lookup columns are kept in sync on every write.
pub struct DatabaseStorage {
    db: DatabaseManager,
}

impl DatabaseStorage {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = DatabaseManager::new(config).await?;
        db.run_migrations().await?;
        Ok(Self { db })
    }

    fn encode<T: Serialize>(entity: &T, kind: &str) -> Result<String> {
        serde_json::to_string(entity).map_err(|e| ShopError::Database {
            message: format!("Failed to serialize {kind}: {e}"),
        })
    }

    fn decode<T: DeserializeOwned>(data: &str, kind: &str) -> Result<T> {
        serde_json::from_str(data).map_err(|e| ShopError::Database {
            message: format!("Failed to deserialize {kind}: {e}"),
        })
    }

    async fn exec(&self, sql: &str, params: impl IntoParams, context: &str) -> Result<u64> {
        let conn = self.db.get_connection().await?;
        conn.execute(sql, params)
            .await
            .map_err(|e| ShopError::Database {
                message: format!("{context}: {e}"),
            })
    }

    /// Run a query returning the data column of every row.
    async fn query_data(
        &self,
        sql: &str,
        params: impl IntoParams,
        context: &str,
    ) -> Result<Vec<String>> {
        let conn = self.db.get_connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| ShopError::Database {
                message: format!("{context}: {e}"),
            })?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| ShopError::Database {
            message: format!("{context}: failed to read row: {e}"),
        })? {
            let data: String = row.get(0).map_err(|e| ShopError::Database {
                message: format!("{context}: failed to get data column: {e}"),
            })?;
            out.push(data);
        }
        Ok(out)
    }

    async fn query_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: impl IntoParams,
        kind: &str,
    ) -> Result<Option<T>> {
        let context = format!("Failed to query {kind}");
        let rows = self.query_data(sql, params, &context).await?;
        match rows.first() {
            Some(data) => Ok(Some(Self::decode(data, kind)?)),
            None => Ok(None),
        }
    }

    async fn query_many<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: impl IntoParams,
        kind: &str,
    ) -> Result<Vec<T>> {
        let context = format!("Failed to query {kind}");
        let rows = self.query_data(sql, params, &context).await?;
        rows.iter().map(|data| Self::decode(data, kind)).collect()
    }

    async fn count(&self, sql: &str, params: impl IntoParams, context: &str) -> Result<u64> {
        let conn = self.db.get_connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| ShopError::Database {
                message: format!("{context}: {e}"),
            })?;
        let row = rows
            .next()
            .await
            .map_err(|e| ShopError::Database {
                message: format!("{context}: failed to read row: {e}"),
            })?
            .ok_or_else(|| ShopError::Database {
                message: format!("{context}: count query returned no rows"),
            })?;
        let count: i64 = row.get(0).map_err(|e| ShopError::Database {
            message: format!("{context}: failed to get count: {e}"),
        })?;
        Ok(count as u64)
    }

    async fn put_order(&self, order: &mut Order) -> Result<()> {
        let order_id = order
            .id
            .ok_or_else(|| ShopError::Validation("cannot update order without id".to_string()))?;
        order.updated_at = Utc::now();
        let data = Self::encode(order, "order")?;
        let affected = self
            .exec(
                "UPDATE orders SET data = ?1 WHERE id = ?2",
                libsql::params![data, order_id.to_string()],
                "Failed to update order",
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::OrderNotFound);
        }
        Ok(())
    }

    async fn put_voucher(&self, voucher: &mut Voucher) -> Result<()> {
        let voucher_id = voucher
            .id
            .ok_or_else(|| ShopError::Validation("cannot update voucher without id".to_string()))?;
        voucher.updated_at = Utc::now();
        let data = Self::encode(voucher, "voucher")?;
        self.exec(
            "UPDATE vouchers SET status = ?1, order_id = ?2, data = ?3 WHERE id = ?4",
            libsql::params![
                voucher.status.value(),
                voucher.order_id.map(|id| id.to_string()),
                data,
                voucher_id.to_string()
            ],
            "Failed to update voucher",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn create_category(&self, category: &mut Category) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        category.id = Some(id);
        category.created_at = now;
        category.updated_at = now;

        let data = Self::encode(category, "category")?;
        self.exec(
            "INSERT INTO categories (id, slug, data) VALUES (?1, ?2, ?3)",
            libsql::params![id.to_string(), category.slug.clone(), data],
            "Failed to insert category",
        )
        .await?;

        debug!("Created category: {} with id {}", category.name, id);
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let category_id = category.id.ok_or_else(|| {
            ShopError::Validation("cannot update category without id".to_string())
        })?;
        let mut updated = category.clone();
        updated.updated_at = Utc::now();
        let data = Self::encode(&updated, "category")?;

        let affected = self
            .exec(
                "UPDATE categories SET slug = ?1, data = ?2 WHERE id = ?3",
                libsql::params![updated.slug.clone(), data, category_id.to_string()],
                "Failed to update category",
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::CategoryNotFound);
        }
        Ok(())
    }

    async fn get_category_by_id(&self, category_id: Uuid) -> Result<Option<Category>> {
        self.query_one(
            "SELECT data FROM categories WHERE id = ?1",
            libsql::params![category_id.to_string()],
            "category",
        )
        .await
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.query_one(
            "SELECT data FROM categories WHERE slug = ?1",
            libsql::params![slug],
            "category",
        )
        .await
    }

    async fn list_categories(&self, include_removed: bool) -> Result<Vec<Category>> {
        let mut list: Vec<Category> = self
            .query_many("SELECT data FROM categories", libsql::params![], "category")
            .await?;
        list.retain(|c| include_removed || !c.is_removed);
        list.sort_by_key(|c| c.sort_order);
        Ok(list)
    }

    async fn remove_category(&self, category_id: Uuid) -> Result<()> {
        let mut category = self
            .get_category_by_id(category_id)
            .await?
            .ok_or(ShopError::CategoryNotFound)?;
        category.is_removed = true;
        self.update_category(&category).await
    }

    async fn create_product(&self, product: &mut Product) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product.id = Some(id);
        product.created_at = now;
        product.updated_at = now;

        let data = Self::encode(product, "product")?;
        self.exec(
            "INSERT INTO products (id, category_id, slug, data) VALUES (?1, ?2, ?3, ?4)",
            libsql::params![
                id.to_string(),
                product.category_id.to_string(),
                product.slug.clone(),
                data
            ],
            "Failed to insert product",
        )
        .await?;

        debug!("Created product: {} with id {}", product.name, id);
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let product_id = product
            .id
            .ok_or_else(|| ShopError::Validation("cannot update product without id".to_string()))?;
        let mut updated = product.clone();
        updated.updated_at = Utc::now();
        let data = Self::encode(&updated, "product")?;

        let affected = self
            .exec(
                "UPDATE products SET category_id = ?1, slug = ?2, data = ?3 WHERE id = ?4",
                libsql::params![
                    updated.category_id.to_string(),
                    updated.slug.clone(),
                    data,
                    product_id.to_string()
                ],
                "Failed to update product",
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::ProductNotFound);
        }
        Ok(())
    }

    async fn get_product_by_id(&self, product_id: Uuid) -> Result<Option<Product>> {
        self.query_one(
            "SELECT data FROM products WHERE id = ?1",
            libsql::params![product_id.to_string()],
            "product",
        )
        .await
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        self.query_one(
            "SELECT data FROM products WHERE slug = ?1",
            libsql::params![slug],
            "product",
        )
        .await
    }

    async fn list_products_by_category(
        &self,
        category_id: Uuid,
        include_hidden: bool,
    ) -> Result<Vec<Product>> {
        let mut list: Vec<Product> = self
            .query_many(
                "SELECT data FROM products WHERE category_id = ?1",
                libsql::params![category_id.to_string()],
                "product",
            )
            .await?;
        list.retain(|p| include_hidden || p.is_browsable());
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn remove_product(&self, product_id: Uuid) -> Result<()> {
        let mut product = self
            .get_product_by_id(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound)?;
        product.is_removed = true;
        self.update_product(&product).await
    }

    async fn add_vouchers(&self, product_id: Uuid, codes: &[String]) -> Result<u64> {
        // Reject duplicates up front so nothing is written on failure.
        let mut seen: Vec<&str> = Vec::with_capacity(codes.len());
        for code in codes {
            if seen.contains(&code.as_str()) {
                return Err(ShopError::VoucherSaveFailed(format!(
                    "duplicate code '{}' for product {}",
                    code, product_id
                )));
            }
            let existing = self
                .count(
                    "SELECT COUNT(*) FROM vouchers WHERE product_id = ?1 AND code = ?2",
                    libsql::params![product_id.to_string(), code.clone()],
                    "Failed to check voucher code",
                )
                .await?;
            if existing > 0 {
                return Err(ShopError::VoucherSaveFailed(format!(
                    "duplicate code '{}' for product {}",
                    code, product_id
                )));
            }
            seen.push(code);
        }

        let now = Utc::now();
        for code in codes {
            let id = Uuid::new_v4();
            let voucher = Voucher {
                id: Some(id),
                product_id,
                code: code.clone(),
                status: VoucherStatus::Purchased,
                order_id: None,
                created_at: now,
                updated_at: now,
            };
            let data = Self::encode(&voucher, "voucher")?;
            self.exec(
                "INSERT INTO vouchers (id, product_id, code, status, order_id, created_at, data) \
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
                libsql::params![
                    id.to_string(),
                    product_id.to_string(),
                    code.clone(),
                    VoucherStatus::Purchased.value(),
                    now.to_rfc3339(),
                    data
                ],
                "Failed to insert voucher",
            )
            .await?;
        }

        debug!("Stocked {} vouchers for product {}", codes.len(), product_id);
        Ok(codes.len() as u64)
    }

    async fn count_available_vouchers(&self, product_id: Uuid) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM vouchers WHERE product_id = ?1 AND status = 0 AND order_id IS NULL",
            libsql::params![product_id.to_string()],
            "Failed to count vouchers",
        )
        .await
    }

    async fn assign_vouchers_to_order(
        &self,
        product_id: Uuid,
        order_id: Uuid,
        quantity: u32,
    ) -> Result<Vec<Voucher>> {
        let available = self.count_available_vouchers(product_id).await?;
        if available < quantity as u64 {
            return Err(ShopError::OutOfStock);
        }

        // Oldest stock goes out first
        let mut picked: Vec<Voucher> = self
            .query_many(
                "SELECT data FROM vouchers \
                 WHERE product_id = ?1 AND status = 0 AND order_id IS NULL \
                 ORDER BY created_at, code LIMIT ?2",
                libsql::params![product_id.to_string(), quantity as i64],
                "voucher",
            )
            .await?;

        let mut assigned = Vec::with_capacity(picked.len());
        for voucher in picked.iter_mut() {
            voucher.status = VoucherStatus::Sold;
            voucher.order_id = Some(order_id);
            self.put_voucher(voucher).await?;
            assigned.push(voucher.clone());
        }

        debug!("Assigned {} vouchers to order {}", assigned.len(), order_id);
        Ok(assigned)
    }

    async fn release_vouchers_for_order(&self, order_id: Uuid) -> Result<u64> {
        let mut sold: Vec<Voucher> = self
            .query_many(
                "SELECT data FROM vouchers WHERE order_id = ?1 AND status = 1",
                libsql::params![order_id.to_string()],
                "voucher",
            )
            .await?;
        for voucher in sold.iter_mut() {
            voucher.status = VoucherStatus::Purchased;
            voucher.order_id = None;
            self.put_voucher(voucher).await?;
        }
        Ok(sold.len() as u64)
    }

    async fn revoke_vouchers_for_order(&self, order_id: Uuid) -> Result<u64> {
        let mut sold: Vec<Voucher> = self
            .query_many(
                "SELECT data FROM vouchers WHERE order_id = ?1 AND status = 1",
                libsql::params![order_id.to_string()],
                "voucher",
            )
            .await?;
        for voucher in sold.iter_mut() {
            voucher.status = VoucherStatus::Revoked;
            self.put_voucher(voucher).await?;
        }
        Ok(sold.len() as u64)
    }

    async fn list_vouchers_by_order(&self, order_id: Uuid) -> Result<Vec<Voucher>> {
        let mut list: Vec<Voucher> = self
            .query_many(
                "SELECT data FROM vouchers WHERE order_id = ?1",
                libsql::params![order_id.to_string()],
                "voucher",
            )
            .await?;
        list.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(list)
    }

    async fn create_order(&self, order: &mut Order) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        order.id = Some(id);
        order.created_at = now;
        order.updated_at = now;

        let data = Self::encode(order, "order")?;
        self.exec(
            "INSERT INTO orders (id, order_no, user_id, created_at, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            libsql::params![
                id.to_string(),
                order.order_no.clone(),
                order.user_id.to_string(),
                now.to_rfc3339(),
                data
            ],
            "Failed to insert order",
        )
        .await?;

        debug!("Created order: {} with id {}", order.order_no, id);
        Ok(())
    }

    async fn get_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>> {
        self.query_one(
            "SELECT data FROM orders WHERE id = ?1",
            libsql::params![order_id.to_string()],
            "order",
        )
        .await
    }

    async fn get_order_by_no(&self, order_no: &str) -> Result<Option<Order>> {
        self.query_one(
            "SELECT data FROM orders WHERE order_no = ?1",
            libsql::params![order_no],
            "order",
        )
        .await
    }

    async fn list_orders_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.query_many(
            "SELECT data FROM orders WHERE user_id = ?1 ORDER BY created_at DESC",
            libsql::params![user_id.to_string()],
            "order",
        )
        .await
    }

    async fn search_orders(&self, criteria: &OrderSearchCriteria) -> Result<Vec<Order>> {
        let list: Vec<Order> = self
            .query_many(
                "SELECT data FROM orders ORDER BY created_at DESC",
                libsql::params![],
                "order",
            )
            .await?;
        Ok(list.into_iter().filter(|o| criteria.matches(o)).collect())
    }

    async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        let mut order = self
            .get_order_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        order.status = status;
        self.put_order(&mut order).await
    }

    async fn set_order_visibility(
        &self,
        order_id: Uuid,
        visibility: OrderVisibility,
    ) -> Result<()> {
        let mut order = self
            .get_order_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        order.visibility = visibility;
        self.put_order(&mut order).await
    }

    async fn set_order_suspicion(&self, order_id: Uuid, suspicious: bool) -> Result<()> {
        let mut order = self
            .get_order_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        order.is_suspicious = suspicious;
        self.put_order(&mut order).await
    }

    async fn remove_order(&self, order_id: Uuid) -> Result<()> {
        let mut order = self
            .get_order_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        order.is_removed = true;
        self.put_order(&mut order).await
    }

    async fn create_user(&self, user: &mut User) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        user.id = Some(id);
        user.created_at = now;
        user.updated_at = now;

        let data = Self::encode(user, "user")?;
        self.exec(
            "INSERT INTO users (id, keycloak_id, email, data) VALUES (?1, ?2, ?3, ?4)",
            libsql::params![
                id.to_string(),
                user.keycloak_id.clone(),
                user.email.clone(),
                data
            ],
            "Failed to insert user",
        )
        .await?;

        debug!("Created user: {} with id {}", user.username, id);
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let user_id = user
            .id
            .ok_or_else(|| ShopError::Validation("cannot update user without id".to_string()))?;
        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        let data = Self::encode(&updated, "user")?;

        let affected = self
            .exec(
                "UPDATE users SET keycloak_id = ?1, email = ?2, data = ?3 WHERE id = ?4",
                libsql::params![
                    updated.keycloak_id.clone(),
                    updated.email.clone(),
                    data,
                    user_id.to_string()
                ],
                "Failed to update user",
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::UserNotFound);
        }
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        self.query_one(
            "SELECT data FROM users WHERE id = ?1",
            libsql::params![user_id.to_string()],
            "user",
        )
        .await
    }

    async fn get_user_by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<User>> {
        self.query_one(
            "SELECT data FROM users WHERE keycloak_id = ?1",
            libsql::params![keycloak_id],
            "user",
        )
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_one(
            "SELECT data FROM users WHERE email = ?1 COLLATE NOCASE",
            libsql::params![email],
            "user",
        )
        .await
    }

    async fn list_users(&self, include_removed: bool) -> Result<Vec<User>> {
        let mut list: Vec<User> = self
            .query_many("SELECT data FROM users", libsql::params![], "user")
            .await?;
        list.retain(|u| include_removed || !u.is_removed);
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn remove_user(&self, user_id: Uuid) -> Result<()> {
        let mut user = self
            .get_user_by_id(user_id)
            .await?
            .ok_or(ShopError::UserNotFound)?;
        user.is_removed = true;
        self.update_user(&user).await
    }

    async fn upsert_profile(&self, profile: &mut Profile) -> Result<()> {
        let now = Utc::now();
        let existing = self.get_profile_by_user(profile.user_id).await?;

        match existing {
            Some(current) => {
                profile.id = current.id;
                profile.created_at = current.created_at;
                profile.updated_at = now;
                let data = Self::encode(profile, "profile")?;
                self.exec(
                    "UPDATE profiles SET data = ?1 WHERE user_id = ?2",
                    libsql::params![data, profile.user_id.to_string()],
                    "Failed to update profile",
                )
                .await?;
            }
            None => {
                let id = Uuid::new_v4();
                profile.id = Some(id);
                profile.created_at = now;
                profile.updated_at = now;
                let data = Self::encode(profile, "profile")?;
                self.exec(
                    "INSERT INTO profiles (id, user_id, data) VALUES (?1, ?2, ?3)",
                    libsql::params![id.to_string(), profile.user_id.to_string(), data],
                    "Failed to insert profile",
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn get_profile_by_user(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.query_one(
            "SELECT data FROM profiles WHERE user_id = ?1",
            libsql::params![user_id.to_string()],
            "profile",
        )
        .await
    }

    async fn link_social_account(&self, account: &mut SocialAccount) -> Result<()> {
        let existing: Option<SocialAccount> = self
            .query_one(
                "SELECT data FROM social_accounts \
                 WHERE user_id = ?1 AND provider = ?2 AND provider_user_id = ?3",
                libsql::params![
                    account.user_id.to_string(),
                    account.provider.value(),
                    account.provider_user_id.clone()
                ],
                "social account",
            )
            .await?;

        if let Some(found) = existing {
            account.id = found.id;
            account.created_at = found.created_at;
            account.updated_at = found.updated_at;
            return Ok(());
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        account.id = Some(id);
        account.created_at = now;
        account.updated_at = now;
        let data = Self::encode(account, "social account")?;
        self.exec(
            "INSERT INTO social_accounts (id, user_id, provider, provider_user_id, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            libsql::params![
                id.to_string(),
                account.user_id.to_string(),
                account.provider.value(),
                account.provider_user_id.clone(),
                data
            ],
            "Failed to insert social account",
        )
        .await?;
        Ok(())
    }

    async fn list_social_accounts(&self, user_id: Uuid) -> Result<Vec<SocialAccount>> {
        let mut list: Vec<SocialAccount> = self
            .query_many(
                "SELECT data FROM social_accounts WHERE user_id = ?1",
                libsql::params![user_id.to_string()],
                "social account",
            )
            .await?;
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn append_login_log(&self, log: &mut LoginLog) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        log.id = Some(id);
        log.created_at = now;

        let data = Self::encode(log, "login log")?;
        self.exec(
            "INSERT INTO login_logs (id, created_at, data) VALUES (?1, ?2, ?3)",
            libsql::params![id.to_string(), now.to_rfc3339(), data],
            "Failed to insert login log",
        )
        .await?;
        Ok(())
    }

    async fn list_recent_login_logs(&self, limit: usize) -> Result<Vec<LoginLog>> {
        self.query_many(
            "SELECT data FROM login_logs ORDER BY created_at DESC LIMIT ?1",
            libsql::params![limit as i64],
            "login log",
        )
        .await
    }

    async fn create_testimonial(&self, testimonial: &mut Testimonial) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        testimonial.id = Some(id);
        testimonial.created_at = now;
        testimonial.updated_at = now;

        let data = Self::encode(testimonial, "testimonial")?;
        self.exec(
            "INSERT INTO testimonials (id, data) VALUES (?1, ?2)",
            libsql::params![id.to_string(), data],
            "Failed to insert testimonial",
        )
        .await?;
        Ok(())
    }

    async fn update_testimonial(&self, testimonial: &Testimonial) -> Result<()> {
        let testimonial_id = testimonial.id.ok_or_else(|| {
            ShopError::Validation("cannot update testimonial without id".to_string())
        })?;
        let mut updated = testimonial.clone();
        updated.updated_at = Utc::now();
        let data = Self::encode(&updated, "testimonial")?;

        let affected = self
            .exec(
                "UPDATE testimonials SET data = ?1 WHERE id = ?2",
                libsql::params![data, testimonial_id.to_string()],
                "Failed to update testimonial",
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::TestimonialNotFound);
        }
        Ok(())
    }

    async fn get_testimonial_by_id(&self, testimonial_id: Uuid) -> Result<Option<Testimonial>> {
        self.query_one(
            "SELECT data FROM testimonials WHERE id = ?1",
            libsql::params![testimonial_id.to_string()],
            "testimonial",
        )
        .await
    }

    async fn list_published_testimonials(&self) -> Result<Vec<Testimonial>> {
        let mut list: Vec<Testimonial> = self
            .query_many(
                "SELECT data FROM testimonials",
                libsql::params![],
                "testimonial",
            )
            .await?;
        list.retain(|t| t.is_published && !t.is_removed);
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn list_all_testimonials(&self) -> Result<Vec<Testimonial>> {
        let mut list: Vec<Testimonial> = self
            .query_many(
                "SELECT data FROM testimonials",
                libsql::params![],
                "testimonial",
            )
            .await?;
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn remove_testimonial(&self, testimonial_id: Uuid) -> Result<()> {
        let mut testimonial = self
            .get_testimonial_by_id(testimonial_id)
            .await?
            .ok_or(ShopError::TestimonialNotFound)?;
        testimonial.is_removed = true;
        self.update_testimonial(&testimonial).await
    }

    async fn create_question(&self, question: &mut CustomerQuestion) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        question.id = Some(id);
        question.created_at = now;
        question.updated_at = now;

        let data = Self::encode(question, "question")?;
        self.exec(
            "INSERT INTO questions (id, user_id, status, created_at, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            libsql::params![
                id.to_string(),
                question.user_id.map(|u| u.to_string()),
                question.status.value(),
                now.to_rfc3339(),
                data
            ],
            "Failed to insert question",
        )
        .await?;
        Ok(())
    }

    async fn update_question(&self, question: &CustomerQuestion) -> Result<()> {
        let question_id = question.id.ok_or_else(|| {
            ShopError::Validation("cannot update question without id".to_string())
        })?;
        let mut updated = question.clone();
        updated.updated_at = Utc::now();
        let data = Self::encode(&updated, "question")?;

        let affected = self
            .exec(
                "UPDATE questions SET status = ?1, data = ?2 WHERE id = ?3",
                libsql::params![updated.status.value(), data, question_id.to_string()],
                "Failed to update question",
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::QuestionNotFound);
        }
        Ok(())
    }

    async fn get_question_by_id(&self, question_id: Uuid) -> Result<Option<CustomerQuestion>> {
        self.query_one(
            "SELECT data FROM questions WHERE id = ?1",
            libsql::params![question_id.to_string()],
            "question",
        )
        .await
    }

    async fn list_questions_by_user(&self, user_id: Uuid) -> Result<Vec<CustomerQuestion>> {
        let mut list: Vec<CustomerQuestion> = self
            .query_many(
                "SELECT data FROM questions WHERE user_id = ?1 ORDER BY created_at DESC",
                libsql::params![user_id.to_string()],
                "question",
            )
            .await?;
        list.retain(|q| !q.is_removed);
        Ok(list)
    }

    async fn list_questions_by_status(
        &self,
        status: Option<QuestionStatus>,
    ) -> Result<Vec<CustomerQuestion>> {
        let mut list: Vec<CustomerQuestion> = match status {
            Some(status) => {
                self.query_many(
                    "SELECT data FROM questions WHERE status = ?1 ORDER BY created_at DESC",
                    libsql::params![status.value()],
                    "question",
                )
                .await?
            }
            None => {
                self.query_many(
                    "SELECT data FROM questions ORDER BY created_at DESC",
                    libsql::params![],
                    "question",
                )
                .await?
            }
        };
        list.retain(|q| !q.is_removed);
        Ok(list)
    }

    async fn remove_question(&self, question_id: Uuid) -> Result<()> {
        let mut question = self
            .get_question_by_id(question_id)
            .await?
            .ok_or(ShopError::QuestionNotFound)?;
        question.is_removed = true;
        self.update_question(&question).await
    }
}
