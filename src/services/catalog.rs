use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{Category, Product};
use crate::error::{Result, ShopError};
use crate::storage::Storage;

/// Available stock for one product, as shown on the admin surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StockSummary {
    pub product_id: Uuid,
    pub available: u64,
}

pub struct CatalogService {
    storage: Arc<dyn Storage>,
}

impl CatalogService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    // Open surface

    /// Categories for the storefront, ordered by `sort_order`.
    pub async fn browse_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.storage.list_categories(false).await?;
        categories.sort_by_key(|c| c.sort_order);
        Ok(categories)
    }

    /// Visible products under a category slug.
    pub async fn browse_products(&self, category_slug: &str) -> Result<Vec<Product>> {
        let category = self
            .storage
            .get_category_by_slug(category_slug)
            .await?
            .filter(|c| !c.is_removed)
            .ok_or(ShopError::CategoryNotFound)?;
        let category_id = category.id.ok_or(ShopError::CategoryNotFound)?;
        self.storage
            .list_products_by_category(category_id, false)
            .await
    }

    /// A browsable product plus its available stock count.
    pub async fn product_detail(&self, slug: &str) -> Result<(Product, u64)> {
        let product = self
            .storage
            .get_product_by_slug(slug)
            .await?
            .filter(|p| p.is_browsable())
            .ok_or(ShopError::ProductNotFound)?;
        let product_id = product.id.ok_or(ShopError::ProductNotFound)?;
        let available = self.storage.count_available_vouchers(product_id).await?;
        Ok((product, available))
    }

    // Admin surface

    pub async fn admin_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.storage.list_categories(true).await?;
        categories.sort_by_key(|c| c.sort_order);
        Ok(categories)
    }

    pub async fn create_category(&self, mut category: Category) -> Result<Category> {
        self.storage.create_category(&mut category).await?;
        info!("Created category '{}'", category.slug);
        Ok(category)
    }

    pub async fn update_category(&self, category: Category) -> Result<Category> {
        self.storage.update_category(&category).await?;
        Ok(category)
    }

    pub async fn remove_category(&self, category_id: Uuid) -> Result<()> {
        self.storage.remove_category(category_id).await
    }

    pub async fn admin_products(&self, category_id: Uuid) -> Result<Vec<Product>> {
        self.storage
            .list_products_by_category(category_id, true)
            .await
    }

    pub async fn create_product(&self, mut product: Product) -> Result<Product> {
        self.storage
            .get_category_by_id(product.category_id)
            .await?
            .filter(|c| !c.is_removed)
            .ok_or(ShopError::CategoryNotFound)?;
        self.storage.create_product(&mut product).await?;
        info!("Created product '{}'", product.slug);
        Ok(product)
    }

    pub async fn update_product(&self, product: Product) -> Result<Product> {
        self.storage.update_product(&product).await?;
        Ok(product)
    }

    /// Show or hide a product on the storefront without touching its data.
    pub async fn set_product_visibility(&self, product_id: Uuid, show: bool) -> Result<Product> {
        let mut product = self
            .storage
            .get_product_by_id(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound)?;
        product.show_product = show;
        self.storage.update_product(&product).await?;
        Ok(product)
    }

    pub async fn remove_product(&self, product_id: Uuid) -> Result<()> {
        self.storage.remove_product(product_id).await
    }

    /// Bulk-load voucher codes for a product. Codes are trimmed; empty
    /// lines are rejected up front so the batch fails before any write.
    pub async fn upload_vouchers(&self, product_id: Uuid, codes: Vec<String>) -> Result<u64> {
        let product = self
            .storage
            .get_product_by_id(product_id)
            .await?
            .filter(|p| !p.is_removed)
            .ok_or(ShopError::ProductNotFound)?;

        let codes: Vec<String> = codes.iter().map(|c| c.trim().to_string()).collect();
        if codes.is_empty() {
            return Err(ShopError::Validation("no voucher codes supplied".into()));
        }
        if codes.iter().any(|c| c.is_empty()) {
            return Err(ShopError::Validation("voucher codes must not be blank".into()));
        }

        let added = self.storage.add_vouchers(product_id, &codes).await?;
        info!("Stocked {} voucher codes for '{}'", added, product.slug);
        Ok(added)
    }

    pub async fn stock_summary(&self, product_id: Uuid) -> Result<StockSummary> {
        self.storage
            .get_product_by_id(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound)?;
        let available = self.storage.count_available_vouchers(product_id).await?;
        Ok(StockSummary {
            product_id,
            available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStorage::new()))
    }

    fn category(name: &str, slug: &str, sort_order: i32) -> Category {
        Category {
            id: None,
            name: name.into(),
            slug: slug.into(),
            sort_order,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product(category_id: Uuid, slug: &str) -> Product {
        Product {
            id: None,
            category_id,
            name: slug.to_uppercase(),
            slug: slug.into(),
            description: None,
            face_value: Decimal::new(5000, 0),
            price: Decimal::new(4800, 0),
            currency: crate::domain::Currency::KRW,
            image_url: None,
            show_product: true,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn browse_orders_categories_by_sort_order() {
        let service = service();
        service.create_category(category("B", "b", 2)).await.unwrap();
        service.create_category(category("A", "a", 1)).await.unwrap();

        let listed = service.browse_categories().await.unwrap();
        assert_eq!(
            listed.iter().map(|c| c.slug.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn hidden_product_is_not_browsable_but_admin_sees_it() {
        let service = service();
        let cat = service.create_category(category("Games", "games", 1)).await.unwrap();
        let cat_id = cat.id.unwrap();
        let created = service.create_product(product(cat_id, "gc-5000")).await.unwrap();
        service
            .set_product_visibility(created.id.unwrap(), false)
            .await
            .unwrap();

        assert!(service.browse_products("games").await.unwrap().is_empty());
        assert!(matches!(
            service.product_detail("gc-5000").await.unwrap_err(),
            ShopError::ProductNotFound
        ));
        assert_eq!(service.admin_products(cat_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn product_requires_a_live_category() {
        let service = service();
        let err = service
            .create_product(product(Uuid::new_v4(), "orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::CategoryNotFound));
    }

    #[tokio::test]
    async fn voucher_upload_trims_and_counts() {
        let service = service();
        let cat = service.create_category(category("Games", "games", 1)).await.unwrap();
        let created = service
            .create_product(product(cat.id.unwrap(), "gc-5000"))
            .await
            .unwrap();
        let product_id = created.id.unwrap();

        let added = service
            .upload_vouchers(product_id, vec![" CODE-1 ".into(), "CODE-2".into()])
            .await
            .unwrap();
        assert_eq!(added, 2);

        let summary = service.stock_summary(product_id).await.unwrap();
        assert_eq!(summary.available, 2);
    }

    #[tokio::test]
    async fn blank_voucher_code_fails_the_whole_batch() {
        let service = service();
        let cat = service.create_category(category("Games", "games", 1)).await.unwrap();
        let created = service
            .create_product(product(cat.id.unwrap(), "gc-5000"))
            .await
            .unwrap();
        let product_id = created.id.unwrap();

        let err = service
            .upload_vouchers(product_id, vec!["CODE-1".into(), "   ".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        assert_eq!(service.stock_summary(product_id).await.unwrap().available, 0);
    }
}
