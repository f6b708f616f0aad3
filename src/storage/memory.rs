use crate::domain::*;
use crate::error::{Result, ShopError};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// In-memory storage implementation for development/testing
pub struct MemoryStorage {
    categories: Arc<Mutex<HashMap<Uuid, Category>>>,
    products: Arc<Mutex<HashMap<Uuid, Product>>>,
    vouchers: Arc<Mutex<HashMap<Uuid, Voucher>>>,
    orders: Arc<Mutex<HashMap<Uuid, Order>>>,
    users: Arc<Mutex<HashMap<Uuid, User>>>,
    profiles: Arc<Mutex<HashMap<Uuid, Profile>>>,
    social_accounts: Arc<Mutex<HashMap<Uuid, SocialAccount>>>,
    login_logs: Arc<Mutex<HashMap<Uuid, LoginLog>>>,
    testimonials: Arc<Mutex<HashMap<Uuid, Testimonial>>>,
    questions: Arc<Mutex<HashMap<Uuid, CustomerQuestion>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            categories: Arc::new(Mutex::new(HashMap::new())),
            products: Arc::new(Mutex::new(HashMap::new())),
            vouchers: Arc::new(Mutex::new(HashMap::new())),
            orders: Arc::new(Mutex::new(HashMap::new())),
            users: Arc::new(Mutex::new(HashMap::new())),
            profiles: Arc::new(Mutex::new(HashMap::new())),
            social_accounts: Arc::new(Mutex::new(HashMap::new())),
            login_logs: Arc::new(Mutex::new(HashMap::new())),
            testimonials: Arc::new(Mutex::new(HashMap::new())),
            questions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_category(&self, category: &mut Category) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        category.id = Some(id);
        category.created_at = now;
        category.updated_at = now;

        let mut categories = self.categories.lock().unwrap();
        categories.insert(id, category.clone());

        debug!("Created category: {} with id {}", category.name, id);
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let category_id = category.id.ok_or_else(|| {
            ShopError::Validation("cannot update category without id".to_string())
        })?;

        let mut categories = self.categories.lock().unwrap();
        if !categories.contains_key(&category_id) {
            return Err(ShopError::CategoryNotFound);
        }
        let mut updated = category.clone();
        updated.updated_at = Utc::now();
        categories.insert(category_id, updated);
        Ok(())
    }

    async fn get_category_by_id(&self, category_id: Uuid) -> Result<Option<Category>> {
        let categories = self.categories.lock().unwrap();
        Ok(categories.get(&category_id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let categories = self.categories.lock().unwrap();
        let category = categories.values().find(|c| c.slug == slug).cloned();
        Ok(category)
    }

    async fn list_categories(&self, include_removed: bool) -> Result<Vec<Category>> {
        let categories = self.categories.lock().unwrap();
        let mut list: Vec<Category> = categories
            .values()
            .filter(|c| include_removed || !c.is_removed)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.sort_order);
        Ok(list)
    }

    async fn remove_category(&self, category_id: Uuid) -> Result<()> {
        let mut categories = self.categories.lock().unwrap();
        let category = categories
            .get_mut(&category_id)
            .ok_or(ShopError::CategoryNotFound)?;
        category.is_removed = true;
        category.updated_at = Utc::now();
        Ok(())
    }

    async fn create_product(&self, product: &mut Product) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product.id = Some(id);
        product.created_at = now;
        product.updated_at = now;

        let mut products = self.products.lock().unwrap();
        products.insert(id, product.clone());

        debug!("Created product: {} with id {}", product.name, id);
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let product_id = product
            .id
            .ok_or_else(|| ShopError::Validation("cannot update product without id".to_string()))?;

        let mut products = self.products.lock().unwrap();
        if !products.contains_key(&product_id) {
            return Err(ShopError::ProductNotFound);
        }
        let mut updated = product.clone();
        updated.updated_at = Utc::now();
        products.insert(product_id, updated);
        Ok(())
    }

    async fn get_product_by_id(&self, product_id: Uuid) -> Result<Option<Product>> {
        let products = self.products.lock().unwrap();
        Ok(products.get(&product_id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let products = self.products.lock().unwrap();
        let product = products.values().find(|p| p.slug == slug).cloned();
        Ok(product)
    }

    async fn list_products_by_category(
        &self,
        category_id: Uuid,
        include_hidden: bool,
    ) -> Result<Vec<Product>> {
        let products = self.products.lock().unwrap();
        let mut list: Vec<Product> = products
            .values()
            .filter(|p| p.category_id == category_id)
            .filter(|p| include_hidden || p.is_browsable())
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn remove_product(&self, product_id: Uuid) -> Result<()> {
        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&product_id)
            .ok_or(ShopError::ProductNotFound)?;
        product.is_removed = true;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn add_vouchers(&self, product_id: Uuid, codes: &[String]) -> Result<u64> {
        let mut vouchers = self.vouchers.lock().unwrap();

        let mut seen: Vec<&str> = vouchers
            .values()
            .filter(|v| v.product_id == product_id)
            .map(|v| v.code.as_str())
            .collect();
        for code in codes {
            if seen.contains(&code.as_str()) {
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
            vouchers.insert(
                id,
                Voucher {
                    id: Some(id),
                    product_id,
                    code: code.clone(),
                    status: VoucherStatus::Purchased,
                    order_id: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        debug!("Stocked {} vouchers for product {}", codes.len(), product_id);
        Ok(codes.len() as u64)
    }

    async fn count_available_vouchers(&self, product_id: Uuid) -> Result<u64> {
        let vouchers = self.vouchers.lock().unwrap();
        let count = vouchers
            .values()
            .filter(|v| v.product_id == product_id && v.is_available())
            .count();
        Ok(count as u64)
    }

    async fn assign_vouchers_to_order(
        &self,
        product_id: Uuid,
        order_id: Uuid,
        quantity: u32,
    ) -> Result<Vec<Voucher>> {
        let mut vouchers = self.vouchers.lock().unwrap();

        // Oldest stock goes out first
        let mut available: Vec<&Voucher> = vouchers
            .values()
            .filter(|v| v.product_id == product_id && v.is_available())
            .collect();
        available.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)));

        if (available.len() as u32) < quantity {
            return Err(ShopError::OutOfStock);
        }

        let picked: Vec<Uuid> = available
            .into_iter()
            .take(quantity as usize)
            .filter_map(|v| v.id)
            .collect();

        let now = Utc::now();
        let mut assigned = Vec::with_capacity(quantity as usize);
        for voucher_id in picked {
            if let Some(voucher) = vouchers.get_mut(&voucher_id) {
                voucher.status = VoucherStatus::Sold;
                voucher.order_id = Some(order_id);
                voucher.updated_at = now;
                assigned.push(voucher.clone());
            }
        }

        debug!("Assigned {} vouchers to order {}", assigned.len(), order_id);
        Ok(assigned)
    }

    async fn release_vouchers_for_order(&self, order_id: Uuid) -> Result<u64> {
        let mut vouchers = self.vouchers.lock().unwrap();
        let now = Utc::now();
        let mut released = 0;
        for voucher in vouchers.values_mut() {
            if voucher.order_id == Some(order_id) && voucher.status == VoucherStatus::Sold {
                voucher.status = VoucherStatus::Purchased;
                voucher.order_id = None;
                voucher.updated_at = now;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn revoke_vouchers_for_order(&self, order_id: Uuid) -> Result<u64> {
        let mut vouchers = self.vouchers.lock().unwrap();
        let now = Utc::now();
        let mut revoked = 0;
        for voucher in vouchers.values_mut() {
            if voucher.order_id == Some(order_id) && voucher.status == VoucherStatus::Sold {
                voucher.status = VoucherStatus::Revoked;
                voucher.updated_at = now;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn list_vouchers_by_order(&self, order_id: Uuid) -> Result<Vec<Voucher>> {
        let vouchers = self.vouchers.lock().unwrap();
        let mut list: Vec<Voucher> = vouchers
            .values()
            .filter(|v| v.order_id == Some(order_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(list)
    }

    async fn create_order(&self, order: &mut Order) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        order.id = Some(id);
        order.created_at = now;
        order.updated_at = now;

        let mut orders = self.orders.lock().unwrap();
        orders.insert(id, order.clone());

        debug!("Created order: {} with id {}", order.order_no, id);
        Ok(())
    }

    async fn get_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.get(&order_id).cloned())
    }

    async fn get_order_by_no(&self, order_no: &str) -> Result<Option<Order>> {
        let orders = self.orders.lock().unwrap();
        let order = orders.values().find(|o| o.order_no == order_no).cloned();
        Ok(order)
    }

    async fn list_orders_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let orders = self.orders.lock().unwrap();
        let mut list: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn search_orders(&self, criteria: &OrderSearchCriteria) -> Result<Vec<Order>> {
        let orders = self.orders.lock().unwrap();
        let mut list: Vec<Order> = orders
            .values()
            .filter(|o| criteria.matches(o))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&order_id).ok_or(ShopError::OrderNotFound)?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_order_visibility(
        &self,
        order_id: Uuid,
        visibility: OrderVisibility,
    ) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&order_id).ok_or(ShopError::OrderNotFound)?;
        order.visibility = visibility;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_order_suspicion(&self, order_id: Uuid, suspicious: bool) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&order_id).ok_or(ShopError::OrderNotFound)?;
        order.is_suspicious = suspicious;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn remove_order(&self, order_id: Uuid) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&order_id).ok_or(ShopError::OrderNotFound)?;
        order.is_removed = true;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn create_user(&self, user: &mut User) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        user.id = Some(id);
        user.created_at = now;
        user.updated_at = now;

        let mut users = self.users.lock().unwrap();
        users.insert(id, user.clone());

        debug!("Created user: {} with id {}", user.username, id);
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let user_id = user
            .id
            .ok_or_else(|| ShopError::Validation("cannot update user without id".to_string()))?;

        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user_id) {
            return Err(ShopError::UserNotFound);
        }
        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        users.insert(user_id, updated);
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&user_id).cloned())
    }

    async fn get_user_by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        let user = users
            .values()
            .find(|u| u.keycloak_id == keycloak_id)
            .cloned();
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        let user = users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned();
        Ok(user)
    }

    async fn list_users(&self, include_removed: bool) -> Result<Vec<User>> {
        let users = self.users.lock().unwrap();
        let mut list: Vec<User> = users
            .values()
            .filter(|u| include_removed || !u.is_removed)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn remove_user(&self, user_id: Uuid) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(ShopError::UserNotFound)?;
        user.is_removed = true;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_profile(&self, profile: &mut Profile) -> Result<()> {
        let mut profiles = self.profiles.lock().unwrap();
        let now = Utc::now();

        let existing = profiles
            .values()
            .find(|p| p.user_id == profile.user_id)
            .map(|p| (p.id, p.created_at));

        match existing {
            Some((id, created_at)) => {
                profile.id = id;
                profile.created_at = created_at;
                profile.updated_at = now;
                if let Some(id) = id {
                    profiles.insert(id, profile.clone());
                }
            }
            None => {
                let id = Uuid::new_v4();
                profile.id = Some(id);
                profile.created_at = now;
                profile.updated_at = now;
                profiles.insert(id, profile.clone());
            }
        }
        Ok(())
    }

    async fn get_profile_by_user(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let profiles = self.profiles.lock().unwrap();
        let profile = profiles.values().find(|p| p.user_id == user_id).cloned();
        Ok(profile)
    }

    async fn link_social_account(&self, account: &mut SocialAccount) -> Result<()> {
        let mut accounts = self.social_accounts.lock().unwrap();

        if let Some(existing) = accounts.values().find(|a| {
            a.user_id == account.user_id
                && a.provider == account.provider
                && a.provider_user_id == account.provider_user_id
        }) {
            account.id = existing.id;
            account.created_at = existing.created_at;
            account.updated_at = existing.updated_at;
            return Ok(());
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        account.id = Some(id);
        account.created_at = now;
        account.updated_at = now;
        accounts.insert(id, account.clone());
        Ok(())
    }

    async fn list_social_accounts(&self, user_id: Uuid) -> Result<Vec<SocialAccount>> {
        let accounts = self.social_accounts.lock().unwrap();
        let mut list: Vec<SocialAccount> = accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn append_login_log(&self, log: &mut LoginLog) -> Result<()> {
        let id = Uuid::new_v4();
        log.id = Some(id);
        log.created_at = Utc::now();

        let mut logs = self.login_logs.lock().unwrap();
        logs.insert(id, log.clone());
        Ok(())
    }

    async fn list_recent_login_logs(&self, limit: usize) -> Result<Vec<LoginLog>> {
        let logs = self.login_logs.lock().unwrap();
        let mut list: Vec<LoginLog> = logs.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn create_testimonial(&self, testimonial: &mut Testimonial) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        testimonial.id = Some(id);
        testimonial.created_at = now;
        testimonial.updated_at = now;

        let mut testimonials = self.testimonials.lock().unwrap();
        testimonials.insert(id, testimonial.clone());
        Ok(())
    }

    async fn update_testimonial(&self, testimonial: &Testimonial) -> Result<()> {
        let testimonial_id = testimonial.id.ok_or_else(|| {
            ShopError::Validation("cannot update testimonial without id".to_string())
        })?;

        let mut testimonials = self.testimonials.lock().unwrap();
        if !testimonials.contains_key(&testimonial_id) {
            return Err(ShopError::TestimonialNotFound);
        }
        let mut updated = testimonial.clone();
        updated.updated_at = Utc::now();
        testimonials.insert(testimonial_id, updated);
        Ok(())
    }

    async fn get_testimonial_by_id(&self, testimonial_id: Uuid) -> Result<Option<Testimonial>> {
        let testimonials = self.testimonials.lock().unwrap();
        Ok(testimonials.get(&testimonial_id).cloned())
    }

    async fn list_published_testimonials(&self) -> Result<Vec<Testimonial>> {
        let testimonials = self.testimonials.lock().unwrap();
        let mut list: Vec<Testimonial> = testimonials
            .values()
            .filter(|t| t.is_published && !t.is_removed)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn list_all_testimonials(&self) -> Result<Vec<Testimonial>> {
        let testimonials = self.testimonials.lock().unwrap();
        let mut list: Vec<Testimonial> = testimonials.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn remove_testimonial(&self, testimonial_id: Uuid) -> Result<()> {
        let mut testimonials = self.testimonials.lock().unwrap();
        let testimonial = testimonials
            .get_mut(&testimonial_id)
            .ok_or(ShopError::TestimonialNotFound)?;
        testimonial.is_removed = true;
        testimonial.updated_at = Utc::now();
        Ok(())
    }

    async fn create_question(&self, question: &mut CustomerQuestion) -> Result<()> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        question.id = Some(id);
        question.created_at = now;
        question.updated_at = now;

        let mut questions = self.questions.lock().unwrap();
        questions.insert(id, question.clone());
        Ok(())
    }

    async fn update_question(&self, question: &CustomerQuestion) -> Result<()> {
        let question_id = question.id.ok_or_else(|| {
            ShopError::Validation("cannot update question without id".to_string())
        })?;

        let mut questions = self.questions.lock().unwrap();
        if !questions.contains_key(&question_id) {
            return Err(ShopError::QuestionNotFound);
        }
        let mut updated = question.clone();
        updated.updated_at = Utc::now();
        questions.insert(question_id, updated);
        Ok(())
    }

    async fn get_question_by_id(&self, question_id: Uuid) -> Result<Option<CustomerQuestion>> {
        let questions = self.questions.lock().unwrap();
        Ok(questions.get(&question_id).cloned())
    }

    async fn list_questions_by_user(&self, user_id: Uuid) -> Result<Vec<CustomerQuestion>> {
        let questions = self.questions.lock().unwrap();
        let mut list: Vec<CustomerQuestion> = questions
            .values()
            .filter(|q| q.user_id == Some(user_id) && !q.is_removed)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn list_questions_by_status(
        &self,
        status: Option<QuestionStatus>,
    ) -> Result<Vec<CustomerQuestion>> {
        let questions = self.questions.lock().unwrap();
        let mut list: Vec<CustomerQuestion> = questions
            .values()
            .filter(|q| !q.is_removed)
            .filter(|q| status.map_or(true, |s| q.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn remove_question(&self, question_id: Uuid) -> Result<()> {
        let mut questions = self.questions.lock().unwrap();
        let question = questions
            .get_mut(&question_id)
            .ok_or(ShopError::QuestionNotFound)?;
        question.is_removed = true;
        question.updated_at = Utc::now();
        Ok(())
    }
}
