use crate::domain::*;
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Storage trait for persisting shop data (catalog, vouchers, orders, users,
/// support content, and login logs)
#[async_trait]
pub trait Storage: Send + Sync {
    // Category operations
    async fn create_category(&self, category: &mut Category) -> Result<()>;
    async fn update_category(&self, category: &Category) -> Result<()>;
    async fn get_category_by_id(&self, category_id: Uuid) -> Result<Option<Category>>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn list_categories(&self, include_removed: bool) -> Result<Vec<Category>>;
    async fn remove_category(&self, category_id: Uuid) -> Result<()>;

    // Product operations
    async fn create_product(&self, product: &mut Product) -> Result<()>;
    async fn update_product(&self, product: &Product) -> Result<()>;
    async fn get_product_by_id(&self, product_id: Uuid) -> Result<Option<Product>>;
    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;
    async fn list_products_by_category(
        &self,
        category_id: Uuid,
        include_hidden: bool,
    ) -> Result<Vec<Product>>;
    async fn remove_product(&self, product_id: Uuid) -> Result<()>;

    // Voucher operations
    /// Bulk-insert codes for a product. A code already stocked for the same
    /// product fails the whole batch; nothing is written.
    async fn add_vouchers(&self, product_id: Uuid, codes: &[String]) -> Result<u64>;
    async fn count_available_vouchers(&self, product_id: Uuid) -> Result<u64>;
    /// Move `quantity` available vouchers to an order, all or nothing.
    async fn assign_vouchers_to_order(
        &self,
        product_id: Uuid,
        order_id: Uuid,
        quantity: u32,
    ) -> Result<Vec<Voucher>>;
    async fn release_vouchers_for_order(&self, order_id: Uuid) -> Result<u64>;
    async fn revoke_vouchers_for_order(&self, order_id: Uuid) -> Result<u64>;
    async fn list_vouchers_by_order(&self, order_id: Uuid) -> Result<Vec<Voucher>>;

    // Order operations
    async fn create_order(&self, order: &mut Order) -> Result<()>;
    async fn get_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>>;
    async fn get_order_by_no(&self, order_no: &str) -> Result<Option<Order>>;
    async fn list_orders_by_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    async fn search_orders(&self, criteria: &OrderSearchCriteria) -> Result<Vec<Order>>;
    async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()>;
    async fn set_order_visibility(
        &self,
        order_id: Uuid,
        visibility: OrderVisibility,
    ) -> Result<()>;
    async fn set_order_suspicion(&self, order_id: Uuid, suspicious: bool) -> Result<()>;
    async fn remove_order(&self, order_id: Uuid) -> Result<()>;

    // User operations
    async fn create_user(&self, user: &mut User) -> Result<()>;
    async fn update_user(&self, user: &User) -> Result<()>;
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self, include_removed: bool) -> Result<Vec<User>>;
    async fn remove_user(&self, user_id: Uuid) -> Result<()>;

    // Profile operations
    async fn upsert_profile(&self, profile: &mut Profile) -> Result<()>;
    async fn get_profile_by_user(&self, user_id: Uuid) -> Result<Option<Profile>>;

    // Social account operations
    /// Linking the same (user, provider, provider_user_id) twice is a no-op.
    async fn link_social_account(&self, account: &mut SocialAccount) -> Result<()>;
    async fn list_social_accounts(&self, user_id: Uuid) -> Result<Vec<SocialAccount>>;

    // Login log operations
    async fn append_login_log(&self, log: &mut LoginLog) -> Result<()>;
    async fn list_recent_login_logs(&self, limit: usize) -> Result<Vec<LoginLog>>;

    // Testimonial operations
    async fn create_testimonial(&self, testimonial: &mut Testimonial) -> Result<()>;
    async fn update_testimonial(&self, testimonial: &Testimonial) -> Result<()>;
    async fn get_testimonial_by_id(&self, testimonial_id: Uuid) -> Result<Option<Testimonial>>;
    async fn list_published_testimonials(&self) -> Result<Vec<Testimonial>>;
    async fn list_all_testimonials(&self) -> Result<Vec<Testimonial>>;
    async fn remove_testimonial(&self, testimonial_id: Uuid) -> Result<()>;

    // Question operations
    async fn create_question(&self, question: &mut CustomerQuestion) -> Result<()>;
    async fn update_question(&self, question: &CustomerQuestion) -> Result<()>;
    async fn get_question_by_id(&self, question_id: Uuid) -> Result<Option<CustomerQuestion>>;
    async fn list_questions_by_user(&self, user_id: Uuid) -> Result<Vec<CustomerQuestion>>;
    async fn list_questions_by_status(
        &self,
        status: Option<QuestionStatus>,
    ) -> Result<Vec<CustomerQuestion>>;
    async fn remove_question(&self, question_id: Uuid) -> Result<()>;
}
