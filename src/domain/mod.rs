pub mod catalog;
pub mod order;
pub mod support;
pub mod user;
pub mod voucher;

pub use catalog::{Category, Currency, Product};
pub use order::{
    Order, OrderSearchCriteria, OrderStatus, OrderVisibility, PaymentMethod, VisibilityFilter,
};
pub use support::{CustomerQuestion, QuestionStatus, Testimonial};
pub use user::{LoginLog, Profile, Role, SocialAccount, SocialProvider, User};
pub use voucher::{Voucher, VoucherStatus};
