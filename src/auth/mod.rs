pub mod cookie;
pub mod extract;
pub mod jwt;

pub use cookie::{build_session_cookie, clear_session_cookie, resolve_cookie_domain};
pub use extract::{AdminSession, AuthSession};
pub use jwt::{Claims, JwtKeys};
