mod jwt;
mod middleware;

pub use jwt::{create_session_token, verify_session_token, Claims};
pub use middleware::{auth_middleware, SessionUser, USER_ID_HEADER};
