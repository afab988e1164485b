pub mod auth_service;
pub mod catalog_service;
pub mod dispatch_service;
pub mod panel_service;
pub mod payment_service;
pub mod reservation_service;
pub mod seed_service;
pub mod user_service;

use crate::middleware::auth::AuthUser;

/// Who is driving a service call: an HTTP principal, a CLI operator or an anonymous visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<i32>,
    pub is_admin: bool,
}

impl Caller {
    /// Batch commands run with staff rights and no user attached.
    pub fn system() -> Self {
        Self {
            user_id: None,
            is_admin: true,
        }
    }

    pub fn public() -> Self {
        Self {
            user_id: None,
            is_admin: false,
        }
    }
}

impl From<&AuthUser> for Caller {
    fn from(user: &AuthUser) -> Self {
        Self {
            user_id: Some(user.user_id),
            is_admin: user.is_admin(),
        }
    }
}
