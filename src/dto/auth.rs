use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `POST /login` form. `email` also accepts the login name.
#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub redirect_to: String,
}

/// Payload the login page is rendered from.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginPage {
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub superuser: bool,
    pub exp: usize,
}
