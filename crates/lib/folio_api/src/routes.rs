//! Route paths.

pub const GET_HEALTH: &str = "/health";
pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const POST_AUTH_FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const POST_AUTH_RESET_PASSWORD: &str = "/auth/reset-password";
pub const USERS_ME: &str = "/users/me";
pub const POST_USERS_ME_PASSWORD: &str = "/users/me/password";
pub const POST_ADMIN_USERS: &str = "/admin/users";
pub const PATCH_ADMIN_USERS_ID_STATUS: &str = "/admin/users/{id}/status";
