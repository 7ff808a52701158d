//! Backend route table. Authenticated routes live under `/api`.

pub const PUBLIC_STATUS: &str = "/api/whatsapp/public-status";
pub const MY_STATUS: &str = "/api/whatsapp/status";
pub const CONNECT: &str = "/api/whatsapp/connect";
pub const FORCE_LOGOUT: &str = "/api/whatsapp/force-logout";
pub const DISCONNECT: &str = "/api/whatsapp/disconnect";
pub const GROUPS: &str = "/api/whatsapp/groups";
pub const PROPERTIES: &str = "/api/parsing-job/properties";
pub const PROPERTIES_EXPORT_CSV: &str = "/api/parsing-job/properties/export/csv";

/// Identity provider (GoTrue) routes.
pub mod auth {
    pub const TOKEN: &str = "/auth/v1/token";
    pub const SIGNUP: &str = "/auth/v1/signup";
    pub const LOGOUT: &str = "/auth/v1/logout";
}

/// Join a base URL and a route without doubling the slash.
pub fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
