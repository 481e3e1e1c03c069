pub const AUTH_COOKIE_NAME: &str = "webmail-proxy-auth";
pub const AUTH_EMAIL_STRING: &str = "auth-email";
pub const AUTH_PASSWORD_STRING: &str = "auth-password";
pub const AUTH_DOMAIN_STRING: &str = "auth-domain";

pub const IMAP_PORT: u16 = 993;
pub const SMTP_PORT: u16 = 465;

/// Cached SMTP transports are reused for this long before being rebuilt.
pub const TRANSPORT_TTL_SECONDS: u64 = 300;
pub const SMTP_MAX_POOL_CONNECTIONS: u32 = 5;
pub const SMTP_TIMEOUT_SECONDS: u64 = 30;

/// Listing fetches cap the raw source used for preview decoding.
pub const PREVIEW_SOURCE_LIMIT_BYTES: usize = 4096;
pub const SNIPPET_MAX_CHARS: usize = 120;
