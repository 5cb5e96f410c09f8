/// Application name
pub const APP_NAME: &str = "Adsplat";

/// Separator between the three components of an encrypted payload
pub const PAYLOAD_SEPARATOR: &str = "/+/";

/// AES-128 key size in bytes
pub const CODEC_KEY_SIZE: usize = 16;

/// CBC initialization vector size in bytes
pub const CODEC_IV_SIZE: usize = 16;

/// Envelope status codes
pub const CODE_OK: i64 = 200;
pub const CODE_UNAUTHORIZED: i64 = 401;

/// Persisted state keys
pub const KEY_AUTHORIZATION: &str = "authorization";
pub const KEY_SERVER_DATA: &str = "serverData";
pub const KEY_SERVER_DATA_TIMESTAMP: &str = "serverDataTimestamp";
pub const KEY_MENU_DATA: &str = "menuData";
pub const KEY_MENU_DATA_TIMESTAMP: &str = "menuDataTimestamp";

/// Server data cache lifetime (2 hours)
pub const SERVER_CACHE_TTL_SECS: u64 = 2 * 60 * 60;

/// Menu cache lifetime (5 minutes)
pub const MENU_CACHE_TTL_SECS: u64 = 5 * 60;

/// Delay between the sign-out notice and the redirect
pub const SIGN_OUT_REDIRECT_DELAY_MS: u64 = 1500;

/// Sign-in surface path
pub const SIGN_IN_PATH: &str = "/lock";

/// KV key the backend reads its client configuration from
pub const CLIENT_JSON_KEY: &str = "client_json";
