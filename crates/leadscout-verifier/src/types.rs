//! Response shape of the single-email lookup endpoint (`GET /api/v3/`).
//!
//! Every field is optional: error responses carry only `error`, and older
//! accounts omit `quality`.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub resultcode: Option<i64>,
    #[serde(default)]
    pub subresult: Option<String>,
    #[serde(default)]
    pub free: Option<bool>,
    #[serde(default)]
    pub role: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}
