use serde::Deserialize;

use crate::types::User;

#[derive(Debug, Deserialize)]
pub(crate) struct Login {
    pub(crate) access: String,
    pub(crate) refresh: String,
    pub(crate) user: User,
}

/// Body of a successful refresh; backends that do not rotate refresh
/// tokens omit `refresh`.
#[derive(Debug, Deserialize)]
pub(crate) struct Refresh {
    pub(crate) access: String,
    #[serde(default)]
    pub(crate) refresh: Option<String>,
}
