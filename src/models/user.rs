use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coins: u64,
    /// Push registration token for this user's browser
    ///
    /// Read from the store but never sent back to clients.
    #[serde(default, skip_serializing)]
    pub fcm_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
}
