use serde::{Deserialize, Serialize};

/// Store and server details returned by the webstore for the configured secret key.
///
/// Always replaced wholesale; never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub store: StoreDetails,
    pub server: ServerDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDetails {
    pub id: u64,
    pub name: String,
    pub domain: String,
    pub game_type: String,
    pub currency: String,
    /// Whether the store expects players to be identified by UUID.
    #[serde(default)]
    pub online_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDetails {
    pub id: u64,
    pub name: String,
}

/// A group of purchasable packages, as shown in the buy menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub order: i32,
    #[serde(default)]
    pub packages: Vec<Package>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: u64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub sale_discount: Option<f64>,
}

/// Community goal progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: u64,
    pub name: String,
    pub current: f64,
    pub target: f64,
    pub status: GoalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Disabled,
}

impl Goal {
    pub fn is_visible(&self) -> bool {
        self.status != GoalStatus::Disabled
    }
}

/// A one-off payment link for a single package and buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutUrl {
    pub url: String,
    pub expires: Option<chrono::DateTime<chrono::Utc>>,
}
