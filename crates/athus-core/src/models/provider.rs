use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProvider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    pub specialization: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    pub location: String,
    #[serde(default)]
    pub description: String,
}

/// A service offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub provider_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_image: Option<String>,
    pub rating: f32,
    pub comment: String,
    pub date: String,
}
