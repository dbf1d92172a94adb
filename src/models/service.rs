//! Catalog service offered by a provider

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Catalog entry; its price is copied into an appointment at creation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Service {
    pub id: i32,
    pub provider_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub is_active: bool,
}
