use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::events::Loggable;

/// Stock counted only as "running low".
pub const QUANTITY_LOW: i64 = -1;
/// Stock counted only as "plenty".
pub const QUANTITY_HIGH: i64 = -2;

/// Whether the item is a tool, a consumable or a bundle of other items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ItemRole {
    #[serde(rename = "T")]
    Tool,
    #[serde(rename = "M")]
    Material,
    #[serde(rename = "K")]
    Kit,
}

impl ItemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemRole::Tool => "T",
            ItemRole::Material => "M",
            ItemRole::Kit => "K",
        }
    }
}

impl FromStr for ItemRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T" => Ok(ItemRole::Tool),
            "M" => Ok(ItemRole::Material),
            "K" => Ok(ItemRole::Kit),
            other => Err(AppError::internal(format!("unknown item role `{other}`"))),
        }
    }
}

/// How an item may be used and whether it can leave the space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemAccessType {
    UseInSpace,
    CheckoutInSpace,
    CheckoutTakeHome,
    TakeHome,
}

impl ItemAccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemAccessType::UseInSpace => "USE_IN_SPACE",
            ItemAccessType::CheckoutInSpace => "CHECKOUT_IN_SPACE",
            ItemAccessType::CheckoutTakeHome => "CHECKOUT_TAKE_HOME",
            ItemAccessType::TakeHome => "TAKE_HOME",
        }
    }
}

impl fmt::Display for ItemAccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemAccessType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USE_IN_SPACE" => Ok(ItemAccessType::UseInSpace),
            "CHECKOUT_IN_SPACE" => Ok(ItemAccessType::CheckoutInSpace),
            "CHECKOUT_TAKE_HOME" => Ok(ItemAccessType::CheckoutTakeHome),
            "TAKE_HOME" => Ok(ItemAccessType::TakeHome),
            other => Err(AppError::internal(format!("unknown access type `{other}`"))),
        }
    }
}

/// One place an item is kept.
///
/// `quantity` is a count, or [`QUANTITY_LOW`] / [`QUANTITY_HIGH`] for
/// stock that is only tracked roughly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ItemLocation {
    #[schema(example = "cage")]
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "drawer 4")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific: Option<String>,
    #[schema(example = 12)]
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryItem {
    #[schema(example = "ITEM-PLA-WHITE")]
    pub uuid: String,
    #[schema(example = "PLA filament")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Prusament PLA 1.75mm, white")]
    pub long_name: Option<String>,
    pub role: ItemRole,
    pub access_type: ItemAccessType,
    #[serde(default)]
    pub locations: Vec<ItemLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Item uuids bundled in a kit
    #[serde(default)]
    pub kit_contents: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Role uuids allowed to use the item; empty means anyone
    #[serde(default)]
    pub authorized_roles: Vec<String>,
}

impl InventoryItem {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.uuid.trim().is_empty() {
            return Err(AppError::bad_request("item uuid must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::bad_request("item name must not be empty"));
        }
        if self.role != ItemRole::Kit && !self.kit_contents.is_empty() {
            return Err(AppError::bad_request("only kits may list kit_contents"));
        }
        if self.kit_contents.iter().any(|uuid| uuid == &self.uuid) {
            return Err(AppError::bad_request("a kit cannot contain itself"));
        }
        for location in &self.locations {
            if location.room.trim().is_empty() {
                return Err(AppError::bad_request("location room must not be empty"));
            }
            if location.quantity < QUANTITY_HIGH {
                return Err(AppError::bad_request(format!(
                    "quantity {} is neither a count nor LOW (-1) / HIGH (-2)",
                    location.quantity
                )));
            }
        }
        Ok(())
    }

    pub fn to_public(&self) -> PublicInventoryItem {
        PublicInventoryItem {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            long_name: self.long_name.clone(),
            role: self.role,
            access_type: self.access_type,
            locations: self.locations.clone(),
            keywords: self.keywords.clone(),
        }
    }
}

impl Loggable for InventoryItem {
    fn entity_type() -> &'static str { "inventory_item" }
    fn subject_id(&self) -> String { self.uuid.clone() }
}

/// What anyone in the space may see: no reorder links, serials or role gates.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PublicInventoryItem {
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    pub role: ItemRole,
    pub access_type: ItemAccessType,
    pub locations: Vec<ItemLocation>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbInventoryItem {
    pub uuid: String,
    pub name: String,
    pub long_name: Option<String>,
    pub role: String,
    pub access_type: String,
    pub reorder_url: Option<String>,
    pub serial_number: Option<String>,
    pub kit_contents: String,
    pub keywords: String,
    pub authorized_roles: String,
}

fn string_list(column: &str, raw: &str) -> Result<Vec<String>, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::internal(format!("bad `{column}` column: {e}")))
}

impl DbInventoryItem {
    pub fn into_item(self, locations: Vec<ItemLocation>) -> Result<InventoryItem, AppError> {
        Ok(InventoryItem {
            role: self.role.parse()?,
            access_type: self.access_type.parse()?,
            kit_contents: string_list("kit_contents", &self.kit_contents)?,
            keywords: string_list("keywords", &self.keywords)?,
            authorized_roles: string_list("authorized_roles", &self.authorized_roles)?,
            uuid: self.uuid,
            name: self.name,
            long_name: self.long_name,
            locations,
            reorder_url: self.reorder_url,
            serial_number: self.serial_number,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemBody {
    pub item_obj: InventoryItem,
}
