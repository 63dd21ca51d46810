//! Lead entity model
//!
//! This module contains the SeaORM entity model for the leads table, which
//! stores buyer leads, together with the closed vocabularies a lead draws
//! its categorical fields from.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error returned when a string is not a member of a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a text-backed enum whose wire and storage form is the
/// SCREAMING_SNAKE_CASE variant name.
macro_rules! lead_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
            Deserialize, ToSchema,
        )]
        #[sea_orm(rs_type = "String", db_type = "Text")]
        pub enum $name {
            $(
                #[sea_orm(string_value = $value)]
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const VARIANTS: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

lead_enum! {
    /// City the buyer is looking in
    City ("city") {
        Chandigarh => "CHANDIGARH",
        Mohali => "MOHALI",
        Zirakpur => "ZIRAKPUR",
        Panchkula => "PANCHKULA",
        Other => "OTHER",
    }
}

lead_enum! {
    /// Kind of property the buyer wants
    PropertyType ("property type") {
        Apartment => "APARTMENT",
        Villa => "VILLA",
        Plot => "PLOT",
        Office => "OFFICE",
        Retail => "RETAIL",
    }
}

lead_enum! {
    /// Bedroom-hall-kitchen configuration
    Bhk ("bhk") {
        Studio => "STUDIO",
        One => "ONE",
        Two => "TWO",
        Three => "THREE",
        Four => "FOUR",
    }
}

lead_enum! {
    Purpose ("purpose") {
        Buy => "BUY",
        Rent => "RENT",
    }
}

lead_enum! {
    /// How soon the buyer intends to close
    Timeline ("timeline") {
        ZeroToThreeMonths => "ZERO_TO_THREE_MONTHS",
        ThreeToSixMonths => "THREE_TO_SIX_MONTHS",
        MoreThanSixMonths => "MORE_THAN_SIX_MONTHS",
        Exploring => "EXPLORING",
    }
}

lead_enum! {
    /// Channel the lead arrived through
    Source ("source") {
        Website => "WEBSITE",
        Referral => "REFERRAL",
        WalkIn => "WALK_IN",
        Call => "CALL",
        Other => "OTHER",
    }
}

lead_enum! {
    /// Position of the lead in the sales pipeline
    LeadStatus ("status") {
        New => "NEW",
        Qualified => "QUALIFIED",
        Contacted => "CONTACTED",
        Visited => "VISITED",
        Negotiation => "NEGOTIATION",
        Converted => "CONVERTED",
        Dropped => "DROPPED",
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::New
    }
}

impl PropertyType {
    /// Whether a bedroom configuration is mandatory for this property type.
    pub fn requires_bhk(&self) -> bool {
        matches!(self, Self::Apartment | Self::Villa)
    }
}

/// Buyer lead owned by exactly one user
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    /// Unique identifier for the lead (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub full_name: String,

    pub email: Option<String>,

    pub phone: String,

    pub city: City,

    pub property_type: PropertyType,

    /// Present exactly when the property type requires it
    pub bhk: Option<Bhk>,

    pub purpose: Purpose,

    pub budget_min: Option<i64>,

    pub budget_max: Option<i64>,

    pub timeline: Timeline,

    pub source: Source,

    pub status: LeadStatus,

    pub notes: Option<String>,

    /// Comma-separated free text, empty when none
    pub tags: String,

    /// Owning user; never changes after creation
    pub owner_id: Uuid,

    /// Timestamp when the lead was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp of the last mutation
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
