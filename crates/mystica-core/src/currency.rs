//! Currency kinds and the closed source/sink taxonomy.
//!
//! Every balance change is labelled with why it happened. Credits carry a
//! [`SourceKind`], debits carry a [`SinkKind`]; the transaction log stores
//! either one as an [`EntryKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EconomyError;

/// A currency a player can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyKind {
    /// Soft currency earned in play.
    Gold,
    /// Premium currency.
    Gems,
}

impl CurrencyKind {
    /// Every currency kind, in display order.
    pub const ALL: [Self; 2] = [Self::Gold, Self::Gems];

    /// Get the currency code as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gold => "GOLD",
            Self::Gems => "GEMS",
        }
    }

    /// Stable single-byte tag used in storage keys.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Gold => 1,
            Self::Gems => 2,
        }
    }
}

impl fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyKind {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GOLD" => Ok(Self::Gold),
            "GEMS" => Ok(Self::Gems),
            other => Err(EconomyError::validation(format!(
                "unknown currency kind: {other}"
            ))),
        }
    }
}

/// Why currency entered a balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Loot from a won combat (or instant loot).
    #[default]
    CombatVictory,
    /// Daily quest reward.
    DailyQuest,
    /// Achievement unlock.
    Achievement,
    /// In-app purchase.
    Iap,
    /// Manual grant by an operator.
    Admin,
    /// Starting balance on profile creation.
    ProfileInit,
}

impl SourceKind {
    /// Get the source name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CombatVictory => "combat_victory",
            Self::DailyQuest => "daily_quest",
            Self::Achievement => "achievement",
            Self::Iap => "iap",
            Self::Admin => "admin",
            Self::ProfileInit => "profile_init",
        }
    }
}

impl FromStr for SourceKind {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "combat_victory" => Ok(Self::CombatVictory),
            "daily_quest" => Ok(Self::DailyQuest),
            "achievement" => Ok(Self::Achievement),
            "iap" => Ok(Self::Iap),
            "admin" => Ok(Self::Admin),
            "profile_init" => Ok(Self::ProfileInit),
            other => Err(EconomyError::validation(format!(
                "unknown source kind: {other}"
            ))),
        }
    }
}

/// Why currency left a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Upgrading an item's level.
    ItemUpgrade,
    /// Swapping a material applied to an item.
    MaterialReplacement,
    /// Buying from the shop.
    ShopPurchase,
    /// Unlocking an extra loadout slot.
    LoadoutSlotUnlock,
}

impl SinkKind {
    /// Get the sink name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ItemUpgrade => "item_upgrade",
            Self::MaterialReplacement => "material_replacement",
            Self::ShopPurchase => "shop_purchase",
            Self::LoadoutSlotUnlock => "loadout_slot_unlock",
        }
    }
}

impl FromStr for SinkKind {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "item_upgrade" => Ok(Self::ItemUpgrade),
            "material_replacement" => Ok(Self::MaterialReplacement),
            "shop_purchase" => Ok(Self::ShopPurchase),
            "loadout_slot_unlock" => Ok(Self::LoadoutSlotUnlock),
            other => Err(EconomyError::validation(format!(
                "unknown sink kind: {other}"
            ))),
        }
    }
}

/// The `source_or_sink_kind` column of a ledger transaction.
///
/// Serialized as the bare kind string (`"daily_quest"`, `"shop_purchase"`);
/// the two sets share no names, so parsing is unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntryKind {
    /// A credit.
    Source(SourceKind),
    /// A debit.
    Sink(SinkKind),
}

impl EntryKind {
    /// Get the kind name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Source(source) => source.as_str(),
            Self::Sink(sink) => sink.as_str(),
        }
    }

    /// Check if this kind adds currency.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EntryKind {
    type Error = EconomyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Ok(source) = value.parse::<SourceKind>() {
            return Ok(Self::Source(source));
        }
        value.parse::<SinkKind>().map(Self::Sink)
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.as_str().to_string()
    }
}
