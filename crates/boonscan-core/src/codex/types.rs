use serde::{Deserialize, Serialize};

/// Grouping for trait providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Boons granted by gods.
    Gods,

    /// Infernal arm upgrades.
    #[serde(rename = "Arm_Upgrades")]
    ArmUpgrades,

    /// Infernal arm aspects.
    #[serde(rename = "Arm_Aspects")]
    ArmAspects,

    /// Standard keepsakes, e.g. the Old Spiked Collar.
    Keepsakes,

    /// Legendary keepsakes (companions).
    Companions,

    /// Sentinel provider for unfilled slots.
    #[serde(rename = "Empty_Ability")]
    EmptyAbility,

    /// Temporary items purchased from the Well of Charon.
    #[serde(rename = "Charons_Well")]
    CharonsWell,

    /// Unique traits: blessings, mirror skills, the membership card.
    #[serde(rename = "Special_Item")]
    SpecialItem,

    /// One of Eurydice's upgrades.
    Eurydice,
}

impl Category {
    /// Whether icons of this category sit in the diamond frame and take
    /// corner masking before comparison. Companion and keepsake art fills
    /// its full square.
    pub fn is_diamond(self) -> bool {
        !matches!(self, Category::Companions | Category::Keepsakes)
    }

    /// Whether traits of this category implicate an equipped weapon.
    pub fn is_weapon(self) -> bool {
        matches!(self, Category::ArmUpgrades | Category::ArmAspects)
    }
}

/// Ability slot a boon occupies. Players hold at most one trait of each
/// subcategory at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Subcategory {
    #[default]
    None,

    Attack,
    Call,
    Cast,
    Dash,
    Special,
}

/// Index of a provider within its codex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub usize);

/// Index of a trait within its codex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitId(pub usize);
