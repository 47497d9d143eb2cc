//! The trait codex: every provider and collectible trait the classifiers can
//! name, with the indices needed to answer identity questions.

mod data;
mod types;

pub use types::{Category, ProviderId, Subcategory, TraitId};

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Load-time failures. All of these mean the codex document cannot be
/// trusted, so loading aborts rather than limping on with partial data.
#[derive(Debug, Error)]
pub enum CodexError {
    #[error("failed to read codex document")]
    Io(#[from] std::io::Error),

    #[error("failed to parse codex document")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate trait name outside the gods pool: {0}")]
    DuplicateName(String),

    #[error("duo trait {0} spans providers of different categories")]
    MixedCategories(String),

    #[error("trait {trait_name} references unknown trait {reference}")]
    UnresolvedReference {
        trait_name: String,
        reference: String,
    },

    #[error("codex must contain exactly one empty-slot trait, found {0}")]
    EmptySlotCount(usize),
}

/// A named source of traits: a god, a weapon, a companion pool.
#[derive(Debug)]
pub struct Provider {
    pub name: String,
    pub category: Category,
    traits: Vec<TraitId>,
}

impl Provider {
    /// Traits granted by this provider, in document order.
    pub fn traits(&self) -> &[TraitId] {
        &self.traits
    }
}

/// A single collectible trait. Duo traits are stored once, holding every
/// provider that grants them.
#[derive(Debug)]
pub struct Trait {
    pub name: String,
    pub description: String,
    pub icon_file: PathBuf,
    pub category: Category,
    pub subcategory: Subcategory,
    pub requires: Vec<String>,
    pub requires_any: Vec<String>,
    pub incompatible_with: Vec<String>,
    providers: Vec<ProviderId>,
}

impl Trait {
    /// Providers granting this trait; more than one for duo traits.
    pub fn providers(&self) -> &[ProviderId] {
        &self.providers
    }

    pub fn is_duo(&self) -> bool {
        self.providers.len() > 1
    }
}

// Identity is by name: a trait is the same trait no matter which provider
// record it was reached through.
impl PartialEq for Trait {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Trait {}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Owns all providers and traits for the process lifetime and answers the
/// identity questions classification needs.
#[derive(Debug)]
pub struct Codex {
    providers: Vec<Provider>,
    traits: Vec<Trait>,
    by_name: HashMap<String, TraitId>,
    by_icon: HashMap<PathBuf, Vec<TraitId>>,
    empty: TraitId,
}

impl Codex {
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CodexError> {
        let file = File::open(path.as_ref())?;
        Self::load(BufReader::new(file))
    }

    pub fn load(reader: impl Read) -> Result<Self, CodexError> {
        Self::resolve(data::parse(reader)?)
    }

    /// Post-parse resolution: duo merging, indices, cross-reference checks.
    fn resolve(docs: Vec<data::ProviderDoc>) -> Result<Self, CodexError> {
        let mut providers: Vec<Provider> = Vec::with_capacity(docs.len());
        let mut traits: Vec<Trait> = Vec::new();
        let mut by_name: HashMap<String, TraitId> = HashMap::new();

        for doc in docs {
            let provider_id = ProviderId(providers.len());
            let mut provider = Provider {
                name: doc.name,
                category: doc.category,
                traits: Vec::with_capacity(doc.equips.len()),
            };

            for equip in doc.equips {
                let id = match by_name.get(&equip.name) {
                    Some(&existing) => {
                        // The same boon offered by a second god is a duo;
                        // merge into one record. Any other name collision is
                        // a document error.
                        let known = &mut traits[existing.0];
                        if doc.category != Category::Gods {
                            return Err(CodexError::DuplicateName(equip.name));
                        }
                        if known.category != Category::Gods {
                            return Err(CodexError::MixedCategories(equip.name));
                        }
                        known.providers.push(provider_id);
                        log::debug!("found duo trait {}", known.name);
                        existing
                    }
                    None => {
                        let id = TraitId(traits.len());
                        by_name.insert(equip.name.clone(), id);
                        traits.push(Trait {
                            name: equip.name,
                            description: equip.description,
                            icon_file: equip.icon_file,
                            category: doc.category,
                            subcategory: equip.subcategory,
                            requires: equip.requires,
                            requires_any: equip.requires_any,
                            incompatible_with: equip.incompatible_with,
                            providers: vec![provider_id],
                        });
                        id
                    }
                };

                provider.traits.push(id);
            }

            providers.push(provider);
        }

        // every prerequisite/incompatibility must name a known trait
        for t in &traits {
            let references = t
                .requires
                .iter()
                .chain(&t.requires_any)
                .chain(&t.incompatible_with);
            for reference in references {
                if !by_name.contains_key(reference) {
                    return Err(CodexError::UnresolvedReference {
                        trait_name: t.name.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        // group names sharing icon art; alphabetical order makes the first
        // entry the canonical representative
        let mut by_icon: HashMap<PathBuf, Vec<TraitId>> = HashMap::new();
        for (idx, t) in traits.iter().enumerate() {
            by_icon
                .entry(t.icon_file.clone())
                .or_default()
                .push(TraitId(idx));
        }
        for group in by_icon.values_mut() {
            group.sort_by(|a, b| traits[a.0].name.cmp(&traits[b.0].name));
        }

        let empties: Vec<TraitId> = traits
            .iter()
            .enumerate()
            .filter(|(_, t)| t.category == Category::EmptyAbility)
            .map(|(idx, _)| TraitId(idx))
            .collect();
        let empty = match empties.as_slice() {
            [single] => *single,
            other => return Err(CodexError::EmptySlotCount(other.len())),
        };

        log::info!(
            "loaded codex: {} providers, {} traits",
            providers.len(),
            traits.len()
        );

        Ok(Self {
            providers,
            traits,
            by_name,
            by_icon,
            empty,
        })
    }

    pub fn traits(&self) -> impl Iterator<Item = &Trait> {
        self.traits.iter()
    }

    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter()
    }

    pub fn get(&self, id: TraitId) -> &Trait {
        &self.traits[id.0]
    }

    pub fn provider(&self, id: ProviderId) -> &Provider {
        &self.providers[id.0]
    }

    pub fn trait_by_name(&self, name: &str) -> Option<&Trait> {
        self.by_name.get(name).map(|id| &self.traits[id.0])
    }

    pub fn trait_id(&self, name: &str) -> Option<TraitId> {
        self.by_name.get(name).copied()
    }

    /// The sentinel trait standing in for an unfilled slot.
    pub fn empty_slot(&self) -> &Trait {
        &self.traits[self.empty.0]
    }

    /// True unless the trait is the empty-slot sentinel.
    pub fn is_slot_filled(&self, t: &Trait) -> bool {
        t.name != self.empty_slot().name
    }

    /// Every trait drawn with the same icon art as `name`, alphabetically
    /// ordered and including the trait itself. Empty for unknown names.
    pub fn icon_sharing_traits(&self, name: &str) -> Vec<&Trait> {
        let Some(t) = self.trait_by_name(name) else {
            return Vec::new();
        };
        self.by_icon[&t.icon_file]
            .iter()
            .map(|id| self.get(*id))
            .collect()
    }

    /// First name (alphabetically) of the icon-sharing group `name` belongs
    /// to; the label all sharers are filed under.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.icon_sharing_traits(name)
            .first()
            .map(|t| t.name.as_str())
    }

    /// Distinct icon-sharing groups, one canonical trait per group.
    pub fn icon_groups(&self) -> impl Iterator<Item = &Trait> {
        self.by_icon.values().map(|group| self.get(group[0]))
    }

    /// Scan a trait collection for the equipped weapon. Exactly one distinct
    /// arm-upgrade/arm-aspect provider must be implicated; zero or several
    /// mean the screen cannot be trusted and yield `None`.
    pub fn determine_weapon<'t>(
        &self,
        traits: impl IntoIterator<Item = &'t Trait>,
    ) -> Option<&str> {
        let mut weapon: Option<&str> = None;
        for t in traits {
            if !t.category.is_weapon() {
                continue;
            }
            for pid in &t.providers {
                let name = self.providers[pid.0].name.as_str();
                match weapon {
                    None => weapon = Some(name),
                    Some(current) if current == name => {}
                    Some(_) => return None,
                }
            }
        }
        weapon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> &'static str {
        r#"[
            {
                "category": "Gods",
                "name": "Zeus",
                "equips": [
                    { "name": "Lightning Strike", "desc": "Your attack deals bonus damage.", "icon": "icons/lightning_strike.png", "singleton": "Attack" },
                    { "name": "Sea Storm", "desc": "Lightning strikes knocked-away foes.", "icon": "icons/sea_storm.png" }
                ]
            },
            {
                "category": "Gods",
                "name": "Poseidon",
                "equips": [
                    { "name": "Tempest Strike", "desc": "Your attack knocks foes away.", "icon": "icons/tempest_strike.png", "singleton": "Attack" },
                    { "name": "Sea Storm", "desc": "Lightning strikes knocked-away foes.", "icon": "icons/sea_storm.png" }
                ]
            },
            {
                "category": "Arm_Aspects",
                "name": "Stygius",
                "equips": [
                    { "name": "Aspect of Zagreus", "desc": "Bonus to your abilities.", "icon": "icons/aspect_zagreus.png" }
                ]
            },
            {
                "category": "Keepsakes",
                "name": "Cerberus",
                "equips": [
                    { "name": "Old Spiked Collar", "desc": "Gain bonus health.", "icon": "icons/collar.png" },
                    { "name": "Worn Spiked Collar", "desc": "Gain bonus health.", "icon": "icons/collar.png" }
                ]
            },
            {
                "category": "Empty_Ability",
                "name": "Empty",
                "equips": [
                    { "name": "Empty Boon", "desc": "An unfilled slot.", "icon": "icons/empty.png" }
                ]
            }
        ]"#
    }

    #[test]
    fn duo_traits_merge_into_one_record() {
        let codex = Codex::load(fixture().as_bytes()).unwrap();
        let duo = codex.trait_by_name("Sea Storm").unwrap();
        assert!(duo.is_duo());
        let gods: Vec<&str> = duo
            .providers()
            .iter()
            .map(|id| codex.provider(*id).name.as_str())
            .collect();
        assert_eq!(gods, ["Zeus", "Poseidon"]);

        // both god records still reach the shared trait
        for god in ["Zeus", "Poseidon"] {
            let provider = codex.providers().find(|p| p.name == god).unwrap();
            assert!(provider.traits().iter().any(|id| codex.get(*id).name == "Sea Storm"));
        }
    }

    #[test]
    fn icon_sharing_groups_are_ordered_and_symmetric() {
        let codex = Codex::load(fixture().as_bytes()).unwrap();
        let from_old: Vec<&str> = codex
            .icon_sharing_traits("Old Spiked Collar")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        let from_worn: Vec<&str> = codex
            .icon_sharing_traits("Worn Spiked Collar")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(from_old, ["Old Spiked Collar", "Worn Spiked Collar"]);
        assert_eq!(from_old, from_worn);
        assert_eq!(codex.canonical_name("Worn Spiked Collar"), Some("Old Spiked Collar"));
    }

    #[test]
    fn weapon_determination_requires_exactly_one_arm_provider() {
        let codex = Codex::load(fixture().as_bytes()).unwrap();
        let aspect = codex.trait_by_name("Aspect of Zagreus").unwrap();
        let boon = codex.trait_by_name("Lightning Strike").unwrap();

        assert_eq!(codex.determine_weapon([aspect, boon]), Some("Stygius"));
        assert_eq!(codex.determine_weapon([boon]), None);
    }

    #[test]
    fn empty_slot_sentinel_is_not_filled() {
        let codex = Codex::load(fixture().as_bytes()).unwrap();
        assert!(!codex.is_slot_filled(codex.empty_slot()));
        assert!(codex.is_slot_filled(codex.trait_by_name("Sea Storm").unwrap()));
    }

    #[test]
    fn unresolved_cross_reference_fails_load() {
        let doc = r#"[
            {
                "category": "Gods",
                "name": "Zeus",
                "equips": [
                    { "name": "Splitting Bolt", "desc": "x", "icon": "icons/a.png", "requires": ["No Such Trait"] }
                ]
            },
            {
                "category": "Empty_Ability",
                "name": "Empty",
                "equips": [ { "name": "Empty Boon", "desc": "x", "icon": "icons/empty.png" } ]
            }
        ]"#;
        let err = Codex::load(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, CodexError::UnresolvedReference { .. }));
    }

    #[test]
    fn duplicate_name_outside_gods_fails_load() {
        let doc = r#"[
            {
                "category": "Keepsakes",
                "name": "Cerberus",
                "equips": [ { "name": "Collar", "desc": "x", "icon": "icons/a.png" } ]
            },
            {
                "category": "Keepsakes",
                "name": "Achilles",
                "equips": [ { "name": "Collar", "desc": "x", "icon": "icons/b.png" } ]
            },
            {
                "category": "Empty_Ability",
                "name": "Empty",
                "equips": [ { "name": "Empty Boon", "desc": "x", "icon": "icons/empty.png" } ]
            }
        ]"#;
        let err = Codex::load(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, CodexError::DuplicateName(_)));
    }

    #[test]
    fn missing_empty_sentinel_fails_load() {
        let doc = r#"[
            {
                "category": "Gods",
                "name": "Zeus",
                "equips": [ { "name": "Lightning Strike", "desc": "x", "icon": "icons/a.png" } ]
            }
        ]"#;
        let err = Codex::load(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, CodexError::EmptySlotCount(0)));
    }
}
