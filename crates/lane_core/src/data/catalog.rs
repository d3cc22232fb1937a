//! The card catalog: lookup, validation, RON loading and the built-in set.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::card_data::{
    CardData, CardKind, CardRole, CardTraits, DeathExplosion, SpawnRule, SpellData, SpellTarget,
    StatusKind, StatusPayload,
};
use crate::error::{GameError, Result};
use crate::math::Fixed;

/// Highest card cost the economy can ever pay.
pub const MAX_CARD_COST: u32 = 10;

/// Immutable table of card definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CardData>", into = "Vec<CardData>")]
pub struct CardCatalog {
    cards: Vec<CardData>,
    index: HashMap<String, usize>,
}

impl CardCatalog {
    /// Build a catalog from card definitions, validating them.
    pub fn from_cards(cards: Vec<CardData>) -> Result<Self> {
        let mut index = HashMap::with_capacity(cards.len());
        for (i, card) in cards.iter().enumerate() {
            if index.insert(card.id.clone(), i).is_some() {
                return Err(GameError::InvalidCatalog(format!(
                    "duplicate card id '{}'",
                    card.id
                )));
            }
        }
        let catalog = Self { cards, index };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a catalog from a RON list of cards.
    pub fn from_ron_str(ron_text: &str) -> Result<Self> {
        Self::parse_labeled(ron_text, "<inline>")
    }

    /// Load a catalog from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::parse_labeled(&text, &path.display().to_string())?;
        tracing::info!(path = %path.display(), cards = catalog.len(), "Loaded card catalog");
        Ok(catalog)
    }

    fn parse_labeled(ron_text: &str, label: &str) -> Result<Self> {
        let cards: Vec<CardData> =
            ron::from_str(ron_text).map_err(|e| GameError::DataParseError {
                path: label.to_string(),
                message: e.to_string(),
            })?;
        Self::from_cards(cards)
    }

    /// Serialize the catalog as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(&self.cards, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize catalog: {e}")))
    }

    /// Look up a card by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CardData> {
        self.index.get(id).map(|&i| &self.cards[i])
    }

    /// Look up a card by id, failing with [`GameError::UnknownCard`].
    pub fn require(&self, id: &str) -> Result<&CardData> {
        self.get(id)
            .ok_or_else(|| GameError::UnknownCard(id.to_string()))
    }

    /// Whether the catalog defines `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All cards in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &CardData> {
        self.cards.iter()
    }

    /// Number of cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Check that every deck entry exists in the catalog.
    pub fn validate_deck(&self, deck: &[String], min_len: usize) -> Result<()> {
        if deck.len() < min_len {
            return Err(GameError::InvalidConfig(format!(
                "deck has {} cards, needs at least {min_len}",
                deck.len()
            )));
        }
        let mut seen = HashSet::new();
        for id in deck {
            self.require(id)?;
            if !seen.insert(id.as_str()) {
                return Err(GameError::InvalidConfig(format!("deck lists '{id}' twice")));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for card in &self.cards {
            let fail = |why: &str| Err(GameError::InvalidCatalog(format!("'{}': {why}", card.id)));
            if card.cost > MAX_CARD_COST {
                return fail("cost exceeds the elixir cap");
            }
            if card.count == 0 {
                return fail("count must be at least 1");
            }
            match card.kind {
                CardKind::Troop => {
                    if card.health == 0 {
                        return fail("troops need health");
                    }
                    if card.speed <= Fixed::ZERO {
                        return fail("troops need a positive speed");
                    }
                }
                CardKind::Building => {
                    if card.health == 0 {
                        return fail("buildings need health");
                    }
                }
                CardKind::Spell => match &card.spell {
                    None => return fail("spells need a spell payload"),
                    Some(spell) => {
                        if spell.radius <= Fixed::ZERO {
                            return fail("spell radius must be positive");
                        }
                        if spell.projectile_speed < Fixed::ZERO {
                            return fail("projectile speed cannot be negative");
                        }
                        if spell.duration > Fixed::ZERO && spell.pulse_interval <= Fixed::ZERO {
                            return fail("lingering spells need a pulse interval");
                        }
                    }
                },
            }
            if let Some(rule) = &card.traits.spawns {
                match self.get(&rule.card) {
                    Some(spawned) if spawned.kind == CardKind::Troop => {}
                    Some(_) => return fail("spawner must produce a troop"),
                    None => {
                        return Err(GameError::UnknownCard(rule.card.clone()));
                    }
                }
                if rule.interval <= Fixed::ZERO {
                    return fail("spawn interval must be positive");
                }
            }
        }
        Ok(())
    }

    /// The built-in card set.
    #[must_use]
    pub fn default_catalog() -> Self {
        let cards = default_cards();
        let index = cards
            .iter()
            .enumerate()
            .map(|(i, card)| (card.id.clone(), i))
            .collect();
        Self { cards, index }
    }
}

impl Default for CardCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

impl TryFrom<Vec<CardData>> for CardCatalog {
    type Error = GameError;

    fn try_from(cards: Vec<CardData>) -> Result<Self> {
        Self::from_cards(cards)
    }
}

impl From<CardCatalog> for Vec<CardData> {
    fn from(catalog: CardCatalog) -> Self {
        catalog.cards
    }
}

fn fx(value: f64) -> Fixed {
    Fixed::from_num(value)
}

fn troop(
    id: &str,
    name: &str,
    role: CardRole,
    cost: u32,
    health: u32,
    damage: u32,
    speed: f64,
    range: f64,
    attack_rate: f64,
) -> CardData {
    CardData {
        id: id.to_string(),
        name: name.to_string(),
        kind: CardKind::Troop,
        role,
        cost,
        health,
        damage,
        speed: fx(speed),
        range: fx(range),
        attack_rate: fx(attack_rate),
        radius: fx(8.0),
        sight: fx(110.0),
        count: 1,
        traits: CardTraits::default(),
        spell: None,
    }
}

fn spell(id: &str, name: &str, cost: u32, payload: SpellData) -> CardData {
    CardData {
        id: id.to_string(),
        name: name.to_string(),
        kind: CardKind::Spell,
        role: CardRole::Spell,
        cost,
        health: 0,
        damage: 0,
        speed: Fixed::ZERO,
        range: Fixed::ZERO,
        attack_rate: Fixed::ZERO,
        radius: Fixed::ZERO,
        sight: Fixed::ZERO,
        count: 1,
        traits: CardTraits::default(),
        spell: Some(payload),
    }
}

fn blast(damage: u32, radius: f64, projectile_speed: f64) -> SpellData {
    SpellData {
        damage,
        heal: 0,
        status: None,
        radius: fx(radius),
        duration: Fixed::ZERO,
        pulse_interval: Fixed::ZERO,
        affects: SpellTarget::Enemies,
        projectile_speed: fx(projectile_speed),
    }
}

fn status(kind: StatusKind, duration: f64, strength: f64) -> Option<StatusPayload> {
    Some(StatusPayload {
        kind,
        duration: fx(duration),
        strength: fx(strength),
    })
}

fn default_cards() -> Vec<CardData> {
    let mut cards = Vec::new();

    cards.push(troop("knight", "Knight", CardRole::Melee, 3, 660, 75, 45.0, 20.0, 1.2));

    let mut archers = troop("archers", "Archers", CardRole::Ranged, 3, 200, 40, 45.0, 100.0, 1.0);
    archers.count = 2;
    cards.push(archers);

    let mut giant = troop("giant", "Giant", CardRole::Tank, 5, 2000, 120, 30.0, 20.0, 1.5);
    giant.radius = fx(14.0);
    giant.sight = fx(40.0);
    cards.push(giant);

    cards.push(troop(
        "musketeer", "Musketeer", CardRole::Ranged, 4, 600, 180, 45.0, 120.0, 1.1,
    ));

    let mut prince = troop("prince", "Prince", CardRole::Melee, 5, 1100, 220, 60.0, 24.0, 1.4);
    prince.traits.charge_multiplier = 2;
    prince.radius = fx(11.0);
    cards.push(prince);

    let mut guards = troop("guards", "Guards", CardRole::Swarm, 3, 90, 90, 60.0, 20.0, 1.0);
    guards.count = 3;
    guards.traits.shield = 150;
    cards.push(guards);

    let mut phoenix = troop("phoenix", "Phoenix", CardRole::Melee, 4, 700, 160, 60.0, 24.0, 1.2);
    phoenix.traits.revive_percent = 50;
    cards.push(phoenix);

    let mut golem = troop("golem", "Golem", CardRole::Tank, 8, 3000, 190, 30.0, 24.0, 2.5);
    golem.radius = fx(16.0);
    golem.sight = fx(40.0);
    golem.traits.death_explosion = Some(DeathExplosion {
        damage: 260,
        radius: fx(60.0),
    });
    cards.push(golem);

    let mut valkyrie = troop("valkyrie", "Valkyrie", CardRole::Melee, 4, 1300, 120, 45.0, 20.0, 1.5);
    valkyrie.traits.splash_radius = fx(40.0);
    cards.push(valkyrie);

    let mut goblins = troop("goblins", "Goblins", CardRole::Swarm, 2, 170, 100, 60.0, 18.0, 1.1);
    goblins.count = 3;
    cards.push(goblins);

    let mut spear_goblins = troop(
        "spear_goblins",
        "Spear Goblins",
        CardRole::Ranged,
        2,
        110,
        65,
        60.0,
        90.0,
        1.2,
    );
    spear_goblins.count = 3;
    cards.push(spear_goblins);

    cards.push(spell("fireball", "Fireball", 4, blast(325, 50.0, 300.0)));

    let mut zap = blast(160, 50.0, 1000.0);
    zap.status = status(StatusKind::Stunned, 0.5, 1.0);
    cards.push(spell("zap", "Zap", 2, zap));

    let mut freeze = blast(90, 60.0, 1000.0);
    freeze.status = status(StatusKind::Frozen, 4.0, 1.0);
    cards.push(spell("freeze", "Freeze", 4, freeze));

    let mut snowball = blast(100, 40.0, 400.0);
    snowball.status = status(StatusKind::Slowed, 2.5, 0.5);
    cards.push(spell("snowball", "Snowball", 2, snowball));

    let mut poison = blast(0, 70.0, 1000.0);
    poison.status = status(StatusKind::Poisoned, 1.5, 60.0);
    poison.duration = fx(8.0);
    poison.pulse_interval = fx(1.0);
    cards.push(spell("poison", "Poison", 4, poison));

    let mut rage = blast(0, 80.0, 1000.0);
    rage.affects = SpellTarget::Allies;
    rage.status = status(StatusKind::Raged, 1.0, 1.4);
    rage.duration = fx(6.0);
    rage.pulse_interval = fx(0.5);
    cards.push(spell("rage", "Rage", 2, rage));

    let mut heal = blast(0, 70.0, 1000.0);
    heal.affects = SpellTarget::Allies;
    heal.heal = 100;
    heal.duration = fx(2.0);
    heal.pulse_interval = fx(0.5);
    cards.push(spell("heal", "Heal", 3, heal));

    let mut cannon = troop("cannon", "Cannon", CardRole::Defense, 3, 800, 80, 0.0, 110.0, 0.9);
    cannon.kind = CardKind::Building;
    cannon.radius = fx(16.0);
    cannon.traits.lifetime = fx(30.0);
    cards.push(cannon);

    let mut hut = troop("goblin_hut", "Goblin Hut", CardRole::Spawner, 5, 900, 0, 0.0, 0.0, 0.0);
    hut.kind = CardKind::Building;
    hut.radius = fx(18.0);
    hut.traits.lifetime = fx(40.0);
    hut.traits.spawns = Some(SpawnRule {
        card: "spear_goblins".to_string(),
        interval: fx(5.0),
        count: 1,
    });
    cards.push(hut);

    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = CardCatalog::default_catalog();
        assert!(catalog.validate().is_ok());
        assert!(catalog.contains("knight"));
        assert!(catalog.get("golem").is_some_and(|c| c.traits.death_explosion.is_some()));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let knight = CardCatalog::default_catalog().require("knight").cloned();
        let knight = knight.expect("knight exists");
        let result = CardCatalog::from_cards(vec![knight.clone(), knight]);
        assert!(matches!(result, Err(GameError::InvalidCatalog(_))));
    }

    #[test]
    fn zero_speed_spell_is_instant_but_negative_is_rejected() {
        let mut zap = CardCatalog::default_catalog()
            .require("zap")
            .cloned()
            .expect("zap exists");
        if let Some(spell) = zap.spell.as_mut() {
            spell.projectile_speed = Fixed::ZERO;
        }
        assert!(CardCatalog::from_cards(vec![zap.clone()]).is_ok());

        if let Some(spell) = zap.spell.as_mut() {
            spell.projectile_speed = Fixed::from_num(-1);
        }
        let result = CardCatalog::from_cards(vec![zap]);
        assert!(matches!(result, Err(GameError::InvalidCatalog(_))));
    }

    #[test]
    fn spawner_must_reference_a_known_troop() {
        let mut hut = CardCatalog::default_catalog()
            .require("goblin_hut")
            .cloned()
            .expect("hut exists");
        if let Some(rule) = hut.traits.spawns.as_mut() {
            rule.card = "missing".to_string();
        }
        let result = CardCatalog::from_cards(vec![hut]);
        assert!(matches!(result, Err(GameError::UnknownCard(id)) if id == "missing"));
    }

    #[test]
    fn ron_round_trip_preserves_cards() {
        let catalog = CardCatalog::default_catalog();
        let text = catalog.to_ron_string().expect("serializes");
        let parsed = CardCatalog::from_ron_str(&text).expect("parses");
        assert_eq!(parsed.len(), catalog.len());
        assert_eq!(parsed.get("prince"), catalog.get("prince"));
    }

    #[test]
    fn minimal_ron_card_uses_defaults() {
        let text = r#"[
            (
                id: "brute",
                name: "Brute",
                kind: Troop,
                role: Melee,
                cost: 6,
                health: 900,
                damage: 100,
                speed: 40.0,
                range: 20.0,
                attack_rate: 1.0,
            ),
        ]"#;
        let catalog = CardCatalog::from_ron_str(text).expect("parses");
        let brute = catalog.require("brute").expect("present");
        assert_eq!(brute.count, 1);
        assert_eq!(brute.radius, Fixed::from_num(8));
        assert_eq!(brute.traits, CardTraits::default());
    }

    #[test]
    fn malformed_ron_reports_parse_error() {
        let result = CardCatalog::from_ron_str("[ ( id: ");
        assert!(matches!(result, Err(GameError::DataParseError { .. })));
    }

    #[test]
    fn deck_validation_catches_unknown_and_duplicate_cards() {
        let catalog = CardCatalog::default_catalog();
        let ids = |names: &[&str]| names.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        assert!(catalog
            .validate_deck(&ids(&["knight", "archers", "giant", "zap", "fireball"]), 5)
            .is_ok());
        assert!(matches!(
            catalog.validate_deck(&ids(&["knight", "nope", "giant", "zap", "fireball"]), 5),
            Err(GameError::UnknownCard(_))
        ));
        assert!(matches!(
            catalog.validate_deck(&ids(&["knight", "knight", "giant", "zap", "fireball"]), 5),
            Err(GameError::InvalidConfig(_))
        ));
    }
}
