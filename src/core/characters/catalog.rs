//! Fixed Character Pool Catalog
//!
//! The shared pool is seeded once from this catalog at bootstrap.
//! Seeding is idempotent: the store only writes when the pool table is
//! empty. Characters are never removed from the catalog, only
//! soft-deactivated in the store.

use super::types::{CharacterId, CharacterRole, CharacterTemplate, Gender, VisualProfile};

fn human(age_years: u8, hair: &str, eyes: &str, clothing: &str) -> VisualProfile {
    VisualProfile::Human {
        age_years,
        hair: hair.to_string(),
        eyes: eyes.to_string(),
        clothing: clothing.to_string(),
    }
}

fn animal(species: &str, coat: &str, size: &str) -> VisualProfile {
    VisualProfile::Animal {
        species: species.to_string(),
        coat: coat.to_string(),
        size: size.to_string(),
    }
}

fn fantasy(kind: &str, palette: &str, aura: &str) -> VisualProfile {
    VisualProfile::Fantasy {
        kind: kind.to_string(),
        palette: palette.to_string(),
        aura: aura.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    name: &str,
    role: CharacterRole,
    archetype: &str,
    emotional_nature: &str,
    gender: Gender,
    visual_profile: VisualProfile,
    max_screen_time: u8,
    available_chapters: &[u32],
    canon_settings: &[&str],
) -> CharacterTemplate {
    CharacterTemplate {
        id: CharacterId::new(id),
        name: name.to_string(),
        role,
        archetype: archetype.to_string(),
        emotional_nature: emotional_nature.to_string(),
        gender,
        visual_profile,
        image_url: None,
        max_screen_time,
        available_chapters: available_chapters.to_vec(),
        canon_settings: canon_settings.iter().map(|s| s.to_string()).collect(),
        recent_usage_count: 0,
        total_usage_count: 0,
        last_used_at: None,
        is_active: true,
    }
}

/// The fixed pool catalog.
pub fn seed_catalog() -> Vec<CharacterTemplate> {
    vec![
        entry(
            "pool-henrik",
            "Old Henrik",
            CharacterRole::Guide,
            "wise mentor",
            "calm and patient",
            Gender::Male,
            human(72, "white", "grey", "a moss-green cloak"),
            40,
            &[],
            &["forest", "village", "mountains"],
        ),
        entry(
            "pool-greta",
            "Grandmother Greta",
            CharacterRole::Guide,
            "kind storyteller",
            "warm and encouraging",
            Gender::Female,
            human(68, "silver", "blue", "a patchwork shawl"),
            40,
            &[],
            &["village", "farm", "forest"],
        ),
        entry(
            "pool-felix",
            "Felix the Fox",
            CharacterRole::Companion,
            "clever trickster",
            "playful and loyal",
            Gender::Male,
            animal("fox", "rust-red fur with a white chest", "small"),
            30,
            &[],
            &["forest", "meadow", "village"],
        ),
        entry(
            "pool-luna",
            "Luna the Owl",
            CharacterRole::Companion,
            "night watcher",
            "thoughtful and quiet",
            Gender::Female,
            animal("owl", "speckled brown feathers", "small"),
            30,
            &[],
            &["forest", "mountains", "night sky"],
        ),
        entry(
            "pool-bruno",
            "Bruno the Bear",
            CharacterRole::Support,
            "gentle giant",
            "protective and slow to anger",
            Gender::Male,
            animal("bear", "thick brown fur", "large"),
            50,
            &[],
            &["forest", "mountains", "river"],
        ),
        entry(
            "pool-pip",
            "Pip the Sprite",
            CharacterRole::Discovery,
            "curious spark",
            "mischievous and bright",
            Gender::Neutral,
            fantasy("sprite", "teal and silver", "shimmering"),
            20,
            &[1, 2, 3, 4],
            &["forest", "river", "garden"],
        ),
        entry(
            "pool-ember",
            "Ember",
            CharacterRole::Discovery,
            "young dragon",
            "eager and clumsy",
            Gender::Neutral,
            fantasy("dragon", "copper and gold", "smoldering"),
            40,
            &[2, 3, 4, 5, 6],
            &["mountains", "castle", "cave"],
        ),
        entry(
            "pool-morla",
            "Morla the Shadow Cat",
            CharacterRole::Obstacle,
            "sly rival",
            "proud and cunning",
            Gender::Female,
            animal("cat", "ink-black fur", "medium"),
            35,
            &[2, 3, 4, 5, 6, 7],
            &["forest", "castle", "village"],
        ),
        entry(
            "pool-grimbart",
            "Grimbart",
            CharacterRole::Obstacle,
            "grumbling troll",
            "stubborn but fair",
            Gender::Male,
            fantasy("troll", "granite grey", "heavy"),
            45,
            &[3, 4, 5, 6, 7],
            &["mountains", "bridge", "cave"],
        ),
        entry(
            "pool-marta",
            "Baker Marta",
            CharacterRole::Support,
            "village helper",
            "cheerful and practical",
            Gender::Female,
            human(45, "brown", "hazel", "a flour-dusted apron"),
            25,
            &[],
            &["village", "farm", "market"],
        ),
        entry(
            "pool-nixe",
            "Nixe",
            CharacterRole::Special,
            "river spirit",
            "dreamy and elusive",
            Gender::Female,
            fantasy("water spirit", "sea-glass green", "rippling"),
            30,
            &[2, 3, 4, 5],
            &["river", "lake", "sea"],
        ),
        entry(
            "pool-kasimir",
            "Kasimir the Raven",
            CharacterRole::Special,
            "messenger",
            "dry-witted and watchful",
            Gender::Male,
            animal("raven", "glossy black feathers", "small"),
            20,
            &[],
            &["forest", "castle", "mountains", "village"],
        ),
    ]
}
