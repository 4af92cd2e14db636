use std::collections::BTreeMap;

use crate::config::OntologyConfig;

pub trait Ontology {
    /// Type of a word, if known.
    fn infer_type(&self, word: &str) -> Option<&str>;
    /// Properties worth asking about for a type. Empty when unknown.
    fn valid_properties(&self, entity_type: &str) -> &[String];
    /// Every known word, in table order.
    fn words(&self) -> Vec<&str>;
}

#[derive(Clone, Debug)]
struct TypeEntry {
    words: Vec<String>,
    properties: Vec<String>,
}

/// In-memory ontology seeded with a small built-in table.
#[derive(Clone, Debug)]
pub struct StaticOntology {
    types: BTreeMap<String, TypeEntry>,
    order: Vec<String>,
}

const BUILTIN: &[(&str, &[&str], &[&str])] = &[
    (
        "animal",
        &["dog", "cat", "bird", "fish", "horse", "hamster", "rabbit", "parrot"],
        &["name", "breed", "age", "color"],
    ),
    (
        "vehicle",
        &["car", "truck", "bike", "motorcycle", "boat"],
        &["color", "make", "model", "name"],
    ),
    (
        "relation",
        &[
            "wife", "husband", "mother", "father", "sister", "brother", "son", "daughter",
            "friend", "boss", "girlfriend", "boyfriend",
        ],
        &["name", "age", "job", "birthday"],
    ),
    (
        "place",
        &["city", "house", "home", "town", "country", "school", "office"],
        &["name", "location"],
    ),
    (
        "food",
        &["pizza", "pasta", "sushi", "coffee", "tea", "chocolate"],
        &["flavor", "place"],
    ),
    (
        "activity",
        &["music", "sport", "book", "movie", "game", "hobby"],
        &["genre", "title"],
    ),
];

impl Default for StaticOntology {
    fn default() -> Self {
        let mut ontology = Self {
            types: BTreeMap::new(),
            order: Vec::new(),
        };
        for (name, words, props) in BUILTIN {
            ontology.add_type(
                name,
                words.iter().map(|w| w.to_string()).collect(),
                props.iter().map(|p| p.to_string()).collect(),
            );
        }
        ontology
    }
}

impl StaticOntology {
    /// Built-in table plus configured types. A configured type with an
    /// existing name extends it.
    pub fn with_config(config: &OntologyConfig) -> Self {
        let mut ontology = Self::default();
        for ty in &config.types {
            ontology.add_type(
                ty.name.trim(),
                ty.words
                    .iter()
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect(),
                ty.properties.clone(),
            );
        }
        ontology
    }

    fn add_type(&mut self, name: &str, words: Vec<String>, properties: Vec<String>) {
        match self.types.get_mut(name) {
            Some(entry) => {
                for w in words {
                    if !entry.words.contains(&w) {
                        entry.words.push(w);
                    }
                }
                for p in properties {
                    if !entry.properties.contains(&p) {
                        entry.properties.push(p);
                    }
                }
            }
            None => {
                self.order.push(name.to_string());
                self.types
                    .insert(name.to_string(), TypeEntry { words, properties });
            }
        }
    }
}

impl Ontology for StaticOntology {
    fn infer_type(&self, word: &str) -> Option<&str> {
        let word = word.trim().to_lowercase();
        self.order
            .iter()
            .find(|name| self.types[name.as_str()].words.contains(&word))
            .map(String::as_str)
    }

    fn valid_properties(&self, entity_type: &str) -> &[String] {
        self.types
            .get(entity_type)
            .map(|e| e.properties.as_slice())
            .unwrap_or(&[])
    }

    fn words(&self) -> Vec<&str> {
        self.order
            .iter()
            .flat_map(|name| self.types[name.as_str()].words.iter().map(String::as_str))
            .collect()
    }
}
