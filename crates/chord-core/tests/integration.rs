//! Whole-pipeline conversations through the orchestrator with the lexical
//! backend: analysis → memory → flow → assembler → tone.

use std::sync::atomic::{AtomicBool, Ordering};

use chord_core::{
    BackendError, ChordConfig, ChordError, EmotionReading, EntitySpan, InferenceBackend,
    IntentPrediction, LexicalBackend, Orchestrator, Phase,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(42)
}

async fn engine() -> Orchestrator<LexicalBackend, SmallRng> {
    let mut orchestrator = Orchestrator::new(ChordConfig::default(), LexicalBackend::default(), rng());
    orchestrator.initialize().await.unwrap();
    orchestrator
}

/// Lexical backend that can be switched to fail every call.
#[derive(Default)]
struct FlakyBackend {
    inner: LexicalBackend,
    failing: AtomicBool,
}

impl FlakyBackend {
    fn check(&self) -> Result<(), BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("inference service down".into()))
        } else {
            Ok(())
        }
    }
}

impl InferenceBackend for FlakyBackend {
    async fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError> {
        self.check()?;
        self.inner.encode(text).await
    }

    async fn classify_intent(&self, text: &str) -> Result<IntentPrediction, BackendError> {
        self.check()?;
        self.inner.classify_intent(text).await
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<EntitySpan>, BackendError> {
        self.check()?;
        self.inner.extract_entities(text).await
    }

    async fn analyze_emotion(&self, text: &str) -> Result<EmotionReading, BackendError> {
        self.check()?;
        self.inner.analyze_emotion(text).await
    }
}

#[tokio::test]
async fn remembers_user_name() {
    let mut bot = engine().await;
    let intro = bot.process("My name is Alice").await.unwrap();
    assert!(intro.contains("Alice"), "{intro}");

    let answer = bot.process("What is my name?").await.unwrap();
    assert!(answer.contains("Your name is Alice."), "{answer}");
}

#[tokio::test]
async fn remembers_pet_name_and_who_it_is() {
    let mut bot = engine().await;
    bot.process("My dog's name is Buddy").await.unwrap();

    let memory = bot.memory().unwrap();
    assert_eq!(memory.query_entity_memory("dog_name").unwrap().value, "Buddy");

    let answer = bot.process("What is my dog's name?").await.unwrap();
    assert!(answer.contains("Your dog's name is Buddy."), "{answer}");

    let answer = bot.process("Who is Buddy?").await.unwrap();
    assert!(answer.contains("Buddy is your dog."), "{answer}");
}

#[tokio::test]
async fn description_is_not_stored_as_a_name() {
    let mut bot = engine().await;
    let reply = bot.process("My dog is a labrador").await.unwrap();
    assert!(!reply.contains(", a."), "{reply}");
    assert!(bot.memory().unwrap().query_entity_memory("dog_name").is_none());

    let answer = bot.process("What is my dog's name?").await.unwrap();
    assert!(answer.contains("I don't know your dog's name yet"), "{answer}");
}

#[tokio::test]
async fn resolves_pronoun_after_entity_query() {
    let mut bot = engine().await;
    let unknown = bot.process("What is my wife's name?").await.unwrap();
    assert!(unknown.contains("I don't know your wife's name yet"), "{unknown}");

    bot.process("Her name is Sarah").await.unwrap();
    let memory = bot.memory().unwrap();
    assert_eq!(memory.query_entity_relationship("wife", "name").unwrap().value, "Sarah");

    let answer = bot.process("What is her name?").await.unwrap();
    assert!(answer.contains("Her name is Sarah."), "{answer}");
}

#[tokio::test]
async fn remembers_favorites() {
    let mut bot = engine().await;
    bot.process("My favorite color is green").await.unwrap();
    let answer = bot.process("What is my favorite color?").await.unwrap();
    assert!(answer.contains("Your favorite color is green."), "{answer}");
}

#[tokio::test]
async fn answers_bot_identity() {
    let config = ChordConfig {
        bot_name: "Echo".into(),
        ..ChordConfig::default()
    };
    let mut bot = Orchestrator::new(config, LexicalBackend::default(), rng());
    bot.initialize().await.unwrap();
    let answer = bot.process("What's your name?").await.unwrap();
    assert!(answer.contains("My name is Echo."), "{answer}");
}

#[tokio::test]
async fn greeting_then_introduction_moves_to_exploration() {
    let mut bot = engine().await;
    bot.process("Hello there").await.unwrap();
    assert_eq!(bot.flow().unwrap().phase, Phase::Opening);
    bot.process("My name is Alice").await.unwrap();
    assert_eq!(bot.flow().unwrap().phase, Phase::Exploration);
}

#[tokio::test]
async fn sad_input_gets_warm_reply() {
    let mut bot = engine().await;
    let reply = bot.process("I feel so sad and lonely today").await.unwrap();
    assert!(reply.starts_with("I understand."), "{reply}");
}

#[tokio::test]
async fn rejects_use_before_initialize() {
    let mut bot = Orchestrator::new(ChordConfig::default(), LexicalBackend::default(), rng());
    assert!(matches!(bot.process("hello").await, Err(ChordError::NotInitialized)));
    assert!(matches!(bot.debug_info(), Err(ChordError::NotInitialized)));
    assert!(matches!(bot.reset(), Err(ChordError::NotInitialized)));
}

#[tokio::test]
async fn rejects_blank_input() {
    let mut bot = engine().await;
    assert!(matches!(bot.process("   ").await, Err(ChordError::EmptyInput)));
    assert_eq!(bot.debug_info().unwrap().memory.turns, 0);
}

#[tokio::test]
async fn rejects_invalid_configuration() {
    let mut config = ChordConfig::default();
    config.memory.history_cap = 0;
    let mut bot = Orchestrator::new(config, LexicalBackend::default(), rng());
    assert!(matches!(
        bot.initialize().await,
        Err(ChordError::ConfigurationInvalid(_))
    ));
    assert!(!bot.is_initialized());
}

#[tokio::test]
async fn backend_failure_leaves_state_untouched() {
    let mut bot = Orchestrator::new(ChordConfig::default(), FlakyBackend::default(), rng());
    bot.initialize().await.unwrap();
    bot.process("My name is Alice").await.unwrap();
    let before = bot.debug_info().unwrap();

    bot_backend_failing(&bot, true);
    let err = bot.process("My dog's name is Buddy").await.unwrap_err();
    assert!(matches!(err, ChordError::Backend(BackendError::Unavailable(_))), "{err}");

    let after = bot.debug_info().unwrap();
    assert_eq!(after.memory, before.memory);
    assert_eq!(after.human.state.turn_count, before.human.state.turn_count);
    assert!(bot.memory().unwrap().query_entity_memory("dog_name").is_none());

    bot_backend_failing(&bot, false);
    let answer = bot.process("What is my name?").await.unwrap();
    assert!(answer.contains("Alice"), "{answer}");
}

fn bot_backend_failing(bot: &Orchestrator<FlakyBackend, SmallRng>, failing: bool) {
    bot.backend().failing.store(failing, Ordering::SeqCst);
}

#[tokio::test]
async fn debug_info_tracks_turns() {
    let mut bot = engine().await;
    bot.process("Hello").await.unwrap();
    bot.process("My name is Alice").await.unwrap();

    let info = bot.debug_info().unwrap();
    // one human and one bot turn each
    assert_eq!(info.memory.turns, 4);
    assert_eq!(info.human.state.turn_count, 2);
    assert_eq!(info.bot.state.turn_count, 2);
    assert!(info.vocabulary_size > 0);
    assert!((0.0..=1.0).contains(&info.coherence));

    let json = serde_json::to_value(&info).unwrap();
    assert!(json.get("memory").is_some());
    assert!(info.started_at.ends_with('Z'), "{}", info.started_at);
}

#[tokio::test]
async fn reset_forgets_everything() {
    let mut bot = engine().await;
    bot.process("My name is Alice").await.unwrap();
    bot.reset().unwrap();

    let info = bot.debug_info().unwrap();
    assert_eq!(info.memory.turns, 0);
    assert_eq!(info.phase, Phase::Opening);

    let answer = bot.process("What is my name?").await.unwrap();
    assert!(!answer.contains("Alice"), "{answer}");
}

#[tokio::test]
async fn batch_runs_in_order() {
    let mut bot = engine().await;
    let replies = bot
        .process_batch(&["Hi", "My name is Alice", "What is my name?"])
        .await;
    assert_eq!(replies.len(), 3);
    let last = replies[2].as_ref().unwrap();
    assert!(last.contains("Alice"), "{last}");
}

#[tokio::test]
async fn seeded_conversations_are_repeatable() {
    let script = ["Hello", "My name is Alice", "Tell me about volcanoes", "Thanks!"];
    let mut a = engine().await;
    let mut b = engine().await;
    for line in script {
        assert_eq!(a.process(line).await.unwrap(), b.process(line).await.unwrap());
    }
}

#[tokio::test]
async fn turn_outcome_reports_pipeline_state() {
    let mut bot = engine().await;
    let outcome = bot.process_turn("What is my name?").await.unwrap();
    assert_eq!(outcome.generator, "identity_query");
    assert!(!outcome.input_signature.is_empty());
    assert!(outcome.response_signature.contains(11));
    assert!(outcome.resonant_words.len() <= 5);
}
