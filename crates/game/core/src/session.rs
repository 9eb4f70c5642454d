use std::fmt;
use std::sync::Arc;

use crate::action::EffectRegistry;
use crate::config::GameConfig;
use crate::content::ContentRepository;
use crate::dice::{DiceRoller, PcgRng};

/// Per-simulation bundle handed to `resolve` and `apply`: content catalogs,
/// effect handlers, the dice source and tunable configuration.
pub struct Session {
    content: Arc<ContentRepository>,
    effects: Arc<EffectRegistry>,
    dice: Box<dyn DiceRoller>,
    config: GameConfig,
}

impl Session {
    /// Standard effect handlers, default config, dice seeded with 0.
    pub fn new(content: Arc<ContentRepository>) -> Self {
        Self {
            content,
            effects: Arc::new(EffectRegistry::standard()),
            dice: Box::new(PcgRng::seeded(0)),
            config: GameConfig::default(),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_dice(PcgRng::seeded(seed))
    }

    pub fn with_dice(mut self, dice: impl DiceRoller + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    pub fn with_effects(mut self, effects: EffectRegistry) -> Self {
        self.effects = Arc::new(effects);
        self
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn content(&self) -> &ContentRepository {
        &self.content
    }

    pub fn content_arc(&self) -> &Arc<ContentRepository> {
        &self.content
    }

    pub fn effects(&self) -> Arc<EffectRegistry> {
        Arc::clone(&self.effects)
    }

    pub fn dice(&mut self) -> &mut dyn DiceRoller {
        self.dice.as_mut()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Borrows the read-only parts and the dice at the same time.
    pub(crate) fn split(&mut self) -> (&ContentRepository, &GameConfig, &mut dyn DiceRoller) {
        (&self.content, &self.config, self.dice.as_mut())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("effects", &self.effects)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
