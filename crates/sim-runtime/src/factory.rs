//! Startup factory: collision-free names and tier-scaled pitches.

use rand::seq::SliceRandom;
use rand::Rng;
use sim_core::{GameConfig, GameError, RoundTier, Sector, Startup};
use std::collections::BTreeSet;
use tracing::debug;

/// Hands out startup names drawn from a prefix x suffix vocabulary, never
/// repeating a name until [`NameRegistry::reset`].
#[derive(Clone, Debug, Default)]
pub struct NameRegistry {
    combinations: Vec<String>,
    used: BTreeSet<String>,
}

impl NameRegistry {
    pub fn new(prefixes: &[String], suffixes: &[String]) -> Self {
        let combinations: BTreeSet<String> = prefixes
            .iter()
            .flat_map(|p| suffixes.iter().map(move |s| format!("{p} {s}")))
            .collect();
        Self {
            combinations: combinations.into_iter().collect(),
            used: BTreeSet::new(),
        }
    }

    pub fn from_config(cfg: &GameConfig) -> Self {
        Self::new(&cfg.name_prefixes, &cfg.name_suffixes)
    }

    /// Draw a fresh name uniformly among those not yet used and register it.
    pub fn generate<R: Rng>(&mut self, rng: &mut R) -> Result<String, GameError> {
        let free: Vec<&String> = self
            .combinations
            .iter()
            .filter(|n| !self.used.contains(*n))
            .collect();
        let name = free
            .choose(rng)
            .map(|n| (*n).clone())
            .ok_or(GameError::NameSpaceExhausted {
                combinations: self.combinations.len(),
            })?;
        self.used.insert(name.clone());
        Ok(name)
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    pub fn capacity(&self) -> usize {
        self.combinations.len()
    }

    /// Forget every handed-out name. Only a full game reset does this.
    pub fn reset(&mut self) {
        self.used.clear();
    }
}

/// Produces pitches for the active round.
#[derive(Clone, Debug)]
pub struct StartupFactory {
    names: NameRegistry,
}

impl StartupFactory {
    pub fn new(names: NameRegistry) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    pub fn reset_names(&mut self) {
        self.names.reset();
    }

    /// Build a pitch for `round` using the tier in effect for it.
    pub fn create_pitch<R: Rng>(
        &mut self,
        cfg: &GameConfig,
        round: u32,
        rng: &mut R,
    ) -> Result<Startup, GameError> {
        let tier = cfg
            .effective_tier(round)
            .ok_or(GameError::InvalidRoundTier { round })?;
        let pitch = self.create_for_tier(tier, rng)?;
        debug!(round, tier = %tier.name, name = %pitch.name, ask = pitch.investment_required, "pitch created");
        Ok(pitch)
    }

    /// Build a pitch scaled by an explicit tier.
    pub fn create_for_tier<R: Rng>(
        &mut self,
        tier: &RoundTier,
        rng: &mut R,
    ) -> Result<Startup, GameError> {
        let sector = *Sector::ALL.choose(rng).unwrap_or(&Sector::Tech);
        let name = self.names.generate(rng)?;
        let investment_required = rng.gen_range(tier.min_investment..tier.max_investment);
        Ok(Startup {
            name,
            sector,
            investment_required,
            market_size: rng.gen_range(0..1000),
            team_experience: rng.gen_range(1..=10),
            financials: f64::from(rng.gen_range(-50i32..50)),
            goal: investment_required.saturating_mul(tier.target_multiplier),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::BeyondFinalRound;

    fn factory(cfg: &GameConfig) -> StartupFactory {
        StartupFactory::new(NameRegistry::from_config(cfg))
    }

    #[test]
    fn twenty_five_unique_names_then_exhausted() {
        let cfg = GameConfig::default();
        let mut f = factory(&cfg);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut seen = BTreeSet::new();
        for _ in 0..25 {
            let p = f.create_pitch(&cfg, 1, &mut rng).unwrap();
            assert!(seen.insert(p.name));
        }
        assert_eq!(f.names().used_count(), 25);
        assert_eq!(
            f.create_pitch(&cfg, 1, &mut rng),
            Err(GameError::NameSpaceExhausted { combinations: 25 })
        );
    }

    #[test]
    fn reset_frees_the_namespace() {
        let cfg = GameConfig::default();
        let mut names = NameRegistry::from_config(&cfg);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..25 {
            names.generate(&mut rng).unwrap();
        }
        assert!(names.generate(&mut rng).is_err());
        names.reset();
        assert!(names.generate(&mut rng).is_ok());
    }

    #[test]
    fn duplicate_vocabulary_entries_collapse() {
        let p = vec!["Acme".to_string(), "Acme".to_string()];
        let s = vec!["Labs".to_string()];
        let names = NameRegistry::new(&p, &s);
        assert_eq!(names.capacity(), 1);
    }

    #[test]
    fn names_combine_prefix_and_suffix() {
        let cfg = GameConfig::default();
        let mut names = NameRegistry::from_config(&cfg);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let n = names.generate(&mut rng).unwrap();
        let (prefix, suffix) = n.split_once(' ').unwrap();
        assert!(cfg.name_prefixes.iter().any(|p| p == prefix));
        assert!(cfg.name_suffixes.iter().any(|s| s == suffix));
        assert!(names.is_used(&n));
    }

    #[test]
    fn round_without_tier_fails() {
        let cfg = GameConfig {
            beyond_final_round: BeyondFinalRound::Fail,
            ..GameConfig::default()
        };
        let mut f = factory(&cfg);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            f.create_pitch(&cfg, 4, &mut rng),
            Err(GameError::InvalidRoundTier { round: 4 })
        );
        assert_eq!(
            f.create_pitch(&cfg, 0, &mut rng),
            Err(GameError::InvalidRoundTier { round: 0 })
        );
        assert_eq!(f.names().used_count(), 0);
    }

    #[test]
    fn reused_final_tier_scales_like_series_c() {
        let cfg = GameConfig::default();
        let mut f = factory(&cfg);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let p = f.create_pitch(&cfg, 5, &mut rng).unwrap();
        assert!((1_000_000..5_000_000).contains(&p.investment_required));
        assert_eq!(p.goal, p.investment_required * 100);
    }

    proptest! {
        #[test]
        fn pitches_respect_tier_bounds(seed in any::<u64>(), round in 1u32..=3) {
            let cfg = GameConfig::default();
            let mut f = factory(&cfg);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tier = cfg.tier(round).unwrap().clone();
            let p = f.create_pitch(&cfg, round, &mut rng).unwrap();
            prop_assert!(p.investment_required >= tier.min_investment);
            prop_assert!(p.investment_required < tier.max_investment);
            prop_assert_eq!(p.goal, p.investment_required * tier.target_multiplier);
            prop_assert!(p.market_size < 1000);
            prop_assert!((1..=10).contains(&p.team_experience));
            prop_assert!((-50.0..50.0).contains(&p.financials));
        }
    }
}
