use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MIN_OPERAND: u32 = 1;
pub const MAX_OPERAND: u32 = 9;

/// A single multiplication problem shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub a: u32,
    pub b: u32,
    pub answer: u32,
}

impl Question {
    pub fn new(a: u32, b: u32) -> Self {
        Self { a, b, answer: a * b }
    }

    /// Operands in range and the stored answer matches their product.
    /// Snapshots come from disk, so restored questions are checked before use.
    pub fn is_valid(&self) -> bool {
        let range = MIN_OPERAND..=MAX_OPERAND;
        range.contains(&self.a) && range.contains(&self.b) && self.answer == self.a * self.b
    }
}

/// Draw a fresh question with both operands uniform in 1..=9
pub fn generate_question<R: Rng + ?Sized>(rng: &mut R) -> Question {
    let a = rng.gen_range(MIN_OPERAND..=MAX_OPERAND);
    let b = rng.gen_range(MIN_OPERAND..=MAX_OPERAND);
    Question::new(a, b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum GemKind {
    #[strum(to_string = "Ruby")]
    RubySmall,
    #[strum(to_string = "Topaz")]
    TopazSmall,
    #[strum(to_string = "Sapphire")]
    SapphireSmall,
}

impl GemKind {
    pub const ALL: [GemKind; 3] = [GemKind::RubySmall, GemKind::TopazSmall, GemKind::SapphireSmall];
}

/// Pick the reward for a finished session, uniform over all gem kinds
pub fn pick_gem<R: Rng + ?Sized>(rng: &mut R) -> GemKind {
    *GemKind::ALL
        .choose(rng)
        .unwrap_or(&GemKind::RubySmall)
}

/// Collected gems, keyed the same way they are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemCount {
    pub ruby_small: u32,
    pub topaz_small: u32,
    pub sapphire_small: u32,
}

impl GemCount {
    pub fn get(&self, kind: GemKind) -> u32 {
        match kind {
            GemKind::RubySmall => self.ruby_small,
            GemKind::TopazSmall => self.topaz_small,
            GemKind::SapphireSmall => self.sapphire_small,
        }
    }

    pub fn with_added(mut self, kind: GemKind) -> Self {
        let slot = match kind {
            GemKind::RubySmall => &mut self.ruby_small,
            GemKind::TopazSmall => &mut self.topaz_small,
            GemKind::SapphireSmall => &mut self.sapphire_small,
        };
        *slot = slot.saturating_add(1);
        self
    }

    pub fn total(&self) -> u32 {
        GemKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_generate_question_in_range() {
        let mut rng = rand::thread_rng();

        for _ in 0..1000 {
            let q = generate_question(&mut rng);
            assert!((1..=9).contains(&q.a));
            assert!((1..=9).contains(&q.b));
            assert_eq!(q.answer, q.a * q.b);
            assert!(q.is_valid());
        }
    }

    #[test]
    fn test_generate_question_covers_all_operands() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();

        for _ in 0..1000 {
            seen.insert(generate_question(&mut rng).a);
        }

        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn test_question_validity() {
        assert!(Question::new(2, 3).is_valid());
        assert!(!Question::new(0, 3).is_valid());
        assert!(!Question::new(10, 3).is_valid());
        assert!(!Question { a: 2, b: 3, answer: 7 }.is_valid());
    }

    #[test]
    fn test_pick_gem_reaches_every_kind() {
        let mut rng = StdRng::seed_from_u64(42);
        let picked: HashSet<GemKind> = (0..300).map(|_| pick_gem(&mut rng)).collect();

        assert_eq!(picked.len(), GemKind::ALL.len());
    }

    #[test]
    fn test_gem_kind_serde_names() {
        assert_eq!(serde_json::to_string(&GemKind::RubySmall).unwrap(), "\"ruby_small\"");
        assert_eq!(serde_json::to_string(&GemKind::TopazSmall).unwrap(), "\"topaz_small\"");
        assert_eq!(
            serde_json::to_string(&GemKind::SapphireSmall).unwrap(),
            "\"sapphire_small\""
        );
    }

    #[test]
    fn test_gem_kind_display() {
        assert_eq!(GemKind::RubySmall.to_string(), "Ruby");
        assert_eq!(GemKind::TopazSmall.to_string(), "Topaz");
        assert_eq!(GemKind::SapphireSmall.to_string(), "Sapphire");
    }

    #[test]
    fn test_gem_count_with_added() {
        let counts = GemCount {
            ruby_small: 2,
            topaz_small: 0,
            sapphire_small: 1,
        };

        let updated = counts.with_added(GemKind::RubySmall);

        assert_eq!(updated.ruby_small, 3);
        assert_eq!(updated.topaz_small, 0);
        assert_eq!(updated.sapphire_small, 1);
        assert_eq!(updated.total(), 4);
        // input untouched
        assert_eq!(counts.ruby_small, 2);
    }

    #[test]
    fn test_gem_count_partial_json_defaults_missing_fields() {
        let counts: GemCount = serde_json::from_str(r#"{"topaz_small": 4}"#).unwrap();
        assert_eq!(
            counts,
            GemCount {
                ruby_small: 0,
                topaz_small: 4,
                sapphire_small: 0
            }
        );
    }
}
