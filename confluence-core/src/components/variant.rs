//! Strategy variants.
//!
//! One parameterized strategy, three presets. The variant decides which
//! confirmations an entry must satisfy; the thresholds themselves always come
//! from [`Options`].

use serde::{Deserialize, Serialize};

use super::confirmation::{ConfirmationKind, Confirmations};
use crate::domain::Direction;
use crate::options::Options;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyVariant {
    /// Trend-following: DMI/ADX required, stochastic ignored.
    Trending,
    /// Mean-reverting: stochastic required, DMI ignored, no pre-cross.
    Ranging,
    /// Full confluence: optional confirmations follow `use_stoch` / `use_dmi`.
    #[default]
    Confluence,
}

/// Which confirmations gate an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    pub volume: bool,
    pub volatility: bool,
    pub stochastic: bool,
    pub dmi: bool,
    pub pre_cross: bool,
}

impl StrategyVariant {
    pub fn requirements(self, opts: &Options) -> Requirements {
        match self {
            StrategyVariant::Trending => Requirements {
                volume: true,
                volatility: true,
                stochastic: false,
                dmi: true,
                pre_cross: opts.enable_pre_cross,
            },
            StrategyVariant::Ranging => Requirements {
                volume: true,
                volatility: true,
                stochastic: true,
                dmi: false,
                pre_cross: false,
            },
            StrategyVariant::Confluence => Requirements {
                volume: true,
                volatility: true,
                stochastic: opts.use_stoch,
                dmi: opts.use_dmi,
                pre_cross: opts.enable_pre_cross,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyVariant::Trending => "trending",
            StrategyVariant::Ranging => "ranging",
            StrategyVariant::Confluence => "confluence",
        }
    }
}

impl Requirements {
    /// Required confirmations that did not hold. Empty means the entry may fire.
    ///
    /// The volume requirement is met by either a spike or, for shorts, the
    /// grind-down exception.
    pub fn missing(&self, direction: Direction, c: &Confirmations) -> Vec<ConfirmationKind> {
        let mut missing = Vec::new();
        let volume_ok = c.volume || (direction == Direction::Short && c.short_grind);
        if self.volume && !volume_ok {
            missing.push(ConfirmationKind::Volume);
        }
        if self.volatility && !c.volatility {
            missing.push(ConfirmationKind::Volatility);
        }
        if self.stochastic && !c.stochastic {
            missing.push(ConfirmationKind::Stochastic);
        }
        if self.dmi && !c.dmi {
            missing.push(ConfirmationKind::Dmi);
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_true() -> Confirmations {
        Confirmations {
            volume: true,
            short_grind: false,
            volatility: true,
            stochastic: true,
            dmi: true,
        }
    }

    #[test]
    fn serde_names_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&StrategyVariant::Trending).unwrap(),
            "\"trending\""
        );
        let v: StrategyVariant = serde_json::from_str("\"ranging\"").unwrap();
        assert_eq!(v, StrategyVariant::Ranging);
        assert_eq!(StrategyVariant::default(), StrategyVariant::Confluence);
    }

    #[test]
    fn confluence_follows_toggles() {
        let opts = Options::default();
        let req = StrategyVariant::Confluence.requirements(&opts);
        assert!(!req.stochastic && !req.dmi);

        let opts = Options {
            use_stoch: true,
            use_dmi: true,
            ..Options::default()
        };
        let req = StrategyVariant::Confluence.requirements(&opts);
        assert!(req.stochastic && req.dmi);
    }

    #[test]
    fn trending_and_ranging_presets() {
        let opts = Options::default();
        let trending = StrategyVariant::Trending.requirements(&opts);
        assert!(trending.dmi && !trending.stochastic && trending.pre_cross);

        let ranging = StrategyVariant::Ranging.requirements(&opts);
        assert!(ranging.stochastic && !ranging.dmi && !ranging.pre_cross);
    }

    #[test]
    fn missing_lists_failed_requirements() {
        let req = StrategyVariant::Trending.requirements(&Options::default());
        let mut c = all_true();
        assert!(req.missing(Direction::Long, &c).is_empty());

        c.dmi = false;
        c.volume = false;
        // Stochastic is not required by Trending, so it never shows up.
        c.stochastic = false;
        assert_eq!(
            req.missing(Direction::Long, &c),
            vec![ConfirmationKind::Volume, ConfirmationKind::Dmi]
        );
    }

    #[test]
    fn grind_satisfies_volume_for_shorts_only() {
        let req = StrategyVariant::Confluence.requirements(&Options::default());
        let c = Confirmations {
            volume: false,
            short_grind: true,
            ..all_true()
        };
        assert!(req.missing(Direction::Short, &c).is_empty());
        assert_eq!(req.missing(Direction::Long, &c), vec![ConfirmationKind::Volume]);
    }
}
