use serde::{Deserialize, Serialize};

use crate::recommend::types::ExamDistribution;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    /// 分类正确率低于此值视为薄弱
    pub weak_below: f64,
    /// 分类正确率高于此值视为擅长
    pub strong_above: f64,
    pub weak_cap: usize,
    pub strong_cap: usize,
    pub mastered_cap: usize,
    pub recent_topics_cap: usize,
    /// Completed sessions read per analysis.
    pub history_window: usize,
    pub hard_above: f64,
    pub easy_below: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            weak_below: 0.6,
            strong_above: 0.8,
            weak_cap: 5,
            strong_cap: 5,
            mastered_cap: 8,
            recent_topics_cap: 10,
            history_window: 20,
            hard_above: 0.8,
            easy_below: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyScores {
    pub weakness: f64,
    pub progressive: f64,
    pub review: f64,
    pub exploration: f64,
    pub fallback: f64,
}

impl Default for StrategyScores {
    fn default() -> Self {
        Self {
            weakness: 0.9,
            progressive: 0.8,
            review: 0.7,
            exploration: 0.6,
            fallback: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveConfig {
    /// Above this accuracy the window is {medium, hard}.
    pub harder_above: f64,
    /// Below this accuracy the window is {easy, medium}.
    pub easier_below: f64,
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            harder_above: 0.7,
            easier_below: 0.4,
        }
    }
}

/// 四类策略的整数百分比
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyMix {
    pub weakness: u32,
    pub progressive: u32,
    pub review: u32,
    pub exploration: u32,
}

impl StrategyMix {
    pub const fn new(weakness: u32, progressive: u32, review: u32, exploration: u32) -> Self {
        Self {
            weakness,
            progressive,
            review,
            exploration,
        }
    }

    /// `ceil(total * pct)` per bucket, computed in integers so that e.g.
    /// 30% of 10 is exactly 3. The sum is not renormalized.
    pub fn split(&self, total: usize) -> ExamDistribution {
        let part = |pct: u32| (total * pct as usize).div_ceil(100);
        ExamDistribution {
            weakness: part(self.weakness),
            progressive: part(self.progressive),
            review: part(self.review),
            exploration: part(self.exploration),
        }
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        for (field, pct) in [
            ("weakness", self.weakness),
            ("progressive", self.progressive),
            ("review", self.review),
            ("exploration", self.exploration),
        ] {
            if pct > 100 {
                return Err(format!("{name}.{field} must be in [0,100]"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfig {
    pub low_accuracy_below: f64,
    pub high_accuracy_above: f64,
    pub low_mix: StrategyMix,
    pub high_mix: StrategyMix,
    pub default_mix: StrategyMix,
    /// 评语阈值：高于为 excellent
    pub excellent_above: f64,
    /// 评语阈值：高于为 good
    pub good_above: f64,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            low_accuracy_below: 0.4,
            high_accuracy_above: 0.8,
            low_mix: StrategyMix::new(60, 30, 10, 0),
            high_mix: StrategyMix::new(20, 40, 20, 20),
            default_mix: StrategyMix::new(40, 30, 20, 10),
            excellent_above: 0.8,
            good_above: 0.6,
        }
    }
}

impl ExamConfig {
    pub fn mix_for(&self, accuracy: f64) -> StrategyMix {
        if accuracy < self.low_accuracy_below {
            self.low_mix
        } else if accuracy > self.high_accuracy_above {
            self.high_mix
        } else {
            self.default_mix
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathScoringConfig {
    pub base_score: f64,
    pub difficulty_weight: f64,
    pub weakness_weight: f64,
    pub interest_weight: f64,
    pub prerequisite_weight: f64,
    /// 每差一级难度扣分
    pub difficulty_step_penalty: f64,
    pub popularity_divisor: f64,
    pub popularity_cap: f64,
    /// Paths scoring at or below this are dropped.
    pub min_score: f64,
    /// Score used when a fraction has no denominator.
    pub neutral_fraction: f64,
    pub default_max_paths: usize,
    pub max_match_reasons: usize,
}

impl Default for PathScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 0.5,
            difficulty_weight: 0.25,
            weakness_weight: 0.3,
            interest_weight: 0.2,
            prerequisite_weight: 0.15,
            difficulty_step_penalty: 0.3,
            popularity_divisor: 100.0,
            popularity_cap: 0.1,
            min_score: 0.3,
            neutral_fraction: 0.5,
            default_max_paths: 5,
            max_match_reasons: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePointConfig {
    pub default_count: usize,
    pub default_estimated_time_mins: u32,
}

impl Default for KnowledgePointConfig {
    fn default() -> Self {
        Self {
            default_count: 10,
            default_estimated_time_mins: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommenderConfig {
    pub profile: ProfileConfig,
    pub scores: StrategyScores,
    #[serde(default)]
    pub progressive: ProgressiveConfig,
    pub smart_mix: StrategyMix,
    pub exam: ExamConfig,
    #[serde(default)]
    pub paths: PathScoringConfig,
    #[serde(default)]
    pub knowledge_points: KnowledgePointConfig,
    pub default_count: usize,
    pub max_count: usize,
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            profile: ProfileConfig::default(),
            scores: StrategyScores::default(),
            progressive: ProgressiveConfig::default(),
            smart_mix: StrategyMix::new(40, 30, 20, 10),
            exam: ExamConfig::default(),
            paths: PathScoringConfig::default(),
            knowledge_points: KnowledgePointConfig::default(),
            default_count: 10,
            max_count: 100,
            metrics_enabled: true,
        }
    }
}

impl RecommenderConfig {
    pub fn from_env(env_config: &crate::config::RecommendEnvConfig) -> Self {
        let mut config = Self::default();
        config.profile.history_window = env_config.history_window;
        config.default_count = env_config.default_count;
        config.max_count = env_config.max_count;
        config.metrics_enabled = env_config.metrics_enabled;
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        let unit = |v: f64| (0.0..=1.0).contains(&v);

        let p = &self.profile;
        if !unit(p.weak_below) || !unit(p.strong_above) {
            return Err("profile thresholds must be in [0,1]".to_string());
        }
        if p.weak_below > p.strong_above {
            return Err("profile.weak_below must not exceed profile.strong_above".to_string());
        }
        if !unit(p.easy_below) || !unit(p.hard_above) || p.easy_below > p.hard_above {
            return Err("invalid preferred difficulty bands".to_string());
        }
        if p.history_window == 0 {
            return Err("profile.history_window must be > 0".to_string());
        }

        let s = &self.scores;
        if ![s.weakness, s.progressive, s.review, s.exploration, s.fallback]
            .into_iter()
            .all(unit)
        {
            return Err("strategy scores must be in [0,1]".to_string());
        }

        if !unit(self.progressive.easier_below)
            || !unit(self.progressive.harder_above)
            || self.progressive.easier_below > self.progressive.harder_above
        {
            return Err("invalid progressive difficulty window".to_string());
        }

        self.smart_mix.validate("smart_mix")?;
        let e = &self.exam;
        e.low_mix.validate("exam.low_mix")?;
        e.high_mix.validate("exam.high_mix")?;
        e.default_mix.validate("exam.default_mix")?;
        if !unit(e.low_accuracy_below)
            || !unit(e.high_accuracy_above)
            || e.low_accuracy_below > e.high_accuracy_above
        {
            return Err("invalid exam accuracy bands".to_string());
        }

        let w = &self.paths;
        if [
            w.base_score,
            w.difficulty_weight,
            w.weakness_weight,
            w.interest_weight,
            w.prerequisite_weight,
            w.difficulty_step_penalty,
            w.popularity_cap,
        ]
        .into_iter()
        .any(|v| !v.is_finite() || v < 0.0)
        {
            return Err("path scoring weights must be non-negative".to_string());
        }
        if w.popularity_divisor <= 0.0 {
            return Err("paths.popularity_divisor must be > 0".to_string());
        }
        if !unit(w.min_score) || !unit(w.neutral_fraction) {
            return Err("paths.min_score and paths.neutral_fraction must be in [0,1]".to_string());
        }

        if self.default_count == 0 || self.default_count > self.max_count {
            return Err("default_count must be in [1, max_count]".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RecommenderConfig::default().validate().is_ok());
    }

    #[test]
    fn split_rounds_up_each_bucket() {
        let d = StrategyMix::new(60, 30, 10, 0).split(20);
        assert_eq!((d.weakness, d.progressive, d.review, d.exploration), (12, 6, 2, 0));

        let d = StrategyMix::new(40, 30, 20, 10).split(10);
        assert_eq!((d.weakness, d.progressive, d.review, d.exploration), (4, 3, 2, 1));

        // 7 * 40% = 2.8 -> 3, 7 * 10% = 0.7 -> 1; the sum overshoots
        let d = StrategyMix::new(40, 30, 20, 10).split(7);
        assert_eq!((d.weakness, d.progressive, d.review, d.exploration), (3, 3, 2, 1));
        assert_eq!(d.total(), 9);
    }

    #[test]
    fn exam_mix_bands() {
        let e = ExamConfig::default();
        assert_eq!(e.mix_for(0.35), e.low_mix);
        assert_eq!(e.mix_for(0.4), e.default_mix);
        assert_eq!(e.mix_for(0.8), e.default_mix);
        assert_eq!(e.mix_for(0.81), e.high_mix);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut cfg = RecommenderConfig::default();
        cfg.profile.weak_below = 0.9;
        assert!(cfg.validate().is_err());

        let mut cfg = RecommenderConfig::default();
        cfg.smart_mix.review = 150;
        assert!(cfg.validate().is_err());

        let mut cfg = RecommenderConfig::default();
        cfg.default_count = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let mut value = serde_json::to_value(RecommenderConfig::default()).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("paths");
        obj.remove("knowledgePoints");
        obj.remove("metricsEnabled");
        let cfg: RecommenderConfig = serde_json::from_value(value).unwrap();
        assert_eq!(cfg.paths, PathScoringConfig::default());
        assert!(cfg.metrics_enabled);
    }
}
