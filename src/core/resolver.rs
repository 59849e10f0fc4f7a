//! Identity Resolver: classification → no identity / guest / VIP
//!
//! The rule table is a stand-in for real face matching. Callers only see
//! the `IdentityResolver` trait so a biometric matcher can replace it.

use serde::{Deserialize, Serialize};
use crate::types::{Classification, Detection, Gender, Owner, VipId};

/// Maps one detection to an owner
pub trait IdentityResolver: Send + Sync {
    /// `None` when nobody is in view
    fn resolve(&self, detection: &Detection) -> Option<Owner>;
}

/// `(min_age..=max_age, gender) → vip_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipRule {
    pub vip_id: VipId,
    pub gender: Gender,
    pub min_age: u32,
    /// Open-ended when absent
    #[serde(default)]
    pub max_age: Option<u32>,
}

impl VipRule {
    pub fn new(vip_id: u32, gender: Gender, min_age: u32, max_age: Option<u32>) -> Self {
        Self {
            vip_id: VipId(vip_id),
            gender,
            min_age,
            max_age,
        }
    }

    pub fn matches(&self, c: &Classification) -> bool {
        c.gender == self.gender
            && c.age >= self.min_age
            && self.max_age.map_or(true, |max| c.age <= max)
    }

    /// Could one classification match both rules?
    pub fn overlaps(&self, other: &VipRule) -> bool {
        if self.gender != other.gender {
            return false;
        }
        let self_max = self.max_age.unwrap_or(u32::MAX);
        let other_max = other.max_age.unwrap_or(u32::MAX);
        self.min_age <= other_max && other.min_age <= self_max
    }
}

/// Ordered rule table, first match wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<VipRule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RuleTable {
    /// Table order is significant and is kept as given
    pub fn new(rules: Vec<VipRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[VipRule] {
        &self.rules
    }

    /// Index pairs of rules that overlap (a configuration error; the
    /// earlier rule still wins)
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.rules.iter().enumerate() {
            for (j, b) in self.rules.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    fn lookup(&self, c: &Classification) -> Option<VipId> {
        self.rules.iter().find(|r| r.matches(c)).map(|r| r.vip_id)
    }
}

impl IdentityResolver for RuleTable {
    fn resolve(&self, detection: &Detection) -> Option<Owner> {
        match detection {
            Detection::NoFace => None,
            Detection::Face(c) => Some(match self.lookup(c) {
                Some(id) => Owner::Vip(id),
                None => Owner::Guest,
            }),
        }
    }
}

/// The kiosk's built-in age/gender buckets
pub fn default_rules() -> Vec<VipRule> {
    vec![
        VipRule::new(1, Gender::Male, 20, Some(25)),
        VipRule::new(2, Gender::Female, 26, Some(30)),
        VipRule::new(3, Gender::Male, 31, Some(35)),
        VipRule::new(4, Gender::Female, 36, Some(40)),
        VipRule::new(5, Gender::Male, 41, Some(45)),
        VipRule::new(6, Gender::Female, 46, Some(50)),
        VipRule::new(7, Gender::Male, 51, None),
    ]
}
