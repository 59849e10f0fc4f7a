//! Identity types: what the recognition service reports and who we think it is

use serde::{Deserialize, Serialize};

/// Gender as reported by the recognition service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(alias = "male", alias = "MALE", alias = "Man", alias = "man")]
    Male,
    #[serde(alias = "female", alias = "FEMALE", alias = "Woman", alias = "woman")]
    Female,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" | "m" | "man" => Ok(Gender::Male),
            "female" | "f" | "woman" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

/// Face bounding box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceCoords {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One successful classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub gender: Gender,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_coords: Option<FaceCoords>,
}

impl Classification {
    pub fn new(gender: Gender, age: u32) -> Self {
        Self {
            gender,
            age,
            confidence: None,
            face_coords: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Result of one sampling tick
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Face(Classification),
    NoFace,
}

impl Detection {
    /// Shorthand for a face with no confidence or coordinates
    pub fn face(gender: Gender, age: u32) -> Self {
        Detection::Face(Classification::new(gender, age))
    }

    pub fn classification(&self) -> Option<&Classification> {
        match self {
            Detection::Face(c) => Some(c),
            Detection::NoFace => None,
        }
    }
}

/// Stable identifier of a known (VIP) subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VipId(pub u32);

impl std::fmt::Display for VipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who owns a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    Vip(VipId),
    Guest,
}

impl Owner {
    pub fn vip_id(&self) -> Option<VipId> {
        match self {
            Owner::Vip(id) => Some(*id),
            Owner::Guest => None,
        }
    }

    pub fn kind(&self) -> OwnerKind {
        match self {
            Owner::Vip(_) => OwnerKind::Vip,
            Owner::Guest => OwnerKind::Guest,
        }
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Owner::Vip(id) => write!(f, "VIP {}", id),
            Owner::Guest => write!(f, "Guest"),
        }
    }
}

/// Owner category exposed to the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// Nobody has been seen yet (or the active VIP was cleared)
    Idle,
    Guest,
    Vip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_deserializes_any_case() {
        let g: Gender = serde_json::from_str("\"male\"").unwrap();
        assert_eq!(g, Gender::Male);
        let g: Gender = serde_json::from_str("\"Female\"").unwrap();
        assert_eq!(g, Gender::Female);
    }

    #[test]
    fn test_gender_from_str() {
        assert_eq!("M".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("woman".parse::<Gender>().unwrap(), Gender::Female);
        assert!("robot".parse::<Gender>().is_err());
    }

    #[test]
    fn test_owner_serialization() {
        let json = serde_json::to_string(&Owner::Vip(VipId(3))).unwrap();
        assert_eq!(json, r#"{"kind":"vip","id":3}"#);
        let json = serde_json::to_string(&Owner::Guest).unwrap();
        assert_eq!(json, r#"{"kind":"guest"}"#);
    }
}
