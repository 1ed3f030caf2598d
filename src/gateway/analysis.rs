//! Structured analysis results and the schemas requested from the provider

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Outcome of the analysis call; produced once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub theme: String,
    pub insight: String,
    pub recommendation: Recommendation,
}

/// What the analysis recommends as the next step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    /// A single peer-support circle led by a therapist
    Group(GroupMatch),
    /// Ranked individual therapist matches
    Therapists {
        matches: Vec<TherapistMatch>,
        suggested_action: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMatch {
    pub id: String,
    pub theme: String,
    pub focus: String,
    pub description: String,
    pub therapist: Therapist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Therapist {
    pub name: String,
    pub image_url: String,
    pub credentials: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistMatch {
    pub name: String,
    pub specialty: String,
    pub match_score: f64,
    pub description: String,
    pub image_url: String,
}

/// Which result shape the provider is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisVariant {
    #[default]
    GroupMatch,
    TherapistList,
}

impl AnalysisVariant {
    /// Response schema in the provider's OpenAPI subset
    pub fn schema(self) -> Value {
        match self {
            AnalysisVariant::GroupMatch => json!({
                "type": "OBJECT",
                "properties": {
                    "summary": { "type": "STRING" },
                    "theme": { "type": "STRING" },
                    "insight": { "type": "STRING" },
                    "groupMatch": {
                        "type": "OBJECT",
                        "properties": {
                            "id": { "type": "STRING" },
                            "theme": { "type": "STRING" },
                            "focus": { "type": "STRING" },
                            "description": { "type": "STRING" },
                            "therapist": {
                                "type": "OBJECT",
                                "properties": {
                                    "name": { "type": "STRING" },
                                    "imageUrl": { "type": "STRING" },
                                    "credentials": { "type": "STRING" }
                                },
                                "required": ["name", "imageUrl", "credentials"]
                            }
                        },
                        "required": ["id", "theme", "focus", "description", "therapist"]
                    }
                },
                "required": ["summary", "theme", "insight", "groupMatch"]
            }),
            AnalysisVariant::TherapistList => json!({
                "type": "OBJECT",
                "properties": {
                    "summary": { "type": "STRING" },
                    "theme": { "type": "STRING" },
                    "insight": { "type": "STRING" },
                    "matches": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": { "type": "STRING" },
                                "specialty": { "type": "STRING" },
                                "matchScore": { "type": "NUMBER" },
                                "description": { "type": "STRING" },
                                "imageUrl": { "type": "STRING" }
                            },
                            "required": ["name", "specialty", "matchScore", "description", "imageUrl"]
                        }
                    },
                    "suggestedAction": { "type": "STRING" }
                },
                "required": ["summary", "theme", "insight", "matches", "suggestedAction"]
            }),
        }
    }

    /// Parse a provider response body into a result of this variant.
    ///
    /// Returns a human-readable reason on failure; the caller wraps it into
    /// the gateway's malformed-response error.
    pub fn parse(self, body: &str) -> Result<AnalysisResult, String> {
        match self {
            AnalysisVariant::GroupMatch => {
                let wire: GroupMatchWire =
                    serde_json::from_str(body.trim()).map_err(|e| e.to_string())?;
                Ok(AnalysisResult {
                    summary: wire.summary,
                    theme: wire.theme,
                    insight: wire.insight,
                    recommendation: Recommendation::Group(wire.group_match),
                })
            }
            AnalysisVariant::TherapistList => {
                let wire: TherapistListWire =
                    serde_json::from_str(body.trim()).map_err(|e| e.to_string())?;
                if wire.matches.is_empty() {
                    return Err("analysis contained no therapist matches".to_string());
                }
                Ok(AnalysisResult {
                    summary: wire.summary,
                    theme: wire.theme,
                    insight: wire.insight,
                    recommendation: Recommendation::Therapists {
                        matches: wire.matches,
                        suggested_action: wire.suggested_action,
                    },
                })
            }
        }
    }
}

impl FromStr for AnalysisVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "group" | "group_match" => Ok(AnalysisVariant::GroupMatch),
            "therapists" | "therapist_list" => Ok(AnalysisVariant::TherapistList),
            other => Err(format!("unknown analysis variant: {other}")),
        }
    }
}

impl fmt::Display for AnalysisVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisVariant::GroupMatch => f.write_str("group"),
            AnalysisVariant::TherapistList => f.write_str("therapists"),
        }
    }
}

// Wire shapes, as produced by the provider

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupMatchWire {
    summary: String,
    theme: String,
    insight: String,
    group_match: GroupMatch,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TherapistListWire {
    summary: String,
    theme: String,
    insight: String,
    matches: Vec<TherapistMatch>,
    suggested_action: String,
}
