//! CDS Hooks discovery and card types for the guideline service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fhir::Prefetch;

pub const SERVICE_ID: &str = "heart-failure-guideline";
pub const GUIDELINE_LABEL: &str = "2022 AHA/ACC/HFSA Guideline for HF Management";
pub const GUIDELINE_URL: &str = "https://hfsa.org/hfguidelines2022";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub services: Vec<ServiceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub hook: String,
    pub title: String,
    pub description: String,
    pub prefetch: BTreeMap<String, String>,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    #[serde(rename = "type")]
    pub kind: String,
    pub level: String,
}

/// A `POST /cds-services/{id}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRequest {
    pub hook: String,
    pub hook_instance: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub prefetch: Prefetch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResponse {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub summary: String,
    pub indicator: Indicator,
    pub detail: String,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The manifest served at `GET /cds-services`.
pub fn discovery() -> Discovery {
    let prefetch = BTreeMap::from([
        ("patient".to_string(), "Patient/{{context.patientId}}".to_string()),
        ("conditions".to_string(), "Condition?patient={{context.patientId}}".to_string()),
        ("medications".to_string(), "MedicationRequest?patient={{context.patientId}}".to_string()),
    ]);
    Discovery {
        services: vec![ServiceDescriptor {
            id: SERVICE_ID.to_string(),
            hook: "patient-view".to_string(),
            title: "Heart Failure Guideline Support".to_string(),
            description: "Provides clinical guidance for Heart Failure management based on the \
                          2022 AHA/ACC/HFSA guidelines."
                .to_string(),
            prefetch,
            access: Access { kind: "patient".to_string(), level: "read".to_string() },
        }],
    }
}

/// An informational card carrying `detail`, linking to the chat front end
/// when one is configured.
pub fn guideline_card(detail: impl Into<String>, frontend_url: Option<&str>) -> Card {
    let links = frontend_url
        .filter(|url| !url.trim().is_empty())
        .map(|url| Link {
            label: "Open Full CDSS Chatbot".to_string(),
            url: url.to_string(),
            kind: "absolute".to_string(),
        })
        .into_iter()
        .collect();
    Card {
        summary: "Heart Failure Guideline Recommendation".to_string(),
        indicator: Indicator::Info,
        detail: detail.into(),
        source: Source { label: GUIDELINE_LABEL.to_string(), url: GUIDELINE_URL.to_string() },
        links,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn discovery_serializes_as_cds_hooks_manifest() {
        let value = serde_json::to_value(discovery()).unwrap();
        let service = &value["services"][0];
        assert_eq!(service["id"], SERVICE_ID);
        assert_eq!(service["hook"], "patient-view");
        assert_eq!(service["prefetch"]["medications"], "MedicationRequest?patient={{context.patientId}}");
        assert_eq!(service["access"], json!({"type": "patient", "level": "read"}));
    }

    #[test]
    fn card_links_only_when_frontend_configured() {
        let card = serde_json::to_value(guideline_card("GDMT.", Some("https://cdss.example"))).unwrap();
        assert_eq!(card["indicator"], "info");
        assert_eq!(card["links"][0]["type"], "absolute");
        assert_eq!(card["source"]["url"], GUIDELINE_URL);

        let card = serde_json::to_value(guideline_card("GDMT.", None)).unwrap();
        assert!(card.get("links").is_none());
    }

    #[test]
    fn hook_request_tolerates_missing_prefetch() {
        let request: HookRequest = serde_json::from_value(json!({
            "hook": "patient-view",
            "hookInstance": "d1577c69-dfbe-44ad-ba6d-3e05e953b2ea",
            "context": {"patientId": "1288992"}
        }))
        .unwrap();
        assert_eq!(request.prefetch, Prefetch::default());
        assert_eq!(request.context["patientId"], "1288992");
    }
}
