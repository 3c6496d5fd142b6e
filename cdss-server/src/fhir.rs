//! FHIR prefetch resources and their rendering into a guideline question.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The subset of a FHIR `Patient` the query uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub code: Option<CodeableConcept>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    #[serde(default)]
    pub medication_codeable_concept: Option<CodeableConcept>,
}

/// A FHIR search-set bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de> + Default"))]
pub struct Bundle<R> {
    #[serde(default)]
    pub entry: Vec<BundleEntry<R>>,
}

impl<R> Default for Bundle<R> {
    fn default() -> Self {
        Self { entry: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de> + Default"))]
pub struct BundleEntry<R> {
    #[serde(default)]
    pub resource: R,
}

/// Prefetched resources keyed as in the service's discovery manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prefetch {
    #[serde(default)]
    pub patient: Option<Patient>,
    #[serde(default)]
    pub conditions: Option<Bundle<Condition>>,
    #[serde(default)]
    pub medications: Option<Bundle<MedicationRequest>>,
}

/// Whole years between a FHIR `birthDate` (`YYYY-MM-DD`) and `today`.
///
/// Partial dates, malformed dates and future dates have no age.
pub fn age_on(birth_date: &str, today: NaiveDate) -> Option<u32> {
    let birth = NaiveDate::parse_from_str(birth_date.trim(), "%Y-%m-%d").ok()?;
    today.years_since(birth)
}

/// Render prefetched patient context as a question for the guideline graph.
pub fn format_query_from_fhir(prefetch: &Prefetch, today: NaiveDate) -> String {
    let patient = prefetch.patient.clone().unwrap_or_default();
    let gender = patient.gender.as_deref().map(str::trim).filter(|g| !g.is_empty());
    let age = patient.birth_date.as_deref().and_then(|b| age_on(b, today));
    let patient_summary = match (age, gender) {
        (Some(age), Some(gender)) => format!("A {age}-year-old {gender} patient"),
        (Some(age), None) => format!("A {age}-year-old patient of unknown gender"),
        (None, Some(gender)) => format!("A {gender} patient of an unknown age"),
        (None, None) => "A patient of an unknown age and unknown gender".to_string(),
    };

    let conditions: Vec<&str> = prefetch
        .conditions
        .iter()
        .flat_map(|bundle| &bundle.entry)
        .map(|entry| {
            entry
                .resource
                .code
                .as_ref()
                .and_then(|code| code.text.as_deref())
                .unwrap_or("unspecified condition")
        })
        .collect();
    let medications: Vec<&str> = prefetch
        .medications
        .iter()
        .flat_map(|bundle| &bundle.entry)
        .map(|entry| {
            entry
                .resource
                .medication_codeable_concept
                .as_ref()
                .and_then(|concept| concept.text.as_deref())
                .unwrap_or("unspecified medication")
        })
        .collect();

    let conditions_summary = if conditions.is_empty() {
        "none listed".to_string()
    } else {
        conditions.join(", ")
    };
    let medications_summary = if medications.is_empty() {
        "no active medications".to_string()
    } else {
        medications.join(", ")
    };

    format!(
        "Based on the 2022 AHA/ACC/HFSA guidelines, what are the key recommendations for managing \
         heart failure in the following clinical scenario? \n\n\
         **Patient Profile:** {patient_summary} with diagnoses including: {conditions_summary} \
         and is currently prescribed: {medications_summary}. \n\n\
         Please provide a concise, evidence-based summary."
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn age_counts_completed_years() {
        assert_eq!(age_on("1957-06-15", today()), Some(67));
        assert_eq!(age_on("1957-06-16", today()), Some(66));
        assert_eq!(age_on("1957", today()), None);
        assert_eq!(age_on("2030-01-01", today()), None);
    }

    #[test]
    fn formats_a_full_prefetch() {
        let prefetch: Prefetch = serde_json::from_value(json!({
            "patient": {"resourceType": "Patient", "birthDate": "1957-03-02", "gender": "male"},
            "conditions": {"resourceType": "Bundle", "entry": [
                {"resource": {"resourceType": "Condition", "code": {"text": "Heart failure with reduced ejection fraction"}}},
                {"resource": {"resourceType": "Condition", "code": {"coding": []}}}
            ]},
            "medications": {"resourceType": "Bundle", "entry": [
                {"resource": {"medicationCodeableConcept": {"text": "Sacubitril/valsartan 49/51 mg"}}},
                {"resource": {"medicationCodeableConcept": {"text": "Carvedilol 25 mg"}}}
            ]}
        }))
        .unwrap();

        let query = format_query_from_fhir(&prefetch, today());
        assert!(query.starts_with("Based on the 2022 AHA/ACC/HFSA guidelines"));
        assert!(query.contains(
            "**Patient Profile:** A 67-year-old male patient with diagnoses including: \
             Heart failure with reduced ejection fraction, unspecified condition and is currently \
             prescribed: Sacubitril/valsartan 49/51 mg, Carvedilol 25 mg. \n\n"
        ));
        assert!(query.ends_with("Please provide a concise, evidence-based summary."));
    }

    #[test]
    fn missing_resources_use_placeholders() {
        let query = format_query_from_fhir(&Prefetch::default(), today());
        assert!(query.contains(
            "A patient of an unknown age and unknown gender with diagnoses including: none \
             listed and is currently prescribed: no active medications."
        ));

        let prefetch = Prefetch {
            patient: Some(Patient { birth_date: Some("1950".into()), gender: Some("female".into()) }),
            ..Prefetch::default()
        };
        assert!(format_query_from_fhir(&prefetch, today()).contains("A female patient of an unknown age"));
    }
}
