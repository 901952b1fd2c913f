use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Raw row of the `resumes` table. The document itself lives in `data`.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: String,
    pub user_id: String,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

/// Read-only snapshot of a user's resume as edited in the builder.
///
/// Every field defaults so that partially filled documents still deserialize;
/// absent optional text renders as an empty string, never as "null".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeDocument {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub experiences: Vec<Experience>,
    pub projects: Vec<Project>,
    pub education: Vec<Education>,
    pub skills: Vec<Skill>,
    pub certifications: Vec<Certification>,
    pub languages: Vec<Language>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub company: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub bullet_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub name: Option<String>,
    pub role: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub bullet_points: Vec<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    pub name: String,
    pub proficiency: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    pub name: String,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Language {
    pub language: String,
    pub proficiency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sparse_document_deserializes_with_defaults() {
        let doc: ResumeDocument = serde_json::from_value(json!({
            "name": "Ada Lovelace",
            "experiences": [{
                "company": "Analytical Engines",
                "bulletPoints": ["Wrote the first program"]
            }]
        }))
        .unwrap();

        assert_eq!(doc.name, "Ada Lovelace");
        assert_eq!(doc.title, None);
        assert_eq!(doc.experiences.len(), 1);
        assert_eq!(doc.experiences[0].position, None);
        assert_eq!(doc.experiences[0].bullet_points, vec!["Wrote the first program"]);
        assert!(doc.skills.is_empty());
    }

    #[test]
    fn test_null_fields_deserialize_as_none() {
        let doc: ResumeDocument =
            serde_json::from_value(json!({"name": "X", "summary": null})).unwrap();
        assert_eq!(doc.summary, None);
    }
}
