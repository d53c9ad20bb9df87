// src/profile/models.rs

use serde::{Deserialize, Serialize};

use crate::db::SqlParam;

// ============================================================================
// Profile Columns
// ============================================================================

/// Allow-list of updatable profile columns. Column names in UPDATE statements
/// only ever come from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    AgeRange,
    EducationLevel,
    FieldOfStudy,
    PrimaryInterests,
    SecondaryInterests,
    Hobbies,
    TopicsToAvoid,
    PreferredComplexity,
    PreferredArticleLength,
    NewsFrequency,
    PreferredContentTypes,
    PoliticalOrientation,
    CredibilityThreshold,
}

impl ProfileField {
    pub const ALL: [ProfileField; 14] = [
        ProfileField::Name,
        ProfileField::AgeRange,
        ProfileField::EducationLevel,
        ProfileField::FieldOfStudy,
        ProfileField::PrimaryInterests,
        ProfileField::SecondaryInterests,
        ProfileField::Hobbies,
        ProfileField::TopicsToAvoid,
        ProfileField::PreferredComplexity,
        ProfileField::PreferredArticleLength,
        ProfileField::NewsFrequency,
        ProfileField::PreferredContentTypes,
        ProfileField::PoliticalOrientation,
        ProfileField::CredibilityThreshold,
    ];

    pub fn column(self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::AgeRange => "age_range",
            ProfileField::EducationLevel => "education_level",
            ProfileField::FieldOfStudy => "field_of_study",
            ProfileField::PrimaryInterests => "primary_interests",
            ProfileField::SecondaryInterests => "secondary_interests",
            ProfileField::Hobbies => "hobbies",
            ProfileField::TopicsToAvoid => "topics_to_avoid",
            ProfileField::PreferredComplexity => "preferred_complexity",
            ProfileField::PreferredArticleLength => "preferred_article_length",
            ProfileField::NewsFrequency => "news_frequency",
            ProfileField::PreferredContentTypes => "preferred_content_types",
            ProfileField::PoliticalOrientation => "political_orientation",
            ProfileField::CredibilityThreshold => "credibility_threshold",
        }
    }

    /// Columns that also exist on the remote `users_personalized` table
    pub fn mirrors_to_remote(self) -> bool {
        matches!(
            self,
            ProfileField::Name
                | ProfileField::AgeRange
                | ProfileField::EducationLevel
                | ProfileField::PrimaryInterests
                | ProfileField::SecondaryInterests
                | ProfileField::PoliticalOrientation
                | ProfileField::CredibilityThreshold
        )
    }
}

// ============================================================================
// Request Models
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age_range: Option<String>,
    pub education_level: Option<String>,
    pub field_of_study: Option<String>,
    pub primary_interests: Option<Vec<String>>,
    pub secondary_interests: Option<Vec<String>>,
    pub hobbies: Option<Vec<String>>,
    pub topics_to_avoid: Option<Vec<String>>,
    pub preferred_complexity: Option<String>,
    pub preferred_article_length: Option<String>,
    pub news_frequency: Option<String>,
    pub preferred_content_types: Option<Vec<String>>,
    pub political_orientation: Option<String>,
    pub credibility_threshold: Option<f64>,
}

impl ProfileUpdate {
    pub fn text(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Name => self.name.as_deref(),
            ProfileField::AgeRange => self.age_range.as_deref(),
            ProfileField::EducationLevel => self.education_level.as_deref(),
            ProfileField::FieldOfStudy => self.field_of_study.as_deref(),
            ProfileField::PreferredComplexity => self.preferred_complexity.as_deref(),
            ProfileField::PreferredArticleLength => self.preferred_article_length.as_deref(),
            ProfileField::NewsFrequency => self.news_frequency.as_deref(),
            ProfileField::PoliticalOrientation => self.political_orientation.as_deref(),
            _ => None,
        }
    }

    pub fn list(&self, field: ProfileField) -> Option<&[String]> {
        match field {
            ProfileField::PrimaryInterests => self.primary_interests.as_deref(),
            ProfileField::SecondaryInterests => self.secondary_interests.as_deref(),
            ProfileField::Hobbies => self.hobbies.as_deref(),
            ProfileField::TopicsToAvoid => self.topics_to_avoid.as_deref(),
            ProfileField::PreferredContentTypes => self.preferred_content_types.as_deref(),
            _ => None,
        }
    }

    /// Supplied fields as bound values, in column order. Text is trimmed and
    /// lists are stored as JSON text.
    pub fn changes(&self) -> Vec<(ProfileField, SqlParam)> {
        ProfileField::ALL
            .iter()
            .filter_map(|&field| {
                if field == ProfileField::CredibilityThreshold {
                    return self
                        .credibility_threshold
                        .map(|v| (field, SqlParam::Float(v)));
                }
                if let Some(text) = self.text(field) {
                    return Some((field, SqlParam::Text(text.trim().to_string())));
                }
                self.list(field).map(|items| {
                    let json = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
                    (field, SqlParam::Text(json))
                })
            })
            .collect()
    }
}

// ============================================================================
// Response Models
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub message: String,
    pub updated_fields: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_only_include_supplied_fields() {
        let update = ProfileUpdate {
            name: Some("  Ada  ".to_string()),
            hobbies: Some(vec!["chess".to_string(), "rowing".to_string()]),
            credibility_threshold: Some(0.7),
            ..Default::default()
        };

        let changes = update.changes();
        assert_eq!(
            changes,
            vec![
                (ProfileField::Name, SqlParam::Text("Ada".to_string())),
                (
                    ProfileField::Hobbies,
                    SqlParam::Text(r#"["chess","rowing"]"#.to_string())
                ),
                (ProfileField::CredibilityThreshold, SqlParam::Float(0.7)),
            ]
        );
    }

    #[test]
    fn test_empty_update_has_no_changes() {
        assert!(ProfileUpdate::default().changes().is_empty());
    }

    #[test]
    fn test_remote_mirror_subset() {
        let mirrored: Vec<&str> = ProfileField::ALL
            .iter()
            .filter(|f| f.mirrors_to_remote())
            .map(|f| f.column())
            .collect();

        assert_eq!(
            mirrored,
            vec![
                "name",
                "age_range",
                "education_level",
                "primary_interests",
                "secondary_interests",
                "political_orientation",
                "credibility_threshold",
            ]
        );
    }
}
