use serde::{Deserialize, Serialize};

/// What kind of input a form field accepts. A tagged union rather than a
/// free-form type string, so a select field cannot exist without its
/// option list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Boolean,
    Select { options: Vec<String> },
}

/// Show a field only when an earlier field's answer equals `equals`.
/// Evaluation is a UI concern; the engine only validates the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityCondition {
    pub field_key: String,
    pub equals: serde_json::Value,
}

/// One field of an activity's registration form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub id: String,
    pub activity_id: String,
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    pub position: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<VisibilityCondition>,
}

/// Field definition as submitted by staff; ids and positions are assigned
/// on write.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFormField {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub visible_if: Option<VisibilityCondition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_kind_round_trips_select_options() {
        let kind = FieldKind::Select {
            options: vec!["Beginner".into(), "Intermediate".into(), "Advanced".into()],
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"type\":\"select\""));
        let back: FieldKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn new_field_defaults_optional_flags() {
        let field: NewFormField = serde_json::from_str(
            r#"{ "key": "wheelchair_access", "label": "Do you need wheelchair access?", "type": "boolean" }"#,
        )
        .unwrap();
        assert!(!field.required);
        assert!(field.visible_if.is_none());
        assert_eq!(field.kind, FieldKind::Boolean);
    }
}
