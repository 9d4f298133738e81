//! Host props: what the embedding page hands the studio.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StudioError, StudioResult};

/// Where the background comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundSource {
    /// An AI-generated image.
    Generated {
        /// Storage key of the image.
        key: String,
    },
    /// A background picked from the template catalog.
    Template {
        /// Storage key of the template image.
        key: String,
    },
}

impl BackgroundSource {
    /// Storage key of the background image.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Generated { key } | Self::Template { key } => key,
        }
    }
}

/// A loadable catalog icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRef {
    /// Catalog identifier.
    pub id: String,
    /// Storage key of the icon image.
    pub key: String,
}

/// Business-info strings and logo used to seed a design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessPresets {
    /// Company name.
    pub company_name: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Phone, email or website.
    pub contact: Option<String>,
    /// Storage key of the logo.
    pub logo_key: Option<String>,
}

/// Inputs supplied by the host page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostProps {
    /// Chosen background, if any.
    pub background: Option<BackgroundSource>,
    /// Icons the user can place.
    pub icons: Vec<IconRef>,
    /// Font names offered in the toolbar.
    pub fonts: Vec<String>,
    /// Business presets.
    pub presets: BusinessPresets,
}

impl HostProps {
    /// Parse props from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or icon ids repeat.
    pub fn from_json(json: &str) -> StudioResult<Self> {
        let props: Self = serde_json::from_str(json)?;
        props.validate()?;
        Ok(props)
    }

    /// Read props from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> StudioResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a catalog icon by id.
    #[must_use]
    pub fn icon(&self, id: &str) -> Option<&IconRef> {
        self.icons.iter().find(|icon| icon.id == id)
    }

    /// Whether `family` is offered to the user.
    #[must_use]
    pub fn offers_font(&self, family: &str) -> bool {
        self.fonts.iter().any(|f| f == family)
    }

    fn validate(&self) -> StudioResult<()> {
        for (index, icon) in self.icons.iter().enumerate() {
            if self.icons[..index].iter().any(|other| other.id == icon.id) {
                return Err(StudioError::Props(format!("duplicate icon id {}", icon.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPS: &str = r#"{
        "background": { "type": "generated", "key": "ai/42.png" },
        "icons": [
            { "id": "7", "key": "icons/phone.png" },
            { "id": "9", "key": "icons/pin.png" }
        ],
        "fonts": ["Roboto", "Georgia"],
        "presets": {
            "companyName": "Bakery Nord",
            "address": "Main St 1",
            "logoKey": "logos/bakery.png"
        }
    }"#;

    #[test]
    fn test_parse_host_props() {
        let props = HostProps::from_json(PROPS).expect("props");
        assert_eq!(props.background.as_ref().map(BackgroundSource::key), Some("ai/42.png"));
        assert_eq!(props.icon("9").map(|i| i.key.as_str()), Some("icons/pin.png"));
        assert!(props.icon("1").is_none());
        assert!(props.offers_font("Georgia"));
        assert_eq!(props.presets.company_name.as_deref(), Some("Bakery Nord"));
        assert!(props.presets.contact.is_none());
    }

    #[test]
    fn test_empty_props_default() {
        let props = HostProps::from_json("{}").expect("props");
        assert_eq!(props, HostProps::default());
    }

    #[test]
    fn test_template_background() {
        let props =
            HostProps::from_json(r#"{"background":{"type":"template","key":"tpl/3.jpg"}}"#)
                .expect("props");
        assert_eq!(
            props.background,
            Some(BackgroundSource::Template {
                key: "tpl/3.jpg".into()
            })
        );
    }

    #[test]
    fn test_duplicate_icon_ids_rejected() {
        let json = r#"{"icons":[{"id":"1","key":"a"},{"id":"1","key":"b"}]}"#;
        assert!(matches!(HostProps::from_json(json), Err(StudioError::Props(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("props.json");
        std::fs::write(&path, PROPS).expect("write");
        assert_eq!(HostProps::from_file(&path).expect("props").icons.len(), 2);
    }
}
