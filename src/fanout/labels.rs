//! Labels the model is asked to pick from a closed set.
//!
//! The model is not bound by the list, so every label type keeps an
//! `Unknown` variant carrying the received text verbatim.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! soft_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub const KNOWN: &'static [&'static str] = &[$($label,)+];

            /// Exact match against the known labels after trimming; anything
            /// else is kept as `Unknown` with the original text.
            pub fn from_label(raw: &str) -> Self {
                match raw.trim() {
                    $($label => $name::$variant,)+
                    _ => $name::Unknown(raw.to_string()),
                }
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown(raw) => raw,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Unknown(_))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from_label(&raw))
            }
        }
    };
}

soft_enum! {
    /// How an expanded query relates to the original one.
    pub enum QueryType {
        Reformulation => "reformulation",
        Related => "related",
        Implicit => "implicit",
        Comparative => "comparative",
        EntityExpansion => "entity_expansion",
        Personalized => "personalized",
    }
}

soft_enum! {
    /// Content format a retrieval router would prefer for a sub-query.
    pub enum RoutingFormat {
        WebArticle => "web_article",
        FaqPage => "faq_page",
        HowToSteps => "how_to_steps",
        ComparisonTable => "comparison_table",
        BuyersGuide => "buyers_guide",
        Checklist => "checklist",
        ProductSpecSheet => "product_spec_sheet",
        GlossaryDefinition => "glossary/definition",
        PricingPage => "pricing_page",
        ReviewRoundup => "review_roundup",
        TutorialVideoTranscript => "tutorial_video/transcript",
        PodcastTranscript => "podcast_transcript",
        CodeSamplesDocs => "code_samples/docs",
        ApiReference => "api_reference",
        CalculatorTool => "calculator/tool",
        Dataset => "dataset",
        ImageGallery => "image_gallery",
        MapLocalPack => "map/local_pack",
        ForumQna => "forum/qna",
        PdfWhitepaper => "pdf_whitepaper",
        CaseStudy => "case_study",
        PressRelease => "press_release",
        InteractiveWidget => "interactive_widget",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_query_types_parse() {
        assert_eq!(QueryType::from_label("comparative"), QueryType::Comparative);
        assert_eq!(
            QueryType::from_label(" entity_expansion "),
            QueryType::EntityExpansion
        );
        assert_eq!(QueryType::KNOWN.len(), 6);
    }

    #[test]
    fn unknown_label_keeps_received_text() {
        let t = QueryType::from_label("Reformulation");
        assert_eq!(t, QueryType::Unknown("Reformulation".into()));
        assert_eq!(t.as_str(), "Reformulation");
        assert!(!t.is_known());
    }

    #[test]
    fn routing_formats_cover_closed_list() {
        assert_eq!(RoutingFormat::KNOWN.len(), 23);
        for label in RoutingFormat::KNOWN {
            let parsed = RoutingFormat::from_label(label);
            assert!(parsed.is_known(), "{label} should be known");
            assert_eq!(parsed.as_str(), *label);
        }
    }

    #[test]
    fn slash_labels_round_trip_through_serde() {
        let f: RoutingFormat = serde_json::from_str(r#""map/local_pack""#).unwrap();
        assert_eq!(f, RoutingFormat::MapLocalPack);
        assert_eq!(serde_json::to_string(&f).unwrap(), r#""map/local_pack""#);

        let odd: RoutingFormat = serde_json::from_str(r#""video""#).unwrap();
        assert_eq!(serde_json::to_string(&odd).unwrap(), r#""video""#);
    }
}
