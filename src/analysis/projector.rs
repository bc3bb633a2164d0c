//! Result projector - turns an analysis outcome into metadata writes.
//!
//! [`Projector::project`] is pure: it computes the derived metadata and the
//! list of writes. [`Projection::apply`] performs them on a store.
//!
//! Categories are processed in order (labels, moderation, faces,
//! celebrities, text):
//! - a failed category stores its error and contributes nothing else
//! - an empty success is skipped
//! - a non-empty success stores its detections, clears a stale error and
//!   contributes keywords, terms and an alt-text candidate

use super::hooks::Hooks;
use super::keywords;
use super::orchestrator::AnalysisOutcome;
use crate::error::{Error, Result};
use crate::recognition::{Category, Detections};
use crate::store::{self, AttachmentId, MetadataStore, ALT_TEXT_KEY, KEYWORDS_KEY, LABELS_TAXONOMY};

/// Number of labels used for the alt-text candidate.
const ALT_TEXT_LABELS: usize = 3;

/// Attachment values the projection depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingState {
    pub alt_text: String,
    /// Caption
    pub excerpt: String,
}

impl ExistingState {
    pub async fn load(store: &dyn MetadataStore, id: AttachmentId) -> Result<Self> {
        let attachment = store
            .attachment(id)
            .await?
            .ok_or(Error::AttachmentNotFound(id))?;
        let alt_text = store.get_meta(id, ALT_TEXT_KEY).await?.unwrap_or_default();

        Ok(Self {
            alt_text,
            excerpt: attachment.excerpt,
        })
    }
}

/// One store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaWrite {
    SetMeta { key: String, value: String },
    DeleteMeta { key: String },
    AddTerms { taxonomy: String, terms: Vec<String> },
    SetExcerpt(String),
}

/// Values derived from one outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedMetadata {
    /// Normalised keywords, as stored
    pub keywords: Vec<String>,
    /// Alt-text candidate before the alt-text hook; `None` when no label or
    /// celebrity was found
    pub alt_text: Option<String>,
    /// Label and celebrity names assigned as taxonomy terms
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub derived: DerivedMetadata,
    pub writes: Vec<MetaWrite>,
}

impl Projection {
    /// Perform every write, in order.
    pub async fn apply(&self, store: &dyn MetadataStore, id: AttachmentId) -> Result<()> {
        for write in &self.writes {
            match write {
                MetaWrite::SetMeta { key, value } => store.set_meta(id, key, value).await?,
                MetaWrite::DeleteMeta { key } => store.delete_meta(id, key).await?,
                MetaWrite::AddTerms { taxonomy, terms } => store.add_object_terms(id, taxonomy, terms).await?,
                MetaWrite::SetExcerpt(excerpt) => store.set_excerpt(id, excerpt).await?,
            }
        }
        Ok(())
    }

    /// Value of the last `SetMeta` for `key`, if any.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.writes.iter().rev().find_map(|w| match w {
            MetaWrite::SetMeta { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }
}

pub struct Projector<'a> {
    hooks: &'a Hooks,
}

impl<'a> Projector<'a> {
    pub fn new(hooks: &'a Hooks) -> Self {
        Self { hooks }
    }

    pub fn project(&self, id: AttachmentId, outcome: &AnalysisOutcome, existing: &ExistingState) -> Result<Projection> {
        let mut writes = Vec::new();
        let mut collected: Vec<String> = Vec::new();
        let mut terms: Vec<String> = Vec::new();
        let mut alt_candidate: Option<String> = None;

        for (category, result) in outcome.iter() {
            let detections = match result {
                Err(e) => {
                    writes.push(MetaWrite::SetMeta {
                        key: store::error_key(category),
                        value: serde_json::to_string(&e.to_stored())?,
                    });
                    continue;
                }
                Ok(d) if d.is_empty() => continue,
                Ok(d) => d,
            };

            writes.push(MetaWrite::SetMeta {
                key: store::result_key(category),
                value: detections.to_payload()?,
            });
            writes.push(MetaWrite::DeleteMeta {
                key: store::error_key(category),
            });

            match detections {
                Detections::Labels(labels) => {
                    let names: Vec<String> = labels.iter().map(|l| l.name.clone()).collect();
                    collected.extend(names.iter().cloned());
                    terms.extend(names);

                    let mut best: Vec<_> = labels.iter().collect();
                    best.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
                    let best: Vec<&str> = best.iter().take(ALT_TEXT_LABELS).map(|l| l.name.as_str()).collect();
                    alt_candidate = Some(best.join(", "));
                }
                Detections::Moderation(flags) => {
                    collected.extend(flags.iter().map(|m| m.name.clone()));
                }
                Detections::Faces(faces) => {
                    for face in faces {
                        if let Some(gender) = &face.gender {
                            collected.push(gender.value.clone());
                        }
                        if let Some(emotions) = &face.emotions {
                            collected.extend(emotions.iter().map(|e| e.kind.clone()));
                        }
                    }
                }
                Detections::Celebrities(celebrities) => {
                    let names: Vec<String> = celebrities.iter().map(|c| c.name.clone()).collect();
                    collected.splice(0..0, names.iter().cloned());
                    terms.extend(names.iter().cloned());

                    let joined = names.join(", ");
                    if existing.excerpt.trim().is_empty() {
                        writes.push(MetaWrite::SetExcerpt(joined.clone()));
                    }
                    alt_candidate = Some(joined);
                }
                Detections::Text(lines) => {
                    collected.extend(lines.iter().map(|t| t.detected_text.clone()));
                }
            }
        }

        if !terms.is_empty() {
            writes.push(MetaWrite::AddTerms {
                taxonomy: LABELS_TAXONOMY.to_string(),
                terms: terms.clone(),
            });
        }

        if existing.alt_text.trim().is_empty() {
            let alt = self
                .hooks
                .apply_alt_text(alt_candidate.clone().unwrap_or_default(), outcome, id);
            if !alt.trim().is_empty() {
                writes.push(MetaWrite::SetMeta {
                    key: ALT_TEXT_KEY.to_string(),
                    value: alt,
                });
            }
        }

        let keywords = keywords::normalize(self.hooks.apply_keywords(collected, outcome, id));
        writes.push(MetaWrite::SetMeta {
            key: KEYWORDS_KEY.to_string(),
            value: keywords::join(&keywords),
        });

        Ok(Projection {
            derived: DerivedMetadata {
                keywords,
                alt_text: alt_candidate,
                terms,
            },
            writes,
        })
    }
}
