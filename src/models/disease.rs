use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::fields::{self, Document};

/// Free text as stored: a single string or a (possibly nested) list of them.
/// The stored layout is kept so clients can render bullet lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TextValue {
    Text(String),
    List(Vec<TextValue>),
}

impl TextValue {
    /// Convert a stored value. Blank strings, empty lists, nulls and objects
    /// carry no text and yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(TextValue::Text(s.clone())),
            Value::Number(n) => Some(TextValue::Text(n.to_string())),
            Value::Array(items) => {
                let list: Vec<TextValue> = items.iter().filter_map(TextValue::from_value).collect();
                if list.is_empty() {
                    None
                } else {
                    Some(TextValue::List(list))
                }
            }
            _ => None,
        }
    }
}

fn text_field(doc: &Document, keys: &[&str]) -> Option<TextValue> {
    keys.iter()
        .filter_map(|k| doc.get(*k))
        .find_map(TextValue::from_value)
}

/// One treatment: what to give, how to prepare it, and how much.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Treatment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<TextValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<TextValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparation: Option<TextValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<TextValue>,
}

impl Treatment {
    fn read(doc: &Document, name_keys: &[&str]) -> Self {
        Self {
            name: text_field(doc, name_keys),
            ingredients: text_field(doc, &fields::INGREDIENT_KEYS),
            preparation: text_field(doc, &fields::PREPARATION_KEYS),
            dosage: text_field(doc, &fields::DOSAGE_KEYS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.ingredients.is_none()
            && self.preparation.is_none()
            && self.dosage.is_none()
    }
}

/// Treatment data in whichever of the two stored layouts the record uses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum Treatments {
    None,
    /// Treatment fields stored at the top level of the record.
    Flat(Treatment),
    /// A `Treatments` array of sub-records.
    Listed(Vec<Treatment>),
}

impl Treatments {
    fn read(doc: &Document) -> Self {
        let listed: Vec<Treatment> = fields::first_present(doc, &fields::TREATMENT_LIST_KEYS)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|entry| Treatment::read(entry, &fields::ENTRY_NAME_KEYS))
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if !listed.is_empty() {
            return Treatments::Listed(listed);
        }

        let flat = Treatment::read(doc, &fields::TREATMENT_NAME_KEYS);
        if flat.is_empty() {
            Treatments::None
        } else {
            Treatments::Flat(flat)
        }
    }

    pub fn entries(&self) -> Vec<&Treatment> {
        match self {
            Treatments::None => Vec::new(),
            Treatments::Flat(t) => vec![t],
            Treatments::Listed(list) => list.iter().collect(),
        }
    }
}

/// An image attached to a record. The base64 payload is never serialized;
/// clients fetch it through `image_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseImage {
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(skip)]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl DiseaseImage {
    fn read(entry: &Document) -> Option<Self> {
        let image_id = match entry.get("image_id")? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(Self {
            image_id,
            image_name: fields::first_text(entry, &["image_name"]).map(str::to_string),
            image_data: fields::first_text(entry, &["image_data"]).map(str::to_string),
            image_url: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordShape {
    FlatTreatment,
    TreatmentList,
    ImageBearing,
}

/// A disease record normalized out of one stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<TextValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causes: Option<TextValue>,
    pub treatments: Treatments,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<DiseaseImage>,
    pub collection: String,
    pub shape: RecordShape,
    /// Set when the stored document had no id and one was generated.
    #[serde(skip)]
    pub synthetic_id: bool,
}

impl DiseaseRecord {
    /// Normalize a stored document. Returns `None` when the document has no
    /// usable name.
    pub fn from_document(collection: &str, doc: &Document) -> Option<Self> {
        let name = fields::first_text(doc, &fields::NAME_KEYS)?.trim().to_string();

        let (id, synthetic_id) = match fields::document_id(doc) {
            Some(id) => (id, false),
            None => (format!("temp_{}", Uuid::new_v4().simple()), true),
        };

        let mut images: Vec<DiseaseImage> = fields::first_present(doc, &fields::IMAGE_LIST_KEYS)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(DiseaseImage::read)
                    .collect()
            })
            .unwrap_or_default();
        if !synthetic_id {
            for image in &mut images {
                image.image_url = Some(format!(
                    "/api/image/{}/{}/{}",
                    collection, id, image.image_id
                ));
            }
        }

        let treatments = Treatments::read(doc);
        let shape = shape_of(&treatments, &images);

        Some(Self {
            id,
            index: fields::document_index(doc),
            name,
            symptoms: text_field(doc, &fields::SYMPTOM_KEYS),
            causes: text_field(doc, &fields::CAUSE_KEYS),
            treatments,
            images,
            collection: collection.to_string(),
            shape,
            synthetic_id,
        })
    }

    /// Fold several records for the same logical disease into one. Scalars
    /// keep the first non-empty value; treatments and images are unioned,
    /// images keyed by `image_id` and treatments by structural equality.
    pub fn merge(records: Vec<DiseaseRecord>) -> Option<DiseaseRecord> {
        let mut iter = records.into_iter();
        let mut merged = iter.next()?;
        let mut entries: Vec<Treatment> =
            merged.treatments.entries().into_iter().cloned().collect();
        let started_flat = matches!(merged.treatments, Treatments::Flat(_));

        for record in iter {
            if merged.synthetic_id && !record.synthetic_id {
                merged.id = record.id.clone();
                merged.synthetic_id = false;
            }
            if merged.index.is_none() {
                merged.index = record.index;
            }
            if merged.name.is_empty() {
                merged.name = record.name.clone();
            }
            if merged.symptoms.is_none() {
                merged.symptoms = record.symptoms.clone();
            }
            if merged.causes.is_none() {
                merged.causes = record.causes.clone();
            }
            for entry in record.treatments.entries() {
                if !entries.contains(entry) {
                    entries.push(entry.clone());
                }
            }
            for image in record.images {
                if !merged.images.iter().any(|i| i.image_id == image.image_id) {
                    merged.images.push(image);
                }
            }
        }

        merged.treatments = match entries.len() {
            0 => Treatments::None,
            1 if started_flat => Treatments::Flat(entries.remove(0)),
            _ => Treatments::Listed(entries),
        };
        merged.shape = shape_of(&merged.treatments, &merged.images);
        Some(merged)
    }

    pub fn image(&self, image_id: &str) -> Option<&DiseaseImage> {
        self.images.iter().find(|i| i.image_id == image_id)
    }

    pub fn summary(&self) -> DiseaseSummary {
        DiseaseSummary {
            id: self.id.clone(),
            index: self.index,
            name: self.name.clone(),
            symptoms: self.symptoms.clone(),
            collection: self.collection.clone(),
        }
    }
}

fn shape_of(treatments: &Treatments, images: &[DiseaseImage]) -> RecordShape {
    if !images.is_empty() {
        RecordShape::ImageBearing
    } else if matches!(treatments, Treatments::Listed(_)) {
        RecordShape::TreatmentList
    } else {
        RecordShape::FlatTreatment
    }
}

/// Compact listing form of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<TextValue>,
    pub collection: String,
}
