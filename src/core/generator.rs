//! Generation steps that consume a description: structured attributes and
//! the embedding vector.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{describe_error, PipelineError};
use crate::adapters::{EmbeddingModel, GenerativeModel};
use crate::domain::Attributes;

const ENTRY_PROMPT: &str = r#"You are a Pokedex designed to output JSON. Given a description of an object, output a single JSON object with the following fields: object, species, approximateWeight, approximateHeight, weight, height, hp, attack, defense, speed, and type.
Humans for example would have base health of 100. For a Golden Retriever you should output:
{"object": "Golden Retriever", "species": "Dog", "approximateWeight": "10-20 kg", "approximateHeight": "50-60 cm", "weight": 15, "height": 55, "hp": 50, "attack": 40, "defense": 40, "speed": 19, "type": "Normal"}
For a Magpie:
{"object": "Magpie", "species": "Bird", "approximateWeight": "130 - 270 g", "approximateHeight": "37-43 cm", "weight": 0.2, "height": 40, "hp": 25, "attack": 20, "defense": 10, "speed": 32, "type": "Flying"}
If the object is not a living creature, plant or lifeform, such as a coffee cup, output the same fields with "type": "Inanimate".
If the description is of a person, output "object": "Person", "species": "Human" and "type": "Normal".
If you are not sure about attributes such as height or speed, it is okay to guess. Plants have type Grass with species Plant; fish have type Water with species Fish.
Keep the type to one of: Normal, Fire, Water, Grass, Electric, Ice, Fighting, Poison, Ground, Flying, Psychic, Bug, Rock, Ghost, Dragon, Dark, Steel, Fairy, Inanimate.
Description: "#;

/// Remove markdown code fences (```json / ```) around model output
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse cleaned model output into attributes
fn parse_attributes(cleaned: &str) -> Result<Attributes, PipelineError> {
    let mut value: Value =
        serde_json::from_str(cleaned).map_err(|e| PipelineError::Parse(e.to_string()))?;

    // Models sometimes emit both `object` and `name`; `object` wins
    if let Some(map) = value.as_object_mut() {
        if map.contains_key("object") {
            map.remove("name");
        }
        // The id is always assigned here, never taken from the model
        map.remove("_id");
    }

    Attributes::deserialize(value).map_err(|e| PipelineError::Parse(e.to_string()))
}

/// Description to structured attributes
pub struct EntryGenerator {
    model: Arc<dyn GenerativeModel>,
}

impl EntryGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    #[instrument(skip_all, fields(provider = self.model.name()))]
    pub async fn generate(&self, description: &str) -> Result<Attributes, PipelineError> {
        let prompt = format!("{}{}", ENTRY_PROMPT, description);

        let text = self
            .model
            .generate(&prompt, None)
            .await
            .map_err(|e| PipelineError::Generation(describe_error(&e)))?;

        let mut attributes = parse_attributes(&strip_code_fences(&text)).map_err(|e| {
            warn!(error = %e, "Model output did not parse as an entry");
            e
        })?;

        attributes.id = Uuid::new_v4();
        attributes.description = description.to_string();

        debug!(object = %attributes.object, kind = %attributes.kind, "Attributes generated");
        Ok(attributes)
    }
}

/// Description to embedding vector
pub struct EmbeddingGenerator {
    model: Arc<dyn EmbeddingModel>,
}

impl EmbeddingGenerator {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self { model }
    }

    #[instrument(skip_all)]
    pub async fn embed(&self, description: &str) -> Result<Vec<f32>, PipelineError> {
        let vector = self
            .model
            .embed(description)
            .await
            .map_err(|e| PipelineError::Embedding(describe_error(&e)))?;

        if vector.is_empty() {
            return Err(PipelineError::Embedding(
                "provider returned an empty vector".to_string(),
            ));
        }

        debug!(dimensions = vector.len(), "Embedding generated");
        Ok(vector)
    }
}
