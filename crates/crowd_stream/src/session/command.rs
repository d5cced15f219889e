use crowd_stream_proto::{ClientCommand, CommandSchema, RESET_KEY, TARGET_COMMAND_SCHEMA};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message is not valid json: {0}")]
    NotJson(String),
    #[error("message is not a json object")]
    NotObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Turns raw inbound text into a [`ClientCommand`] under one [`CommandSchema`].
/// Rejection never touches session state; callers just drop the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDecoder {
    schema: CommandSchema,
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new(TARGET_COMMAND_SCHEMA)
    }
}

impl CommandDecoder {
    pub fn new(schema: CommandSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> CommandSchema {
        self.schema
    }

    pub fn decode(&self, raw: &str) -> Result<ClientCommand, ValidationError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| ValidationError::NotJson(err.to_string()))?;
        self.decode_value(&value)
    }

    pub fn decode_value(&self, value: &Value) -> Result<ClientCommand, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::NotObject)?;
        if let Some(missing) = self
            .schema
            .required
            .iter()
            .find(|key| !object.contains_key(**key))
        {
            return Err(ValidationError::MissingField(*missing));
        }

        let command = ClientCommand {
            reset: bool_field(object, RESET_KEY)?,
            is_running: bool_field(object, self.schema.running_key)?,
            target: count_field(object, self.schema.target_key)?,
        };

        // A required key holding `null` is as good as missing.
        if self.is_required(self.schema.running_key) && command.is_running.is_none() {
            return Err(ValidationError::WrongType {
                field: self.schema.running_key,
                expected: "a boolean",
            });
        }
        if self.is_required(self.schema.target_key) && command.target.is_none() {
            return Err(ValidationError::WrongType {
                field: self.schema.target_key,
                expected: "a non-negative integer",
            });
        }
        Ok(command)
    }

    fn is_required(&self, key: &str) -> bool {
        self.schema.required.iter().any(|required| *required == key)
    }
}

fn bool_field(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<bool>, ValidationError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(ValidationError::WrongType {
            field: key,
            expected: "a boolean",
        }),
    }
}

fn count_field(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<u64>, ValidationError> {
    let wrong_type = ValidationError::WrongType {
        field: key,
        expected: "a non-negative integer",
    };
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            if let Some(value) = number.as_u64() {
                return Ok(Some(value));
            }
            // Browser clients send sliders as floats; accept whole values.
            match number.as_f64() {
                Some(value) if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 => {
                    Ok(Some(value as u64))
                }
                _ => Err(wrong_type),
            }
        }
        Some(_) => Err(wrong_type),
    }
}
