//! Request body extractors.
//!
//! Write endpoints accept either a JSON object or `multipart/form-data`.
//! [`FormPayload`] flattens both into text fields plus uploaded files so the
//! handlers validate a single shape.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

use super::error::ApiError;

/// JSON body whose rejections use the API error format.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// A file part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A submitted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSON `null`, or an empty multipart file part
    Null,
    Text(String),
    List(Vec<String>),
}

/// Flattened JSON or multipart body.
#[derive(Debug, Default)]
pub struct FormPayload {
    fields: HashMap<String, FieldValue>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormPayload {
    /// Whether the client sent the field at all, as text, null or a file.
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.files.contains_key(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Text(value) => Some(value),
            FieldValue::List(values) => values.first().map(String::as_str),
            FieldValue::Null => None,
        }
    }

    /// Every value of a repeatable field.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.fields.get(name) {
            Some(FieldValue::List(values)) => values.clone(),
            Some(FieldValue::Text(value)) => vec![value.clone()],
            Some(FieldValue::Null) | None => Vec::new(),
        }
    }

    /// A field sent explicitly empty: `null` or `""`, and no file.
    pub fn is_cleared(&self, name: &str) -> bool {
        if self.files.contains_key(name) {
            return false;
        }
        match self.fields.get(name) {
            Some(FieldValue::Null) => true,
            Some(FieldValue::Text(value)) => value.trim().is_empty(),
            _ => false,
        }
    }

    /// Parse a boolean field. Missing fields are `Ok(None)`.
    pub fn boolean(&self, name: &str) -> Result<Option<bool>, String> {
        let Some(raw) = self.text(name) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(Some(true)),
            "false" | "0" | "off" | "no" => Ok(Some(false)),
            _ => Err("Must be a valid boolean.".to_string()),
        }
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).and_then(|files| files.first())
    }

    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn push_text(&mut self, name: String, value: String) {
        match self.fields.remove(&name) {
            Some(FieldValue::Text(first)) => {
                self.fields.insert(name, FieldValue::List(vec![first, value]));
            }
            Some(FieldValue::List(mut values)) => {
                values.push(value);
                self.fields.insert(name, FieldValue::List(values));
            }
            Some(FieldValue::Null) | None => {
                self.fields.insert(name, FieldValue::Text(value));
            }
        }
    }

    fn from_json(object: serde_json::Map<String, Value>) -> Self {
        let mut payload = FormPayload::default();
        for (name, value) in object {
            let field = match value {
                Value::Null => FieldValue::Null,
                Value::String(text) => FieldValue::Text(text),
                Value::Array(items) => FieldValue::List(
                    items
                        .into_iter()
                        .filter(|item| !item.is_null())
                        .map(json_scalar_to_string)
                        .collect(),
                ),
                other => FieldValue::Text(json_scalar_to_string(other)),
            };
            payload.fields.insert(name, field);
        }
        payload
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut payload = FormPayload::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            match file_name {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(|e| {
                        ApiError::BadRequest(format!("Failed to read upload {}: {}", name, e))
                    })?;
                    // Browsers send an empty part when no file was chosen.
                    if file_name.is_empty() && bytes.is_empty() {
                        payload.fields.entry(name).or_insert(FieldValue::Null);
                        continue;
                    }
                    payload
                        .files
                        .entry(name)
                        .or_default()
                        .push(UploadedFile { file_name, bytes });
                }
                None => {
                    let text = field.text().await.map_err(|e| {
                        ApiError::BadRequest(format!("Failed to read field {}: {}", name, e))
                    })?;
                    payload.push_text(name, text);
                }
            }
        }
        Ok(payload)
    }
}

fn json_scalar_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
            return FormPayload::from_multipart(multipart).await;
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(FormPayload::default());
        }
        if !content_type.is_empty() && !content_type.contains("json") {
            return Err(ApiError::BadRequest(format!(
                "Unsupported media type \"{}\" in request.",
                content_type
            )));
        }
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(object)) => Ok(FormPayload::from_json(object)),
            Ok(_) => Err(ApiError::BadRequest(
                "Expected a JSON object as the request body.".to_string(),
            )),
            Err(e) => Err(ApiError::BadRequest(format!("JSON parse error: {}", e))),
        }
    }
}
