//! Dynamic values at the evaluator boundary.
//!
//! Expression evaluation passes function arguments whose type is only
//! known at run time. [`Value`] is the closed tagged union those arguments
//! travel as; operations dispatch by pattern match at each boundary.

use helio_core::{Image, MonoImage, RgbImage};
use std::sync::Arc;

/// A dynamically typed evaluator value.
#[derive(Debug, Clone)]
pub enum Value {
    /// A mono image.
    Mono(Arc<MonoImage>),
    /// An RGB image.
    Rgb(Arc<RgbImage>),
    /// A number (all script numbers are f64).
    Number(f64),
    /// A string.
    Text(String),
    /// A list of values.
    List(Vec<Value>),
}

impl Value {
    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Mono(_) => "mono",
            Value::Rgb(_) => "rgb",
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// Numeric view.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// String view.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Mono-image view.
    pub fn as_mono(&self) -> Option<&Arc<MonoImage>> {
        match self {
            Value::Mono(v) => Some(v),
            _ => None,
        }
    }

    /// RGB-image view.
    pub fn as_rgb(&self) -> Option<&Arc<RgbImage>> {
        match self {
            Value::Rgb(v) => Some(v),
            _ => None,
        }
    }

    /// List view.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this value is an image of either kind.
    pub fn is_image(&self) -> bool {
        matches!(self, Value::Mono(_) | Value::Rgb(_))
    }
}

impl From<Image> for Value {
    fn from(image: Image) -> Self {
        match image {
            Image::Mono(img) => Value::Mono(Arc::new(img)),
            Image::Rgb(img) => Value::Rgb(Arc::new(img)),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch() {
        let v = Value::from(2.5);
        assert_eq!(v.as_number(), Some(2.5));
        assert_eq!(v.as_text(), None);
        assert_eq!(v.type_name(), "number");

        let img = Value::from(Image::Mono(MonoImage::new(2, 2)));
        assert!(img.is_image());
        assert!(img.as_mono().is_some());

        let list = Value::List(vec![Value::from(1.0), Value::from("x")]);
        assert_eq!(list.as_list().unwrap().len(), 2);
    }
}
