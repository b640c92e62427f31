//! The boundary to the component library being showcased.
//!
//! Components are opaque: the runtime only knows them by name and hands
//! them a props map.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

/// Props handed to a component: fixed args overlaid with control values.
pub type Props = IndexMap<String, Value>;

/// What a component produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub markup: String,
}

impl RenderedOutput {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// A component reported that it could not render.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// A renderable unit of the component library.
pub trait Renderable: Send + Sync {
    fn render(&self, props: &Props) -> Result<RenderedOutput, RenderError>;
}

impl<F> Renderable for F
where
    F: Fn(&Props) -> Result<RenderedOutput, RenderError> + Send + Sync,
{
    fn render(&self, props: &Props) -> Result<RenderedOutput, RenderError> {
        self(props)
    }
}

/// Components by name.
#[derive(Clone, Default)]
pub struct ComponentLibrary {
    components: BTreeMap<String, Arc<dyn Renderable>>,
}

impl fmt::Debug for ComponentLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentLibrary")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: impl Into<String>, component: impl Renderable + 'static) {
        self.components.insert(name.into(), Arc::new(component));
    }

    pub fn with(mut self, name: impl Into<String>, component: impl Renderable + 'static) -> Self {
        self.register(name, component);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Renderable>> {
        self.components.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_register_as_components() {
        let library = ComponentLibrary::new().with("echo", |props: &Props| -> Result<RenderedOutput, RenderError> {
            Ok(RenderedOutput::new(format!("{}", props.len())))
        });
        let echo = library.get("echo").unwrap();
        let mut props = Props::new();
        props.insert("a".into(), Value::Null);
        assert_eq!(echo.render(&props).unwrap().markup, "1");
        assert!(library.get("missing").is_none());
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["echo"]);
    }

    #[test]
    fn render_error_keeps_its_source() {
        let io = std::io::Error::other("disk");
        let err = RenderError::new("failed").with_source(io);
        assert_eq!(err.to_string(), "failed");
        assert_eq!(StdError::source(&err).unwrap().to_string(), "disk");
    }
}
